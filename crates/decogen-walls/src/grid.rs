use crate::plane_split::{group_by_plane, GridVertex, PlaneGroup, WallOrientation};
use decogen_core::geom::approximately;
use decogen_core::report::{WallBuildReport, Warning};
use itertools::Itertools;
use serde::{Deserialize, Serialize};

/// Spacing between consecutive real vertices must exceed this many steps
/// before fillers are synthesized.
const GAP_THRESHOLD_FACTOR: f32 = 1.5;

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct WallGridConfig {
    /// Nominal spacing of the source mesh's vertex lattice.
    pub vertex_step: f32,
    /// Two vertices within this Y distance land in the same row.
    pub row_tolerance: f32,
}

impl Default for WallGridConfig {
    fn default() -> Self {
        Self {
            vertex_step: 0.25,
            row_tolerance: 0.05,
        }
    }
}

/// One wall face as a dense row/column grid. Rows run top-down (descending
/// world Y), columns left-to-right along the face's horizontal axis. Row and
/// column boundary coordinates are cached for cell resolution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WallGrid {
    rows: Vec<Vec<GridVertex>>,
    orientation: WallOrientation,
    position_value: f32,
    source_vertex_count: usize,
    row_boundaries: Vec<f32>,
    col_boundaries: Vec<f32>,
}

impl WallGrid {
    /// Arrange an unordered coplanar vertex set into a grid: bucket by Y
    /// into rows, order rows top-down and columns ascending, synthesize gap
    /// fillers, cache the boundary coordinates. Also returns the filler
    /// count for diagnostics.
    pub fn from_vertices(
        config: &WallGridConfig,
        vertices: &[GridVertex],
        orientation: WallOrientation,
        position_value: f32,
        source_vertex_count: usize,
    ) -> (WallGrid, usize) {
        let mut rows: Vec<Vec<GridVertex>> = Vec::new();
        for vertex in vertices {
            match rows.iter_mut().find(|row| {
                approximately(row[0].position.y, vertex.position.y, config.row_tolerance)
            }) {
                Some(row) => row.push(*vertex),
                None => rows.push(vec![*vertex]),
            }
        }
        rows.sort_by(|a, b| b[0].position.y.total_cmp(&a[0].position.y));
        for row in rows.iter_mut() {
            row.sort_by(|a, b| {
                orientation
                    .horizontal(&a.position)
                    .total_cmp(&orientation.horizontal(&b.position))
            });
        }

        let mut grid = WallGrid {
            rows,
            orientation,
            position_value,
            source_vertex_count,
            row_boundaries: Vec::new(),
            col_boundaries: Vec::new(),
        };
        let fillers = grid.fill_gaps(config.vertex_step);
        grid.cache_ranges();
        (grid, fillers)
    }

    /// Per row: spacing beyond 1.5x the step gets round(d/step) - 1 fillers
    /// at even interpolations; rows shorter than the first row are extended
    /// toward the first row's last column the same way. Idempotent, since
    /// filled rows no longer exceed the threshold.
    fn fill_gaps(&mut self, step: f32) -> usize {
        if self.rows.is_empty() {
            return 0;
        }
        let mut added = 0;
        added += fill_row_gaps(&mut self.rows[0], step, self.orientation, None);

        let first_len = self.rows[0].len();
        let first_last_h = self
            .rows[0]
            .last()
            .map(|v| self.orientation.horizontal(&v.position));
        for row in self.rows.iter_mut().skip(1) {
            let extend_to = if row.len() < first_len {
                first_last_h
            } else {
                None
            };
            added += fill_row_gaps(row, step, self.orientation, extend_to);
        }
        added
    }

    fn cache_ranges(&mut self) {
        self.row_boundaries = self.rows.iter().map(|r| r[0].position.y).collect();
        self.col_boundaries = self
            .rows
            .first()
            .map(|row| {
                row.iter()
                    .map(|v| self.orientation.horizontal(&v.position))
                    .collect()
            })
            .unwrap_or_default();
    }

    /// False when any row diverges from the first row's width; callers must
    /// discard and rebuild rather than query an inconsistent grid.
    pub fn is_correctly_calculated(&self) -> bool {
        match self.rows.first() {
            Some(first) => self.rows.iter().all(|row| row.len() == first.len()),
            None => false,
        }
    }

    /// Detect a topologically disjoint group: a filler run in the first row
    /// flanked by real vertices marks a door/window-style hole, and the grid
    /// is split into a left and a right surface at that run. The gap span
    /// itself belongs to neither half.
    pub fn split_disjoint(&self) -> Option<(Vec<GridVertex>, Vec<GridVertex>)> {
        let first_row = self.rows.first()?;
        for j in 1..first_row.len() {
            if !first_row[j].is_filler() || first_row[j - 1].is_filler() {
                continue;
            }
            let right_start = match first_row[j + 1..]
                .iter()
                .find_position(|v| !v.is_filler())
            {
                Some((offset, _)) => j + 1 + offset,
                None => j,
            };

            let mut left = Vec::new();
            let mut right = Vec::new();
            for row in &self.rows {
                left.extend(row.iter().take(j).copied());
                right.extend(row.iter().skip(right_start).copied());
            }
            return Some((left, right));
        }
        None
    }

    pub fn rows(&self) -> &[Vec<GridVertex>] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn col_count(&self) -> usize {
        self.rows.first().map(Vec::len).unwrap_or(0)
    }

    pub fn vertex(&self, row: usize, col: usize) -> Option<&GridVertex> {
        self.rows.get(row)?.get(col)
    }

    pub fn orientation(&self) -> WallOrientation {
        self.orientation
    }

    pub fn position_value(&self) -> f32 {
        self.position_value
    }

    pub fn source_vertex_count(&self) -> usize {
        self.source_vertex_count
    }

    pub fn row_boundaries(&self) -> &[f32] {
        &self.row_boundaries
    }

    pub fn col_boundaries(&self) -> &[f32] {
        &self.col_boundaries
    }
}

fn fill_row_gaps(
    row: &mut Vec<GridVertex>,
    step: f32,
    orientation: WallOrientation,
    extend_to: Option<f32>,
) -> usize {
    let mut filled: Vec<GridVertex> = Vec::with_capacity(row.len());
    let mut added = 0;

    for (i, vertex) in row.iter().enumerate() {
        if i > 0 {
            let prev = filled[filled.len() - 1];
            let prev_h = orientation.horizontal(&prev.position);
            let distance = orientation.horizontal(&vertex.position) - prev_h;
            if distance > step * GAP_THRESHOLD_FACTOR {
                let missing = (distance / step).round() as usize;
                for n in 1..missing {
                    let position = orientation
                        .with_horizontal(&prev.position, prev_h + n as f32 * step)
                        .round_dp(4);
                    filled.push(GridVertex::filler(position, prev.normal));
                    added += 1;
                }
            }
        }
        filled.push(*vertex);
    }

    // short row: extend toward the first row's last column
    if let (Some(target_h), Some(last)) = (extend_to, filled.last().copied()) {
        let last_h = orientation.horizontal(&last.position);
        let distance = target_h - last_h;
        if distance > 0.0 {
            let missing = (distance / step).round() as usize;
            for n in 1..missing {
                let position = orientation
                    .with_horizontal(&last.position, last_h + n as f32 * step)
                    .round_dp(4);
                filled.push(GridVertex::filler(position, last.normal));
                added += 1;
            }
        }
    }

    *row = filled;
    added
}

/// Full pipeline from a tagged world-space vertex buffer to queryable wall
/// grids: coplanar grouping, per-group grid synthesis, disjoint-surface
/// splitting, with a build report for diagnostics.
pub fn build_grids(
    config: &WallGridConfig,
    vertices: &[GridVertex],
    source_vertex_count: usize,
) -> (Vec<WallGrid>, WallBuildReport) {
    let mut report = WallBuildReport::default();
    let (groups, discarded) = group_by_plane(vertices);
    report.groups_found = groups.len();
    report.groups_discarded = discarded;

    let mut grids = Vec::new();
    for group in &groups {
        let (grid, fillers) = grid_from_group(config, group, &group.vertices, source_vertex_count);

        if let Some((left, right)) = grid.split_disjoint() {
            // the pre-split grid is discarded, so its fillers do not count
            report.splits_performed += 1;
            for half in [left, right] {
                let (sub, fillers) = grid_from_group(config, group, &half, source_vertex_count);
                report.gap_vertices_added += fillers;
                push_checked(sub, &mut grids, &mut report);
            }
        } else {
            report.gap_vertices_added += fillers;
            push_checked(grid, &mut grids, &mut report);
        }
    }

    report.grids_built = grids.len();
    (grids, report)
}

fn grid_from_group(
    config: &WallGridConfig,
    group: &PlaneGroup,
    vertices: &[GridVertex],
    source_vertex_count: usize,
) -> (WallGrid, usize) {
    WallGrid::from_vertices(
        config,
        vertices,
        group.orientation,
        group.position_value,
        source_vertex_count,
    )
}

fn push_checked(grid: WallGrid, grids: &mut Vec<WallGrid>, report: &mut WallBuildReport) {
    if !grid.is_correctly_calculated() {
        report.warnings.push(Warning::new(
            "inconsistent_grid",
            format!(
                "{:?} wall at {} has ragged rows",
                grid.orientation(),
                grid.position_value()
            ),
        ));
    }
    grids.push(grid);
}

#[cfg(test)]
mod tests {
    use super::*;
    use decogen_core::geom::Vec3;

    fn vert(x: f32, y: f32, z: f32, index: i32) -> GridVertex {
        GridVertex::new(Vec3::new(x, y, z), Vec3::RIGHT, index)
    }

    fn config() -> WallGridConfig {
        WallGridConfig {
            vertex_step: 1.0,
            row_tolerance: 0.05,
        }
    }

    /// 3x3 lattice on an x-facing wall, rows at y = 2, 1, 0.
    fn lattice() -> Vec<GridVertex> {
        let mut out = Vec::new();
        let mut index = 0;
        for y in [0, 1, 2] {
            for z in [0, 1, 2] {
                out.push(vert(0.0, y as f32, z as f32, index));
                index += 1;
            }
        }
        out
    }

    #[test]
    fn rows_run_top_down_and_columns_ascend() {
        let (grid, fillers) = WallGrid::from_vertices(
            &config(),
            &lattice(),
            WallOrientation::XPositive,
            0.0,
            9,
        );
        assert_eq!(0, fillers);
        assert_eq!(3, grid.row_count());
        assert_eq!(3, grid.col_count());
        assert!(grid.is_correctly_calculated());
        assert_eq!(2.0, grid.vertex(0, 0).unwrap().position.y);
        assert_eq!(0.0, grid.vertex(2, 0).unwrap().position.y);
        assert_eq!(0.0, grid.vertex(0, 0).unwrap().position.z);
        assert_eq!(2.0, grid.vertex(0, 2).unwrap().position.z);
        assert_eq!(&[2.0, 1.0, 0.0], grid.row_boundaries());
        assert_eq!(&[0.0, 1.0, 2.0], grid.col_boundaries());
    }

    #[test]
    fn gap_of_two_steps_gets_one_filler() {
        // row at z = 0, 1, 3: one missing vertex at z = 2
        let vertices = vec![vert(0.0, 1.0, 0.0, 0), vert(0.0, 1.0, 1.0, 1), vert(0.0, 1.0, 3.0, 2)];
        let (grid, fillers) =
            WallGrid::from_vertices(&config(), &vertices, WallOrientation::XPositive, 0.0, 3);
        assert_eq!(1, fillers);
        assert_eq!(4, grid.col_count());
        let filler = grid.vertex(0, 2).unwrap();
        assert!(filler.is_filler());
        assert_eq!(2.0, filler.position.z);
        // real vertices keep their order around the filler
        assert_eq!(1, grid.vertex(0, 1).unwrap().index);
        assert_eq!(2, grid.vertex(0, 3).unwrap().index);
    }

    #[test]
    fn spacing_within_threshold_is_left_alone() {
        let vertices = vec![vert(0.0, 1.0, 0.0, 0), vert(0.0, 1.0, 1.4, 1)];
        let (grid, fillers) =
            WallGrid::from_vertices(&config(), &vertices, WallOrientation::XPositive, 0.0, 2);
        assert_eq!(0, fillers);
        assert_eq!(2, grid.col_count());
    }

    #[test]
    fn ragged_rows_fail_the_consistency_check() {
        let mut vertices = lattice();
        vertices.pop();
        // the top row comes up one vertex short of the rows below it
        let (grid, _) =
            WallGrid::from_vertices(&config(), &vertices, WallOrientation::XPositive, 0.0, 8);
        assert!(!grid.is_correctly_calculated());
    }

    #[test]
    fn disjoint_group_splits_into_two_grids() {
        // two 2x2 islands separated by a 3-step gap (a door)
        let mut vertices = Vec::new();
        let mut index = 0;
        for y in [0, 1] {
            for z in [0, 1, 4, 5] {
                vertices.push(vert(0.0, y as f32, z as f32, index));
                index += 1;
            }
        }
        let (grids, report) = build_grids(&config(), &vertices, 8);

        assert_eq!(1, report.groups_found);
        assert_eq!(1, report.splits_performed);
        assert_eq!(2, report.grids_built);
        assert_eq!(2, grids.len());
        // the door-gap fillers only ever lived in the discarded pre-split
        // grid; neither kept half needed any
        assert_eq!(0, report.gap_vertices_added);

        let mut seen: Vec<i32> = grids
            .iter()
            .flat_map(|g| g.rows().iter().flatten())
            .filter(|v| !v.is_filler())
            .map(|v| v.index)
            .collect();
        seen.sort_unstable();
        // the two halves partition the real vertices, nothing shared
        assert_eq!((0..8).collect::<Vec<_>>(), seen);
        assert!(grids.iter().all(|g| g.is_correctly_calculated()));
        assert!(grids.iter().all(|g| g.row_count() == 2 && g.col_count() == 2));
    }

    #[test]
    fn contiguous_group_does_not_split() {
        let (grids, report) = build_grids(&config(), &lattice(), 9);
        assert_eq!(1, grids.len());
        assert_eq!(0, report.splits_performed);
        assert_eq!(1, report.grids_built);
    }
}
