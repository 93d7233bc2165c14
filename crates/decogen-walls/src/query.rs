use crate::grid::WallGrid;
use decogen_core::geom::Vec3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrushShape {
    Square,
    Circle,
    /// Square with the horizontal extent doubled.
    Rectangle,
}

#[derive(Debug, Clone, Copy)]
pub struct BrushQuery {
    /// Neighbor steps out from the resolved cell.
    pub radius: usize,
    pub shape: BrushShape,
}

/// Radial falloff over grid distance |dx| + |dy|, 1 at the center, fading
/// to 0 one step past the radius.
pub fn falloff(distance: usize, radius: usize) -> f32 {
    (1.0 - distance as f32 / (radius as f32 + 1.0)).max(0.0)
}

/// Map a world position onto the grid cell whose boundary coordinates it is
/// nearest to, deciding between adjacent rows/columns by their midpoint.
/// None means the position is outside the grid; callers treat that as a
/// no-op, not an error.
pub fn resolve_cell(grid: &WallGrid, position: &Vec3) -> Option<(usize, usize)> {
    let row = scan_descending(grid.row_boundaries(), position.y)?;
    let h = grid.orientation().horizontal(position);
    let col = scan_ascending(grid.col_boundaries(), h)?;
    Some((row, col))
}

fn scan_descending(boundaries: &[f32], value: f32) -> Option<usize> {
    for i in 0..boundaries.len().saturating_sub(1) {
        let current = boundaries[i];
        let next = boundaries[i + 1];
        if value <= current && value >= next {
            let mid = (current + next) / 2.0;
            return Some(if value > mid { i } else { i + 1 });
        }
    }
    None
}

fn scan_ascending(boundaries: &[f32], value: f32) -> Option<usize> {
    for i in 0..boundaries.len().saturating_sub(1) {
        let current = boundaries[i];
        let next = boundaries[i + 1];
        if value >= current && value <= next {
            let mid = (current + next) / 2.0;
            return Some(if value < mid { i } else { i + 1 });
        }
    }
    None
}

/// Lazy neighbor enumeration for one brush stroke: the resolved cell first,
/// then a quadrant-mirrored diamond out to the radius. Gap fillers and
/// out-of-bounds cells are skipped silently; each item is the source-mesh
/// vertex index plus its falloff alpha. Clone to restart.
pub fn neighbors<'a>(grid: &'a WallGrid, origin: &Vec3, query: BrushQuery) -> Neighbors<'a> {
    let col_extent = match query.shape {
        BrushShape::Rectangle => query.radius * 2,
        _ => query.radius,
    };
    Neighbors {
        grid,
        cell: resolve_cell(grid, origin),
        radius: query.radius,
        shape: query.shape,
        col_extent,
        center_done: false,
        i: 0,
        j: 0,
        quadrant: 0,
    }
}

#[derive(Clone)]
pub struct Neighbors<'a> {
    grid: &'a WallGrid,
    cell: Option<(usize, usize)>,
    radius: usize,
    shape: BrushShape,
    col_extent: usize,
    center_done: bool,
    i: usize,
    j: usize,
    quadrant: u8,
}

/// Circular cut: axis-aligned offsets are excluded from the radius itself,
/// diagonal offsets only past it. The asymmetry is part of the established
/// brush footprint.
fn circle_excluded(i: usize, j: usize, radius: usize) -> bool {
    if i == 0 || j == 0 {
        i + j >= radius
    } else {
        i + j >= radius + 1
    }
}

impl Iterator for Neighbors<'_> {
    type Item = (usize, f32);

    fn next(&mut self) -> Option<Self::Item> {
        let (row, col) = self.cell?;

        if !self.center_done {
            self.center_done = true;
            if let Some(v) = self.grid.vertex(row, col) {
                if !v.is_filler() {
                    return Some((v.index as usize, falloff(0, self.radius)));
                }
            }
        }

        loop {
            if self.i > self.col_extent {
                return None;
            }
            if self.j > self.radius {
                self.j = 0;
                self.i += 1;
                continue;
            }
            if self.quadrant >= 4 {
                self.quadrant = 0;
                self.j += 1;
                continue;
            }
            let (i, j, q) = (self.i, self.j, self.quadrant);
            self.quadrant += 1;

            if i == 0 && j == 0 {
                continue;
            }
            if self.shape == BrushShape::Circle && circle_excluded(i, j, self.radius) {
                continue;
            }
            // a zero offset makes two quadrants coincide; visit each cell once
            if i == 0 && q >= 2 {
                continue;
            }
            if j == 0 && (q == 1 || q == 3) {
                continue;
            }

            let (dc, dr): (isize, isize) = match q {
                0 => (i as isize, j as isize),
                1 => (i as isize, -(j as isize)),
                2 => (-(i as isize), j as isize),
                _ => (-(i as isize), -(j as isize)),
            };
            let r = row as isize + dr;
            let c = col as isize + dc;
            if r < 0 || c < 0 {
                continue;
            }
            let Some(vertex) = self.grid.vertex(r as usize, c as usize) else {
                continue;
            };
            if vertex.is_filler() {
                continue;
            }
            return Some((vertex.index as usize, falloff(i + j, self.radius)));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::WallGridConfig;
    use crate::plane_split::{GridVertex, WallOrientation};

    fn lattice(width: usize, height: usize) -> WallGrid {
        let mut vertices = Vec::new();
        let mut index = 0;
        for y in 0..height {
            for z in 0..width {
                vertices.push(GridVertex::new(
                    Vec3::new(0.0, y as f32, z as f32),
                    Vec3::RIGHT,
                    index,
                ));
                index += 1;
            }
        }
        let config = WallGridConfig {
            vertex_step: 1.0,
            row_tolerance: 0.05,
        };
        let (grid, _) = WallGrid::from_vertices(
            &config,
            &vertices,
            WallOrientation::XPositive,
            0.0,
            width * height,
        );
        grid
    }

    fn collect(grid: &WallGrid, origin: Vec3, radius: usize, shape: BrushShape) -> Vec<(usize, f32)> {
        neighbors(grid, &origin, BrushQuery { radius, shape }).collect()
    }

    #[test]
    fn resolve_cell_picks_the_nearest_boundary() {
        let grid = lattice(3, 3);
        // y rows are 2, 1, 0 top-down; z columns 0, 1, 2
        assert_eq!(Some((0, 0)), resolve_cell(&grid, &Vec3::new(0.0, 1.9, 0.1)));
        assert_eq!(Some((1, 1)), resolve_cell(&grid, &Vec3::new(0.0, 1.2, 0.8)));
        assert_eq!(Some((2, 2)), resolve_cell(&grid, &Vec3::new(0.0, 0.1, 1.9)));
        assert_eq!(None, resolve_cell(&grid, &Vec3::new(0.0, 5.0, 0.0)));
        assert_eq!(None, resolve_cell(&grid, &Vec3::new(0.0, 1.0, 9.0)));
    }

    #[test]
    fn radius_zero_is_exactly_the_resolved_cell() {
        let grid = lattice(3, 3);
        let hits = collect(&grid, Vec3::new(0.0, 1.0, 1.0), 0, BrushShape::Circle);
        assert_eq!(1, hits.len());
        assert_eq!(4, hits[0].0);
        assert_eq!(1.0, hits[0].1);
    }

    #[test]
    fn outside_the_grid_yields_nothing() {
        let grid = lattice(3, 3);
        let hits = collect(&grid, Vec3::new(0.0, 40.0, 1.0), 3, BrushShape::Square);
        assert!(hits.is_empty());
    }

    #[test]
    fn square_covers_the_full_block_and_circle_cuts_corners() {
        let grid = lattice(5, 5);
        let center = Vec3::new(0.0, 2.0, 2.0);
        let square = collect(&grid, center, 2, BrushShape::Square);
        assert_eq!(25, square.len());

        let circle = collect(&grid, center, 2, BrushShape::Circle);
        assert_eq!(9, circle.len());
        // every circle hit is also a square hit, and no index repeats
        let mut indices: Vec<usize> = square.iter().map(|(i, _)| *i).collect();
        indices.sort_unstable();
        indices.dedup();
        assert_eq!(25, indices.len());
    }

    #[test]
    fn rectangle_doubles_the_horizontal_extent() {
        let grid = lattice(9, 3);
        let center = Vec3::new(0.0, 1.0, 4.0);
        let rect = collect(&grid, center, 1, BrushShape::Rectangle);
        // 5 columns by 3 rows
        assert_eq!(15, rect.len());
        let square = collect(&grid, center, 1, BrushShape::Square);
        assert_eq!(9, square.len());
    }

    #[test]
    fn fillers_are_never_yielded() {
        // row z = 0, 1, 3 with a synthesized vertex at z = 2
        let vertices = vec![
            GridVertex::new(Vec3::new(0.0, 1.0, 0.0), Vec3::RIGHT, 0),
            GridVertex::new(Vec3::new(0.0, 1.0, 1.0), Vec3::RIGHT, 1),
            GridVertex::new(Vec3::new(0.0, 1.0, 3.0), Vec3::RIGHT, 2),
            GridVertex::new(Vec3::new(0.0, 0.0, 0.0), Vec3::RIGHT, 3),
            GridVertex::new(Vec3::new(0.0, 0.0, 1.0), Vec3::RIGHT, 4),
            GridVertex::new(Vec3::new(0.0, 0.0, 3.0), Vec3::RIGHT, 5),
        ];
        let config = WallGridConfig {
            vertex_step: 1.0,
            row_tolerance: 0.05,
        };
        let (grid, fillers) =
            WallGrid::from_vertices(&config, &vertices, WallOrientation::XPositive, 0.0, 6);
        assert_eq!(2, fillers);

        let hits = collect(&grid, Vec3::new(0.0, 1.0, 1.0), 3, BrushShape::Square);
        assert!(hits.iter().all(|(i, _)| *i <= 5));
        assert_eq!(6, hits.len());
    }

    #[test]
    fn alpha_falls_off_with_grid_distance() {
        let grid = lattice(5, 5);
        let hits = collect(&grid, Vec3::new(0.0, 2.0, 2.0), 2, BrushShape::Square);
        for (index, alpha) in &hits {
            let row = index / 5;
            let col = index % 5;
            let d = row.abs_diff(2) + col.abs_diff(2);
            assert!((alpha - falloff(d, 2)).abs() < 1e-6, "index {index}");
        }
    }

    #[test]
    fn restarting_the_query_repeats_the_sequence() {
        let grid = lattice(5, 5);
        let query = BrushQuery {
            radius: 2,
            shape: BrushShape::Circle,
        };
        let origin = Vec3::new(0.0, 2.0, 2.0);
        let first: Vec<_> = neighbors(&grid, &origin, query).collect();
        let second: Vec<_> = neighbors(&grid, &origin, query).collect();
        assert_eq!(first, second);
    }
}
