use decogen_core::geom::{approximately, Vec3};
use serde::{Deserialize, Serialize};

/// Tolerance for two vertices to share a plane offset.
pub const PLANE_OFFSET_TOLERANCE: f32 = 0.1;

/// One paintable mesh vertex in world space. `index` points back into the
/// source mesh's vertex buffer; synthesized gap fillers carry -1 and are
/// never painted. `alpha` is the transient falloff weight of the last query.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridVertex {
    pub position: Vec3,
    pub normal: Vec3,
    pub index: i32,
    pub alpha: f32,
}

impl GridVertex {
    pub fn new(position: Vec3, normal: Vec3, index: i32) -> Self {
        Self {
            position,
            normal,
            index,
            alpha: 0.0,
        }
    }

    /// A synthesized placeholder with no source-mesh vertex behind it.
    pub fn filler(position: Vec3, normal: Vec3) -> Self {
        Self::new(position, normal, -1)
    }

    pub fn is_filler(&self) -> bool {
        self.index < 0
    }
}

/// Which cardinal direction a wall faces. Up/down-facing surfaces are not
/// walls and never get an orientation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WallOrientation {
    XPositive,
    XNegative,
    ZPositive,
    ZNegative,
}

impl WallOrientation {
    pub fn from_normal(normal: &Vec3) -> Option<Self> {
        let n = normal.round();
        if n == Vec3::RIGHT {
            Some(WallOrientation::XPositive)
        } else if n == Vec3::LEFT {
            Some(WallOrientation::XNegative)
        } else if n == Vec3::FORWARD {
            Some(WallOrientation::ZPositive)
        } else if n == Vec3::BACK {
            Some(WallOrientation::ZNegative)
        } else {
            None
        }
    }

    /// Coplanar offset along the facing axis.
    pub fn position_value(&self, position: &Vec3) -> f32 {
        match self {
            WallOrientation::XPositive | WallOrientation::XNegative => position.x,
            WallOrientation::ZPositive | WallOrientation::ZNegative => position.z,
        }
    }

    /// Coordinate running horizontally along the wall face.
    pub fn horizontal(&self, position: &Vec3) -> f32 {
        match self {
            WallOrientation::XPositive | WallOrientation::XNegative => position.z,
            WallOrientation::ZPositive | WallOrientation::ZNegative => position.x,
        }
    }

    /// Rebuild a world position from a template with the horizontal
    /// coordinate replaced; used to place gap fillers along a row.
    pub fn with_horizontal(&self, template: &Vec3, horizontal: f32) -> Vec3 {
        match self {
            WallOrientation::XPositive | WallOrientation::XNegative => {
                Vec3::new(template.x, template.y, horizontal)
            }
            WallOrientation::ZPositive | WallOrientation::ZNegative => {
                Vec3::new(horizontal, template.y, template.z)
            }
        }
    }
}

/// Vertices sharing one cardinal wall normal and one coplanar offset.
#[derive(Debug, Clone)]
pub struct PlaneGroup {
    pub vertices: Vec<GridVertex>,
    pub orientation: WallOrientation,
    pub position_value: f32,
}

impl PlaneGroup {
    fn from_seed(vertex: GridVertex, orientation: WallOrientation) -> Self {
        let position_value = round4(orientation.position_value(&vertex.position));
        Self {
            vertices: vec![vertex],
            orientation,
            position_value,
        }
    }

    fn belongs_to(&self, vertex: &GridVertex) -> bool {
        match WallOrientation::from_normal(&vertex.normal) {
            Some(o) if o == self.orientation => approximately(
                self.position_value,
                round4(self.orientation.position_value(&vertex.position)),
                PLANE_OFFSET_TOLERANCE,
            ),
            _ => false,
        }
    }
}

fn round4(value: f32) -> f32 {
    (value * 1e4).round() / 1e4
}

/// Tag a mesh's world-space vertex buffer for grid building. Positions are
/// rounded to 4 decimals and normals snapped to unit axes so the coplanarity
/// tests see stable values.
pub fn world_vertices(positions: &[Vec3], normals: &[Vec3]) -> Vec<GridVertex> {
    positions
        .iter()
        .zip(normals)
        .enumerate()
        .map(|(i, (p, n))| GridVertex::new(p.round_dp(4), n.round(), i as i32))
        .collect()
}

/// Single pass coplanar grouping: each vertex joins the first group whose
/// orientation and offset it matches, else seeds a new group. Vertices whose
/// normal is not a cardinal wall direction (floors, ceilings, slopes) are
/// dropped; the second return value counts them. O(n * groups), fine for
/// wall-sized meshes.
pub fn group_by_plane(vertices: &[GridVertex]) -> (Vec<PlaneGroup>, usize) {
    let mut groups: Vec<PlaneGroup> = Vec::new();
    let mut discarded = 0usize;

    for vertex in vertices {
        if let Some(group) = groups.iter_mut().find(|g| g.belongs_to(vertex)) {
            group.vertices.push(*vertex);
            continue;
        }
        match WallOrientation::from_normal(&vertex.normal) {
            Some(orientation) => groups.push(PlaneGroup::from_seed(*vertex, orientation)),
            None => discarded += 1,
        }
    }

    (groups, discarded)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(x: f32, y: f32, z: f32, nx: f32, ny: f32, nz: f32, index: i32) -> GridVertex {
        GridVertex::new(Vec3::new(x, y, z), Vec3::new(nx, ny, nz), index)
    }

    #[test]
    fn coplanar_vertices_share_a_group() {
        let vertices = vec![
            v(0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0),
            v(0.05, 1.0, 0.5, 1.0, 0.0, 0.0, 1),
            v(2.0, 0.0, 0.0, 1.0, 0.0, 0.0, 2),
        ];
        let (groups, discarded) = group_by_plane(&vertices);
        // the 0.05 offset is within tolerance, the 2.0 offset is not
        assert_eq!(2, groups.len());
        assert_eq!(0, discarded);
        assert_eq!(2, groups[0].vertices.len());
    }

    #[test]
    fn floors_and_ceilings_are_discarded() {
        let vertices = vec![
            v(0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0),
            v(0.0, 2.0, 0.0, 0.0, -1.0, 0.0, 1),
            v(0.0, 0.0, 0.0, 0.0, 0.0, 1.0, 2),
        ];
        let (groups, discarded) = group_by_plane(&vertices);
        assert_eq!(1, groups.len());
        assert_eq!(WallOrientation::ZPositive, groups[0].orientation);
        assert_eq!(2, discarded);
    }

    #[test]
    fn opposite_normals_never_merge() {
        let vertices = vec![
            v(0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0),
            v(0.0, 1.0, 0.0, -1.0, 0.0, 0.0, 1),
        ];
        let (groups, _) = group_by_plane(&vertices);
        assert_eq!(2, groups.len());
    }

    #[test]
    fn orientation_axes() {
        let p = Vec3::new(1.0, 2.0, 3.0);
        assert_eq!(1.0, WallOrientation::XPositive.position_value(&p));
        assert_eq!(3.0, WallOrientation::XPositive.horizontal(&p));
        assert_eq!(3.0, WallOrientation::ZNegative.position_value(&p));
        assert_eq!(1.0, WallOrientation::ZNegative.horizontal(&p));

        let moved = WallOrientation::XPositive.with_horizontal(&p, 9.0);
        assert_eq!(Vec3::new(1.0, 2.0, 9.0), moved);
    }
}
