use decogen_core::geom::{lerp_clamped, Vec3};
use decogen_core::model::{BulbSetType, BulbSetting};
use itertools::Itertools;
use nalgebra::{Point3, Vector3};

pub const CABLE_THICKNESS: f32 = 0.0125;
pub const MIN_TENSION: f32 = 8.0;
pub const MAX_TENSION: f32 = 24.0;
pub const CABLE_CURVE_RADIUS_FACTOR: f32 = 0.1;
pub const COMPLEXITY_CHANGE_THRESHOLD: f32 = 0.25;

/// A user-placed cable endpoint: world position plus the tangent direction
/// the cable leaves the surface with.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Anchor {
    pub position: Point3<f32>,
    pub tangent: Vector3<f32>,
}

impl Anchor {
    pub fn new(position: Point3<f32>, tangent: Vector3<f32>) -> Self {
        Self { position, tangent }
    }

    pub fn from_setting(setting: &BulbSetting) -> Self {
        Self {
            position: to_point3(setting.position),
            tangent: to_vector3(setting.tangent),
        }
    }
}

pub fn to_point3(v: Vec3) -> Point3<f32> {
    Point3::new(v.x, v.y, v.z)
}

pub fn to_vector3(v: Vec3) -> Vector3<f32> {
    Vector3::new(v.x, v.y, v.z)
}

pub fn to_vec3(p: &Point3<f32>) -> Vec3 {
    Vec3::new(p.x, p.y, p.z)
}

/// Unity-style normalize: zero-length input yields the zero vector, so
/// coincident anchors degrade to empty geometry instead of NaNs.
pub fn normalize_or_zero(v: Vector3<f32>) -> Vector3<f32> {
    v.try_normalize(f32::EPSILON).unwrap_or_else(Vector3::zeros)
}

/// WashingLine chains use a quarter-thickness cable.
pub fn cable_thickness(set_type: BulbSetType) -> f32 {
    if set_type == BulbSetType::WashingLine {
        CABLE_THICKNESS / 4.0
    } else {
        CABLE_THICKNESS
    }
}

pub fn cubic_bezier(
    p0: Point3<f32>,
    p1: Point3<f32>,
    p2: Point3<f32>,
    p3: Point3<f32>,
    t: f32,
) -> Point3<f32> {
    let u = 1.0 - t;
    Point3::from(
        p0.coords * (u * u * u)
            + p1.coords * (3.0 * u * u * t)
            + p2.coords * (3.0 * u * t * t)
            + p3.coords * (t * t * t),
    )
}

fn lerp_point(a: Point3<f32>, b: Point3<f32>, t: f32) -> Point3<f32> {
    Point3::from(a.coords + (b.coords - a.coords) * t.clamp(0.0, 1.0))
}

/// Tessellation density heuristic, tuned visually: tension and (below a
/// threshold) vertical separation decide where between MIN_TENSION and
/// MAX_TENSION samples-per-unit the curve lands. The exact formula is
/// load-bearing for save/reload parity.
pub fn curve_complexity(a: &Anchor, b: &Anchor, tension: f32) -> f32 {
    let delta_y = (a.position.y - b.position.y).abs().clamp(0.0, 1.0);
    let inv_tension = if tension > 0.0 { 1.0 / tension } else { 1.0 };
    let factor = if delta_y < COMPLEXITY_CHANGE_THRESHOLD {
        inv_tension
    } else {
        delta_y * inv_tension
    };
    lerp_clamped(MAX_TENSION, MIN_TENSION, factor)
}

/// Cubic Bezier point at `t` for the segment between two anchors. Control
/// points sit along the anchor tangents at the fixed curve-radius factor,
/// with tension pulling the inner controls downward by tension/10.
pub fn curve_point(a: &Anchor, b: &Anchor, tension: f32, t: f32) -> Point3<f32> {
    let down_pull = Vector3::new(0.0, -1.0, 0.0) * (tension / 10.0);
    let near = a.position + a.tangent * CABLE_CURVE_RADIUS_FACTOR;
    let far = b.position + b.tangent * CABLE_CURVE_RADIUS_FACTOR + down_pull;
    cubic_bezier(
        a.position,
        lerp_point(near, far, 1.0 / 3.0),
        lerp_point(near, far, 2.0 / 3.0),
        b.position,
        t,
    )
}

/// Sample the cable curve. Sample count is floor(distance * complexity);
/// the parameter accumulates additively, and the accumulation order is
/// load-bearing for save/reload parity. Coincident anchors yield a single
/// point and no quads downstream.
pub fn build_curve(a: &Anchor, b: &Anchor, tension: f32) -> Vec<Point3<f32>> {
    let distance = (a.position - b.position).norm();
    let complexity = curve_complexity(a, b, tension);
    let count = (distance * complexity).floor() as usize;
    let step = if count > 0 { 1.0 / count as f32 } else { 0.0 };

    let mut points = Vec::with_capacity(count + 1);
    let mut t = 0.0f32;
    for _ in 0..=count {
        points.push(curve_point(a, b, tension, t));
        t += step;
    }
    points
}

/// A re-tessellatable square-tube mesh for one cable curve, identified by a
/// stable integer id so it can be rebuilt in place across edits.
#[derive(Debug, Clone)]
pub struct CableMesh {
    pub positions: Vec<Point3<f32>>,
    pub uvs: Vec<[f32; 2]>,
    pub indices: Vec<u32>,
    pub normals: Vec<Vector3<f32>>,
    thickness: f32,
    id: i32,
    enabled: bool,
}

impl CableMesh {
    pub fn new(thickness: f32, id: i32) -> Self {
        Self {
            positions: Vec::new(),
            uvs: Vec::new(),
            indices: Vec::new(),
            normals: Vec::new(),
            thickness,
            id,
            enabled: true,
        }
    }

    pub fn id(&self) -> i32 {
        self.id
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn quad_count(&self) -> usize {
        self.indices.len() / 6
    }

    /// Reconfigure a pooled or rebuilt mesh for a new curve id.
    pub fn configure(&mut self, thickness: f32, id: i32) {
        self.thickness = thickness;
        self.id = id;
    }

    /// Rebuild the tube in place: 4 quads (a closed square cross-section)
    /// per consecutive point pair. `left` and `down` are the local offset
    /// directions, scaled here by the cable thickness; the uv channel
    /// carries the xy of the face direction for the cable shader.
    pub fn tessellate(
        &mut self,
        points: &[Point3<f32>],
        left_dir: Vector3<f32>,
        down_dir: Vector3<f32>,
    ) {
        self.positions.clear();
        self.uvs.clear();
        self.indices.clear();
        self.normals.clear();

        let left = left_dir * self.thickness;
        let down = down_dir * self.thickness;

        for i in 1..points.len() {
            let a = points[i - 1];
            let b = points[i];

            self.push_quad([a, a + left, b, b + left], -down_dir);
            self.push_quad([a + down, a, b + down, b], -left_dir);
            self.push_quad([a + down + left, a + down, b + down + left, b + down], down_dir);
            self.push_quad([a + left, a + down + left, b + left, b + down + left], left_dir);
        }

        self.enabled = true;
        self.recalculate_normals();
    }

    fn push_quad(&mut self, corners: [Point3<f32>; 4], face_dir: Vector3<f32>) {
        let base = self.positions.len() as u32;
        self.positions.extend_from_slice(&corners);
        for _ in 0..4 {
            self.uvs.push([face_dir.x, face_dir.y]);
        }
        self.indices
            .extend_from_slice(&[base, base + 3, base + 1, base, base + 2, base + 3]);
    }

    /// Flat per-face normals: vertices are not shared across quads, so each
    /// vertex ends up with its quad's face normal.
    fn recalculate_normals(&mut self) {
        self.normals = vec![Vector3::zeros(); self.positions.len()];
        for tri in self.indices.chunks_exact(3) {
            let (i0, i1, i2) = (tri[0] as usize, tri[1] as usize, tri[2] as usize);
            let e1 = self.positions[i1] - self.positions[i0];
            let e2 = self.positions[i2] - self.positions[i0];
            let n = e1.cross(&e2);
            self.normals[i0] += n;
            self.normals[i1] += n;
            self.normals[i2] += n;
        }
        for n in &mut self.normals {
            *n = normalize_or_zero(*n);
        }
    }
}

/// Owns every cable mesh, live and pooled. At most one live segment exists
/// per id: lookups go live-list first, then the pool, then a fresh
/// allocation.
#[derive(Debug, Default)]
pub struct CableMeshStore {
    live: Vec<CableMesh>,
    pool: Vec<CableMesh>,
}

impl CableMeshStore {
    pub fn has_live(&self, id: i32) -> bool {
        self.live.iter().any(|c| c.id() == id)
    }

    pub fn get_or_make(&mut self, thickness: f32, id: i32) -> &mut CableMesh {
        let idx = match self.live.iter().find_position(|c| c.id() == id) {
            Some((i, _)) => i,
            None => {
                let mesh = self.pool.pop().unwrap_or_else(|| CableMesh::new(thickness, id));
                self.live.push(mesh);
                self.live.len() - 1
            }
        };
        self.live[idx].configure(thickness, id);
        &mut self.live[idx]
    }

    /// Return the newest live segment to the pool; yields its id so the
    /// caller can release the bulbs that rode on it.
    pub fn release_last(&mut self) -> Option<i32> {
        let mut mesh = self.live.pop()?;
        mesh.set_enabled(false);
        let id = mesh.id();
        self.pool.push(mesh);
        Some(id)
    }

    pub fn live(&self) -> &[CableMesh] {
        &self.live
    }

    pub fn get(&self, id: i32) -> Option<&CableMesh> {
        self.live.iter().find(|c| c.id() == id)
    }

    pub fn pooled_count(&self) -> usize {
        self.pool.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn anchor(x: f32, y: f32, z: f32) -> Anchor {
        Anchor::new(Point3::new(x, y, z), Vector3::new(0.0, -1.0, 0.0))
    }

    #[test]
    fn complexity_stays_in_tension_band() {
        let a = anchor(0.0, 2.0, 0.0);
        let b = anchor(3.0, 2.5, 0.0);
        for tension in [0.001f32, 0.1, 0.5, 1.0, 2.0, 10.0, 1000.0] {
            let c = curve_complexity(&a, &b, tension);
            assert!((MIN_TENSION..=MAX_TENSION).contains(&c), "tension {tension} -> {c}");
        }
        // zero tension hits the division guard, not a NaN
        assert!(curve_complexity(&a, &b, 0.0).is_finite());
    }

    #[test]
    fn curve_endpoints_are_anchor_positions() {
        let a = anchor(0.0, 2.0, 0.0);
        let b = anchor(4.0, 2.0, 1.0);
        assert_eq!(a.position, curve_point(&a, &b, 1.0, 0.0));
        let end = curve_point(&a, &b, 1.0, 1.0);
        assert!((end - b.position).norm() < 1e-5);
    }

    #[test]
    fn tessellation_emits_four_quads_per_segment() {
        let a = anchor(0.0, 2.0, 0.0);
        let b = anchor(3.0, 2.0, 0.0);
        let points = build_curve(&a, &b, 1.0);
        assert!(points.len() >= 2);

        let mut mesh = CableMesh::new(CABLE_THICKNESS, 0);
        let left = Vector3::new(0.0, 0.0, 1.0);
        let down = Vector3::new(0.0, -1.25, 0.0);
        mesh.tessellate(&points, left, down);

        let segments = points.len() - 1;
        assert_eq!(4 * segments, mesh.quad_count());
        assert_eq!(16 * segments, mesh.positions.len());
        assert_eq!(16 * segments, mesh.uvs.len());
        assert_eq!(16 * segments, mesh.normals.len());
        assert_eq!(24 * segments, mesh.indices.len());
    }

    #[test]
    fn tessellation_is_deterministic() {
        let a = anchor(0.5, 2.0, -1.0);
        let b = anchor(3.5, 2.25, 1.0);
        let points = build_curve(&a, &b, 2.0);
        let left = Vector3::new(0.0, 0.0, 1.0);
        let down = Vector3::new(0.0, -1.25, 0.0);

        let mut first = CableMesh::new(CABLE_THICKNESS, 0);
        first.tessellate(&points, left, down);
        let mut second = CableMesh::new(CABLE_THICKNESS, 0);
        second.tessellate(&points, left, down);
        // rebuilding in place must also match
        let mut rebuilt = first.clone();
        rebuilt.tessellate(&points, left, down);

        assert_eq!(first.positions, second.positions);
        assert_eq!(first.indices, second.indices);
        assert_eq!(first.uvs, second.uvs);
        assert_eq!(first.positions, rebuilt.positions);
        assert_eq!(first.indices, rebuilt.indices);
    }

    #[test]
    fn coincident_anchors_produce_no_quads() {
        let a = anchor(1.0, 2.0, 3.0);
        let points = build_curve(&a, &a, 1.0);
        assert_eq!(1, points.len());
        let mut mesh = CableMesh::new(CABLE_THICKNESS, 0);
        mesh.tessellate(&points, Vector3::zeros(), Vector3::zeros());
        assert_eq!(0, mesh.quad_count());
    }

    #[test]
    fn store_keeps_one_live_segment_per_id() {
        let mut store = CableMeshStore::default();
        store.get_or_make(CABLE_THICKNESS, 3);
        store.get_or_make(CABLE_THICKNESS, 3);
        store.get_or_make(CABLE_THICKNESS, 4);
        assert_eq!(2, store.live().len());

        assert_eq!(Some(4), store.release_last());
        assert_eq!(1, store.pooled_count());
        // pooled mesh is reused before allocating
        store.get_or_make(CABLE_THICKNESS, 5);
        assert_eq!(0, store.pooled_count());
        assert_eq!(2, store.live().len());
    }
}
