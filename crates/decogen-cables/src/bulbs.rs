use crate::curve::normalize_or_zero;
use crate::pool::{BulbId, BulbKind};
use decogen_core::geom::round_half_down;
use decogen_core::model::BulbSetType;
use nalgebra::{Point3, Vector3};

/// Hard cap on bulbs that act as real light sources, for render cost.
pub const MAX_POINT_LIGHTS: usize = 5;

/// Tangent-agreement boundary: above it bulbs blend toward vertical by the
/// configured weight, below it they stay pinned to the anchor tangent.
pub const UP_SNAP_DOT_THRESHOLD: f32 = 0.98;

/// Runtime state of one spawned bulb. Lives in the engine arena; pooled
/// bulbs keep their slot and are marked invisible/unplaced.
#[derive(Debug, Clone)]
pub struct Bulb {
    pub id: BulbId,
    pub set_type: BulbSetType,
    pub kind: BulbKind,
    pub position: Point3<f32>,
    pub up: Vector3<f32>,
    pub placed: bool,
    pub visible: bool,
    pub is_light_source: bool,
    pub chain_index: usize,
    pub curve_index: i32,
    pub price: f32,
}

impl Bulb {
    pub fn new(id: BulbId, set_type: BulbSetType, kind: BulbKind, chain_index: usize) -> Self {
        Self {
            id,
            set_type,
            kind,
            position: Point3::origin(),
            up: Vector3::y(),
            placed: false,
            visible: true,
            is_light_source: false,
            chain_index,
            curve_index: 0,
            price: 0.0,
        }
    }
}

/// Blend weight for a bulb's up direction between two anchors. Diverging
/// tangents (dot <= 0.98) get a near-zero weight, keeping the bulb pinned
/// to the anchor tangent.
pub fn up_blend_weight(
    a_tangent: &Vector3<f32>,
    b_tangent: &Vector3<f32>,
    configured_weight: f32,
) -> f32 {
    let dot = normalize_or_zero(*a_tangent).dot(&normalize_or_zero(*b_tangent));
    if dot > UP_SNAP_DOT_THRESHOLD {
        configured_weight
    } else {
        0.01
    }
}

pub fn bulb_up_direction(anchor_tangent: &Vector3<f32>, weight: f32) -> Vector3<f32> {
    let blended = anchor_tangent * (1.0 - weight) + Vector3::y() * weight;
    normalize_or_zero(blended)
}

/// Bezier parameters for bulbs hung along one curve segment. Count is
/// ceil(distance * density); the walk starts one step in and stops half a
/// step (step/2.5) short of the far anchor so no bulb sits on a hook.
pub fn bulb_parameters(distance: f32, density: f32) -> Vec<f32> {
    let count = (distance * density).ceil();
    if count < 1.0 || !count.is_finite() {
        return Vec::new();
    }
    let step = 1.0 / count;
    let mut parameters = Vec::new();
    let mut t = step;
    while t < 1.0 - step / 2.5 {
        parameters.push(t);
        t += step;
    }
    parameters
}

/// Indices of the bulbs that act as light sources, over the global ordered
/// bulb list. Up to MAX_POINT_LIGHTS everything is lit; beyond that, five
/// evenly sampled indices (half ties rounding down) are chosen. The sampling
/// law is preserved exactly for save/reload parity.
pub fn light_source_indices(bulb_count: usize) -> Vec<usize> {
    if bulb_count <= MAX_POINT_LIGHTS {
        return (0..bulb_count).collect();
    }
    (0..MAX_POINT_LIGHTS)
        .map(|i| {
            let t = i as f32 / (MAX_POINT_LIGHTS - 1) as f32;
            round_half_down(t * (bulb_count - 1) as f32) as usize
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_bulbs_lit_up_to_the_cap() {
        assert_eq!(vec![0, 1, 2], light_source_indices(3));
        assert_eq!(vec![0, 1, 2, 3, 4], light_source_indices(5));
        assert!(light_source_indices(0).is_empty());
    }

    #[test]
    fn even_sampling_beyond_the_cap() {
        assert_eq!(vec![0, 3, 5, 8, 11], light_source_indices(12));
        assert_eq!(vec![0, 1, 2, 4, 5], light_source_indices(6));
        assert_eq!(5, light_source_indices(100).len());
        assert_eq!(vec![0, 25, 49, 74, 99], light_source_indices(100));
    }

    #[test]
    fn bulb_walk_skips_both_anchors() {
        let params = bulb_parameters(2.0, 5.0);
        // count 10, step 0.1: t in {0.1 .. 0.9}, stop before 1 - 0.04
        assert_eq!(9, params.len());
        assert!(params.iter().all(|t| *t > 0.0 && *t < 1.0));
        assert!(bulb_parameters(0.0, 5.0).is_empty());
    }

    #[test]
    fn diverging_tangents_pin_to_anchor() {
        let a = Vector3::new(0.0, -1.0, 0.0);
        let b = Vector3::new(1.0, 0.0, 0.0);
        assert_eq!(0.01, up_blend_weight(&a, &b, 0.3));
        assert_eq!(0.3, up_blend_weight(&a, &a, 0.3));
    }
}
