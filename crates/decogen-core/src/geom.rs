use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3::new(0.0, 0.0, 0.0);
    pub const UP: Vec3 = Vec3::new(0.0, 1.0, 0.0);
    pub const DOWN: Vec3 = Vec3::new(0.0, -1.0, 0.0);
    pub const LEFT: Vec3 = Vec3::new(-1.0, 0.0, 0.0);
    pub const RIGHT: Vec3 = Vec3::new(1.0, 0.0, 0.0);
    pub const FORWARD: Vec3 = Vec3::new(0.0, 0.0, 1.0);
    pub const BACK: Vec3 = Vec3::new(0.0, 0.0, -1.0);

    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }

    pub fn magnitude(&self) -> f32 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    /// Zero input stays zero instead of producing NaNs; degenerate anchor
    /// pairs degrade to empty geometry, never to an error.
    pub fn normalized(&self) -> Vec3 {
        let m = self.magnitude();
        if m <= f32::EPSILON {
            return Vec3::ZERO;
        }
        Vec3::new(self.x / m, self.y / m, self.z / m)
    }

    pub fn dot(&self, other: &Vec3) -> f32 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    /// Snap each component to `dp` decimal places. World positions are
    /// snapped to 4 places before any grouping or equality test.
    pub fn round_dp(&self, dp: u32) -> Vec3 {
        let f = 10f32.powi(dp as i32);
        Vec3::new(
            (self.x * f).round() / f,
            (self.y * f).round() / f,
            (self.z * f).round() / f,
        )
    }

    /// Round each component to the nearest integer; normals become cardinal.
    pub fn round(&self) -> Vec3 {
        Vec3::new(self.x.round(), self.y.round(), self.z.round())
    }

    pub fn approx_eq(&self, other: &Vec3, tol: f32) -> bool {
        approximately(self.x, other.x, tol)
            && approximately(self.y, other.y, tol)
            && approximately(self.z, other.z, tol)
    }
}

pub fn approximately(a: f32, b: f32, tol: f32) -> bool {
    (a - b).abs() <= tol
}

/// Lerp with t clamped to [0, 1].
pub fn lerp_clamped(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t.clamp(0.0, 1.0)
}

/// Round where exact half ties go toward negative infinity: 5.5 -> 5,
/// 2.75 -> 3. The even-light-sampling index law depends on this tie rule.
pub fn round_half_down(x: f32) -> f32 {
    (x - 0.5).ceil()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_half_down_ties() {
        assert_eq!(5.0, round_half_down(5.5));
        assert_eq!(3.0, round_half_down(2.75));
        assert_eq!(8.0, round_half_down(8.25));
        assert_eq!(11.0, round_half_down(11.0));
        assert_eq!(0.0, round_half_down(0.0));
    }

    #[test]
    fn normalized_zero_is_zero() {
        assert_eq!(Vec3::ZERO, Vec3::ZERO.normalized());
    }

    #[test]
    fn round_dp_snaps_components() {
        let v = Vec3::new(0.123456, -2.00004, 1.5);
        let r = v.round_dp(4);
        assert_eq!(Vec3::new(0.1235, -2.0, 1.5), r);
    }
}
