use glam::{Vec2, Vec3, Vec4};

/// Tolerance used when comparing attribute values that came through a
/// float round trip (DCC host, text file, etc).
pub const DEFAULT_TOLERANCE: f32 = 1e-5;

/// Component-wise approximate equality.
///
/// Two values are equal when every component differs by at most `eps`.
pub trait ApproxEq {
    fn approx_eq(&self, other: &Self, eps: f32) -> bool;
}

impl ApproxEq for f32 {
    #[inline]
    fn approx_eq(&self, other: &Self, eps: f32) -> bool {
        (self - other).abs() <= eps
    }
}

impl ApproxEq for Vec2 {
    #[inline]
    fn approx_eq(&self, other: &Self, eps: f32) -> bool {
        self.abs_diff_eq(*other, eps)
    }
}

impl ApproxEq for Vec3 {
    #[inline]
    fn approx_eq(&self, other: &Self, eps: f32) -> bool {
        self.abs_diff_eq(*other, eps)
    }
}

impl ApproxEq for Vec4 {
    #[inline]
    fn approx_eq(&self, other: &Self, eps: f32) -> bool {
        self.abs_diff_eq(*other, eps)
    }
}
