// Re-export glam for convenience
pub use glam::*;

// Meshpack math helpers
mod approx;
pub use approx::{ApproxEq, DEFAULT_TOLERANCE};

/// Reinterpret a slice of glam vectors as a flat scalar slice.
///
/// `Vec2`, `Vec3` and `Vec4` are tightly packed `f32` tuples, so `[Vec2]` of
/// length N is a `[f32]` of length 2N.
pub fn flatten<T: bytemuck::Pod>(values: &[T]) -> &[f32] {
    bytemuck::cast_slice(values)
}

/// Mutable counterpart of [`flatten`].
pub fn flatten_mut<T: bytemuck::Pod>(values: &mut [T]) -> &mut [f32] {
    bytemuck::cast_slice_mut(values)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flatten_vec2() {
        let uvs = vec![Vec2::new(0.0, 1.0), Vec2::new(2.0, 3.0)];
        assert_eq!(flatten(&uvs), &[0.0, 1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_flatten_mut_vec4() {
        let mut colours = vec![Vec4::ZERO; 2];
        flatten_mut(&mut colours)[5] = 7.0;
        assert_eq!(colours[1], Vec4::new(0.0, 7.0, 0.0, 0.0));
    }
}
