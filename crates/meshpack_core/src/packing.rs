//! Geometry attribute packing.
//!
//! Small, stateless conversions between the buffer layouts a DCC host hands
//! out (separate U and V arrays, 3-wide colours, single precision points) and
//! the layouts USD expects (interleaved UVs, RGBA colours, double precision).
//!
//! Every function writes into a caller-provided buffer and takes an explicit
//! element count. Buffers must be sized for that count; an undersized buffer
//! panics on the slice index, nothing is reported through a `Result`.

/// Widen `count` triples into quadruples, setting the fourth component to 1.0.
///
/// `input` must hold at least `3 * count` values, `output` at least `4 * count`.
/// Used to turn RGB colours into RGBA.
pub fn convert_3d_array_to_4d_array(input: &[f32], output: &mut [f32], count: usize) {
    let input = &input[..count * 3];
    let output = &mut output[..count * 4];
    for (src, dst) in input.chunks_exact(3).zip(output.chunks_exact_mut(4)) {
        dst[0] = src[0];
        dst[1] = src[1];
        dst[2] = src[2];
        dst[3] = 1.0;
    }
}

/// Promote `count` single precision triples to double precision.
pub fn convert_float_vec3_array_to_double_vec3_array(
    input: &[f32],
    output: &mut [f64],
    count: usize,
) {
    let len = count * 3;
    for (dst, &src) in output[..len].iter_mut().zip(&input[..len]) {
        *dst = f64::from(src);
    }
}

/// Interleave separate U and V channels into `[u0, v0, u1, v1, ...]`.
pub fn zip_uvs(u: &[f32], v: &[f32], uv: &mut [f32], count: usize) {
    let uv = &mut uv[..count * 2];
    for ((dst, &u), &v) in uv.chunks_exact_mut(2).zip(&u[..count]).zip(&v[..count]) {
        dst[0] = u;
        dst[1] = v;
    }
}

/// Split interleaved `[u0, v0, u1, v1, ...]` back into U and V channels.
///
/// Exact inverse of [`zip_uvs`].
pub fn unzip_uvs(uv: &[f32], u: &mut [f32], v: &mut [f32], count: usize) {
    let uv = &uv[..count * 2];
    for ((src, u), v) in uv.chunks_exact(2).zip(&mut u[..count]).zip(&mut v[..count]) {
        *u = src[0];
        *v = src[1];
    }
}

/// Gather U and V through a shared index list and interleave the result.
///
/// For each `k < num_indices`: `output[2k] = u[indices[k]]` and
/// `output[2k + 1] = v[indices[k]]`. Both channels always use the same index,
/// which is how per-corner UV ids address a host's UV arrays.
///
/// # Panics
///
/// If an index is negative or not a valid position in `u` / `v`.
pub fn interleave_indexed_uv_data(
    output: &mut [f32],
    u: &[f32],
    v: &[f32],
    indices: &[i32],
    num_indices: usize,
) {
    let output = &mut output[..num_indices * 2];
    for (dst, &index) in output.chunks_exact_mut(2).zip(&indices[..num_indices]) {
        let index = usize::try_from(index).unwrap_or(usize::MAX);
        dst[0] = u[index];
        dst[1] = v[index];
    }
}

/// Returns true if any face has no UVs assigned (a zero entry in `uv_counts`).
///
/// Sparse sets cannot be compacted and take the uncompacted export path.
pub fn is_uv_set_data_sparse(uv_counts: &[i32]) -> bool {
    uv_counts.iter().any(|&count| count == 0)
}

/// Fill `indices` with `0, 1, ..., count - 1`, replacing its contents.
pub fn generate_incrementing_indices(indices: &mut Vec<i32>, count: usize) {
    indices.clear();
    indices.reserve(count);
    indices.extend((0..count).map(|i| i as i32));
}
