//! Intensity-volume helpers, `(depth, row, column)` axis order.

use ndarray::{Array3, ArrayView3};

/// Floating-point working copy of an intensity volume.
///
/// The caller's array is never mutated; all fitting happens on the copy.
pub fn working_copy<T>(volume: ArrayView3<'_, T>) -> Array3<f64>
where
    T: Copy + Into<f64>,
{
    volume.map(|&v| v.into())
}

/// Intensity at continuous voxel coordinates `[x, y, z]`, truncated to the
/// nearest voxel and clamped to the volume bounds.
pub fn sample_clamped(volume: &Array3<f64>, center: [f64; 3]) -> f64 {
    let (dz, dy, dx) = volume.dim();
    if dx == 0 || dy == 0 || dz == 0 {
        return 0.0;
    }
    let idx = |v: f64, dim: usize| (v as i64).clamp(0, dim as i64 - 1) as usize;
    volume[[
        idx(center[2], dz),
        idx(center[1], dy),
        idx(center[0], dx),
    ]]
}
