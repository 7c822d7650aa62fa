//! Shared test utilities for synthetic-volume tests.

use ndarray::Array3;
use rand::{rngs::StdRng, SeedableRng};
use rand_distr::{Distribution, Normal};

use crate::gaussian::Gaussian3;

/// Render a superposition of blobs into a fresh volume of shape
/// `(depth, rows, columns)`.
pub(crate) fn synthetic_volume(
    shape: (usize, usize, usize),
    blobs: &[Gaussian3],
) -> Array3<f64> {
    let mut volume = Array3::zeros(shape);
    for blob in blobs {
        blob.draw(&mut volume, None)
            .expect("synthetic blob must be renderable");
    }
    volume
}

/// Add reproducible `amplitude · N(0, 1)` sensor noise.
pub(crate) fn add_noise(volume: &mut Array3<f64>, amplitude: f64, seed: u64) {
    let mut rng = StdRng::seed_from_u64(seed);
    let normal = Normal::new(0.0, 1.0).expect("valid normal distribution");
    for v in volume.iter_mut() {
        *v += amplitude * normal.sample(&mut rng);
    }
}
