//! Per-cluster fitting: crop, smooth, guess, minimize, un-translate.

use ndarray::{s, Array3};
use tracing::{debug, warn};

use crate::bbox::BoundingBox;
use crate::cancel::CancelToken;
use crate::config::FitConfig;
use crate::error::FitError;
use crate::gaussian::Gaussian3;
use crate::minimize::{minimize, MinimizeOutcome};
use crate::residual::MixtureResidual;
use crate::seed::Seed;
use crate::smoothing::Smoother;
use crate::volume::sample_clamped;

/// Fits one overlap cluster of seeds jointly against a cropped sub-volume.
///
/// Every failure mode of a single cluster is contained: the cluster
/// contributes nothing and the caller moves on. Only malformed input
/// surfaces as an error.
pub struct ClusterFitter<'a> {
    config: &'a FitConfig,
    smoother: &'a dyn Smoother,
}

impl<'a> ClusterFitter<'a> {
    pub fn new(config: &'a FitConfig, smoother: &'a dyn Smoother) -> Self {
        Self { config, smoother }
    }

    /// Crop bounds for a cluster: union of the seed extents, expanded so
    /// the fit sees blob tails and the blur stays unbiased at the borders.
    fn crop_bounds(&self, seeds: &[Seed], shape: (usize, usize, usize)) -> Option<BoundingBox> {
        let mut bounds = seeds.first()?.bounds();
        for seed in &seeds[1..] {
            bounds = bounds.union(&seed.bounds());
        }
        let margin_xy = (self.config.blur_radius + self.config.fit_margin) as i64;
        bounds
            .expanded(margin_xy, margin_xy, self.config.padding_z as i64)
            .clipped(shape)
    }

    fn initial_guess(&self, crop: &Array3<f64>, local_center: [f64; 3]) -> Gaussian3 {
        let [cov_xx, cov_yy, cov_zz] = self.config.initial_covariance;
        Gaussian3::new(
            sample_clamped(crop, local_center),
            local_center[0],
            local_center[1],
            local_center[2],
            cov_xx,
            cov_yy,
            cov_zz,
            0.0,
            0.0,
            0.0,
        )
    }

    /// Fit all seeds of one cluster jointly.
    ///
    /// `Ok(None)` covers the contained failures: degenerate crop, oversized
    /// cluster, cancellation, and non-convergence.
    pub fn fit_cluster(
        &self,
        volume: &Array3<f64>,
        seeds: &[Seed],
        cancel: &CancelToken,
    ) -> Result<Option<Vec<(usize, Gaussian3)>>, FitError> {
        let tags: Vec<usize> = seeds.iter().map(|s| s.tag).collect();
        if seeds.len() > self.config.max_blobs_per_cluster {
            warn!(
                ?tags,
                limit = self.config.max_blobs_per_cluster,
                "cluster exceeds joint-fit limit, skipping"
            );
            return Ok(None);
        }
        let Some(bounds) = self.crop_bounds(seeds, volume.dim()) else {
            debug!(?tags, "degenerate crop, skipping cluster");
            return Ok(None);
        };

        // Clipped bounds are non-negative and inside the volume, so the
        // casts below cannot wrap.
        let lo = bounds.min.map(|v| v as usize);
        let hi = bounds.max.map(|v| v as usize);
        let mut crop = volume
            .slice(s![lo[2]..hi[2], lo[1]..hi[1], lo[0]..hi[0]])
            .to_owned();
        self.smoother.smooth(&mut crop, self.config.blur_radius);

        let origin = bounds.origin();
        let mut initial = Vec::with_capacity(seeds.len() * crate::gaussian::PARAMS_PER_BLOB);
        for seed in seeds {
            let local = [
                seed.center[0] - origin[0],
                seed.center[1] - origin[1],
                seed.center[2] - origin[2],
            ];
            initial.extend_from_slice(&self.initial_guess(&crop, local).to_params());
        }

        let mut residual = MixtureResidual::new(crop);
        let outcome = match minimize(&mut residual, &initial, &self.config.minimizer, cancel)? {
            Some(outcome) => outcome,
            None => {
                warn!(?tags, "fit cancelled, skipping cluster");
                return Ok(None);
            }
        };
        let MinimizeOutcome {
            params,
            value,
            converged,
        } = outcome;
        if !converged || value == f64::MAX {
            warn!(?tags, value, "fit did not converge, skipping cluster");
            return Ok(None);
        }

        let blobs = Gaussian3::split_params(&params)?;
        Ok(Some(
            tags.into_iter()
                .zip(blobs)
                .map(|(tag, blob)| (tag, blob.translated(origin[0], origin[1], origin[2])))
                .collect(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::smoothing::GaussianSmoother;
    use ndarray::Array3;

    fn fitter_config() -> FitConfig {
        FitConfig {
            blur_radius: 0,
            initial_covariance: [3.0, 3.0, 1.5],
            ..FitConfig::default()
        }
    }

    #[test]
    fn single_seed_cluster_recovers_the_blob() {
        let truth = Gaussian3::new(150.0, 15.0, 14.0, 6.0, 2.5, 2.0, 1.2, 0.0, 0.0, 0.0);
        let mut volume = Array3::zeros((12, 30, 30));
        truth.draw(&mut volume, None).unwrap();

        let config = fitter_config();
        let fitter = ClusterFitter::new(&config, &GaussianSmoother);
        let seed = Seed::new(4, [15.0, 14.0, 6.0], [5.0, 5.0, 3.0]);
        let fitted = fitter
            .fit_cluster(&volume, &[seed], &CancelToken::new())
            .unwrap()
            .unwrap();
        assert_eq!(fitted.len(), 1);
        assert_eq!(fitted[0].0, 4);
        let blob = fitted[0].1;
        assert!(blob.almost_equal(&truth, 10.0, 1.0, 1.0), "{blob:?}");
    }

    #[test]
    fn oversized_cluster_is_skipped() {
        let volume = Array3::zeros((12, 30, 30));
        let config = FitConfig {
            max_blobs_per_cluster: 2,
            ..fitter_config()
        };
        let fitter = ClusterFitter::new(&config, &GaussianSmoother);
        let seeds: Vec<Seed> = (0..3)
            .map(|i| Seed::new(i, [10.0 + i as f64, 10.0, 5.0], [3.0, 3.0, 2.0]))
            .collect();
        let result = fitter
            .fit_cluster(&volume, &seeds, &CancelToken::new())
            .unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn out_of_volume_cluster_is_skipped() {
        let volume = Array3::zeros((12, 30, 30));
        let config = fitter_config();
        let fitter = ClusterFitter::new(&config, &GaussianSmoother);
        let seed = Seed::new(0, [200.0, 200.0, 50.0], [2.0, 2.0, 1.0]);
        let result = fitter
            .fit_cluster(&volume, &[seed], &CancelToken::new())
            .unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn fitted_blobs_are_reported_in_volume_coordinates() {
        let truth = Gaussian3::new(120.0, 22.0, 18.0, 7.0, 2.0, 2.0, 1.0, 0.0, 0.0, 0.0);
        let mut volume = Array3::zeros((14, 30, 34));
        truth.draw(&mut volume, None).unwrap();

        let config = fitter_config();
        let fitter = ClusterFitter::new(&config, &GaussianSmoother);
        let seed = Seed::new(9, [22.0, 18.0, 7.0], [5.0, 5.0, 3.0]);
        let fitted = fitter
            .fit_cluster(&volume, &[seed], &CancelToken::new())
            .unwrap()
            .unwrap();
        let blob = fitted[0].1;
        // The crop origin is nonzero, so a missing un-translation would
        // shift the center by the margin.
        assert!((blob.mu_x - truth.mu_x).abs() < 1.0);
        assert!((blob.mu_y - truth.mu_y).abs() < 1.0);
        assert!((blob.mu_z - truth.mu_z).abs() < 1.0);
    }
}
