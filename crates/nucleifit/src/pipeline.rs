//! Whole-volume fit orchestration.
//!
//! Entry point of the crate: [`BlobFitter::fit`] takes an intensity volume
//! and the seeds from an upstream segmentation, partitions the seeds into
//! overlap clusters, fits every cluster on a rayon worker pool, and merges
//! the per-cluster results into one sequence aligned with the input seed
//! order. Clusters are data-independent, so each parallel fit owns its own
//! crop and scratch buffers; the merge is the only synchronization point.

use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};

use ndarray::ArrayView3;
use rayon::prelude::*;
use tracing::info;

use crate::cancel::CancelToken;
use crate::cluster;
use crate::config::FitConfig;
use crate::error::FitError;
use crate::fitter::ClusterFitter;
use crate::gaussian::Gaussian3;
use crate::seed::Seed;
use crate::smoothing::{GaussianSmoother, Smoother};
use crate::volume::working_copy;

/// Result of one whole-volume fit.
#[derive(Debug, Clone)]
pub struct FitOutcome {
    /// One slot per input seed, in input order. `None` marks a seed whose
    /// cluster failed or was cancelled.
    pub blobs: Vec<Option<Gaussian3>>,
    /// Wall-clock duration of the fit, advisory.
    pub elapsed: Duration,
}

/// Fits Gaussian mixtures to all seeded nuclei of a volume.
pub struct BlobFitter {
    config: FitConfig,
    smoother: Box<dyn Smoother>,
}

impl Default for BlobFitter {
    fn default() -> Self {
        Self::new(FitConfig::default())
    }
}

impl BlobFitter {
    pub fn new(config: FitConfig) -> Self {
        Self {
            config,
            smoother: Box::new(GaussianSmoother),
        }
    }

    /// Replace the default per-slice Gaussian blur with a custom smoother.
    pub fn with_smoother(config: FitConfig, smoother: Box<dyn Smoother>) -> Self {
        Self { config, smoother }
    }

    /// Fit all seeds against `volume`, `(depth, row, column)` axis order.
    ///
    /// The input volume is never mutated. Seed tags must be unique;
    /// a duplicate is fatal. Per-cluster failures only empty the affected
    /// slots of the outcome.
    pub fn fit<T>(&self, volume: ArrayView3<'_, T>, seeds: &[Seed]) -> Result<FitOutcome, FitError>
    where
        T: Copy + Into<f64>,
    {
        self.fit_with_cancel(volume, seeds, &CancelToken::new())
    }

    /// [`Self::fit`] under a cancellation token: a tripped token skips the
    /// clusters still in flight, clusters already fitted keep their blobs.
    pub fn fit_with_cancel<T>(
        &self,
        volume: ArrayView3<'_, T>,
        seeds: &[Seed],
        cancel: &CancelToken,
    ) -> Result<FitOutcome, FitError>
    where
        T: Copy + Into<f64>,
    {
        let start = Instant::now();
        let mut seen = HashSet::new();
        for seed in seeds {
            if !seen.insert(seed.tag) {
                return Err(FitError::DuplicateTag { tag: seed.tag });
            }
        }

        let working = working_copy(volume);
        let clusters = cluster::partition(seeds);
        let by_tag: HashMap<usize, Seed> = seeds.iter().map(|s| (s.tag, *s)).collect();
        let cluster_seeds: Vec<Vec<Seed>> = clusters
            .iter()
            .map(|c| {
                c.tags
                    .iter()
                    .map(|t| {
                        by_tag
                            .get(t)
                            .copied()
                            .ok_or(FitError::UnknownTag { tag: *t })
                    })
                    .collect()
            })
            .collect::<Result<_, FitError>>()?;

        let fitter = ClusterFitter::new(&self.config, self.smoother.as_ref());
        let fitted = cluster_seeds
            .par_iter()
            .map(|members| fitter.fit_cluster(&working, members, cancel))
            .collect::<Result<Vec<_>, FitError>>()?;

        let position: HashMap<usize, usize> =
            seeds.iter().enumerate().map(|(i, s)| (s.tag, i)).collect();
        let mut blobs = vec![None; seeds.len()];
        let mut fitted_count = 0usize;
        for pairs in fitted.into_iter().flatten() {
            for (tag, blob) in pairs {
                blobs[position[&tag]] = Some(blob);
                fitted_count += 1;
            }
        }

        let elapsed = start.elapsed();
        info!(
            seeds = seeds.len(),
            clusters = clusters.len(),
            fitted = fitted_count,
            elapsed_ms = elapsed.as_millis() as u64,
            "gaussian mixture fit finished"
        );
        Ok(FitOutcome { blobs, elapsed })
    }

    /// Convenience fit of a single seed through the mixture path.
    pub fn fit_single<T>(
        &self,
        volume: ArrayView3<'_, T>,
        seed: Seed,
    ) -> Result<Option<Gaussian3>, FitError>
    where
        T: Copy + Into<f64>,
    {
        let outcome = self.fit(volume, std::slice::from_ref(&seed))?;
        Ok(outcome.blobs.into_iter().next().flatten())
    }
}
