//! Fit configuration.

use crate::minimize::MinimizeConfig;

/// Tuning knobs for the whole fitting pipeline.
///
/// Defaults reproduce the behavior the constants were measured for:
/// nuclei a few voxels across in stacks whose z-resolution is much coarser
/// than x/y.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct FitConfig {
    /// Blur radius applied to each crop before fitting, in voxels.
    /// Zero disables smoothing.
    pub blur_radius: usize,
    /// Extra x/y margin around the cluster bounding box, in voxels, so the
    /// fit sees the blob tails beyond the seed extents.
    pub fit_margin: usize,
    /// Extra z margin around the cluster bounding box, in voxels.
    pub padding_z: usize,
    /// Diagonal covariance `[xx, yy, zz]` of every initial guess.
    pub initial_covariance: [f64; 3],
    /// Largest cluster fit jointly. Bigger clusters point at upstream
    /// over-segmentation and fail as a contained per-cluster error.
    pub max_blobs_per_cluster: usize,
    /// Minimizer selection and tuning.
    pub minimizer: MinimizeConfig,
}

impl Default for FitConfig {
    fn default() -> Self {
        Self {
            blur_radius: 2,
            fit_margin: 5,
            padding_z: 1,
            initial_covariance: [50.0, 50.0, 2.0],
            max_blobs_per_cluster: 5,
            minimizer: MinimizeConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::minimize::MinimizerKind;

    #[test]
    fn defaults_are_stable() {
        let config = FitConfig::default();
        assert_eq!(config.fit_margin, 5);
        assert_eq!(config.padding_z, 1);
        assert_eq!(config.initial_covariance, [50.0, 50.0, 2.0]);
        assert_eq!(config.max_blobs_per_cluster, 5);
        assert_eq!(config.minimizer.kind, MinimizerKind::CoordinateSearch);
    }
}
