//! nucleifit — Gaussian-mixture localization of cell nuclei in 3D stacks.
//!
//! Fits a mixture of anisotropic 3D Gaussian intensity blobs to a
//! volumetric microscopy image, resolving nuclei whose intensity profiles
//! overlap. The pipeline stages are:
//!
//! 1. **Partition** – group seed ellipsoids into overlap-connected clusters;
//!    isolated seeds fit alone, overlapping ones fit jointly.
//! 2. **Crop** – cut a padded sub-volume around each cluster and smooth it.
//! 3. **Fit** – minimize the sum-of-squared-differences between the crop and
//!    the rendered mixture, one parallel task per cluster.
//! 4. **Merge** – translate fitted blobs back to volume coordinates and
//!    collect them in input seed order.
//!
//! Segmentation, image I/O, visualization, and tracking stay outside this
//! crate; volumes enter as [`ndarray`] views and seeds as plain values.
//!
//! # Public API
//! - [`BlobFitter`] with [`FitConfig`] as the primary entry point
//! - [`Gaussian3`] as the fitted-blob value type
//! - [`Seed`], [`Cluster`], [`partition`] for the clustering stage
//! - [`Smoother`] and [`MinimizerKind`] as the tuning seams

mod bbox;
mod cancel;
mod cluster;
mod config;
mod error;
mod fitter;
mod gaussian;
mod minimize;
mod pipeline;
mod residual;
mod seed;
mod smoothing;
#[cfg(test)]
mod test_utils;
mod volume;

pub use bbox::BoundingBox;
pub use cancel::CancelToken;
pub use cluster::{partition, Cluster};
pub use config::FitConfig;
pub use error::FitError;
pub use gaussian::{Gaussian3, RenderedBlob, PARAMS_PER_BLOB};
pub use minimize::{
    CoordinateSearchConfig, GradientDescentConfig, MinimizeConfig, MinimizerKind,
};
pub use pipeline::{BlobFitter, FitOutcome};
pub use residual::MixtureResidual;
pub use seed::Seed;
pub use smoothing::{GaussianSmoother, Smoother};
pub use volume::working_copy;
