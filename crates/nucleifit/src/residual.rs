//! Sum-of-squared-differences objective between a blob mixture and a crop.
//!
//! The optimizer evaluates this objective many times with only one blob's
//! parameters changing per step. [`MixtureResidual`] therefore keeps one
//! render cache slot per blob, keyed by the exact bit patterns of its 10
//! parameters, and redraws only the blobs whose parameters moved. All
//! buffers are owned by the residual and reused across evaluations.

use ndarray::{Array3, Zip};

use crate::error::FitError;
use crate::gaussian::{Gaussian3, RenderKey, RenderedBlob, PARAMS_PER_BLOB};

/// SSD objective over a target crop, with analytic gradient.
pub struct MixtureResidual {
    target: Array3<f64>,
    scratch: Array3<f64>,
    grad_scratch: Array3<f64>,
    diff: Array3<f64>,
    cache: Vec<Option<(RenderKey, RenderedBlob)>>,
}

impl MixtureResidual {
    pub fn new(target: Array3<f64>) -> Self {
        let shape = target.dim();
        Self {
            target,
            scratch: Array3::zeros(shape),
            grad_scratch: Array3::zeros(shape),
            diff: Array3::zeros(shape),
            cache: Vec::new(),
        }
    }

    pub fn shape(&self) -> (usize, usize, usize) {
        self.target.dim()
    }

    /// Render the mixture into the scratch buffer, reusing cached renders
    /// for unchanged blobs. `false` when any blob is unrenderable.
    fn render_model(&mut self, blobs: &[Gaussian3]) -> bool {
        self.scratch.fill(0.0);
        if self.cache.len() != blobs.len() {
            self.cache = vec![None; blobs.len()];
        }
        for (slot, blob) in self.cache.iter_mut().zip(blobs) {
            let key = blob.key();
            let cached = match slot.take() {
                Some((k, rendered)) if k == key => Some(rendered),
                _ => None,
            };
            match blob.draw(&mut self.scratch, cached) {
                Some(rendered) => *slot = Some((key, rendered)),
                None => return false,
            }
        }
        true
    }

    /// SSD between the mixture and the target crop.
    ///
    /// Unrenderable blobs (negative diagonal covariance, mean outside the
    /// crop, singular covariance) yield `f64::MAX` so a minimizer steps
    /// away from them; a parameter vector whose length is not a multiple
    /// of [`PARAMS_PER_BLOB`] is a caller defect and an error.
    pub fn difference(&mut self, params: &[f64]) -> Result<f64, FitError> {
        let blobs = Gaussian3::split_params(params)?;
        if !self.render_model(&blobs) {
            return Ok(f64::MAX);
        }
        Ok(Zip::from(&self.scratch)
            .and(&self.target)
            .fold(0.0, |acc, &m, &t| {
                let d = m - t;
                acc + d * d
            }))
    }

    /// Analytic gradient of [`Self::difference`] with respect to every
    /// parameter: `∂/∂p Σ(m−t)² = Σ 2(m−t)·∂m/∂p`.
    ///
    /// For unrenderable mixtures the gradient is all zeros; the paired
    /// `f64::MAX` objective already repels the minimizer there.
    pub fn gradient(&mut self, params: &[f64]) -> Result<Vec<f64>, FitError> {
        let blobs = Gaussian3::split_params(params)?;
        if !self.render_model(&blobs) {
            return Ok(vec![0.0; params.len()]);
        }
        Zip::from(&mut self.diff)
            .and(&self.scratch)
            .and(&self.target)
            .for_each(|d, &m, &t| *d = 2.0 * (m - t));

        let mut gradient = vec![0.0; params.len()];
        for (b, blob) in blobs.iter().enumerate() {
            for param in 0..PARAMS_PER_BLOB {
                self.grad_scratch.fill(0.0);
                blob.draw_gradient(&mut self.grad_scratch, param);
                gradient[b * PARAMS_PER_BLOB + param] = Zip::from(&self.diff)
                    .and(&self.grad_scratch)
                    .fold(0.0, |acc, &d, &g| acc + d * g);
            }
        }
        Ok(gradient)
    }
}
