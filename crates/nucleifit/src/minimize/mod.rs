//! Derivative-free and gradient-based minimizers for cluster fits.
//!
//! Both minimizers work on the flattened per-cluster parameter vector and
//! poll the cancellation token between objective evaluations. Selection is
//! by configuration; the coordinate search is the robust default, gradient
//! descent trades robustness for fewer evaluations on well-posed crops.

mod coordinate;
mod gradient;

pub use coordinate::CoordinateSearchConfig;
pub use gradient::GradientDescentConfig;

use crate::cancel::CancelToken;
use crate::error::FitError;
use crate::residual::MixtureResidual;

/// Which algorithm drives a cluster fit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MinimizerKind {
    /// Per-coordinate golden-section line searches with adaptive steps.
    CoordinateSearch,
    /// Steepest descent on the analytic gradient with Armijo backtracking.
    GradientDescent,
}

/// Minimizer selection plus per-algorithm tuning.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct MinimizeConfig {
    pub kind: MinimizerKind,
    pub coordinate: CoordinateSearchConfig,
    pub gradient: GradientDescentConfig,
}

impl Default for MinimizeConfig {
    fn default() -> Self {
        Self {
            kind: MinimizerKind::CoordinateSearch,
            coordinate: CoordinateSearchConfig::default(),
            gradient: GradientDescentConfig::default(),
        }
    }
}

/// Result of one minimization run.
#[derive(Debug, Clone)]
pub struct MinimizeOutcome {
    /// Best parameter vector found.
    pub params: Vec<f64>,
    /// Objective value at `params`.
    pub value: f64,
    /// Whether the outcome is usable: a stop criterion fired, or the
    /// iteration budget ran out after the objective had improved. `false`
    /// only for runs that made no progress at all.
    pub converged: bool,
}

/// Minimize the residual from `initial`.
///
/// `Ok(None)` means the run was cancelled. A malformed initial vector is
/// the only error path; past that validation the inner loops treat every
/// evaluation as infallible.
pub fn minimize(
    residual: &mut MixtureResidual,
    initial: &[f64],
    config: &MinimizeConfig,
    cancel: &CancelToken,
) -> Result<Option<MinimizeOutcome>, FitError> {
    // Validates the vector length once; the minimizers never change it.
    let initial_value = residual.difference(initial)?;
    let outcome = match config.kind {
        MinimizerKind::CoordinateSearch => coordinate::minimize(
            residual,
            initial,
            initial_value,
            &config.coordinate,
            cancel,
        ),
        MinimizerKind::GradientDescent => {
            gradient::minimize(residual, initial, initial_value, &config.gradient, cancel)
        }
    };
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gaussian::Gaussian3;
    use ndarray::Array3;

    fn one_blob_residual(truth: &Gaussian3) -> MixtureResidual {
        let mut crop = Array3::zeros((12, 16, 16));
        truth.draw(&mut crop, None).unwrap();
        MixtureResidual::new(crop)
    }

    #[test]
    fn both_minimizers_improve_a_perturbed_guess() {
        let truth = Gaussian3::new(60.0, 8.0, 8.0, 6.0, 2.0, 2.0, 1.5, 0.0, 0.0, 0.0);
        let guess = truth.translated(1.0, -0.8, 0.5).to_params();
        let cancel = CancelToken::new();

        for kind in [MinimizerKind::CoordinateSearch, MinimizerKind::GradientDescent] {
            let mut residual = one_blob_residual(&truth);
            let start = residual.difference(&guess).unwrap();
            let config = MinimizeConfig {
                kind,
                ..MinimizeConfig::default()
            };
            let outcome = minimize(&mut residual, &guess, &config, &cancel)
                .unwrap()
                .unwrap();
            assert!(outcome.value < start, "{kind:?} did not improve");
        }
    }

    #[test]
    fn joint_two_blob_search_yields_a_usable_outcome() {
        // 20 parameters: enough that the sweep budget, not a stop
        // criterion, usually ends the run. The outcome must still be
        // usable and close to the truth.
        let truth = [
            Gaussian3::new(80.0, 7.0, 7.0, 5.0, 2.0, 2.0, 1.5, 0.0, 0.0, 0.0),
            Gaussian3::new(80.0, 15.0, 7.0, 5.0, 2.0, 2.0, 1.5, 0.0, 0.0, 0.0),
        ];
        let mut crop = Array3::zeros((10, 14, 22));
        for blob in &truth {
            blob.draw(&mut crop, None).unwrap();
        }
        let mut residual = MixtureResidual::new(crop);

        let mut guess = Vec::new();
        for blob in &truth {
            guess.extend_from_slice(&blob.translated(0.8, -0.6, 0.4).to_params());
        }
        let start = residual.difference(&guess).unwrap();
        let config = MinimizeConfig {
            coordinate: CoordinateSearchConfig {
                max_sweeps: 20,
                ..CoordinateSearchConfig::default()
            },
            ..MinimizeConfig::default()
        };
        let outcome = minimize(&mut residual, &guess, &config, &CancelToken::new())
            .unwrap()
            .unwrap();
        assert!(outcome.converged);
        assert!(outcome.value < start);
        let fitted = Gaussian3::split_params(&outcome.params).unwrap();
        for (blob, truth) in fitted.iter().zip(&truth) {
            assert!((blob.mu_x - truth.mu_x).abs() < 0.5, "{blob:?}");
            assert!((blob.mu_y - truth.mu_y).abs() < 0.5);
        }
    }

    #[test]
    fn cancelled_token_stops_the_run() {
        let truth = Gaussian3::new(60.0, 8.0, 8.0, 6.0, 2.0, 2.0, 1.5, 0.0, 0.0, 0.0);
        let mut residual = one_blob_residual(&truth);
        let cancel = CancelToken::new();
        cancel.cancel();
        let outcome = minimize(
            &mut residual,
            &truth.to_params(),
            &MinimizeConfig::default(),
            &cancel,
        )
        .unwrap();
        assert!(outcome.is_none());
    }

    #[test]
    fn malformed_initial_vector_is_an_error() {
        let truth = Gaussian3::new(60.0, 8.0, 8.0, 6.0, 2.0, 2.0, 1.5, 0.0, 0.0, 0.0);
        let mut residual = one_blob_residual(&truth);
        let err = minimize(
            &mut residual,
            &[1.0; 11],
            &MinimizeConfig::default(),
            &CancelToken::new(),
        );
        assert!(err.is_err());
    }
}
