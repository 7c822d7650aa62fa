//! Steepest descent on the analytic gradient with Armijo backtracking.

use crate::cancel::CancelToken;
use crate::residual::MixtureResidual;

use super::MinimizeOutcome;

#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct GradientDescentConfig {
    /// Maximum descent iterations.
    pub max_iters: usize,
    /// Armijo sufficient-decrease constant.
    pub armijo_c: f64,
    /// Step shrink factor per backtrack.
    pub backtrack: f64,
    /// Backtracks per iteration before giving up on the direction.
    pub max_backtracks: usize,
    /// Gradient norm below which the iterate counts as stationary.
    pub grad_tol: f64,
    /// Relative objective improvement below which an iteration counts as
    /// stalled.
    pub tol: f64,
    /// Consecutive stalled iterations that declare convergence.
    pub stall_iters: usize,
}

impl Default for GradientDescentConfig {
    fn default() -> Self {
        Self {
            max_iters: 200,
            armijo_c: 1e-4,
            backtrack: 0.5,
            max_backtracks: 40,
            grad_tol: 1e-8,
            tol: 1e-6,
            stall_iters: 3,
        }
    }
}

pub(super) fn minimize(
    residual: &mut MixtureResidual,
    initial: &[f64],
    initial_value: f64,
    config: &GradientDescentConfig,
    cancel: &CancelToken,
) -> Option<MinimizeOutcome> {
    let mut x = initial.to_vec();
    let mut value = initial_value;
    let mut step = 0.0;
    let mut stalled = 0usize;
    let mut converged = false;

    for _ in 0..config.max_iters {
        if cancel.is_cancelled() {
            return None;
        }
        let g = residual
            .gradient(&x)
            .unwrap_or_else(|_| vec![0.0; x.len()]);
        let gnorm2: f64 = g.iter().map(|v| v * v).sum();
        if gnorm2.sqrt() < config.grad_tol {
            converged = true;
            break;
        }
        // First step sized so a roughly quadratic objective with minimum
        // near zero is crossed in one move; SSD gradients are far too
        // large for any fixed step length.
        if step == 0.0 {
            step = value / gnorm2;
        }

        let mut accepted = None;
        let mut t = step;
        for _ in 0..config.max_backtracks {
            if cancel.is_cancelled() {
                return None;
            }
            let trial: Vec<f64> = x.iter().zip(&g).map(|(xi, gi)| xi - t * gi).collect();
            let trial_value = residual.difference(&trial).unwrap_or(f64::MAX);
            if trial_value <= value - config.armijo_c * t * gnorm2 {
                accepted = Some((trial, trial_value, t));
                break;
            }
            t *= config.backtrack;
        }

        let Some((trial, trial_value, t)) = accepted else {
            // No acceptable step along the steepest direction even after
            // full backtracking: numerically stationary.
            converged = true;
            break;
        };

        let improvement = value - trial_value;
        x = trial;
        value = trial_value;
        // Let the next iteration try a slightly longer step than the one
        // that just succeeded.
        step = t * 2.0;
        if improvement <= config.tol * (value.abs() + 1e-12) {
            stalled += 1;
            if stalled >= config.stall_iters {
                converged = true;
                break;
            }
        } else {
            stalled = 0;
        }
    }

    // Budget exhaustion after real progress still yields a usable fit.
    Some(MinimizeOutcome {
        params: x,
        value,
        converged: converged || value < initial_value,
    })
}
