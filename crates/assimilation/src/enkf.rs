//! Ensemble Kalman Filter correcting member reservoir levels from
//! perturbed streamflow observations.

use hoopla_models::{DaConfig, DataAssimilation, EnsembleObservation, ModelError, RunoffState};
use tracing::trace;

use crate::error::AssimilationError;

/// Registry name of the filter.
pub const NAME: &str = "EnsembleKalmanFilter";

const SINGULAR_TOLERANCE: f64 = 1e-12;

/// Stochastic EnKF with a scalar observation (the outlet streamflow).
///
/// With `HA = Qsim − mean(Qsim)`, `Y = Qobs* − Qsim`,
/// `P = Σ e²/N + Σ HA²/(N−1)` and `A = X − mean(X)` for each corrected
/// store `X`, the analysis is `Xa = X + A·HAᵀ·(Y/P)/(N−1)`, floored at zero.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnsembleKalmanFilter;

impl EnsembleKalmanFilter {
    /// Corrects `states` in place.
    ///
    /// A missing observation leaves the states untouched.
    ///
    /// # Errors
    ///
    /// Returns an error for fewer than two members, inconsistent member
    /// counts, a singular innovation covariance, or a store name the model
    /// does not have.
    pub fn analyse(
        &self,
        states: &mut [RunoffState],
        observation: &EnsembleObservation<'_>,
        reservoirs: &[String],
    ) -> Result<(), AssimilationError> {
        let n = states.len();
        if n < 2 {
            return Err(AssimilationError::TooFewMembers { got: n });
        }
        for (what, len) in [
            ("simulated streamflow", observation.simulated.len()),
            ("perturbed observations", observation.perturbed.len()),
            ("observation errors", observation.errors.len()),
        ] {
            if len != n {
                return Err(AssimilationError::MemberMismatch {
                    what,
                    expected: n,
                    got: len,
                });
            }
        }
        if observation.observed.is_nan() {
            trace!("observation missing, analysis skipped");
            return Ok(());
        }

        let nf = n as f64;
        let q_mean = observation.simulated.iter().sum::<f64>() / nf;
        let ha: Vec<f64> = observation.simulated.iter().map(|q| q - q_mean).collect();
        let obs_var = observation.errors.iter().map(|e| e * e).sum::<f64>() / nf;
        let p = obs_var + ha.iter().map(|h| h * h).sum::<f64>() / (nf - 1.0);
        if !p.is_finite() || p.abs() < SINGULAR_TOLERANCE {
            return Err(AssimilationError::SingularCovariance { value: p });
        }
        let gain: Vec<f64> = observation
            .perturbed
            .iter()
            .zip(observation.simulated)
            .map(|(y, q)| (y - q) / p)
            .collect();

        for name in reservoirs {
            let x = states
                .iter()
                .map(|s| {
                    s.store(name).ok_or_else(|| ModelError::UnknownStore {
                        model: s.model().to_string(),
                        name: name.clone(),
                    })
                })
                .collect::<Result<Vec<f64>, _>>()?;
            let x_mean = x.iter().sum::<f64>() / nf;
            // A·HAᵀ collapses to a scalar for a single observed variable.
            let cross: f64 = x.iter().zip(&ha).map(|(xi, h)| (xi - x_mean) * h).sum();
            for ((state, xi), m) in states.iter_mut().zip(&x).zip(&gain) {
                let updated = (xi + cross * m / (nf - 1.0)).max(0.0);
                state.set_store(name, updated)?;
            }
            trace!(store = %name, mean_before = x_mean, "store updated");
        }
        Ok(())
    }
}

impl DataAssimilation for EnsembleKalmanFilter {
    fn name(&self) -> &'static str {
        NAME
    }

    fn run(
        &self,
        states: &mut [RunoffState],
        observation: &EnsembleObservation<'_>,
        config: &DaConfig,
    ) -> Result<(), ModelError> {
        self.analyse(states, observation, config.reservoirs())
            .map_err(ModelError::from)
    }
}
