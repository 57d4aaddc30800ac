//! HydroMod1: a six-parameter soil-moisture and two-reservoir routing model
//! with a delayed unit-response convolution.
//!
//! Parameters, in vector order:
//!
//! | # | Name | Meaning |
//! |---|------|---------|
//! | 0 | `soil_capacity` | soil reservoir capacity (mm) |
//! | 1 | `overflow_split` | share of soil overflow sent to fast routing |
//! | 2 | `slow_constant` | slow routing emptying constant |
//! | 3 | `delay` | routing delay (steps) |
//! | 4 | `partitioning` | rainfall partitioning coefficient (unused by the equations) |
//! | 5 | `fast_constant` | fast routing emptying constant, also the fast precipitation share |

use hoopla_data::Field;
use tracing::trace;

use crate::error::ModelError;
use crate::state::RunoffState;
use crate::traits::{RainfallRunoff, RunoffInputs};

const NAME: &str = "HydroMod1";

const PARAMETER_NAMES: &[&str] = &[
    "soil_capacity",
    "overflow_split",
    "slow_constant",
    "delay",
    "partitioning",
    "fast_constant",
];

/// Store order inside [`RunoffState::stores`].
const STATE_NAMES: &[&str] = &["S", "R", "T"];

const INITIAL_SLOW_STORE: f64 = 10.0;
const INITIAL_FAST_STORE: f64 = 5.0;

/// The HydroMod1 rainfall-runoff model.
#[derive(Debug, Clone, Copy, Default)]
pub struct HydroMod1;

/// Unit-response weights for a routing delay of `delay` steps.
///
/// The kernel has `max(ceil(delay), 1) + 1` weights; only the last two are
/// non-zero and they split the mass according to the fractional delay.
pub fn delay_kernel(delay: f64) -> Vec<f64> {
    let len = (delay.ceil() as usize).max(1) + 1;
    let mut weights = vec![0.0; len];
    let k = (len - 2) as f64;
    weights[len - 2] = 1.0 / (delay - k + 1.0);
    weights[len - 1] = 1.0 - weights[len - 2];
    weights
}

fn check_params(params: &[f64]) -> Result<(), ModelError> {
    if params.len() != PARAMETER_NAMES.len() {
        return Err(ModelError::ParameterCount {
            model: NAME,
            expected: PARAMETER_NAMES.len(),
            got: params.len(),
        });
    }
    let invalid = |i: usize, reason| ModelError::InvalidParameter {
        model: NAME,
        name: PARAMETER_NAMES[i],
        value: params[i],
        reason,
    };
    if let Some(i) = params.iter().position(|p| !p.is_finite()) {
        return Err(invalid(i, "not finite"));
    }
    if params[0] <= 0.0 {
        return Err(invalid(0, "must be > 0"));
    }
    if params[2] == 0.0 {
        return Err(invalid(2, "must be non-zero"));
    }
    if params[3] < 0.0 {
        return Err(invalid(3, "must be >= 0"));
    }
    if params[5] == 0.0 {
        return Err(invalid(5, "must be non-zero"));
    }
    Ok(())
}

impl RainfallRunoff for HydroMod1 {
    fn name(&self) -> &'static str {
        NAME
    }

    fn inputs(&self) -> &'static [Field] {
        &[Field::Precip]
    }

    fn parameter_names(&self) -> &'static [&'static str] {
        PARAMETER_NAMES
    }

    fn state_names(&self) -> &'static [&'static str] {
        STATE_NAMES
    }

    fn prepare(&self, params: &[f64]) -> Result<RunoffState, ModelError> {
        check_params(params)?;
        RunoffState::new(
            NAME,
            STATE_NAMES,
            vec![params[0] * 0.5, INITIAL_SLOW_STORE, INITIAL_FAST_STORE],
            delay_kernel(params[3]),
        )
    }

    fn run(
        &self,
        inputs: RunoffInputs,
        params: &[f64],
        state: &mut RunoffState,
    ) -> Result<f64, ModelError> {
        state.ensure_owner(NAME)?;
        if params.len() != PARAMETER_NAMES.len() {
            return Err(ModelError::ParameterCount {
                model: NAME,
                expected: PARAMETER_NAMES.len(),
                got: params.len(),
            });
        }
        let (stores, kernel, routing) = state.parts_mut();
        let n_stores = stores.len();
        let [s, r, t] = stores else {
            return Err(ModelError::StateMismatch {
                model: NAME,
                state_model: NAME.to_string(),
                reason: format!("{n_stores} stores, expected 3"),
            });
        };

        let RunoffInputs { precip, pet } = inputs;
        let ps = (1.0 - params[5]) * precip;
        let pr = precip - ps;

        // Soil moisture accounting
        let is = if ps >= pet {
            *s = *s + ps - pet;
            let overflow = f64::max(0.0, *s - params[0]);
            *s -= overflow;
            overflow
        } else {
            *s *= ((ps - pet) / params[0]).exp();
            0.0
        };

        // Slow routing
        *r += is * (1.0 - params[1]);
        let qr = *r / (params[2] * params[5]);
        *r -= qr;

        // Fast routing
        *t = *t + pr + is * params[1];
        let qt = *t / params[5];
        *t -= qt;

        routing.rotate_left(1);
        if let Some(last) = routing.last_mut() {
            *last = 0.0;
        }
        for (h, w) in routing.iter_mut().zip(kernel) {
            *h += w * (qt + qr);
        }

        let q = f64::max(0.0, routing.first().copied().unwrap_or(0.0));
        trace!(s = *s, r = *r, t = *t, q, "HydroMod1 step");
        Ok(q)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const PARAMS: [f64; 6] = [100.0, 0.5, 10.0, 2.0, 0.1, 0.5];

    #[test]
    fn kernel_integer_delay() {
        assert_eq!(delay_kernel(2.0), vec![0.0, 0.5, 0.5]);
    }

    #[test]
    fn kernel_fractional_delay() {
        let k = delay_kernel(2.3);
        assert_eq!(k.len(), 4);
        assert_relative_eq!(k[2], 1.0 / 1.3, epsilon = 1e-12);
        assert_relative_eq!(k.iter().sum::<f64>(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn kernel_short_delay_keeps_two_weights() {
        assert_eq!(delay_kernel(0.0), vec![1.0, 0.0]);
        let k = delay_kernel(0.5);
        assert_eq!(k.len(), 2);
        assert_relative_eq!(k[0], 1.0 / 1.5, epsilon = 1e-12);
    }

    #[test]
    fn prepare_initial_stores() {
        let s = HydroMod1.prepare(&PARAMS).unwrap();
        assert_eq!(s.stores(), &[50.0, 10.0, 5.0]);
        assert_eq!(s.routing(), &[0.0, 0.0, 0.0]);
        assert_eq!(s.model(), "HydroMod1");
    }

    #[test]
    fn prepare_rejects_bad_params() {
        assert!(matches!(
            HydroMod1.prepare(&PARAMS[..5]),
            Err(ModelError::ParameterCount { expected: 6, got: 5, .. })
        ));
        let mut p = PARAMS;
        p[0] = 0.0;
        assert!(matches!(
            HydroMod1.prepare(&p),
            Err(ModelError::InvalidParameter { name: "soil_capacity", .. })
        ));
    }

    #[test]
    fn run_rejects_foreign_state() {
        let mut state = RunoffState::new("Other", STATE_NAMES, vec![1.0, 1.0, 1.0], vec![1.0, 0.0])
            .unwrap();
        let err = HydroMod1
            .run(RunoffInputs { precip: 1.0, pet: 0.0 }, &PARAMS, &mut state)
            .unwrap_err();
        assert!(matches!(err, ModelError::StateMismatch { .. }));
    }

    #[test]
    fn soil_overflow_is_removed() {
        let mut state = HydroMod1.prepare(&PARAMS).unwrap();
        HydroMod1
            .run(RunoffInputs { precip: 500.0, pet: 0.0 }, &PARAMS, &mut state)
            .unwrap();
        assert_relative_eq!(state.store("S").unwrap(), 100.0);
    }
}
