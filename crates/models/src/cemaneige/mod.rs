//! CemaNeige snow accounting over elevation bands.
//!
//! Valéry (2010). Forcing measured at the median band elevation is
//! extrapolated to every band, split into rain and snow, and melt is released
//! from each band's stock. The runoff depth handed to the rainfall-runoff
//! model is the band-mean liquid precipitation plus band-mean melt.

pub mod processes;

use hoopla_calendar::TimeStep;
use hoopla_data::Field;

use crate::error::ModelError;
use crate::hyper::SnowHyperParameters;
use crate::state::{SnowBand, SnowState};
use crate::traits::{SnowAccounting, SnowInputs};

use processes::THRESHOLD_FACTOR;

const NAME: &str = "CemaNeige";

const PARAMETER_NAMES: &[&str] = &["ctg", "kf"];

/// The CemaNeige snow model.
#[derive(Debug, Clone, Copy, Default)]
pub struct CemaNeige;

fn check_params(params: &[f64]) -> Result<(), ModelError> {
    if params.len() != PARAMETER_NAMES.len() {
        return Err(ModelError::ParameterCount {
            model: NAME,
            expected: PARAMETER_NAMES.len(),
            got: params.len(),
        });
    }
    if !(0.0..=1.0).contains(&params[0]) {
        return Err(ModelError::InvalidParameter {
            model: NAME,
            name: "ctg",
            value: params[0],
            reason: "must lie in 0..=1",
        });
    }
    if !(params[1].is_finite() && params[1] >= 0.0) {
        return Err(ModelError::InvalidParameter {
            model: NAME,
            name: "kf",
            value: params[1],
            reason: "must be >= 0",
        });
    }
    Ok(())
}

impl SnowAccounting for CemaNeige {
    fn name(&self) -> &'static str {
        NAME
    }

    fn inputs(&self) -> &'static [Field] {
        &[Field::Precip, Field::Temp]
    }

    fn hyper_parameters(&self) -> &'static [&'static str] {
        &[
            "elevations",
            "precip_gradient",
            "temp_gradient",
            "mean_annual_snowfall",
        ]
    }

    fn parameter_names(&self) -> &'static [&'static str] {
        PARAMETER_NAMES
    }

    fn default_parameters(&self, time_step: TimeStep) -> Vec<f64> {
        match time_step {
            TimeStep::Daily => vec![0.25, 3.74],
            TimeStep::ThreeHourly => vec![0.93, 0.40],
        }
    }

    fn prepare(
        &self,
        params: &[f64],
        hyper: &SnowHyperParameters,
    ) -> Result<SnowState, ModelError> {
        check_params(params)?;
        hyper.validate(NAME)?;
        let band = SnowBand {
            stock: 0.0,
            thermal: 0.0,
            threshold: THRESHOLD_FACTOR * hyper.mean_annual_snowfall(),
        };
        let bands = vec![band; hyper.elevations().len()];
        Ok(SnowState::new(NAME, hyper.clone(), bands))
    }

    fn run(
        &self,
        inputs: SnowInputs,
        params: &[f64],
        state: &mut SnowState,
    ) -> Result<f64, ModelError> {
        state.ensure_owner(NAME)?;
        check_params(params)?;
        let (ctg, kf) = (params[0], params[1]);
        let (hyper, bands) = state.parts_mut();

        let reference = hyper.median_elevation();
        let grad_t = hyper.temp_gradient();
        let band_precip = distribute(inputs.precip, hyper, reference);
        let range = match (inputs.tmin, inputs.tmax) {
            (Some(lo), Some(hi)) if lo.is_finite() && hi.is_finite() => Some((lo, hi)),
            _ => None,
        };

        let mut liquid_sum = 0.0;
        let mut melt_sum = 0.0;
        for ((band, &z), &p) in bands.iter_mut().zip(hyper.elevations()).zip(&band_precip) {
            let temp = processes::extrapolate_temp(inputs.temp, reference, z, grad_t);
            let solid = match range {
                Some((lo, hi)) => processes::solid_fraction_range(
                    processes::extrapolate_temp(lo, reference, z, grad_t),
                    processes::extrapolate_temp(hi, reference, z, grad_t),
                ),
                None => processes::solid_fraction_linear(temp),
            };
            let snow = solid * p;
            liquid_sum += p - snow;

            band.stock += snow;
            band.thermal = processes::thermal_state(band.thermal, temp, ctg);
            let potential = processes::potential_melt(band.thermal, temp, kf, band.stock);
            let cover = processes::cover_ratio(band.stock, band.threshold);
            let melt = processes::actual_melt(potential, cover);
            band.stock = (band.stock - melt).max(0.0);
            melt_sum += melt;
        }

        let n = bands.len() as f64;
        Ok((liquid_sum + melt_sum) / n)
    }
}

fn distribute(precip: f64, hyper: &SnowHyperParameters, reference: f64) -> Vec<f64> {
    processes::distribute_precip(
        precip,
        hyper.elevations(),
        reference,
        hyper.precip_gradient(),
    )
}
