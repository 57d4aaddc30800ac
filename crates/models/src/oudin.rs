//! Oudin temperature-based potential evapotranspiration.
//!
//! Oudin et al. (2005), Journal of Hydrology 303, 290-306. Extraterrestrial
//! radiation follows Allen et al. (1998); the 3-hour variant integrates the
//! solar time angle over each period.

use std::f64::consts::PI;

use chrono::Timelike;
use hoopla_calendar::{TimeStep, day_of_year};
use hoopla_data::Field;
use tracing::debug;

use crate::error::ModelError;
use crate::hyper::PetHyperParameters;
use crate::state::PetTerms;
use crate::traits::{Pet, PetInputs};

const NAME: &str = "Oudin";

/// Solar constant (MJ m-2 min-1).
const GSC: f64 = 0.082;
/// Water density (kg L-1).
const RHO: f64 = 1000.0;
/// Longitude of the centre of the local time zone (degrees west).
const LZ: f64 = 75.0;
/// Longitude of the measurement site (degrees west).
const LM: f64 = 72.0;

/// The Oudin PET model.
#[derive(Debug, Clone, Copy, Default)]
pub struct Oudin;

/// Extraterrestrial radiation (MJ m-2 per step) for a step starting at
/// `hour` on fractional day-of-year `doy`.
fn radiation(step: TimeStep, latitude_rad: f64, doy: f64, hour: f64) -> f64 {
    let ds = 0.409 * ((2.0 * PI / 365.0) * doy - 1.39).sin();
    let dr = 1.0 + 0.033 * (doy * 2.0 * PI / 365.0).cos();
    let (sin_l, cos_l) = latitude_rad.sin_cos();
    let (sin_d, cos_d) = ds.sin_cos();

    match step {
        TimeStep::Daily => {
            let omega = (-latitude_rad.tan() * ds.tan()).clamp(-1.0, 1.0).acos();
            (24.0 * 60.0 / PI) * GSC * dr * (omega * sin_l * sin_d + cos_l * cos_d * omega.sin())
        }
        TimeStep::ThreeHourly => {
            let b = 2.0 * PI * (doy - 81.0) / 364.0;
            let sc = 0.1645 * (2.0 * b).sin() - 0.1255 * b.cos() - 0.025 * b.sin();
            let t = hour + 0.5;
            let omega0 = PI / 12.0 * (t + 0.06667 * (LZ - LM) + sc - 12.0);
            let half = PI * f64::from(step.hours()) / 24.0;
            let (omega1, omega2) = (omega0 - half, omega0 + half);
            (12.0 * 60.0 / PI)
                * GSC
                * dr
                * ((omega2 - omega1) * sin_l * sin_d + cos_l * cos_d * (omega2.sin() - omega1.sin()))
        }
    }
}

impl Pet for Oudin {
    fn name(&self) -> &'static str {
        NAME
    }

    fn inputs(&self) -> &'static [Field] {
        &[Field::Dates, Field::Temp, Field::Latitude]
    }

    fn hyper_parameters(&self) -> &'static [&'static str] {
        &["latitude"]
    }

    fn prepare(
        &self,
        time_step: TimeStep,
        inputs: PetInputs<'_>,
        hyper: &PetHyperParameters,
    ) -> Result<PetTerms, ModelError> {
        if inputs.temp.len() != inputs.dates.len() {
            return Err(ModelError::MissingInput {
                model: NAME,
                field: Field::Temp,
            });
        }
        if !(-90.0..=90.0).contains(&hyper.latitude) {
            return Err(ModelError::InvalidHyperParameters {
                model: NAME,
                reason: format!("latitude {} outside -90..=90", hyper.latitude),
            });
        }

        let lat = PI * hyper.latitude / 180.0;
        let rad = inputs
            .dates
            .iter()
            .map(|d| radiation(time_step, lat, day_of_year(d), f64::from(d.hour())))
            .collect();
        let latent_heat = inputs.temp.iter().map(|t| 2.501 - 0.002361 * t).collect();
        debug!(steps = inputs.dates.len(), %time_step, "Oudin terms prepared");

        Ok(PetTerms::new(
            NAME,
            time_step,
            rad,
            latent_heat,
            inputs.temp.to_vec(),
        ))
    }

    fn run(&self, terms: &PetTerms) -> Result<Vec<f64>, ModelError> {
        if terms.model() != NAME {
            return Err(ModelError::StateMismatch {
                model: NAME,
                state_model: terms.model().to_string(),
                reason: "terms prepared by another model".into(),
            });
        }
        Ok(terms
            .radiation
            .iter()
            .zip(&terms.latent_heat)
            .zip(&terms.temp)
            .map(|((re, lambda), t)| {
                let e = re / (lambda * RHO) * (t + 5.0) / 100.0 * 1000.0;
                e.max(0.0)
            })
            .collect())
    }
}
