//! Catchment descriptions that configure sub-models without being calibrated.

use serde::{Deserialize, Serialize};

use crate::error::ModelError;

/// Default precipitation gradient with elevation (m-1).
pub const DEFAULT_PRECIP_GRADIENT: f64 = 0.00041;

/// Default temperature lapse rate (°C per 100 m).
pub const DEFAULT_TEMP_GRADIENT: f64 = 0.6;

/// Inputs of an evapotranspiration model that are not time series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PetHyperParameters {
    /// Catchment latitude (degrees north).
    pub latitude: f64,
}

/// Catchment description used by snow accounting models.
///
/// One snow band is simulated per elevation; the median elevation is the
/// reference the forcing is assumed to be measured at.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnowHyperParameters {
    elevations: Vec<f64>,
    precip_gradient: f64,
    temp_gradient: f64,
    mean_annual_snowfall: f64,
}

impl SnowHyperParameters {
    /// Bands at `elevations` (m, ascending) for a catchment receiving
    /// `mean_annual_snowfall` mm of snow per year.
    pub fn new(elevations: Vec<f64>, mean_annual_snowfall: f64) -> Self {
        Self {
            elevations,
            precip_gradient: DEFAULT_PRECIP_GRADIENT,
            temp_gradient: DEFAULT_TEMP_GRADIENT,
            mean_annual_snowfall,
        }
    }

    /// Set the precipitation gradient (m-1).
    pub fn with_precip_gradient(mut self, beta: f64) -> Self {
        self.precip_gradient = beta;
        self
    }

    /// Set the temperature lapse rate (°C per 100 m).
    pub fn with_temp_gradient(mut self, grad_t: f64) -> Self {
        self.temp_gradient = grad_t;
        self
    }

    /// Band elevations (m).
    pub fn elevations(&self) -> &[f64] {
        &self.elevations
    }

    /// Median band elevation (m).
    pub fn median_elevation(&self) -> f64 {
        let n = self.elevations.len();
        if n == 0 {
            return 0.0;
        }
        if n % 2 == 1 {
            self.elevations[n / 2]
        } else {
            (self.elevations[n / 2 - 1] + self.elevations[n / 2]) / 2.0
        }
    }

    /// Precipitation gradient (m-1).
    pub fn precip_gradient(&self) -> f64 {
        self.precip_gradient
    }

    /// Temperature lapse rate (°C per 100 m).
    pub fn temp_gradient(&self) -> f64 {
        self.temp_gradient
    }

    /// Mean annual snowfall (mm).
    pub fn mean_annual_snowfall(&self) -> f64 {
        self.mean_annual_snowfall
    }

    /// Validate that the configuration is internally consistent.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::InvalidHyperParameters`] if there is no band,
    /// elevations are not finite and ascending, or the snowfall is negative.
    pub fn validate(&self, model: &'static str) -> Result<(), ModelError> {
        let fail = |reason: String| Err(ModelError::InvalidHyperParameters { model, reason });
        if self.elevations.is_empty() {
            return fail("no elevation band".into());
        }
        if self.elevations.iter().any(|z| !z.is_finite())
            || self.elevations.windows(2).any(|w| w[1] < w[0])
        {
            return fail(format!("elevations {:?} are not ascending", self.elevations));
        }
        if !(self.mean_annual_snowfall.is_finite() && self.mean_annual_snowfall >= 0.0) {
            return fail(format!(
                "mean annual snowfall {} must be >= 0",
                self.mean_annual_snowfall
            ));
        }
        if !(self.precip_gradient.is_finite() && self.temp_gradient.is_finite()) {
            return fail("gradients must be finite".into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn median_of_five_bands() {
        let h = SnowHyperParameters::new(vec![400.0, 600.0, 800.0, 1200.0, 2000.0], 300.0);
        assert_eq!(h.median_elevation(), 800.0);
        assert!(h.validate("CemaNeige").is_ok());
    }

    #[test]
    fn validate_rejects_descending() {
        let h = SnowHyperParameters::new(vec![800.0, 600.0], 300.0);
        assert!(h.validate("CemaNeige").is_err());
    }

    #[test]
    fn validate_rejects_negative_snowfall() {
        let h = SnowHyperParameters::new(vec![800.0], -1.0);
        assert!(h.validate("CemaNeige").is_err());
    }

    #[test]
    fn builder_sets_gradients() {
        let h = SnowHyperParameters::new(vec![800.0], 0.0)
            .with_precip_gradient(0.0)
            .with_temp_gradient(0.434);
        assert_eq!(h.precip_gradient(), 0.0);
        assert_eq!(h.temp_gradient(), 0.434);
    }
}
