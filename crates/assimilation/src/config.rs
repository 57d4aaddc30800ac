//! Ensemble configuration.

use crate::error::AssimilationError;

/// Standard deviations of the input and observation perturbations.
///
/// Temperatures and PET are perturbed additively (°C, mm); precipitation and
/// streamflow relatively (fraction of the value).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Uncertainties {
    /// Temperature fed to the PET model (°C).
    pub temp_pet: f64,
    /// Temperature fed to the snow model (°C).
    pub temp_snow: f64,
    /// Minimum temperature (°C).
    pub tmin: f64,
    /// Maximum temperature (°C).
    pub tmax: f64,
    /// Precipitation, relative.
    pub precip: f64,
    /// Observed streamflow, relative.
    pub streamflow: f64,
    /// Observed PET (mm).
    pub pet: f64,
}

impl Default for Uncertainties {
    fn default() -> Self {
        Self {
            temp_pet: 2.0,
            temp_snow: 2.0,
            tmin: 2.0,
            tmax: 2.0,
            precip: 0.5,
            streamflow: 0.1,
            pet: 0.2,
        }
    }
}

/// Configuration of an ensemble run with sequential assimilation.
#[derive(Debug, Clone, PartialEq)]
pub struct EnsembleConfig {
    members: usize,
    period: usize,
    uncertainties: Uncertainties,
    reservoirs: Vec<String>,
    seed: Option<u64>,
}

impl EnsembleConfig {
    /// `members` realizations, assimilating every step, updating the stores
    /// named in `reservoirs`.
    pub fn new<S: Into<String>>(members: usize, reservoirs: impl IntoIterator<Item = S>) -> Self {
        Self {
            members,
            period: 1,
            uncertainties: Uncertainties::default(),
            reservoirs: reservoirs.into_iter().map(Into::into).collect(),
            seed: None,
        }
    }

    /// Assimilate every `period` steps.
    pub fn with_period(mut self, period: usize) -> Self {
        self.period = period;
        self
    }

    /// Set the perturbation magnitudes.
    pub fn with_uncertainties(mut self, uncertainties: Uncertainties) -> Self {
        self.uncertainties = uncertainties;
        self
    }

    /// Sets the RNG seed for reproducibility.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Number of members.
    pub fn members(&self) -> usize {
        self.members
    }

    /// Assimilation period in steps.
    pub fn period(&self) -> usize {
        self.period
    }

    /// Perturbation magnitudes.
    pub fn uncertainties(&self) -> &Uncertainties {
        &self.uncertainties
    }

    /// Stores corrected by the filter.
    pub fn reservoirs(&self) -> &[String] {
        &self.reservoirs
    }

    /// Returns the RNG seed, if set.
    pub fn seed(&self) -> Option<u64> {
        self.seed
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`AssimilationError::TooFewMembers`] when `members < 2`, or
    /// [`AssimilationError::InvalidConfig`] for a zero period, an empty
    /// reservoir list, or a negative or non-finite uncertainty.
    pub fn validate(&self) -> Result<(), AssimilationError> {
        if self.members < 2 {
            return Err(AssimilationError::TooFewMembers { got: self.members });
        }
        if self.period == 0 {
            return Err(AssimilationError::InvalidConfig {
                reason: "assimilation period must be >= 1".into(),
            });
        }
        if self.reservoirs.is_empty() {
            return Err(AssimilationError::InvalidConfig {
                reason: "no reservoir to update".into(),
            });
        }
        let u = &self.uncertainties;
        for (name, v) in [
            ("temp_pet", u.temp_pet),
            ("temp_snow", u.temp_snow),
            ("tmin", u.tmin),
            ("tmax", u.tmax),
            ("precip", u.precip),
            ("streamflow", u.streamflow),
            ("pet", u.pet),
        ] {
            if !v.is_finite() || v < 0.0 {
                return Err(AssimilationError::InvalidConfig {
                    reason: format!("uncertainty {name} must be finite and >= 0, got {v}"),
                });
            }
        }
        Ok(())
    }
}
