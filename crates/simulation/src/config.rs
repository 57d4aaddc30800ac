//! Run configuration resolved once before a simulation starts.

use hoopla_assimilation::EnsembleConfig;
use hoopla_calendar::TimeStep;
use hoopla_data::WarmUp;
use hoopla_models::SnowHyperParameters;

use crate::error::SimulationError;

/// Where evapotranspiration comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PetSource {
    /// The `pet` series of the observations.
    Observed,
    /// Computed once per run by the PET model.
    #[default]
    Computed,
}

/// Values of the snow model parameters.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum SnowParams {
    /// The model's defaults for the time step.
    #[default]
    Default,
    /// Fixed values.
    Fixed(Vec<f64>),
    /// Appended to the rainfall-runoff parameters and calibrated with them.
    Calibrated,
}

/// How precipitation reaches the rainfall-runoff model.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum SnowRouting {
    /// Precipitation is fed directly.
    #[default]
    RainOnly,
    /// Precipitation goes through the snow model first; its runoff depth
    /// is the rainfall-runoff input.
    SnowThenRain {
        /// Catchment description of the snow model.
        hyper: SnowHyperParameters,
        /// Parameter values.
        params: SnowParams,
    },
}

/// Deterministic or ensemble run.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum RunMode {
    /// One realization from the observed forcing.
    #[default]
    Deterministic,
    /// Perturbed members corrected by data assimilation.
    Ensemble(EnsembleConfig),
}

/// Immutable description of a run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    time_step: TimeStep,
    pet: PetSource,
    snow: SnowRouting,
    warm_up: Option<WarmUp>,
    mode: RunMode,
}

impl RunConfig {
    /// A deterministic rain-only run with computed PET and no warm-up.
    pub fn new(time_step: TimeStep) -> Self {
        Self {
            time_step,
            pet: PetSource::default(),
            snow: SnowRouting::default(),
            warm_up: None,
            mode: RunMode::default(),
        }
    }

    /// Set the PET source.
    pub fn with_pet_source(mut self, pet: PetSource) -> Self {
        self.pet = pet;
        self
    }

    /// Set the snow routing.
    pub fn with_snow(mut self, snow: SnowRouting) -> Self {
        self.snow = snow;
        self
    }

    /// Initialise states by simulating `warm_up` first.
    pub fn with_warm_up(mut self, warm_up: WarmUp) -> Self {
        self.warm_up = Some(warm_up);
        self
    }

    /// Set the run mode.
    pub fn with_mode(mut self, mode: RunMode) -> Self {
        self.mode = mode;
        self
    }

    /// Time step of the observations.
    pub fn time_step(&self) -> TimeStep {
        self.time_step
    }

    /// PET source.
    pub fn pet_source(&self) -> PetSource {
        self.pet
    }

    /// Snow routing.
    pub fn snow(&self) -> &SnowRouting {
        &self.snow
    }

    /// Warm-up forcing, if any.
    pub fn warm_up(&self) -> Option<&WarmUp> {
        self.warm_up.as_ref()
    }

    /// Run mode.
    pub fn mode(&self) -> &RunMode {
        &self.mode
    }

    /// Validates the parts that do not depend on the models.
    ///
    /// # Errors
    ///
    /// Returns [`SimulationError::InvalidConfig`] for a warm-up at another
    /// time step, or the error of an invalid ensemble configuration.
    pub fn validate(&self) -> Result<(), SimulationError> {
        if let Some(w) = &self.warm_up {
            w.series()
                .ensure_time_step(self.time_step)
                .map_err(|e| SimulationError::InvalidConfig {
                    reason: format!("warm-up: {e}"),
                })?;
        }
        if let RunMode::Ensemble(e) = &self.mode {
            e.validate()?;
        }
        Ok(())
    }
}

/// Settings of the forecast loop.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ForecastConfig {
    issue_hour: Option<u32>,
}

impl ForecastConfig {
    /// Issue at every step the forecast provides.
    pub fn new() -> Self {
        Self::default()
    }

    /// Only issue at steps starting at `hour` (0-23).
    pub fn with_issue_hour(mut self, hour: u32) -> Self {
        self.issue_hour = Some(hour);
        self
    }

    /// Issuance hour filter.
    pub fn issue_hour(&self) -> Option<u32> {
        self.issue_hour
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`SimulationError::InvalidConfig`] for an hour above 23.
    pub fn validate(&self) -> Result<(), SimulationError> {
        match self.issue_hour {
            Some(h) if h > 23 => Err(SimulationError::InvalidConfig {
                reason: format!("issue hour {h} must lie in 0..=23"),
            }),
            _ => Ok(()),
        }
    }
}
