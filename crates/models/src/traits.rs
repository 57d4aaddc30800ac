//! Contracts of the four pluggable model kinds.
//!
//! Engines only ever talk to models through these traits, so new variants
//! are added by implementing a trait and registering a factory. All traits
//! are object safe and `Send + Sync` so boxed models can be shared across
//! worker threads.

use chrono::NaiveDateTime;
use hoopla_calendar::TimeStep;
use hoopla_data::Field;

use crate::error::ModelError;
use crate::hyper::{PetHyperParameters, SnowHyperParameters};
use crate::state::{PetTerms, RunoffState, SnowState};

/// Forcing of one rainfall-runoff step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunoffInputs {
    /// Water reaching the soil: precipitation, or snow-model runoff (mm).
    pub precip: f64,
    /// Potential evapotranspiration (mm).
    pub pet: f64,
}

/// Forcing of one snow accounting step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SnowInputs {
    /// Total precipitation (mm).
    pub precip: f64,
    /// Mean temperature (°C).
    pub temp: f64,
    /// Minimum temperature (°C), if available.
    pub tmin: Option<f64>,
    /// Maximum temperature (°C), if available.
    pub tmax: Option<f64>,
}

/// Time series an evapotranspiration model is prepared from.
#[derive(Debug, Clone, Copy)]
pub struct PetInputs<'a> {
    /// Timestamps.
    pub dates: &'a [NaiveDateTime],
    /// Mean temperature (°C).
    pub temp: &'a [f64],
}

/// A conceptual rainfall-runoff model stepped one time step at a time.
pub trait RainfallRunoff: Send + Sync {
    /// Registry name.
    fn name(&self) -> &'static str;

    /// Observation fields the model reads directly.
    fn inputs(&self) -> &'static [Field];

    /// Names of the calibrated parameters, in vector order.
    fn parameter_names(&self) -> &'static [&'static str];

    /// Number of calibrated parameters.
    fn n_params(&self) -> usize {
        self.parameter_names().len()
    }

    /// Names of the scalar stores of the state.
    fn state_names(&self) -> &'static [&'static str];

    /// Builds the initial state for `params`.
    fn prepare(&self, params: &[f64]) -> Result<RunoffState, ModelError>;

    /// Advances `state` by one step and returns the simulated streamflow.
    ///
    /// Fails if `state` was not prepared by this model.
    fn run(
        &self,
        inputs: RunoffInputs,
        params: &[f64],
        state: &mut RunoffState,
    ) -> Result<f64, ModelError>;
}

/// A potential evapotranspiration model evaluated over a whole series.
pub trait Pet: Send + Sync {
    /// Registry name.
    fn name(&self) -> &'static str;

    /// Observation fields the model reads.
    fn inputs(&self) -> &'static [Field];

    /// Names of the non-series inputs.
    fn hyper_parameters(&self) -> &'static [&'static str];

    /// Precomputes the terms of the formula.
    fn prepare(
        &self,
        time_step: TimeStep,
        inputs: PetInputs<'_>,
        hyper: &PetHyperParameters,
    ) -> Result<PetTerms, ModelError>;

    /// Evapotranspiration per step (mm, never negative).
    fn run(&self, terms: &PetTerms) -> Result<Vec<f64>, ModelError>;
}

/// A snow accounting routine turning precipitation into runoff depth.
pub trait SnowAccounting: Send + Sync {
    /// Registry name.
    fn name(&self) -> &'static str;

    /// Observation fields the model reads. Optional fields are not listed.
    fn inputs(&self) -> &'static [Field];

    /// Names of the catchment descriptors the model uses.
    fn hyper_parameters(&self) -> &'static [&'static str];

    /// Names of the calibrated parameters, in vector order.
    fn parameter_names(&self) -> &'static [&'static str];

    /// Number of calibrated parameters.
    fn n_params(&self) -> usize {
        self.parameter_names().len()
    }

    /// Default parameter values used when snow parameters are not calibrated.
    fn default_parameters(&self, time_step: TimeStep) -> Vec<f64>;

    /// Builds the initial snow state.
    fn prepare(
        &self,
        params: &[f64],
        hyper: &SnowHyperParameters,
    ) -> Result<SnowState, ModelError>;

    /// Advances `state` by one step and returns the runoff depth (mm).
    fn run(
        &self,
        inputs: SnowInputs,
        params: &[f64],
        state: &mut SnowState,
    ) -> Result<f64, ModelError>;
}

/// What an assimilation step sees of one observation time.
#[derive(Debug, Clone, Copy)]
pub struct EnsembleObservation<'a> {
    /// Simulated streamflow per member.
    pub simulated: &'a [f64],
    /// Observed streamflow.
    pub observed: f64,
    /// Perturbed observation per member.
    pub perturbed: &'a [f64],
    /// Observation error draw per member.
    pub errors: &'a [f64],
}

/// Settings of a data-assimilation step.
#[derive(Debug, Clone, PartialEq)]
pub struct DaConfig {
    reservoirs: Vec<String>,
}

impl DaConfig {
    /// Update the stores called `reservoirs`.
    pub fn new<S: Into<String>>(reservoirs: impl IntoIterator<Item = S>) -> Self {
        Self {
            reservoirs: reservoirs.into_iter().map(Into::into).collect(),
        }
    }

    /// Names of the stores to update.
    pub fn reservoirs(&self) -> &[String] {
        &self.reservoirs
    }
}

/// A sequential data-assimilation scheme correcting member states in place.
pub trait DataAssimilation: Send + Sync {
    /// Registry name.
    fn name(&self) -> &'static str;

    /// Corrects `states` (one per member) against `observation`.
    fn run(
        &self,
        states: &mut [RunoffState],
        observation: &EnsembleObservation<'_>,
        config: &DaConfig,
    ) -> Result<(), ModelError>;
}
