//! The calibration engine: optimizer, objective score and simulator.

use std::str::FromStr;

use hoopla_calendar::find_non_winter_indexes;
use hoopla_data::ParameterBounds;
use hoopla_simulation::{SimulationError, Simulator};
use tracing::{debug, info, warn};

use crate::dds::{self, DdsConfig, DynamicallyDimensionedSearch};
use crate::error::CalibrationError;
use crate::optimizer::Optimizer;
use crate::sce::{self, SceConfig, ShuffledComplexEvolution};
use crate::score::Score;

/// Below this streamflow coverage a calibration is flagged as unreliable.
const MIN_COVERAGE: f64 = 0.25;

/// Optimizer choice and its settings.
#[derive(Debug, Clone, PartialEq)]
pub enum OptimizerKind {
    Sce(SceConfig),
    Dds(DdsConfig),
}

impl OptimizerKind {
    /// Optimizer name.
    pub fn name(&self) -> &'static str {
        match self {
            OptimizerKind::Sce(_) => sce::NAME,
            OptimizerKind::Dds(_) => dds::NAME,
        }
    }

    fn validate(&self) -> Result<(), CalibrationError> {
        match self {
            OptimizerKind::Sce(c) => c.validate(),
            OptimizerKind::Dds(c) => c.validate(),
        }
    }

    fn build(&self, bounds: ParameterBounds) -> Result<Box<dyn Optimizer>, CalibrationError> {
        Ok(match self {
            OptimizerKind::Sce(c) => Box::new(ShuffledComplexEvolution::new(c.clone(), bounds)?),
            OptimizerKind::Dds(c) => {
                Box::new(DynamicallyDimensionedSearch::new(c.clone(), bounds)?)
            }
        })
    }
}

impl FromStr for OptimizerKind {
    type Err = CalibrationError;

    /// `"SCE"` or `"DDS"` with default settings.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            sce::NAME => Ok(OptimizerKind::Sce(SceConfig::new())),
            dds::NAME => Ok(OptimizerKind::Dds(DdsConfig::new())),
            other => Err(CalibrationError::UnknownOptimizer {
                name: other.to_string(),
            }),
        }
    }
}

/// What to optimise and how.
#[derive(Debug, Clone, PartialEq)]
pub struct CalibrationConfig {
    score: Score,
    optimizer: OptimizerKind,
    remove_winter: bool,
}

impl CalibrationConfig {
    /// Scores with `score`, searching with `optimizer`, over every step.
    pub fn new(score: Score, optimizer: OptimizerKind) -> Self {
        Self {
            score,
            optimizer,
            remove_winter: false,
        }
    }

    /// Parses score and optimizer names.
    ///
    /// # Errors
    ///
    /// Returns [`CalibrationError::UnknownScore`] or
    /// [`CalibrationError::UnknownOptimizer`].
    pub fn from_names(score: &str, optimizer: &str) -> Result<Self, CalibrationError> {
        Ok(Self::new(score.parse()?, optimizer.parse()?))
    }

    /// Excludes December to March from the score.
    pub fn with_remove_winter(mut self, remove_winter: bool) -> Self {
        self.remove_winter = remove_winter;
        self
    }

    /// Replaces the optimizer settings.
    pub fn with_optimizer(mut self, optimizer: OptimizerKind) -> Self {
        self.optimizer = optimizer;
        self
    }

    /// Returns the score being optimised.
    pub fn score(&self) -> Score {
        self.score
    }

    /// Returns the optimizer settings.
    pub fn optimizer(&self) -> &OptimizerKind {
        &self.optimizer
    }

    /// Returns whether winter months are excluded from the score.
    pub fn remove_winter(&self) -> bool {
        self.remove_winter
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`CalibrationError::ScoreNotImplemented`] for a placeholder
    /// score or the optimizer's configuration error.
    pub fn validate(&self) -> Result<(), CalibrationError> {
        self.score.ensure_implemented()?;
        self.optimizer.validate()
    }
}

/// Outcome of a calibration.
#[derive(Debug, Clone, PartialEq)]
pub struct CalibrationResult {
    /// Best parameter vector found.
    pub best_params: Vec<f64>,
    /// Raw score of the best parameters (not the minimised objective).
    pub best_score: f64,
    /// Streamflow simulated with the best parameters over the full window.
    pub simulated: Vec<f64>,
    /// Objective evaluations spent.
    pub n_evaluations: usize,
    /// Optimizer name.
    pub optimizer: &'static str,
    /// Score that was optimised.
    pub score: Score,
}

/// Calibrates a [`Simulator`] against its observed streamflow.
#[derive(Debug)]
pub struct Calibrator<'a> {
    simulator: &'a Simulator,
    bounds: ParameterBounds,
    config: CalibrationConfig,
    /// Steps entering the score.
    scored: Vec<usize>,
    observed: Vec<f64>,
}

impl<'a> Calibrator<'a> {
    /// Prepares a calibration. Every configuration problem is reported
    /// here, before any simulation runs.
    ///
    /// # Errors
    ///
    /// - [`CalibrationError::ScoreNotImplemented`] or
    ///   [`CalibrationError::InvalidConfig`] for the configuration.
    /// - [`CalibrationError::BoundsMismatch`] when `bounds` does not cover
    ///   the simulator's parameter vector.
    /// - [`CalibrationError::NoObservations`] when no observed streamflow
    ///   falls in the scored steps.
    pub fn new(
        simulator: &'a Simulator,
        bounds: ParameterBounds,
        config: CalibrationConfig,
    ) -> Result<Self, CalibrationError> {
        config.validate()?;
        if bounds.len() != simulator.n_params() {
            return Err(CalibrationError::BoundsMismatch {
                expected: simulator.n_params(),
                got: bounds.len(),
            });
        }

        let obs = simulator.observations();
        let scored: Vec<usize> = if config.remove_winter {
            find_non_winter_indexes(obs.dates())
        } else {
            (0..obs.len()).collect()
        };
        let observed: Vec<f64> = scored.iter().map(|&i| obs.streamflow()[i]).collect();
        let available = observed.iter().filter(|q| !q.is_nan()).count();
        if available == 0 {
            return Err(CalibrationError::NoObservations);
        }
        let coverage = available as f64 / observed.len() as f64;
        if coverage < MIN_COVERAGE {
            warn!(
                coverage = format!("{:.0}%", coverage * 100.0),
                "little observed streamflow, calibration may be unreliable"
            );
        }
        debug!(scored = scored.len(), available, "scoring window prepared");

        Ok(Self {
            simulator,
            bounds,
            config,
            scored,
            observed,
        })
    }

    /// Raw score of a full-length simulated series.
    ///
    /// # Errors
    ///
    /// Returns [`CalibrationError::ScoreNotImplemented`] for placeholders.
    pub fn score(&self, simulated: &[f64]) -> Result<f64, CalibrationError> {
        let sim: Vec<f64> = self
            .scored
            .iter()
            .map(|&i| simulated.get(i).copied().unwrap_or(f64::NAN))
            .collect();
        self.config.score.evaluate(&self.observed, &sim)
    }

    /// Objective of one candidate; parameter values a model rejects score
    /// `+inf` so the search moves away from them.
    fn objective(&self, params: &[f64]) -> Result<f64, CalibrationError> {
        match self.simulator.simulate(params) {
            Ok(q) => Ok(self.config.score.objective(self.score(&q)?)),
            Err(SimulationError::Model(e)) => {
                debug!(error = %e, "candidate rejected by the model");
                Ok(f64::INFINITY)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Runs the optimizer to completion and re-simulates the best
    /// parameters.
    ///
    /// # Errors
    ///
    /// Returns simulation errors not attributable to a candidate, or
    /// [`CalibrationError::NoEvaluation`] if the optimizer proposed nothing.
    #[tracing::instrument(skip_all, fields(score = %self.config.score, optimizer = self.config.optimizer.name()))]
    pub fn calibrate(&self) -> Result<CalibrationResult, CalibrationError> {
        let mut optimizer = self.config.optimizer.build(self.bounds.clone())?;
        info!(params = self.bounds.len(), "calibration started");

        while let Some(candidate) = optimizer.propose() {
            let objective = self.objective(&candidate)?;
            optimizer.observe(candidate, objective);
        }

        let name = optimizer.name();
        let (best, _) = optimizer
            .best()
            .ok_or(CalibrationError::NoEvaluation { optimizer: name })?;
        let best_params = best.to_vec();
        let simulated = self.simulator.simulate(&best_params)?;
        let best_score = self.score(&simulated)?;
        info!(
            best_score,
            evaluations = optimizer.n_evaluations(),
            "calibration finished"
        );

        Ok(CalibrationResult {
            best_params,
            best_score,
            simulated,
            n_evaluations: optimizer.n_evaluations(),
            optimizer: name,
            score: self.config.score,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn optimizer_names_parse() {
        assert!(matches!("SCE".parse::<OptimizerKind>(), Ok(OptimizerKind::Sce(_))));
        assert!(matches!("DDS".parse::<OptimizerKind>(), Ok(OptimizerKind::Dds(_))));
        assert!(matches!(
            "sce".parse::<OptimizerKind>(),
            Err(CalibrationError::UnknownOptimizer { .. })
        ));
    }

    #[test]
    fn from_names_reports_unknown_score_first() {
        let err = CalibrationConfig::from_names("KGE", "PSO").unwrap_err();
        assert!(matches!(err, CalibrationError::UnknownScore { .. }));
    }

    #[test]
    fn placeholder_score_fails_validation() {
        let config = CalibrationConfig::from_names("KGEm", "DDS").unwrap();
        assert!(matches!(
            config.validate(),
            Err(CalibrationError::ScoreNotImplemented { name: "KGEm" })
        ));
    }
}
