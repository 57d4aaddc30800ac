//! Error types for hoopla-calibration.

use hoopla_simulation::SimulationError;

/// Error type for calibration.
#[derive(Debug, thiserror::Error)]
pub enum CalibrationError {
    /// Returned when a score name is not in the catalog.
    #[error("unknown score '{name}', available: {available}")]
    UnknownScore {
        /// Requested name.
        name: String,
        /// Comma-separated catalog.
        available: String,
    },

    /// Returned when a catalogued score has no implementation yet.
    #[error("score '{name}' is not implemented")]
    ScoreNotImplemented {
        /// Score name.
        name: &'static str,
    },

    /// Returned when an optimizer name is not known.
    #[error("unknown calibration method '{name}', expected 'SCE' or 'DDS'")]
    UnknownOptimizer {
        /// Requested name.
        name: String,
    },

    /// Returned when an optimizer setting is invalid.
    #[error("invalid {optimizer} configuration: {reason}")]
    InvalidConfig {
        /// Optimizer the setting belongs to.
        optimizer: &'static str,
        /// Description of the problem.
        reason: String,
    },

    /// Returned when the bounds do not match the simulated parameter vector.
    #[error("bounds have {got} parameters, the model chain expects {expected}")]
    BoundsMismatch {
        /// Parameters of the model chain.
        expected: usize,
        /// Parameters in the bounds.
        got: usize,
    },

    /// Returned when no observed streamflow is left to score against.
    #[error("no observed streamflow in the scoring period")]
    NoObservations,

    /// Returned when the optimizer finished without a single evaluation.
    #[error("optimizer {optimizer} made no evaluation")]
    NoEvaluation {
        /// Optimizer name.
        optimizer: &'static str,
    },

    /// Wraps an error originating from the hoopla-simulation crate.
    #[error(transparent)]
    Simulation(#[from] SimulationError),
}
