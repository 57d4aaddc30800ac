//! Error types for hoopla-models.

use hoopla_data::Field;

/// Error type for model preparation and stepping.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ModelError {
    /// Returned when a parameter vector has the wrong length.
    #[error("{model}: expected {expected} parameters, got {got}")]
    ParameterCount {
        /// Model name.
        model: &'static str,
        /// Number of parameters the model takes.
        expected: usize,
        /// Number of parameters supplied.
        got: usize,
    },

    /// Returned when a parameter value is outside the model's domain.
    #[error("{model}: invalid parameter {name} = {value}: {reason}")]
    InvalidParameter {
        /// Model name.
        model: &'static str,
        /// Parameter name.
        name: &'static str,
        /// Offending value.
        value: f64,
        /// Why it is rejected.
        reason: &'static str,
    },

    /// Returned when a state record was not prepared by the stepping model,
    /// or its shape has been altered.
    #[error("{model}: state prepared by {state_model} cannot be stepped ({reason})")]
    StateMismatch {
        /// Model asked to step.
        model: &'static str,
        /// Model recorded in the state.
        state_model: String,
        /// Detail.
        reason: String,
    },

    /// Returned when a named store does not exist in a state.
    #[error("{model}: no store named {name:?}")]
    UnknownStore {
        /// Model that owns the state.
        model: String,
        /// Requested store name.
        name: String,
    },

    /// Returned when an input array required by the model is absent or has
    /// the wrong length.
    #[error("{model}: input {field} is missing or has the wrong length")]
    MissingInput {
        /// Model name.
        model: &'static str,
        /// Missing field.
        field: Field,
    },

    /// Returned when hyper-parameters are inconsistent.
    #[error("{model}: invalid hyper-parameters: {reason}")]
    InvalidHyperParameters {
        /// Model name.
        model: &'static str,
        /// Description of the problem.
        reason: String,
    },

    /// Returned when a data-assimilation update cannot be computed.
    #[error("{model}: assimilation failed: {reason}")]
    Assimilation {
        /// Assimilation model name.
        model: &'static str,
        /// Description of the failure.
        reason: String,
    },
}
