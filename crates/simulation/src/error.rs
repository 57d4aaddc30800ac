//! Error types for hoopla-simulation.

use hoopla_assimilation::AssimilationError;
use hoopla_data::{DataError, Field};
use hoopla_models::ModelError;

/// Error type for registry lookups and simulation runs.
#[derive(Debug, thiserror::Error)]
pub enum SimulationError {
    /// Returned when a model name is not registered.
    #[error("unknown {kind} model '{name}', available: {available}")]
    UnknownModel {
        /// Model kind (`rainfall-runoff`, `pet`, `snow`, `assimilation`).
        kind: &'static str,
        /// Requested name.
        name: String,
        /// Comma-separated registered names.
        available: String,
    },

    /// Returned when the observations lack fields an active model reads.
    #[error("observations lack {fields:?} required by {model}")]
    MissingInputs {
        /// Model that needs the fields.
        model: String,
        /// Absent fields.
        fields: Vec<Field>,
    },

    /// Returned when the run configuration and the model set disagree.
    #[error("invalid run configuration: {reason}")]
    InvalidConfig {
        /// Description of the problem.
        reason: String,
    },

    /// Returned when a parameter vector has the wrong length.
    #[error("expected {expected} parameters, got {got}")]
    ParameterCount {
        /// Number of parameters of the model chain.
        expected: usize,
        /// Number supplied.
        got: usize,
    },

    /// Returned when a forecast is not aligned to the simulated period.
    #[error("forecast covers {got} steps, simulation has {expected}")]
    ForecastMismatch {
        /// Number of simulated steps.
        expected: usize,
        /// Number of forecast timeline steps.
        got: usize,
    },

    /// Wraps an error originating from the hoopla-data crate.
    #[error(transparent)]
    Data(#[from] DataError),

    /// Wraps an error originating from the hoopla-models crate.
    #[error(transparent)]
    Model(#[from] ModelError),

    /// Wraps an error originating from the hoopla-assimilation crate.
    #[error(transparent)]
    Assimilation(#[from] AssimilationError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_unknown_model() {
        let err = SimulationError::UnknownModel {
            kind: "pet",
            name: "Hamon".into(),
            available: "Oudin".into(),
        };
        assert_eq!(err.to_string(), "unknown pet model 'Hamon', available: Oudin");
    }

    #[test]
    fn display_missing_inputs() {
        let err = SimulationError::MissingInputs {
            model: "CemaNeige".into(),
            fields: vec![Field::Temp],
        };
        assert_eq!(err.to_string(), "observations lack [Temp] required by CemaNeige");
    }

    #[test]
    fn display_parameter_count() {
        let err = SimulationError::ParameterCount { expected: 8, got: 6 };
        assert_eq!(err.to_string(), "expected 8 parameters, got 6");
    }

    #[test]
    fn from_model_error() {
        let err: SimulationError = ModelError::ParameterCount {
            model: "HydroMod1",
            expected: 6,
            got: 2,
        }
        .into();
        assert!(matches!(err, SimulationError::Model(_)));
    }

    #[test]
    fn error_is_send_sync_and_std_error() {
        fn assert_bounds<T: Send + Sync + std::error::Error>() {}
        assert_bounds::<SimulationError>();
    }
}
