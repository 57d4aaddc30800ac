//! Error types for hoopla-assimilation.

use hoopla_models::ModelError;

/// Error type for ensemble generation and assimilation.
#[derive(Debug, thiserror::Error)]
pub enum AssimilationError {
    /// Returned when the ensemble configuration is invalid.
    #[error("invalid ensemble configuration: {reason}")]
    InvalidConfig {
        /// Description of the problem.
        reason: String,
    },

    /// Returned when fewer than two members are supplied.
    #[error("an ensemble needs at least 2 members, got {got}")]
    TooFewMembers {
        /// Number of members supplied.
        got: usize,
    },

    /// Returned when per-member inputs disagree on the member count.
    #[error("{what}: expected {expected} members, got {got}")]
    MemberMismatch {
        /// Which input is inconsistent.
        what: &'static str,
        /// Number of member states.
        expected: usize,
        /// Number of values supplied.
        got: usize,
    },

    /// Returned when the innovation covariance cannot be inverted.
    #[error("innovation covariance {value} is singular")]
    SingularCovariance {
        /// Covariance value.
        value: f64,
    },

    /// Wraps an error originating from the hoopla-models crate.
    #[error(transparent)]
    Model(#[from] ModelError),
}

impl From<AssimilationError> for ModelError {
    fn from(e: AssimilationError) -> Self {
        match e {
            AssimilationError::Model(inner) => inner,
            other => ModelError::Assimilation {
                model: crate::enkf::NAME,
                reason: other.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_too_few_members() {
        let err = AssimilationError::TooFewMembers { got: 1 };
        assert_eq!(err.to_string(), "an ensemble needs at least 2 members, got 1");
    }

    #[test]
    fn display_member_mismatch() {
        let err = AssimilationError::MemberMismatch {
            what: "perturbed observations",
            expected: 10,
            got: 9,
        };
        assert_eq!(
            err.to_string(),
            "perturbed observations: expected 10 members, got 9"
        );
    }

    #[test]
    fn display_singular() {
        let err = AssimilationError::SingularCovariance { value: 0.0 };
        assert_eq!(err.to_string(), "innovation covariance 0 is singular");
    }

    #[test]
    fn into_model_error_keeps_model_errors() {
        let inner = ModelError::UnknownStore {
            model: "HydroMod1".into(),
            name: "X".into(),
        };
        let back: ModelError = AssimilationError::Model(inner.clone()).into();
        assert_eq!(back, inner);

        let wrapped: ModelError = AssimilationError::TooFewMembers { got: 1 }.into();
        assert!(matches!(wrapped, ModelError::Assimilation { .. }));
    }

    #[test]
    fn error_is_send_sync_and_std_error() {
        fn assert_bounds<T: Send + Sync + std::error::Error>() {}
        assert_bounds::<AssimilationError>();
    }
}
