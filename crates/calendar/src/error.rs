//! Error types for the hoopla-calendar crate.

/// Error type for all fallible operations in the hoopla-calendar crate.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CalendarError {
    /// Returned when a time-step label is not one of the supported steps.
    #[error("invalid time step: {value:?} (expected \"3h\" or \"24h\")")]
    InvalidTimeStep {
        /// The label that was provided.
        value: String,
    },

    /// Returned when a date does not fall on the model time-step grid.
    #[error("date {date} is not aligned to the {hours} h time step")]
    Misaligned {
        /// Formatted offending date.
        date: String,
        /// Time-step length in hours.
        hours: u32,
    },
}
