//! Error types for hoopla-data.

use std::path::PathBuf;

use hoopla_calendar::CalendarError;

/// Error type for all fallible operations in the hoopla-data crate.
#[derive(Debug, thiserror::Error)]
pub enum DataError {
    /// Returned when a required file does not exist on disk.
    #[error("file not found: {}", path.display())]
    FileNotFound {
        /// Path that could not be found.
        path: PathBuf,
    },

    /// Returned when a file cannot be read.
    #[error("failed to read {}: {reason}", path.display())]
    Read {
        /// Path of the file.
        path: PathBuf,
        /// Description of the underlying I/O failure.
        reason: String,
    },

    /// Returned when a JSON document does not match the expected layout.
    #[error("invalid JSON in {}: {reason}", path.display())]
    Json {
        /// Path of the file.
        path: PathBuf,
        /// Description of the parse failure.
        reason: String,
    },

    /// Returned when one or more validation checks fail.
    #[error("{count} validation error(s): {details}")]
    Validation {
        /// Number of accumulated validation failures.
        count: usize,
        /// Human-readable summary of the failures.
        details: String,
    },

    /// Returned when a requested date window is not covered by the data.
    #[error("window {begin} .. {end} is outside the available period {first} .. {last}")]
    OutOfPeriod {
        /// Requested first date.
        begin: String,
        /// Requested last date.
        end: String,
        /// First available date.
        first: String,
        /// Last available date.
        last: String,
    },

    /// Returned when consecutive dates are not one time step apart.
    #[error("dates at index {index} are not {hours} h apart")]
    IrregularTimeStep {
        /// Index of the later of the two dates.
        index: usize,
        /// Expected spacing in hours.
        hours: u32,
    },

    /// Returned when a forecast horizon exceeds what the meteorological
    /// forecast provides.
    #[error("forecast horizon {requested} exceeds the meteorological horizon {available}")]
    HorizonTooLong {
        /// Requested number of lead times.
        requested: usize,
        /// Lead times available in the meteorological forecast.
        available: usize,
    },

    /// Wraps an error originating from the hoopla-calendar crate.
    #[error(transparent)]
    Calendar(#[from] CalendarError),
}
