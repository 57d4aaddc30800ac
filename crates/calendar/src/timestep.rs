//! Supported model time steps.

use std::fmt;
use std::str::FromStr;

use chrono::TimeDelta;

use crate::error::CalendarError;

/// Days in the 365-day year used for slot arithmetic.
pub(crate) const DAYS_PER_YEAR: usize = 365;

/// Number of years of daily history the warm-up wants. The same count of
/// timesteps (365 x 8) is used for 3-hourly runs, where it spans one year.
const WARM_UP_FACTOR: usize = 8;

/// Temporal resolution of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimeStep {
    /// Three-hourly forcing ("3h").
    ThreeHourly,
    /// Daily forcing ("24h").
    Daily,
}

impl TimeStep {
    /// Length of one timestep in hours.
    pub fn hours(self) -> u32 {
        match self {
            TimeStep::ThreeHourly => 3,
            TimeStep::Daily => 24,
        }
    }

    /// Length of one timestep as a [`TimeDelta`].
    pub fn duration(self) -> TimeDelta {
        TimeDelta::hours(i64::from(self.hours()))
    }

    /// Number of timesteps per day.
    pub fn steps_per_day(self) -> usize {
        (24 / self.hours()) as usize
    }

    /// Number of timesteps in a 365-day year.
    pub fn steps_per_year(self) -> usize {
        DAYS_PER_YEAR * self.steps_per_day()
    }

    /// Number of timesteps of history required before the first simulated
    /// step for the warm-up to use observations directly.
    ///
    /// This is `365 * 8` regardless of resolution: eight years of daily data,
    /// or a single year of 3-hourly data.
    pub fn warm_up_steps(self) -> usize {
        DAYS_PER_YEAR * WARM_UP_FACTOR
    }

    /// Label used in configuration files.
    pub fn label(self) -> &'static str {
        match self {
            TimeStep::ThreeHourly => "3h",
            TimeStep::Daily => "24h",
        }
    }
}

impl FromStr for TimeStep {
    type Err = CalendarError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "3h" => Ok(TimeStep::ThreeHourly),
            "24h" => Ok(TimeStep::Daily),
            other => Err(CalendarError::InvalidTimeStep {
                value: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for TimeStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
