//! Fractional day-of-year and year-slot arithmetic.

use chrono::{Datelike, NaiveDateTime, Timelike};

use crate::error::CalendarError;
use crate::timestep::TimeStep;

/// 0-based ordinal of 29 February in a leap year.
const FEB_29_ORDINAL0: u32 = 59;

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Fractional days elapsed since 1 January 00:00: 1 January 12:00 is
/// `0.5`, 31 December 00:00 is `364.0` (or `365.0` in leap years).
pub fn day_of_year(date: &NaiveDateTime) -> f64 {
    let seconds = f64::from(date.num_seconds_from_midnight());
    f64::from(date.ordinal0()) + seconds / SECONDS_PER_DAY
}

/// Position of `date` inside a 365-day year sampled at `step`.
///
/// Slots run from `0` (1 January, first timestep) to
/// `step.steps_per_year() - 1`. In leap years 29 February folds onto
/// 28 February so that every later day keeps the slot it has in common
/// years.
///
/// # Errors
///
/// Returns [`CalendarError::Misaligned`] when the time of day is not a
/// multiple of the time step.
pub fn year_slot(date: &NaiveDateTime, step: TimeStep) -> Result<usize, CalendarError> {
    let hours = step.hours();
    if date.minute() != 0 || date.second() != 0 || date.hour() % hours != 0 {
        return Err(CalendarError::Misaligned {
            date: date.format("%Y-%m-%d %H:%M:%S").to_string(),
            hours,
        });
    }

    let mut ordinal0 = date.ordinal0();
    if date.date().leap_year() && ordinal0 >= FEB_29_ORDINAL0 {
        ordinal0 -= 1;
    }
    let within_day = (date.hour() / hours) as usize;
    Ok(ordinal0 as usize * step.steps_per_day() + within_day)
}
