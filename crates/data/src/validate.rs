//! Accumulated validation utilities.
//!
//! Provides [`ValidationCollector`] for gathering multiple validation errors
//! into a single [`DataError::Validation`], plus standalone helpers that check
//! common invariants on forcing arrays.

use chrono::NaiveDateTime;

use crate::error::DataError;

// ---------------------------------------------------------------------------
// ValidationCollector
// ---------------------------------------------------------------------------

/// Accumulates validation errors and converts them into a single
/// [`DataError::Validation`].
#[derive(Debug, Default)]
pub(crate) struct ValidationCollector {
    errors: Vec<String>,
}

impl ValidationCollector {
    /// Create an empty collector.
    pub(crate) fn new() -> Self {
        Self { errors: Vec::new() }
    }

    /// Record one validation error.
    pub(crate) fn push(&mut self, msg: impl Into<String>) {
        self.errors.push(msg.into());
    }

    /// Move every error of `other` into this collector.
    pub(crate) fn merge(&mut self, other: ValidationCollector) {
        self.errors.extend(other.errors);
    }

    /// Returns `true` when no errors have been recorded.
    #[cfg(test)]
    pub(crate) fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Returns the number of recorded errors.
    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.errors.len()
    }

    /// Consume the collector and return `Ok(())` if no errors were recorded,
    /// or `Err(DataError::Validation { count, details })` otherwise.
    ///
    /// The `details` string joins all messages with `"; "`.
    pub(crate) fn finish(self) -> Result<(), DataError> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(DataError::Validation {
                count: self.errors.len(),
                details: self.errors.join("; "),
            })
        }
    }
}

// ---------------------------------------------------------------------------
// Standalone validation helpers
// ---------------------------------------------------------------------------

/// Check that every named array length equals `expected`.
pub(crate) fn validate_lengths(expected: usize, arrays: &[(&str, Option<usize>)]) -> ValidationCollector {
    let mut c = ValidationCollector::new();
    for &(name, len) in arrays {
        if let Some(len) = len
            && len != expected
        {
            c.push(format!("{name} length {len} != dates length {expected}"));
        }
    }
    c
}

/// Check that every precipitation value is non-negative.
///
/// NaN is not negative and passes; missing forcing is caught by the models.
pub(crate) fn validate_precip_non_negative(precip: &[f64]) -> ValidationCollector {
    let mut c = ValidationCollector::new();
    for (i, &val) in precip.iter().enumerate() {
        if val < 0.0 {
            c.push(format!("negative precipitation at index {i}: {val}"));
        }
    }
    c
}

/// Check that `tmin[i] <= tmax[i]` for every index.
pub(crate) fn validate_temp_ordering(tmin: &[f64], tmax: &[f64]) -> ValidationCollector {
    let mut c = ValidationCollector::new();
    for (i, (&lo, &hi)) in tmin.iter().zip(tmax.iter()).enumerate() {
        if lo > hi {
            c.push(format!("tmin ({lo}) > tmax ({hi}) at index {i}"));
        }
    }
    c
}

/// Check that dates are strictly increasing.
pub(crate) fn validate_dates_increasing(dates: &[NaiveDateTime]) -> ValidationCollector {
    let mut c = ValidationCollector::new();
    for (i, w) in dates.windows(2).enumerate() {
        if w[1] <= w[0] {
            c.push(format!(
                "dates not strictly increasing at index {}: {} after {}",
                i + 1,
                w[1],
                w[0]
            ));
        }
    }
    c
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn day(d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2000, 1, d)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    #[test]
    fn collector_empty_is_ok() {
        let c = ValidationCollector::new();
        assert!(c.is_empty());
        assert!(c.finish().is_ok());
    }

    #[test]
    fn collector_merge_counts_both() {
        let mut a = ValidationCollector::new();
        a.push("one");
        let mut b = ValidationCollector::new();
        b.push("two");
        a.merge(b);
        assert_eq!(a.len(), 2);
        match a.finish().unwrap_err() {
            DataError::Validation { count, details } => {
                assert_eq!(count, 2);
                assert_eq!(details, "one; two");
            }
            other => panic!("expected DataError::Validation, got {other:?}"),
        }
    }

    #[test]
    fn lengths_skip_absent_arrays() {
        let c = validate_lengths(3, &[("precip", Some(3)), ("tmin", None)]);
        assert!(c.is_empty());
    }

    #[test]
    fn lengths_mismatches_produce_errors() {
        let c = validate_lengths(3, &[("precip", Some(2)), ("temp", Some(4))]);
        assert_eq!(c.len(), 2);
        let err = c.finish().unwrap_err().to_string();
        assert!(err.contains("precip length 2 != dates length 3"));
        assert!(err.contains("temp length 4 != dates length 3"));
    }

    #[test]
    fn precip_negatives_produce_errors() {
        let c = validate_precip_non_negative(&[1.0, -0.5, f64::NAN, -1.2]);
        assert_eq!(c.len(), 2);
    }

    #[test]
    fn temps_violations_produce_errors() {
        let c = validate_temp_ordering(&[15.0, 25.0, 5.0], &[30.0, 20.0, 5.0]);
        assert_eq!(c.len(), 1);
        assert!(
            c.finish()
                .unwrap_err()
                .to_string()
                .contains("tmin (25) > tmax (20) at index 1")
        );
    }

    #[test]
    fn dates_must_increase() {
        assert!(validate_dates_increasing(&[day(1), day(2), day(3)]).is_empty());
        assert_eq!(validate_dates_increasing(&[day(1), day(1), day(3), day(2)]).len(), 2);
    }
}
