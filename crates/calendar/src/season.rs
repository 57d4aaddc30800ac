//! Winter-month filtering for objective scores.

use chrono::{Datelike, NaiveDateTime};

/// Months excluded from scoring when winter removal is enabled
/// (December through March).
pub const WINTER_MONTHS: [u32; 4] = [12, 1, 2, 3];

/// Returns `true` if `month` (1..=12) is a winter month.
pub fn is_winter_month(month: u32) -> bool {
    WINTER_MONTHS.contains(&month)
}

/// Indices of the dates whose month is not a winter month, in input order.
pub fn find_non_winter_indexes(dates: &[NaiveDateTime]) -> Vec<usize> {
    dates
        .iter()
        .enumerate()
        .filter(|(_, d)| !is_winter_month(d.month()))
        .map(|(i, _)| i)
        .collect()
}
