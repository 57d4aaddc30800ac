//! Warm-up window selection.
//!
//! The state of a run is initialised by simulating a period that precedes
//! the first reported step. When the observations do not reach far enough
//! back, a synthetic mean year is used instead and the state is no longer
//! continuous with the real history.

use chrono::NaiveDateTime;
use hoopla_calendar::{TimeStep, year_slot};
use hoopla_stats::mean;
use tracing::{info, warn};

use crate::error::DataError;
use crate::observed::{ObservationRecord, ObservationSeries};

/// Forcing used to warm up model states.
#[derive(Debug, Clone, PartialEq)]
pub enum WarmUp {
    /// The observed steps immediately preceding the run.
    Window(ObservationSeries),
    /// A synthetic climatological year ending just before the run.
    MeanYear(ObservationSeries),
}

impl WarmUp {
    /// Picks the warm-up forcing for a run starting at `begin`.
    ///
    /// Uses the last [`TimeStep::warm_up_steps`] observations before `begin`
    /// when that many exist. Otherwise builds a mean year from the whole of
    /// `full`.
    ///
    /// # Errors
    ///
    /// Returns [`DataError::OutOfPeriod`] if `begin` is after the last
    /// observation, or a calendar error if dates are not aligned to `step`.
    pub fn select(
        full: &ObservationSeries,
        begin: NaiveDateTime,
        step: TimeStep,
    ) -> Result<Self, DataError> {
        let start = full
            .index_at_or_after(begin)
            .ok_or_else(|| DataError::OutOfPeriod {
                begin: begin.to_string(),
                end: begin.to_string(),
                first: full.dates().first().map(|d| d.to_string()).unwrap_or_default(),
                last: full.dates().last().map(|d| d.to_string()).unwrap_or_default(),
            })?;

        let required = step.warm_up_steps();
        if start >= required {
            info!(steps = required, "warm-up on observed history");
            return Ok(WarmUp::Window(full.slice(start - required..start)));
        }

        warn!(
            available = start,
            required, "warm-up history too short, using a mean year; state continuity is lost"
        );
        Ok(WarmUp::MeanYear(mean_year(full, begin, step)?))
    }

    /// The forcing series, whichever variant was chosen.
    pub fn series(&self) -> &ObservationSeries {
        match self {
            WarmUp::Window(s) | WarmUp::MeanYear(s) => s,
        }
    }

    /// Returns `true` if the warm-up is continuous with the observations.
    pub fn is_continuous(&self) -> bool {
        matches!(self, WarmUp::Window(_))
    }
}

/// Per-slot means of one variable. Empty slots take the overall mean.
fn slot_means(slots: &[usize], values: &[f64], n_slots: usize) -> Vec<f64> {
    let mut sums = vec![0.0; n_slots];
    let mut counts = vec![0usize; n_slots];
    for (&s, &v) in slots.iter().zip(values) {
        if v.is_finite() {
            sums[s] += v;
            counts[s] += 1;
        }
    }
    let overall = mean(values);
    sums.iter()
        .zip(&counts)
        .map(|(&s, &c)| if c > 0 { s / c as f64 } else { overall })
        .collect()
}

fn mean_year(
    full: &ObservationSeries,
    begin: NaiveDateTime,
    step: TimeStep,
) -> Result<ObservationSeries, DataError> {
    let n = step.steps_per_year();
    let slots = full
        .dates()
        .iter()
        .map(|d| year_slot(d, step))
        .collect::<Result<Vec<_>, _>>()?;

    let dates: Vec<NaiveDateTime> = (1..=n)
        .rev()
        .map(|k| begin - step.duration() * k as i32)
        .collect();
    let target = dates
        .iter()
        .map(|d| year_slot(d, step))
        .collect::<Result<Vec<_>, _>>()?;

    let climatology = |values: &[f64]| {
        let by_slot = slot_means(&slots, values, n);
        target.iter().map(|&s| by_slot[s]).collect::<Vec<f64>>()
    };

    let record = ObservationRecord {
        latitude: full.latitude(),
        precip: climatology(full.precip()),
        temp: climatology(full.temp()),
        tmin: full.tmin().map(climatology),
        tmax: full.tmax().map(climatology),
        streamflow: climatology(full.streamflow()),
        pet: full.pet().map(climatology),
        dates,
    };
    ObservationSeries::new(record)
}
