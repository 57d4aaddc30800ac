//! Observation series container.

use chrono::NaiveDateTime;
use hoopla_calendar::TimeStep;
use serde::{Deserialize, Serialize};

use crate::error::DataError;
use crate::field::Field;
use crate::nan;
use crate::validate::{self, ValidationCollector};

/// Raw observation arrays as stored on disk.
///
/// Missing streamflow values are `null` in JSON and `NaN` in memory.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ObservationRecord {
    /// Catchment latitude in degrees.
    pub latitude: f64,
    /// Timestamp of each step.
    pub dates: Vec<NaiveDateTime>,
    /// Precipitation per step (mm).
    pub precip: Vec<f64>,
    /// Mean temperature per step (°C).
    pub temp: Vec<f64>,
    /// Minimum temperature per step (°C).
    #[serde(default, with = "nan::option")]
    pub tmin: Option<Vec<f64>>,
    /// Maximum temperature per step (°C).
    #[serde(default, with = "nan::option")]
    pub tmax: Option<Vec<f64>>,
    /// Observed streamflow per step (mm).
    #[serde(with = "nan")]
    pub streamflow: Vec<f64>,
    /// Observed potential evapotranspiration per step (mm).
    #[serde(default, with = "nan::option")]
    pub pet: Option<Vec<f64>>,
}

/// Validated, time-indexed forcing and streamflow for one catchment.
///
/// All arrays share the date index. The series is read-only once built;
/// windows are extracted with [`crop`](Self::crop) and [`slice`](Self::slice).
#[derive(Debug, Clone, PartialEq)]
pub struct ObservationSeries {
    latitude: f64,
    dates: Vec<NaiveDateTime>,
    precip: Vec<f64>,
    temp: Vec<f64>,
    tmin: Option<Vec<f64>>,
    tmax: Option<Vec<f64>>,
    streamflow: Vec<f64>,
    pet: Option<Vec<f64>>,
}

impl ObservationSeries {
    /// Validates `record` and wraps it.
    ///
    /// # Errors
    ///
    /// Returns [`DataError::Validation`] listing every failed check:
    /// - the series is empty
    /// - array lengths differ from the number of dates
    /// - dates are not strictly increasing
    /// - precipitation is negative
    /// - `tmin > tmax` at any index
    /// - latitude is outside -90..=90
    pub fn new(record: ObservationRecord) -> Result<Self, DataError> {
        let n = record.dates.len();
        let mut c = ValidationCollector::new();

        if n == 0 {
            c.push("observation series is empty");
        }
        if !(-90.0..=90.0).contains(&record.latitude) {
            c.push(format!("latitude {} outside -90..=90", record.latitude));
        }

        let lengths = validate::validate_lengths(
            n,
            &[
                ("precip", Some(record.precip.len())),
                ("temp", Some(record.temp.len())),
                ("tmin", record.tmin.as_ref().map(Vec::len)),
                ("tmax", record.tmax.as_ref().map(Vec::len)),
                ("streamflow", Some(record.streamflow.len())),
                ("pet", record.pet.as_ref().map(Vec::len)),
            ],
        );
        c.merge(lengths);
        c.merge(validate::validate_dates_increasing(&record.dates));
        c.merge(validate::validate_precip_non_negative(&record.precip));
        if let (Some(lo), Some(hi)) = (&record.tmin, &record.tmax) {
            c.merge(validate::validate_temp_ordering(lo, hi));
        }
        c.finish()?;

        Ok(Self {
            latitude: record.latitude,
            dates: record.dates,
            precip: record.precip,
            temp: record.temp,
            tmin: record.tmin,
            tmax: record.tmax,
            streamflow: record.streamflow,
            pet: record.pet,
        })
    }

    /// Returns the number of time steps.
    pub fn len(&self) -> usize {
        self.dates.len()
    }

    /// Returns `true` if the series has no time steps.
    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    /// Catchment latitude in degrees.
    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    /// Timestamps.
    pub fn dates(&self) -> &[NaiveDateTime] {
        &self.dates
    }

    /// Precipitation.
    pub fn precip(&self) -> &[f64] {
        &self.precip
    }

    /// Mean temperature.
    pub fn temp(&self) -> &[f64] {
        &self.temp
    }

    /// Minimum temperature, if observed.
    pub fn tmin(&self) -> Option<&[f64]> {
        self.tmin.as_deref()
    }

    /// Maximum temperature, if observed.
    pub fn tmax(&self) -> Option<&[f64]> {
        self.tmax.as_deref()
    }

    /// Observed streamflow; `NaN` where missing.
    pub fn streamflow(&self) -> &[f64] {
        &self.streamflow
    }

    /// Observed potential evapotranspiration, if present.
    pub fn pet(&self) -> Option<&[f64]> {
        self.pet.as_deref()
    }

    /// First and last timestamps.
    pub fn period(&self) -> Option<(NaiveDateTime, NaiveDateTime)> {
        Some((*self.dates.first()?, *self.dates.last()?))
    }

    /// Returns `true` if the series carries `field`.
    pub fn has(&self, field: Field) -> bool {
        match field {
            Field::Tmin => self.tmin.is_some(),
            Field::Tmax => self.tmax.is_some(),
            Field::Pet => self.pet.is_some(),
            Field::Dates
            | Field::Precip
            | Field::Temp
            | Field::Latitude
            | Field::Streamflow => true,
        }
    }

    /// The subset of `fields` this series does not carry.
    pub fn missing_fields(&self, fields: &[Field]) -> Vec<Field> {
        fields.iter().copied().filter(|f| !self.has(*f)).collect()
    }

    /// Fraction of time steps with an observed (non-NaN) streamflow.
    pub fn streamflow_coverage(&self) -> f64 {
        if self.streamflow.is_empty() {
            return 0.0;
        }
        let observed = self.streamflow.iter().filter(|q| !q.is_nan()).count();
        observed as f64 / self.streamflow.len() as f64
    }

    /// Checks that consecutive dates are exactly one `step` apart.
    ///
    /// # Errors
    ///
    /// Returns [`DataError::IrregularTimeStep`] at the first gap.
    pub fn ensure_time_step(&self, step: TimeStep) -> Result<(), DataError> {
        let expected = step.duration();
        match self.dates.windows(2).position(|w| w[1] - w[0] != expected) {
            Some(i) => Err(DataError::IrregularTimeStep {
                index: i + 1,
                hours: step.hours(),
            }),
            None => Ok(()),
        }
    }

    /// Index of the first date at or after `date`.
    pub fn index_at_or_after(&self, date: NaiveDateTime) -> Option<usize> {
        let i = self.dates.partition_point(|d| *d < date);
        (i < self.dates.len()).then_some(i)
    }

    /// Sub-series covering the inclusive window `begin ..= end`.
    ///
    /// # Errors
    ///
    /// Returns [`DataError::OutOfPeriod`] if the window is empty, reversed,
    /// or not contained in the observed period.
    pub fn crop(&self, begin: NaiveDateTime, end: NaiveDateTime) -> Result<Self, DataError> {
        let out_of_period = || {
            let (first, last) = self.period().unzip();
            DataError::OutOfPeriod {
                begin: begin.to_string(),
                end: end.to_string(),
                first: first.map(|d| d.to_string()).unwrap_or_default(),
                last: last.map(|d| d.to_string()).unwrap_or_default(),
            }
        };

        let (first, last) = self.period().ok_or_else(out_of_period)?;
        if begin > end || begin < first || end > last {
            return Err(out_of_period());
        }
        let lo = self.dates.partition_point(|d| *d < begin);
        let hi = self.dates.partition_point(|d| *d <= end);
        if lo >= hi {
            return Err(out_of_period());
        }
        Ok(self.slice(lo..hi))
    }

    /// Sub-series over an index range. The range must be in bounds.
    pub fn slice(&self, range: std::ops::Range<usize>) -> Self {
        let cut = |v: &Vec<f64>| v[range.clone()].to_vec();
        Self {
            latitude: self.latitude,
            dates: self.dates[range.clone()].to_vec(),
            precip: cut(&self.precip),
            temp: cut(&self.temp),
            tmin: self.tmin.as_ref().map(cut),
            tmax: self.tmax.as_ref().map(cut),
            streamflow: cut(&self.streamflow),
            pet: self.pet.as_ref().map(cut),
        }
    }

    /// Copy of the series as a raw record.
    pub fn to_record(&self) -> ObservationRecord {
        ObservationRecord {
            latitude: self.latitude,
            dates: self.dates.clone(),
            precip: self.precip.clone(),
            temp: self.temp.clone(),
            tmin: self.tmin.clone(),
            tmax: self.tmax.clone(),
            streamflow: self.streamflow.clone(),
            pet: self.pet.clone(),
        }
    }
}

impl TryFrom<ObservationRecord> for ObservationSeries {
    type Error = DataError;

    fn try_from(record: ObservationRecord) -> Result<Self, Self::Error> {
        Self::new(record)
    }
}
