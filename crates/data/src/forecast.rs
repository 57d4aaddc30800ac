//! Meteorological forecast inputs aligned to an observation timeline.

use std::collections::HashMap;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::DataError;
use crate::nan;
use crate::observed::ObservationSeries;
use crate::validate::ValidationCollector;

/// Lead-time forcing of one meteorological member at one issuance.
///
/// Element `l` is the forcing of lead time `l + 1`, i.e. the step after the
/// issuance step when `l = 0`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MemberForcing {
    /// Precipitation per lead time.
    #[serde(with = "nan")]
    pub precip: Vec<f64>,
    /// Mean temperature per lead time.
    #[serde(with = "nan")]
    pub temp: Vec<f64>,
    /// Minimum temperature per lead time.
    #[serde(default, with = "nan::option")]
    pub tmin: Option<Vec<f64>>,
    /// Maximum temperature per lead time.
    #[serde(default, with = "nan::option")]
    pub tmax: Option<Vec<f64>>,
}

impl MemberForcing {
    /// Returns `true` if P and T are finite over the first `horizon` leads.
    pub fn is_complete(&self, horizon: usize) -> bool {
        let finite = |v: &[f64]| v.len() >= horizon && v[..horizon].iter().all(|x| x.is_finite());
        finite(&self.precip) && finite(&self.temp)
    }

    fn truncate(&mut self, horizon: usize) {
        self.precip.truncate(horizon);
        self.temp.truncate(horizon);
        if let Some(v) = self.tmin.as_mut() {
            v.truncate(horizon);
        }
        if let Some(v) = self.tmax.as_mut() {
            v.truncate(horizon);
        }
    }

    fn shortest(&self) -> usize {
        [
            Some(self.precip.len()),
            Some(self.temp.len()),
            self.tmin.as_ref().map(Vec::len),
            self.tmax.as_ref().map(Vec::len),
        ]
        .into_iter()
        .flatten()
        .min()
        .unwrap_or(0)
    }
}

/// One forecast issued at `issued`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ForecastIssuance {
    /// Issuance timestamp; must coincide with an observation step.
    pub issued: NaiveDateTime,
    /// Meteorological members.
    pub members: Vec<MemberForcing>,
}

/// A meteorological forecast file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ForecastRecord {
    /// Number of lead times the meteorological forecast provides.
    pub horizon: usize,
    /// Issuances in any order.
    pub issuances: Vec<ForecastIssuance>,
}

/// Forecast forcing placed on an observation timeline.
///
/// Step `i` holds the members issued at `dates[i]`, or nothing when no
/// forecast was issued then.
#[derive(Debug, Clone, PartialEq)]
pub struct MeteoForecast {
    horizon: usize,
    n_members: usize,
    slots: Vec<Option<Vec<MemberForcing>>>,
}

impl MeteoForecast {
    /// Aligns `record` onto `timeline`, keeping `horizon` lead times.
    ///
    /// Issuances not on the timeline are dropped.
    ///
    /// # Errors
    ///
    /// - [`DataError::HorizonTooLong`] if `horizon` is zero or exceeds the
    ///   meteorological horizon or the shortest member array.
    /// - [`DataError::Validation`] if issuances disagree on the member count,
    ///   an issuance has no member, or one timestamp is issued twice.
    pub fn align(
        timeline: &[NaiveDateTime],
        record: ForecastRecord,
        horizon: usize,
    ) -> Result<Self, DataError> {
        if horizon == 0 || horizon > record.horizon {
            return Err(DataError::HorizonTooLong {
                requested: horizon,
                available: record.horizon,
            });
        }

        let index: HashMap<NaiveDateTime, usize> =
            timeline.iter().enumerate().map(|(i, d)| (*d, i)).collect();
        let mut slots: Vec<Option<Vec<MemberForcing>>> = vec![None; timeline.len()];
        let mut n_members = None;
        let mut c = ValidationCollector::new();

        for mut issuance in record.issuances {
            let Some(&i) = index.get(&issuance.issued) else {
                debug!(issued = %issuance.issued, "forecast issuance outside the timeline");
                continue;
            };
            if issuance.members.is_empty() {
                c.push(format!("issuance {} has no member", issuance.issued));
                continue;
            }
            match n_members {
                None => n_members = Some(issuance.members.len()),
                Some(m) if m != issuance.members.len() => c.push(format!(
                    "issuance {} has {} members, expected {m}",
                    issuance.issued,
                    issuance.members.len()
                )),
                Some(_) => {}
            }
            for m in &mut issuance.members {
                let available = m.shortest();
                if available < horizon {
                    return Err(DataError::HorizonTooLong {
                        requested: horizon,
                        available,
                    });
                }
                m.truncate(horizon);
            }
            if slots[i].is_some() {
                c.push(format!("issuance {} appears twice", issuance.issued));
            }
            slots[i] = Some(issuance.members);
        }
        c.finish()?;

        Ok(Self {
            horizon,
            n_members: n_members.unwrap_or(0),
            slots,
        })
    }

    /// A single-member forecast equal to the observations that follow each
    /// step. Steps closer than `horizon` to the end of `series` get no
    /// issuance.
    ///
    /// # Errors
    ///
    /// Returns [`DataError::HorizonTooLong`] if `horizon` is zero or not
    /// shorter than the series.
    pub fn perfect(series: &ObservationSeries, horizon: usize) -> Result<Self, DataError> {
        let n = series.len();
        if horizon == 0 || horizon >= n {
            return Err(DataError::HorizonTooLong {
                requested: horizon,
                available: n.saturating_sub(1),
            });
        }
        let leads = |v: &[f64], i: usize| v[i + 1..=i + horizon].to_vec();
        let slots = (0..n)
            .map(|i| {
                (i + horizon < n).then(|| {
                    vec![MemberForcing {
                        precip: leads(series.precip(), i),
                        temp: leads(series.temp(), i),
                        tmin: series.tmin().map(|v| leads(v, i)),
                        tmax: series.tmax().map(|v| leads(v, i)),
                    }]
                })
            })
            .collect();
        Ok(Self {
            horizon,
            n_members: 1,
            slots,
        })
    }

    /// Number of lead times.
    pub fn horizon(&self) -> usize {
        self.horizon
    }

    /// Number of meteorological members.
    pub fn n_members(&self) -> usize {
        self.n_members
    }

    /// Number of timeline steps.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Returns `true` if the timeline is empty.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Members issued at step `i`, if any.
    pub fn issuance(&self, i: usize) -> Option<&[MemberForcing]> {
        self.slots.get(i)?.as_deref()
    }

    /// Number of steps with an issuance.
    pub fn n_issuances(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeDelta};

    fn timeline(n: usize) -> Vec<NaiveDateTime> {
        let start = NaiveDate::from_ymd_opt(2010, 5, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        (0..n).map(|i| start + TimeDelta::days(i as i64)).collect()
    }

    fn member(len: usize) -> MemberForcing {
        MemberForcing {
            precip: vec![1.0; len],
            temp: vec![10.0; len],
            tmin: None,
            tmax: None,
        }
    }

    #[test]
    fn align_places_issuances() {
        let t = timeline(5);
        let record = ForecastRecord {
            horizon: 4,
            issuances: vec![
                ForecastIssuance { issued: t[1], members: vec![member(4), member(4)] },
                ForecastIssuance { issued: t[3], members: vec![member(4), member(4)] },
            ],
        };
        let f = MeteoForecast::align(&t, record, 3).unwrap();
        assert_eq!(f.len(), 5);
        assert_eq!(f.n_members(), 2);
        assert_eq!(f.n_issuances(), 2);
        assert!(f.issuance(0).is_none());
        assert_eq!(f.issuance(1).unwrap()[0].precip.len(), 3);
    }

    #[test]
    fn align_rejects_long_horizon() {
        let t = timeline(3);
        let record = ForecastRecord { horizon: 2, issuances: vec![] };
        assert!(matches!(
            MeteoForecast::align(&t, record, 3),
            Err(DataError::HorizonTooLong { requested: 3, available: 2 })
        ));
    }

    #[test]
    fn align_rejects_inconsistent_members() {
        let t = timeline(3);
        let record = ForecastRecord {
            horizon: 2,
            issuances: vec![
                ForecastIssuance { issued: t[0], members: vec![member(2)] },
                ForecastIssuance { issued: t[1], members: vec![member(2), member(2)] },
            ],
        };
        assert!(matches!(
            MeteoForecast::align(&t, record, 2),
            Err(DataError::Validation { count: 1, .. })
        ));
    }

    #[test]
    fn perfect_forecast_copies_following_observations() {
        use crate::observed::ObservationRecord;
        let t = timeline(5);
        let series = ObservationSeries::new(ObservationRecord {
            latitude: 45.0,
            dates: t,
            precip: vec![0.0, 1.0, 2.0, 3.0, 4.0],
            temp: vec![5.0; 5],
            tmin: None,
            tmax: None,
            streamflow: vec![1.0; 5],
            pet: None,
        })
        .unwrap();
        let f = MeteoForecast::perfect(&series, 2).unwrap();
        assert_eq!(f.n_members(), 1);
        assert_eq!(f.n_issuances(), 3);
        assert_eq!(f.issuance(1).unwrap()[0].precip, vec![2.0, 3.0]);
        assert!(f.issuance(3).is_none());
        assert!(MeteoForecast::perfect(&series, 5).is_err());
    }

    #[test]
    fn incomplete_member_is_detected() {
        let mut m = member(3);
        assert!(m.is_complete(3));
        m.temp[2] = f64::NAN;
        assert!(!m.is_complete(3));
        assert!(m.is_complete(2));
    }
}
