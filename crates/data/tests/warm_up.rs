//! Integration test: warm-up selection at the history boundary.
//!
//! The required history is 365 x 8 timesteps for both resolutions, which is
//! eight years of daily data but a single year of 3-hourly data. These tests
//! pin both sides of that boundary for each resolution.

use chrono::{NaiveDate, NaiveDateTime};
use hoopla_calendar::TimeStep;
use hoopla_data::{ObservationRecord, ObservationSeries, WarmUp};

fn series(step: TimeStep, n: usize) -> ObservationSeries {
    let start = NaiveDate::from_ymd_opt(1990, 1, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap();
    let dates: Vec<NaiveDateTime> = (0..n).map(|i| start + step.duration() * i as i32).collect();
    ObservationSeries::new(ObservationRecord {
        latitude: 45.0,
        precip: (0..n).map(|i| (i % 7) as f64).collect(),
        temp: vec![8.0; n],
        tmin: None,
        tmax: None,
        streamflow: vec![1.0; n],
        pet: None,
        dates,
    })
    .unwrap()
}

fn check_boundary(step: TimeStep) {
    let required = step.warm_up_steps();
    let full = series(step, required + 10);

    let at = WarmUp::select(&full, full.dates()[required], step).unwrap();
    assert!(at.is_continuous(), "{step}: exactly enough history");
    assert_eq!(at.series().len(), required);
    assert_eq!(at.series().dates()[0], full.dates()[0]);
    assert_eq!(
        *at.series().dates().last().unwrap(),
        full.dates()[required - 1]
    );

    let short = WarmUp::select(&full, full.dates()[required - 1], step).unwrap();
    assert!(!short.is_continuous(), "{step}: one step short");
    assert_eq!(short.series().len(), step.steps_per_year());
    assert_eq!(
        *short.series().dates().last().unwrap() + step.duration(),
        full.dates()[required - 1]
    );
}

#[test]
fn daily_boundary() {
    check_boundary(TimeStep::Daily);
}

#[test]
fn three_hourly_boundary() {
    check_boundary(TimeStep::ThreeHourly);
}

#[test]
fn mean_year_averages_matching_slots() {
    let step = TimeStep::Daily;
    let full = series(step, 800);
    let begin = full.dates()[400];
    let warm = WarmUp::select(&full, begin, step).unwrap();
    let WarmUp::MeanYear(year) = warm else {
        panic!("expected a mean year");
    };
    assert_eq!(year.len(), 365);
    assert!(year.precip().iter().all(|p| p.is_finite() && *p >= 0.0));
    assert!(year.temp().iter().all(|t| (*t - 8.0).abs() < 1e-12));
}

#[test]
fn begin_after_last_observation_fails() {
    let step = TimeStep::Daily;
    let full = series(step, 10);
    let after = *full.dates().last().unwrap() + step.duration();
    assert!(WarmUp::select(&full, after, step).is_err());
}
