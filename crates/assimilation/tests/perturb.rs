//! Integration tests for ensemble generation from an observation series.

use chrono::NaiveDate;
use hoopla_assimilation::{EnsembleConfig, PerturbedForcing, make_rng};
use hoopla_data::{ObservationRecord, ObservationSeries};

fn series(n: usize, with_extremes: bool) -> ObservationSeries {
    let start = NaiveDate::from_ymd_opt(2000, 1, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap();
    ObservationSeries::new(ObservationRecord {
        latitude: 46.0,
        dates: (0..n).map(|i| start + chrono::TimeDelta::days(i as i64)).collect(),
        precip: (0..n).map(|i| if i % 3 == 0 { 0.0 } else { 4.0 }).collect(),
        temp: vec![5.0; n],
        tmin: with_extremes.then(|| vec![0.0; n]),
        tmax: with_extremes.then(|| vec![10.0; n]),
        streamflow: (0..n).map(|i| if i == 2 { f64::NAN } else { 2.0 }).collect(),
        pet: None,
    })
    .unwrap()
}

#[test]
fn shapes_follow_members_and_steps() {
    let obs = series(30, true);
    let config = EnsembleConfig::new(12, ["S"]).with_seed(1);
    let mut rng = make_rng(config.seed());
    let p = PerturbedForcing::generate(&obs, &config, &mut rng).unwrap();
    assert_eq!(p.members(), 12);
    assert!(p.precip.iter().all(|m| m.len() == 30));
    assert_eq!(p.tmin.as_ref().map(Vec::len), Some(12));
    assert_eq!(p.tmax.as_ref().map(Vec::len), Some(12));
    assert!(p.pet.is_none());
}

#[test]
fn dry_steps_stay_dry_and_precip_non_negative() {
    let obs = series(60, false);
    let config = EnsembleConfig::new(20, ["S"]).with_seed(9);
    let p = PerturbedForcing::generate(&obs, &config, &mut make_rng(config.seed())).unwrap();
    for m in &p.precip {
        for (i, &v) in m.iter().enumerate() {
            assert!(v >= 0.0);
            if i % 3 == 0 {
                assert_eq!(v, 0.0);
            }
        }
    }
    assert!(p.tmin.is_none());
}

#[test]
fn streamflow_errors_are_consistent() {
    let obs = series(10, false);
    let config = EnsembleConfig::new(5, ["S"]).with_seed(3);
    let p = PerturbedForcing::generate(&obs, &config, &mut make_rng(config.seed())).unwrap();
    for (q, e) in p.streamflow.iter().zip(&p.streamflow_errors) {
        assert!(q[2].is_nan() && e[2].is_nan());
        assert!((q[0] + e[0] - 2.0).abs() < 1e-12);
    }
}

#[test]
fn same_seed_same_ensemble() {
    let obs = series(20, true);
    let config = EnsembleConfig::new(8, ["S"]).with_seed(77);
    let a = PerturbedForcing::generate(&obs, &config, &mut make_rng(Some(77))).unwrap();
    let b = PerturbedForcing::generate(&obs, &config, &mut make_rng(Some(77))).unwrap();
    assert_eq!(a.precip, b.precip);
    assert_eq!(a.temp_snow, b.temp_snow);
}

#[test]
fn invalid_config_is_rejected() {
    let obs = series(5, false);
    let config = EnsembleConfig::new(1, ["S"]);
    assert!(PerturbedForcing::generate(&obs, &config, &mut make_rng(Some(0))).is_err());
}
