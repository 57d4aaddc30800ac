//! Integration test: JSON readers.

use std::io::Write;
use std::path::Path;

use hoopla_data::{DataError, Field, read_bounds, read_forecast, read_observations};

fn write(content: &str) -> tempfile::NamedTempFile {
    let mut f = tempfile::NamedTempFile::new().unwrap();
    f.write_all(content.as_bytes()).unwrap();
    f
}

#[test]
fn read_observations_file_not_found() {
    let err = read_observations(Path::new("/tmp/hoopla_missing_observations.json")).unwrap_err();
    assert!(
        matches!(err, DataError::FileNotFound { .. }),
        "expected FileNotFound, got {err:?}"
    );
}

#[test]
fn read_observations_maps_null_streamflow_to_nan() {
    let f = write(
        r#"{
            "latitude": 46.2,
            "dates": ["2000-01-01T00:00:00", "2000-01-02T00:00:00", "2000-01-03T00:00:00"],
            "precip": [0.0, 3.5, 1.0],
            "temp": [-2.0, 0.5, 1.0],
            "tmin": [-5.0, -1.0, 0.0],
            "tmax": [1.0, 2.0, 3.0],
            "streamflow": [1.2, null, 0.9]
        }"#,
    );
    let obs = read_observations(f.path()).unwrap();
    assert_eq!(obs.len(), 3);
    assert!(obs.streamflow()[1].is_nan());
    assert!(obs.has(Field::Tmin));
    assert!(!obs.has(Field::Pet));
}

#[test]
fn read_observations_rejects_unknown_field() {
    let f = write(
        r#"{"latitude": 0.0, "dates": [], "precip": [], "temp": [], "streamflow": [], "wind": []}"#,
    );
    assert!(matches!(
        read_observations(f.path()),
        Err(DataError::Json { .. })
    ));
}

#[test]
fn read_observations_reports_validation() {
    let f = write(
        r#"{
            "latitude": 10.0,
            "dates": ["2000-01-02T00:00:00", "2000-01-01T00:00:00"],
            "precip": [-1.0, 0.0],
            "temp": [0.0, 0.0],
            "streamflow": [null, null]
        }"#,
    );
    match read_observations(f.path()).unwrap_err() {
        DataError::Validation { count, .. } => assert_eq!(count, 2),
        other => panic!("expected Validation, got {other:?}"),
    }
}

#[test]
fn read_bounds_by_model() {
    let f = write(
        r#"{
            "HydroMod1": {"initial": [100, 0.5, 10, 2, 0.1, 0.5],
                          "lower":   [10, 0, 1, 0, 0, 0.1],
                          "upper":   [1000, 1, 100, 10, 1, 1]},
            "CemaNeige": {"initial": [0.25, 3.74], "lower": [0, 0], "upper": [1, 20]}
        }"#,
    );
    let bounds = read_bounds(f.path()).unwrap();
    assert_eq!(bounds.len(), 2);
    assert_eq!(bounds["HydroMod1"].len(), 6);
    assert_eq!(bounds["CemaNeige"].initial(), &[0.25, 3.74]);
}

#[test]
fn read_bounds_rejects_inverted_box() {
    let f = write(r#"{"M": {"initial": [1], "lower": [2], "upper": [0]}}"#);
    assert!(matches!(read_bounds(f.path()), Err(DataError::Json { .. })));
}

#[test]
fn read_forecast_record() {
    let f = write(
        r#"{
            "horizon": 2,
            "issuances": [
                {"issued": "2000-01-01T00:00:00",
                 "members": [{"precip": [1, 2], "temp": [3, null]}]}
            ]
        }"#,
    );
    let record = read_forecast(f.path()).unwrap();
    assert_eq!(record.horizon, 2);
    let m = &record.issuances[0].members[0];
    assert!(m.temp[1].is_nan());
    assert!(!m.is_complete(2));
}
