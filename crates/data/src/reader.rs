//! JSON readers for observations, forecasts and parameter bounds.

use std::collections::BTreeMap;
use std::path::Path;

use serde::de::DeserializeOwned;
use tracing::{info, warn};

use crate::bounds::ParameterBounds;
use crate::error::DataError;
use crate::forecast::ForecastRecord;
use crate::observed::{ObservationRecord, ObservationSeries};

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, DataError> {
    if !path.exists() {
        return Err(DataError::FileNotFound {
            path: path.to_path_buf(),
        });
    }
    let text = std::fs::read_to_string(path).map_err(|e| DataError::Read {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    serde_json::from_str(&text).map_err(|e| DataError::Json {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

/// Read and validate an observation series.
///
/// # Errors
///
/// Returns [`DataError`] if the file is missing, malformed, or fails
/// [`ObservationSeries::new`] validation.
#[tracing::instrument(skip(path), fields(path = %path.display()))]
pub fn read_observations(path: &Path) -> Result<ObservationSeries, DataError> {
    let record: ObservationRecord = read_json(path)?;
    let series = ObservationSeries::new(record)?;
    let coverage = series.streamflow_coverage();
    if coverage < 0.25 {
        warn!(coverage, "more than 75% of the streamflow is missing");
    }
    info!(steps = series.len(), coverage, "observations loaded");
    Ok(series)
}

/// Read a meteorological forecast file.
///
/// # Errors
///
/// Returns [`DataError`] if the file is missing or malformed.
#[tracing::instrument(skip(path), fields(path = %path.display()))]
pub fn read_forecast(path: &Path) -> Result<ForecastRecord, DataError> {
    let record: ForecastRecord = read_json(path)?;
    info!(
        issuances = record.issuances.len(),
        horizon = record.horizon,
        "forecast loaded"
    );
    Ok(record)
}

/// Read parameter bounds keyed by model name.
///
/// # Errors
///
/// Returns [`DataError`] if the file is missing, malformed, or any entry
/// fails [`ParameterBounds::new`] validation.
#[tracing::instrument(skip(path), fields(path = %path.display()))]
pub fn read_bounds(path: &Path) -> Result<BTreeMap<String, ParameterBounds>, DataError> {
    let bounds: BTreeMap<String, ParameterBounds> = read_json(path)?;
    info!(models = bounds.len(), "parameter bounds loaded");
    Ok(bounds)
}
