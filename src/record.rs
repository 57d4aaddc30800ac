//! Result records written to the output directory, one JSON file per
//! catchment, model combination and operation.

use std::fmt;
use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use hoopla_simulation::{ForecastRun, ModelNames};

/// Which command produced a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Calibration,
    Simulation,
    Forecast,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Operation::Calibration => "calibration",
            Operation::Simulation => "simulation",
            Operation::Forecast => "forecast",
        })
    }
}

/// Model names of the combination.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelsRecord {
    pub runoff: String,
    pub pet: Option<String>,
    pub snow: Option<String>,
    pub assimilation: Option<String>,
}

impl From<&ModelNames> for ModelsRecord {
    fn from(n: &ModelNames) -> Self {
        Self {
            runoff: n.runoff.clone(),
            pet: n.pet.clone(),
            snow: n.snow.clone(),
            assimilation: n.assimilation.clone(),
        }
    }
}

/// Outcome of a calibration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreRecord {
    pub name: String,
    /// `None` when the score is not finite.
    pub value: Option<f64>,
    pub optimizer: String,
    pub evaluations: usize,
}

/// Forecast values per issuance step, `[lead][member]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastOutput {
    pub horizon: usize,
    pub members: usize,
    pub issued: Vec<Option<Vec<Vec<f64>>>>,
}

impl From<&ForecastRun> for ForecastOutput {
    fn from(run: &ForecastRun) -> Self {
        let n = run.simulated().len();
        Self {
            horizon: run.horizon(),
            members: run.n_members(),
            issued: (0..n).map(|t| run.at(t).map(<[Vec<f64>]>::to_vec)).collect(),
        }
    }
}

/// Persisted result of one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRecord {
    pub catchment: String,
    pub operation: Operation,
    pub models: ModelsRecord,
    pub time_step: String,
    pub dates: Vec<NaiveDateTime>,
    pub parameter_names: Vec<String>,
    pub parameters: Vec<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<ScoreRecord>,
    /// Streamflow; the ensemble mean in ensemble runs.
    pub simulated: Vec<f64>,
    /// Member streamflow of ensemble runs, `[member][step]`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ensemble: Option<Vec<Vec<f64>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub forecast: Option<ForecastOutput>,
}

/// File holding the record of `catchment`, `names` and `operation`.
pub fn record_path(dir: &Path, catchment: &str, names: &ModelNames, operation: Operation) -> PathBuf {
    dir.join(format!("{catchment}_{}_{operation}.json", names.label()))
}

/// Writes `record` as pretty JSON, creating the directory if needed.
pub fn write_record(path: &Path, record: &ResultRecord) -> Result<()> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)
            .with_context(|| format!("failed to create {}", dir.display()))?;
    }
    let file = fs::File::create(path)
        .with_context(|| format!("failed to create {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, record)
        .with_context(|| format!("failed to write {}", path.display()))?;
    writer
        .flush()
        .with_context(|| format!("failed to write {}", path.display()))

}

/// The parameter vector stored in a calibration record.
pub fn read_parameters(path: &Path) -> Result<Vec<f64>> {
    #[derive(Deserialize)]
    struct Parameters {
        operation: Operation,
        parameters: Vec<f64>,
    }

    let text = fs::read_to_string(path).with_context(|| {
        format!(
            "no calibrated parameters at {}, run `hoopla calibrate` first",
            path.display()
        )
    })?;
    let p: Parameters = serde_json::from_str(&text)
        .with_context(|| format!("malformed result record {}", path.display()))?;
    anyhow::ensure!(
        p.operation == Operation::Calibration,
        "{} is a {} record, not a calibration",
        path.display(),
        p.operation
    );
    Ok(p.parameters)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn record(operation: Operation) -> ResultRecord {
        let d = NaiveDate::from_ymd_opt(2001, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        ResultRecord {
            catchment: "Bassin1".into(),
            operation,
            models: ModelsRecord::from(&ModelNames::new("HydroMod1").with_pet("Oudin")),
            time_step: "24h".into(),
            dates: vec![d],
            parameter_names: vec!["soil_capacity".into()],
            parameters: vec![120.0],
            score: Some(ScoreRecord {
                name: "NSE".into(),
                value: Some(0.8),
                optimizer: "DDS".into(),
                evaluations: 10,
            }),
            simulated: vec![1.5],
            ensemble: None,
            forecast: None,
        }
    }

    #[test]
    fn parameters_round_trip_through_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let names = ModelNames::new("HydroMod1").with_pet("Oudin");
        let path = record_path(dir.path(), "Bassin1", &names, Operation::Calibration);
        assert!(path.ends_with("Bassin1_HydroMod1_Oudin_calibration.json"));
        write_record(&path, &record(Operation::Calibration)).unwrap();
        assert_eq!(read_parameters(&path).unwrap(), vec![120.0]);
    }

    #[test]
    fn simulation_record_is_not_a_parameter_source() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sim.json");
        write_record(&path, &record(Operation::Simulation)).unwrap();
        assert!(read_parameters(&path).is_err());
    }

    #[test]
    fn missing_record_mentions_calibrate() {
        let err = read_parameters(Path::new("/nonexistent/x.json")).unwrap_err();
        assert!(format!("{err:#}").contains("hoopla calibrate"));
    }

    #[test]
    fn optional_sections_are_omitted() {
        let json = serde_json::to_string(&record(Operation::Simulation)).unwrap();
        assert!(!json.contains("ensemble"));
        assert!(!json.contains("forecast"));
        assert!(json.contains("\"operation\":\"simulation\""));
    }
}
