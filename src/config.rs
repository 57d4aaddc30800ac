use std::path::PathBuf;

use chrono::NaiveDateTime;
use serde::Deserialize;

/// Top-level HOOPLA configuration.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HooplaConfig {
    /// Run-wide settings.
    pub general: GeneralToml,

    /// Calibration, simulation and forecast windows.
    pub dates: DatesToml,

    /// Model names to combine.
    pub models: ModelsToml,

    /// Calibration settings.
    #[serde(default)]
    pub calibration: CalibrationToml,

    /// Forecast settings.
    #[serde(default)]
    pub forecast: ForecastToml,

    /// Ensemble and assimilation settings.
    #[serde(default)]
    pub data_assimilation: DataAssimilationToml,

    /// Catchments to process.
    pub catchments: Vec<CatchmentToml>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GeneralToml {
    /// `"24h"` or `"3h"`.
    #[serde(default = "default_time_step")]
    pub time_step: String,
    /// Compute PET from temperature instead of reading it.
    #[serde(default = "default_true")]
    pub compute_pet: bool,
    /// Route precipitation through a snow model.
    #[serde(default)]
    pub compute_snowmelt: bool,
    /// Warm model states up before the first reported step.
    #[serde(default = "default_true")]
    pub compute_warm_up: bool,
    /// Run combinations in parallel.
    #[serde(default)]
    pub parallel: bool,
    /// Replace existing result files.
    #[serde(default = "default_true")]
    pub overwrite: bool,
    /// Global RNG seed.
    #[serde(default)]
    pub seed: Option<u64>,
    /// Parameter bounds keyed by model name.
    pub bounds: PathBuf,
    /// Directory receiving result records.
    #[serde(default = "default_output")]
    pub output: PathBuf,
}

fn default_time_step() -> String {
    "24h".to_string()
}
fn default_true() -> bool {
    true
}
fn default_output() -> PathBuf {
    PathBuf::from("results")
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WindowToml {
    pub begin: NaiveDateTime,
    pub end: NaiveDateTime,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DatesToml {
    pub calibration: WindowToml,
    pub simulation: WindowToml,
    pub forecast: WindowToml,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModelsToml {
    #[serde(default = "default_runoff")]
    pub runoff: Vec<String>,
    #[serde(default = "default_pet")]
    pub pet: Vec<String>,
    #[serde(default = "default_snow")]
    pub snow: Vec<String>,
    #[serde(default = "default_assimilation")]
    pub assimilation: String,
}

fn default_runoff() -> Vec<String> {
    vec!["HydroMod1".to_string()]
}
fn default_pet() -> Vec<String> {
    vec!["Oudin".to_string()]
}
fn default_snow() -> Vec<String> {
    vec!["CemaNeige".to_string()]
}
fn default_assimilation() -> String {
    "EnsembleKalmanFilter".to_string()
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CalibrationToml {
    #[serde(default = "default_method")]
    pub method: String,
    #[serde(default = "default_score")]
    pub score: String,
    #[serde(default)]
    pub remove_winter: bool,
    /// Calibrate snow parameters together with the runoff parameters.
    #[serde(default)]
    pub calibrate_snow: bool,
    /// Evaluation budget of either optimizer.
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,
    #[serde(default)]
    pub sce: SceToml,
}

impl Default for CalibrationToml {
    fn default() -> Self {
        Self {
            method: default_method(),
            score: default_score(),
            remove_winter: false,
            calibrate_snow: false,
            max_iterations: default_max_iterations(),
            sce: SceToml::default(),
        }
    }
}

fn default_method() -> String {
    "DDS".to_string()
}
fn default_score() -> String {
    "NSE".to_string()
}
fn default_max_iterations() -> usize {
    1000
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SceToml {
    #[serde(default = "default_ngs")]
    pub ngs: usize,
    #[serde(default = "default_kstop")]
    pub kstop: usize,
    #[serde(default = "default_pcento")]
    pub pcento: f64,
    #[serde(default = "default_peps")]
    pub peps: f64,
}

impl Default for SceToml {
    fn default() -> Self {
        Self {
            ngs: default_ngs(),
            kstop: default_kstop(),
            pcento: default_pcento(),
            peps: default_peps(),
        }
    }
}

fn default_ngs() -> usize {
    5
}
fn default_kstop() -> usize {
    10
}
fn default_pcento() -> f64 {
    0.1
}
fn default_peps() -> f64 {
    1e-3
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ForecastToml {
    /// Hour of day forecasts are issued at.
    #[serde(default = "default_issue_hour")]
    pub issue_hour: u32,
    /// Use the observations that follow each step as the forecast.
    #[serde(default)]
    pub perfect_forecast: bool,
    #[serde(default = "default_horizon")]
    pub horizon: usize,
    /// Keep every meteorological member instead of the first.
    #[serde(default)]
    pub meteo_ensemble: bool,
}

impl Default for ForecastToml {
    fn default() -> Self {
        Self {
            issue_hour: default_issue_hour(),
            perfect_forecast: false,
            horizon: default_horizon(),
            meteo_ensemble: false,
        }
    }
}

fn default_issue_hour() -> u32 {
    6
}
fn default_horizon() -> usize {
    10
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DataAssimilationToml {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_members")]
    pub members: usize,
    /// Steps between two analyses.
    #[serde(default = "default_period")]
    pub period: usize,
    #[serde(default = "default_reservoirs")]
    pub reservoirs: Vec<String>,
    #[serde(default)]
    pub uncertainties: UncertaintiesToml,
}

impl Default for DataAssimilationToml {
    fn default() -> Self {
        Self {
            enabled: false,
            members: default_members(),
            period: default_period(),
            reservoirs: default_reservoirs(),
            uncertainties: UncertaintiesToml::default(),
        }
    }
}

fn default_members() -> usize {
    50
}
fn default_period() -> usize {
    1
}
fn default_reservoirs() -> Vec<String> {
    vec!["R".to_string(), "T".to_string()]
}

/// Perturbation standard deviations; unset entries keep the library
/// defaults.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UncertaintiesToml {
    pub temp_pet: Option<f64>,
    pub temp_snow: Option<f64>,
    pub tmin: Option<f64>,
    pub tmax: Option<f64>,
    pub precip: Option<f64>,
    pub streamflow: Option<f64>,
    pub pet: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CatchmentToml {
    pub name: String,
    /// Observation series (JSON).
    pub observations: PathBuf,
    /// Meteorological forecast (JSON), unless forecasts are perfect.
    #[serde(default)]
    pub forecast: Option<PathBuf>,
    /// Catchment description for snow models.
    #[serde(default)]
    pub snow: Option<SnowToml>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SnowToml {
    /// Elevation of each band (m).
    pub elevations: Vec<f64>,
    /// Mean annual snowfall (mm).
    pub mean_annual_snowfall: f64,
    #[serde(default)]
    pub precip_gradient: Option<f64>,
    #[serde(default)]
    pub temp_gradient: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
[general]
bounds = "bounds.json"

[dates.calibration]
begin = "2001-01-01T00:00:00"
end = "2004-12-31T00:00:00"

[dates.simulation]
begin = "2005-01-01T00:00:00"
end = "2008-12-31T00:00:00"

[dates.forecast]
begin = "2007-01-01T00:00:00"
end = "2008-12-31T00:00:00"

[models]

[[catchments]]
name = "Bassin1"
observations = "data/bassin1.json"
"#;

    #[test]
    fn minimal_config_takes_defaults() {
        let config: HooplaConfig = toml::from_str(MINIMAL).unwrap();
        assert_eq!(config.general.time_step, "24h");
        assert!(config.general.compute_pet);
        assert_eq!(config.models.runoff, vec!["HydroMod1"]);
        assert_eq!(config.calibration.method, "DDS");
        assert_eq!(config.calibration.sce.kstop, 10);
        assert_eq!(config.forecast.horizon, 10);
        assert!(!config.data_assimilation.enabled);
        assert_eq!(config.catchments.len(), 1);
        assert!(config.catchments[0].snow.is_none());
    }

    #[test]
    fn unknown_field_is_rejected() {
        let text = MINIMAL.replace("[models]", "[models]\nwarm = 3");
        assert!(toml::from_str::<HooplaConfig>(&text).is_err());
    }

    #[test]
    fn assimilation_section_parses() {
        let text = format!(
            "{MINIMAL}\n[data_assimilation]\nenabled = true\nmembers = 20\n\
             [data_assimilation.uncertainties]\nprecip = 0.3\n"
        );
        let config: HooplaConfig = toml::from_str(&text).unwrap();
        assert_eq!(config.data_assimilation.members, 20);
        assert_eq!(config.data_assimilation.uncertainties.precip, Some(0.3));
        assert_eq!(config.data_assimilation.uncertainties.tmin, None);
    }
}
