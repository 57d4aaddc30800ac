//! The `calibrate`, `simulate` and `forecast` commands.
//!
//! Each command expands the configuration into one job per catchment and
//! model combination. Jobs share nothing mutable and run on the rayon pool
//! when `[general] parallel` is set.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use rayon::prelude::*;
use tracing::{error, info, info_span};

use hoopla_assimilation::EnsembleConfig;
use hoopla_calendar::TimeStep;
use hoopla_calibration::{CalibrationConfig, Calibrator};
use hoopla_data::{
    MeteoForecast, ObservationSeries, ParameterBounds, WarmUp, read_bounds, read_forecast,
    read_observations,
};
use hoopla_simulation::{
    ForecastConfig, ModelNames, ModelRegistry, PetSource, RunConfig, RunMode, Simulator,
    SnowParams, SnowRouting,
};

use crate::cli::RunArgs;
use crate::config::{CatchmentToml, HooplaConfig, WindowToml};
use crate::convert;
use crate::record::{
    ForecastOutput, ModelsRecord, Operation, ResultRecord, ScoreRecord, read_parameters,
    record_path, write_record,
};

/// Reads the TOML file and applies the CLI overrides.
pub fn load_config(args: &RunArgs) -> Result<HooplaConfig> {
    let text = fs::read_to_string(&args.config)
        .with_context(|| format!("failed to read config {}", args.config.display()))?;
    let mut config: HooplaConfig = toml::from_str(&text)
        .with_context(|| format!("failed to parse config {}", args.config.display()))?;
    if let Some(output) = &args.output {
        config.general.output = output.clone();
    }
    if args.seed.is_some() {
        config.general.seed = args.seed;
    }
    Ok(config)
}

/// Runs `operation` for every job of the configuration.
pub fn run(args: &RunArgs, operation: Operation) -> Result<()> {
    let config = load_config(args)?;
    let runner = Runner::new(&config, operation)?;
    let jobs = runner.jobs()?;
    info!(%operation, jobs = jobs.len(), "starting");

    let outcomes: Vec<(String, Result<Option<PathBuf>>)> = if config.general.parallel {
        jobs.par_iter()
            .map(|job| (job.describe(), runner.run_job(job)))
            .collect()
    } else {
        jobs.iter()
            .map(|job| (job.describe(), runner.run_job(job)))
            .collect()
    };

    let total = outcomes.len();
    let mut failed = 0usize;
    for (job, outcome) in outcomes {
        match outcome {
            Ok(Some(path)) => info!(%job, path = %path.display(), "record written"),
            Ok(None) => info!(%job, "record exists, skipped"),
            Err(e) => {
                error!(%job, "{e:#}");
                failed += 1;
            }
        }
    }
    if failed > 0 {
        bail!("{failed} of {total} {operation} runs failed");
    }
    Ok(())
}

/// Prints the registered models.
pub fn list_models() {
    let registry = ModelRegistry::builtin();
    println!("rainfall-runoff: {}", registry.list_runoff().join(", "));
    println!("evapotranspiration: {}", registry.list_pet().join(", "));
    println!("snow: {}", registry.list_snow().join(", "));
    println!("assimilation: {}", registry.list_assimilation().join(", "));
}

/// One catchment with one model combination.
struct Job<'a> {
    catchment: &'a CatchmentToml,
    names: ModelNames,
}

impl Job<'_> {
    fn describe(&self) -> String {
        format!("{}/{}", self.catchment.name, self.names.label())
    }
}

/// Settings resolved once and shared by every job.
struct Runner<'a> {
    config: &'a HooplaConfig,
    operation: Operation,
    time_step: TimeStep,
    registry: ModelRegistry,
    bounds: BTreeMap<String, ParameterBounds>,
    calibration: Option<CalibrationConfig>,
    ensemble: Option<EnsembleConfig>,
    forecast: ForecastConfig,
}

impl<'a> Runner<'a> {
    /// Converts and checks every section the operation uses, so
    /// configuration mistakes fail before any data is read.
    fn new(config: &'a HooplaConfig, operation: Operation) -> Result<Self> {
        let seed = config.general.seed;
        let time_step = convert::parse_time_step(&config.general.time_step)?;
        let (bounds, calibration) = if operation == Operation::Calibration {
            (
                read_bounds(&config.general.bounds)?,
                Some(convert::build_calibration_config(&config.calibration, seed)?),
            )
        } else {
            (BTreeMap::new(), None)
        };
        let ensemble = if operation == Operation::Calibration {
            None
        } else {
            convert::build_ensemble_config(&config.data_assimilation, seed)?
        };
        Ok(Self {
            config,
            operation,
            time_step,
            registry: ModelRegistry::builtin(),
            bounds,
            calibration,
            ensemble,
            forecast: convert::build_forecast_config(&config.forecast)?,
        })
    }

    fn jobs(&self) -> Result<Vec<Job<'a>>> {
        let mut combos = convert::model_combinations(&self.config.models, &self.config.general)?;
        if self.ensemble.is_some() {
            combos = combos
                .into_iter()
                .map(|n| n.with_assimilation(self.config.models.assimilation.as_str()))
                .collect();
        }
        Ok(self
            .config
            .catchments
            .iter()
            .flat_map(|c| {
                combos.iter().map(move |names| Job {
                    catchment: c,
                    names: names.clone(),
                })
            })
            .collect())
    }

    fn window(&self) -> WindowToml {
        let dates = &self.config.dates;
        match self.operation {
            Operation::Calibration => dates.calibration,
            Operation::Simulation => dates.simulation,
            Operation::Forecast => dates.forecast,
        }
    }

    fn output(&self) -> &Path {
        &self.config.general.output
    }

    fn run_config(&self, job: &Job<'_>, full: &ObservationSeries) -> Result<RunConfig> {
        let general = &self.config.general;
        let pet = if general.compute_pet {
            PetSource::Computed
        } else {
            PetSource::Observed
        };
        let mut rc = RunConfig::new(self.time_step).with_pet_source(pet);
        if general.compute_warm_up {
            rc = rc.with_warm_up(WarmUp::select(full, self.window().begin, self.time_step)?);
        }
        if job.names.snow.is_some() {
            let snow = job.catchment.snow.as_ref().with_context(|| {
                format!("catchment {} has no snow description", job.catchment.name)
            })?;
            let params = if self.config.calibration.calibrate_snow {
                SnowParams::Calibrated
            } else {
                SnowParams::Default
            };
            rc = rc.with_snow(SnowRouting::SnowThenRain {
                hyper: convert::build_snow_hyper(snow),
                params,
            });
        }
        if let Some(e) = &self.ensemble {
            rc = rc.with_mode(RunMode::Ensemble(e.clone()));
        }
        Ok(rc)
    }

    /// Runoff bounds, followed by snow bounds when snow is calibrated.
    fn bounds_for(&self, names: &ModelNames) -> Result<ParameterBounds> {
        let lookup = |model: &str| {
            self.bounds.get(model).with_context(|| {
                format!(
                    "no bounds for {model} in {}",
                    self.config.general.bounds.display()
                )
            })
        };
        let runoff = lookup(&names.runoff)?;
        match &names.snow {
            Some(snow) if self.config.calibration.calibrate_snow => {
                Ok(runoff.concat(lookup(snow)?))
            }
            _ => Ok(runoff.clone()),
        }
    }

    /// Parameters calibrated earlier for the same combination.
    fn calibrated_parameters(&self, job: &Job<'_>) -> Result<Vec<f64>> {
        let names = ModelNames {
            assimilation: None,
            ..job.names.clone()
        };
        read_parameters(&record_path(
            self.output(),
            &job.catchment.name,
            &names,
            Operation::Calibration,
        ))
    }

    fn meteo(&self, job: &Job<'_>, obs: &ObservationSeries) -> Result<MeteoForecast> {
        let f = &self.config.forecast;
        if f.perfect_forecast {
            return Ok(MeteoForecast::perfect(obs, f.horizon)?);
        }
        let path = job.catchment.forecast.as_ref().with_context(|| {
            format!(
                "catchment {} has no forecast file and forecasts are not perfect",
                job.catchment.name
            )
        })?;
        let mut record = read_forecast(path)?;
        if !f.meteo_ensemble {
            for issuance in &mut record.issuances {
                issuance.members.truncate(1);
            }
        }
        Ok(MeteoForecast::align(obs.dates(), record, f.horizon)?)
    }

    fn run_job(&self, job: &Job<'_>) -> Result<Option<PathBuf>> {
        let path = record_path(self.output(), &job.catchment.name, &job.names, self.operation);
        if path.exists() && !self.config.general.overwrite {
            return Ok(None);
        }
        let _span = info_span!("job", catchment = %job.catchment.name, models = %job.names.label())
            .entered();

        let full = read_observations(&job.catchment.observations)?;
        let window = self.window();
        let obs = full
            .crop(window.begin, window.end)
            .with_context(|| format!("{} window", self.operation))?;
        let models = self.registry.resolve(&job.names)?;
        let sim = Simulator::new(models, self.run_config(job, &full)?, obs)?;

        let mut record = ResultRecord {
            catchment: job.catchment.name.clone(),
            operation: self.operation,
            models: ModelsRecord::from(&job.names),
            time_step: self.time_step.label().to_string(),
            dates: sim.observations().dates().to_vec(),
            parameter_names: sim.parameter_names().iter().map(|s| s.to_string()).collect(),
            parameters: Vec::new(),
            score: None,
            simulated: Vec::new(),
            ensemble: None,
            forecast: None,
        };

        match self.operation {
            Operation::Calibration => {
                let config = self
                    .calibration
                    .clone()
                    .context("calibration settings were not prepared")?;
                let result = Calibrator::new(&sim, self.bounds_for(&job.names)?, config)?
                    .calibrate()?;
                record.score = Some(ScoreRecord {
                    name: result.score.to_string(),
                    value: result.best_score.is_finite().then_some(result.best_score),
                    optimizer: result.optimizer.to_string(),
                    evaluations: result.n_evaluations,
                });
                record.parameters = result.best_params;
                record.simulated = result.simulated;
            }
            Operation::Simulation => {
                let params = self.calibrated_parameters(job)?;
                if sim.is_ensemble() {
                    let run = sim.simulate_ensemble(&params)?;
                    record.simulated = run.mean().to_vec();
                    record.ensemble = Some(run.members().to_vec());
                } else {
                    record.simulated = sim.simulate(&params)?;
                }
                record.parameters = params;
            }
            Operation::Forecast => {
                let params = self.calibrated_parameters(job)?;
                let meteo = self.meteo(job, sim.observations())?;
                let run = sim.forecast(&params, &meteo, &self.forecast)?;
                record.simulated = run.simulated().to_vec();
                record.forecast = Some(ForecastOutput::from(&run));
                record.parameters = params;
            }
        }

        write_record(&path, &record)?;
        Ok(Some(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeDelta};
    use hoopla_data::ObservationRecord;

    const N: usize = 3 * 365;

    fn write_inputs(dir: &Path, extra: &str) -> PathBuf {
        let start = NaiveDate::from_ymd_opt(2001, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let obs = ObservationRecord {
            latitude: 46.5,
            dates: (0..N).map(|i| start + TimeDelta::days(i as i64)).collect(),
            precip: (0..N).map(|i| [8.0, 0.0, 0.0, 15.0, 2.0, 0.0, 0.0][i % 7]).collect(),
            temp: (0..N)
                .map(|i| 8.0 + 10.0 * (i as f64 * 2.0 * std::f64::consts::PI / 365.0).sin())
                .collect(),
            tmin: None,
            tmax: None,
            streamflow: (0..N).map(|i| 1.0 + (i % 30) as f64 * 0.1).collect(),
            pet: None,
        };
        fs::write(dir.join("obs.json"), serde_json::to_string(&obs).unwrap()).unwrap();
        fs::write(
            dir.join("bounds.json"),
            r#"{"HydroMod1": {"initial": [100, 0.5, 10, 2, 0.1, 0.5],
                              "lower": [10, 0.1, 1, 0.5, 0.01, 0.1],
                              "upper": [500, 0.9, 50, 5, 0.9, 5]}}"#,
        )
        .unwrap();

        let d = dir.display();
        let config = format!(
            r#"
[general]
bounds = "{d}/bounds.json"
output = "{d}/results"
seed = 4

[dates.calibration]
begin = "2002-01-01T00:00:00"
end = "2002-12-31T00:00:00"

[dates.simulation]
begin = "2003-01-01T00:00:00"
end = "2003-06-30T00:00:00"

[dates.forecast]
begin = "2003-01-01T00:00:00"
end = "2003-03-31T00:00:00"

[models]
pet = ["Oudin"]

[calibration]
max_iterations = 20

[forecast]
issue_hour = 0
perfect_forecast = true
horizon = 3
{extra}

[[catchments]]
name = "Bassin1"
observations = "{d}/obs.json"
"#
        );
        let path = dir.join("hoopla.toml");
        fs::write(&path, config).unwrap();
        path
    }

    fn args(config: PathBuf) -> RunArgs {
        RunArgs {
            config,
            output: None,
            seed: None,
        }
    }

    fn read(path: PathBuf) -> ResultRecord {
        serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
    }

    #[test]
    fn calibrate_then_simulate_then_forecast() {
        let dir = tempfile::tempdir().unwrap();
        let a = args(write_inputs(dir.path(), ""));
        let results = dir.path().join("results");

        run(&a, Operation::Calibration).unwrap();
        let cal = read(results.join("Bassin1_HydroMod1_Oudin_calibration.json"));
        assert_eq!(cal.parameters.len(), 6);
        assert_eq!(cal.score.as_ref().unwrap().evaluations, 20);
        assert_eq!(cal.simulated.len(), 365);

        run(&a, Operation::Simulation).unwrap();
        let sim = read(results.join("Bassin1_HydroMod1_Oudin_simulation.json"));
        assert_eq!(sim.parameters, cal.parameters);
        assert_eq!(sim.simulated.len(), 181);

        run(&a, Operation::Forecast).unwrap();
        let fc = read(results.join("Bassin1_HydroMod1_Oudin_forecast.json"));
        let forecast = fc.forecast.unwrap();
        assert_eq!(forecast.horizon, 3);
        assert_eq!(forecast.members, 1);
        assert_eq!(forecast.issued.len(), 90);
        assert!(forecast.issued[0].is_some());
        assert!(forecast.issued[89].is_none());
    }

    #[test]
    fn ensemble_simulation_records_members() {
        let dir = tempfile::tempdir().unwrap();
        let a = args(write_inputs(
            dir.path(),
            "\n[data_assimilation]\nenabled = true\nmembers = 4\n",
        ));
        run(&a, Operation::Calibration).unwrap();
        run(&a, Operation::Simulation).unwrap();
        let sim = read(
            dir.path()
                .join("results/Bassin1_HydroMod1_Oudin_EnsembleKalmanFilter_simulation.json"),
        );
        assert_eq!(sim.ensemble.unwrap().len(), 4);
    }

    #[test]
    fn simulate_without_calibration_fails() {
        let dir = tempfile::tempdir().unwrap();
        let a = args(write_inputs(dir.path(), ""));
        let err = run(&a, Operation::Simulation).unwrap_err();
        assert!(err.to_string().contains("1 of 1 simulation runs failed"));
    }

    #[test]
    fn cli_overrides_output_and_seed() {
        let dir = tempfile::tempdir().unwrap();
        let mut a = args(write_inputs(dir.path(), ""));
        a.output = Some(dir.path().join("elsewhere"));
        a.seed = Some(99);
        let config = load_config(&a).unwrap();
        assert_eq!(config.general.output, dir.path().join("elsewhere"));
        assert_eq!(config.general.seed, Some(99));
    }
}
