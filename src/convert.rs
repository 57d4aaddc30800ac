//! Pure conversion functions: TOML config structs -> crate API config types.

use anyhow::{Context, Result, bail};

use hoopla_assimilation::{EnsembleConfig, Uncertainties};
use hoopla_calendar::TimeStep;
use hoopla_calibration::{CalibrationConfig, DdsConfig, OptimizerKind, SceConfig};
use hoopla_models::SnowHyperParameters;
use hoopla_simulation::{ForecastConfig, ModelNames};

use crate::config::*;

/// Parses the `[general] time_step` string.
pub fn parse_time_step(s: &str) -> Result<TimeStep> {
    s.parse()
        .with_context(|| format!("invalid [general] time_step {s:?}"))
}

/// Builds a [`CalibrationConfig`] from the TOML calibration section.
///
/// Names are checked here so a misspelt score or method fails before any
/// data is read.
pub fn build_calibration_config(
    cal: &CalibrationToml,
    seed: Option<u64>,
) -> Result<CalibrationConfig> {
    let kind = match cal.method.parse::<OptimizerKind>()? {
        OptimizerKind::Sce(_) => OptimizerKind::Sce(
            SceConfig::new()
                .with_complexes(cal.sce.ngs)
                .with_kstop(cal.sce.kstop)
                .with_pcento(cal.sce.pcento)
                .with_peps(cal.sce.peps)
                .with_max_evaluations(cal.max_iterations)
                .with_seed_opt(seed),
        ),
        OptimizerKind::Dds(_) => OptimizerKind::Dds(
            DdsConfig::new()
                .with_max_iterations(cal.max_iterations)
                .with_seed_opt(seed),
        ),
    };
    let config = CalibrationConfig::new(cal.score.parse()?, kind)
        .with_remove_winter(cal.remove_winter);
    config.validate()?;
    Ok(config)
}

/// Library uncertainties with the entries the TOML sets replaced.
pub fn build_uncertainties(u: &UncertaintiesToml) -> Uncertainties {
    let d = Uncertainties::default();
    Uncertainties {
        temp_pet: u.temp_pet.unwrap_or(d.temp_pet),
        temp_snow: u.temp_snow.unwrap_or(d.temp_snow),
        tmin: u.tmin.unwrap_or(d.tmin),
        tmax: u.tmax.unwrap_or(d.tmax),
        precip: u.precip.unwrap_or(d.precip),
        streamflow: u.streamflow.unwrap_or(d.streamflow),
        pet: u.pet.unwrap_or(d.pet),
    }
}

/// Builds the [`EnsembleConfig`] when assimilation is enabled.
pub fn build_ensemble_config(
    da: &DataAssimilationToml,
    seed: Option<u64>,
) -> Result<Option<EnsembleConfig>> {
    if !da.enabled {
        return Ok(None);
    }
    let mut cfg = EnsembleConfig::new(da.members, da.reservoirs.iter().cloned())
        .with_period(da.period)
        .with_uncertainties(build_uncertainties(&da.uncertainties));
    if let Some(s) = seed {
        cfg = cfg.with_seed(s);
    }
    cfg.validate().context("invalid [data_assimilation] section")?;
    Ok(Some(cfg))
}

/// Builds a [`ForecastConfig`] from the TOML forecast section.
pub fn build_forecast_config(f: &ForecastToml) -> Result<ForecastConfig> {
    let cfg = ForecastConfig::new().with_issue_hour(f.issue_hour);
    cfg.validate().context("invalid [forecast] section")?;
    Ok(cfg)
}

/// Builds the snow model description of a catchment.
pub fn build_snow_hyper(s: &SnowToml) -> SnowHyperParameters {
    let mut hyper = SnowHyperParameters::new(s.elevations.clone(), s.mean_annual_snowfall);
    if let Some(beta) = s.precip_gradient {
        hyper = hyper.with_precip_gradient(beta);
    }
    if let Some(grad) = s.temp_gradient {
        hyper = hyper.with_temp_gradient(grad);
    }
    hyper
}

/// Every runoff × PET × snow combination the configuration asks for.
///
/// PET models only enter when PET is computed, snow models only when
/// snowmelt is simulated.
pub fn model_combinations(models: &ModelsToml, general: &GeneralToml) -> Result<Vec<ModelNames>> {
    if models.runoff.is_empty() {
        bail!("[models] runoff lists no model");
    }
    let pets: Vec<Option<&String>> = if general.compute_pet {
        if models.pet.is_empty() {
            bail!("compute_pet is set but [models] pet lists no model");
        }
        models.pet.iter().map(Some).collect()
    } else {
        vec![None]
    };
    let snows: Vec<Option<&String>> = if general.compute_snowmelt {
        if models.snow.is_empty() {
            bail!("compute_snowmelt is set but [models] snow lists no model");
        }
        models.snow.iter().map(Some).collect()
    } else {
        vec![None]
    };

    let mut out = Vec::new();
    for runoff in &models.runoff {
        for pet in &pets {
            for snow in &snows {
                let mut names = ModelNames::new(runoff.as_str());
                if let Some(p) = pet {
                    names = names.with_pet(p.as_str());
                }
                if let Some(s) = snow {
                    names = names.with_snow(s.as_str());
                }
                out.push(names);
            }
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn general(compute_pet: bool, compute_snowmelt: bool) -> GeneralToml {
        GeneralToml {
            time_step: "24h".into(),
            compute_pet,
            compute_snowmelt,
            compute_warm_up: true,
            parallel: false,
            overwrite: true,
            seed: None,
            bounds: PathBuf::from("bounds.json"),
            output: PathBuf::from("results"),
        }
    }

    fn models() -> ModelsToml {
        ModelsToml {
            runoff: vec!["HydroMod1".into(), "Other".into()],
            pet: vec!["Oudin".into()],
            snow: vec!["CemaNeige".into()],
            assimilation: "EnsembleKalmanFilter".into(),
        }
    }

    #[test]
    fn combinations_follow_switches() {
        let all = model_combinations(&models(), &general(true, true)).unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].label(), "HydroMod1_Oudin_CemaNeige");

        let bare = model_combinations(&models(), &general(false, false)).unwrap();
        assert_eq!(bare[1].label(), "Other");
    }

    #[test]
    fn time_step_strings() {
        assert_eq!(parse_time_step("3h").unwrap(), TimeStep::ThreeHourly);
        assert!(parse_time_step("1h").is_err());
    }

    #[test]
    fn calibration_names_are_checked() {
        let mut cal = CalibrationToml::default();
        cal.method = "SCE".into();
        cal.max_iterations = 500;
        let cfg = build_calibration_config(&cal, Some(1)).unwrap();
        match cfg.optimizer() {
            OptimizerKind::Sce(sce) => {
                assert_eq!(sce.max_evaluations(), 500);
                assert_eq!(sce.seed(), Some(1));
            }
            other => panic!("unexpected optimizer {other:?}"),
        }

        cal.score = "PVE".into();
        assert!(build_calibration_config(&cal, None).is_err());
        cal.score = "NSE".into();
        cal.method = "GA".into();
        assert!(build_calibration_config(&cal, None).is_err());
    }

    #[test]
    fn partial_uncertainties_keep_defaults() {
        let u = build_uncertainties(&UncertaintiesToml {
            precip: Some(0.3),
            ..Default::default()
        });
        assert_eq!(u.precip, 0.3);
        assert_eq!(u.streamflow, Uncertainties::default().streamflow);
    }

    #[test]
    fn disabled_assimilation_builds_nothing() {
        assert!(build_ensemble_config(&DataAssimilationToml::default(), None)
            .unwrap()
            .is_none());
        let mut da = DataAssimilationToml::default();
        da.enabled = true;
        da.members = 1;
        assert!(build_ensemble_config(&da, None).is_err());
    }
}
