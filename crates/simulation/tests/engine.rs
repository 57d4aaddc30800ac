//! Integration tests: deterministic and ensemble runs through the engine.

use approx::assert_relative_eq;
use chrono::{NaiveDate, NaiveDateTime, TimeDelta};
use hoopla_assimilation::{EnsembleConfig, Uncertainties};
use hoopla_calendar::TimeStep;
use hoopla_data::{Field, ObservationRecord, ObservationSeries, WarmUp};
use hoopla_models::SnowHyperParameters;
use hoopla_simulation::{
    ModelNames, ModelRegistry, PetSource, RunConfig, RunMode, SimulationError, Simulator,
    SnowParams, SnowRouting,
};

const PARAMS: [f64; 6] = [100.0, 0.5, 10.0, 2.0, 0.1, 0.5];

fn dates(start: NaiveDateTime, n: usize) -> Vec<NaiveDateTime> {
    (0..n).map(|i| start + TimeDelta::days(i as i64)).collect()
}

fn day(y: i32, m: u32, d: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
}

fn series(n: usize, pet: bool) -> ObservationSeries {
    ObservationSeries::new(ObservationRecord {
        latitude: 46.5,
        dates: dates(day(2001, 3, 1), n),
        precip: (0..n).map(|i| [10.0, 0.0, 0.0, 5.0, 0.0][i % 5]).collect(),
        temp: (0..n).map(|i| -5.0 + (i % 20) as f64).collect(),
        tmin: None,
        tmax: None,
        streamflow: (0..n).map(|i| 1.0 + (i % 7) as f64 * 0.5).collect(),
        pet: pet.then(|| vec![2.0; n]),
    })
    .unwrap()
}

fn simulator(names: ModelNames, config: RunConfig, obs: ObservationSeries) -> Simulator {
    let models = ModelRegistry::builtin().resolve(&names).unwrap();
    Simulator::new(models, config, obs).unwrap()
}

#[test]
fn observed_pet_run_matches_reference_model() {
    let obs = ObservationSeries::new(ObservationRecord {
        latitude: 46.5,
        dates: dates(day(2001, 3, 1), 10),
        precip: vec![10.0, 0.0, 0.0, 5.0, 0.0, 0.0, 20.0, 0.0, 0.0, 0.0],
        temp: vec![10.0; 10],
        tmin: None,
        tmax: None,
        streamflow: vec![1.0; 10],
        pet: Some(vec![2.0; 10]),
    })
    .unwrap();
    let sim = simulator(
        ModelNames::new("HydroMod1"),
        RunConfig::new(TimeStep::Daily).with_pet_source(PetSource::Observed),
        obs,
    );
    let q = sim.simulate(&PARAMS).unwrap();
    assert_relative_eq!(q[1], 11.0, max_relative = 1e-12);
    assert_relative_eq!(q[7], 10.589824, max_relative = 1e-12);
    assert_eq!(q[0], 0.0);
}

#[test]
fn simulate_is_idempotent() {
    let sim = simulator(
        ModelNames::new("HydroMod1").with_pet("Oudin"),
        RunConfig::new(TimeStep::Daily),
        series(200, false),
    );
    let a = sim.simulate(&PARAMS).unwrap();
    let b = sim.simulate(&PARAMS).unwrap();
    assert_eq!(a.len(), 200);
    assert!(a.iter().zip(&b).all(|(x, y)| x.to_bits() == y.to_bits()));
    assert!(a.iter().all(|&q| q >= 0.0));
}

#[test]
fn wrong_parameter_count() {
    let sim = simulator(
        ModelNames::new("HydroMod1").with_pet("Oudin"),
        RunConfig::new(TimeStep::Daily),
        series(20, false),
    );
    assert!(matches!(
        sim.simulate(&PARAMS[..5]),
        Err(SimulationError::ParameterCount { expected: 6, got: 5 })
    ));
}

#[test]
fn observed_pet_must_exist() {
    let models = ModelRegistry::builtin()
        .resolve(&ModelNames::new("HydroMod1"))
        .unwrap();
    let err = Simulator::new(
        models,
        RunConfig::new(TimeStep::Daily).with_pet_source(PetSource::Observed),
        series(20, false),
    )
    .unwrap_err();
    assert!(matches!(
        err,
        SimulationError::MissingInputs { ref fields, .. } if fields == &vec![Field::Pet]
    ));
}

#[test]
fn computed_pet_needs_a_model() {
    let models = ModelRegistry::builtin()
        .resolve(&ModelNames::new("HydroMod1"))
        .unwrap();
    assert!(matches!(
        Simulator::new(models, RunConfig::new(TimeStep::Daily), series(20, false)),
        Err(SimulationError::InvalidConfig { .. })
    ));
}

#[test]
fn calibrated_snow_parameters_extend_the_vector() {
    let hyper = SnowHyperParameters::new(vec![500.0, 800.0, 1000.0, 1300.0, 1800.0], 250.0);
    let config = RunConfig::new(TimeStep::Daily).with_snow(SnowRouting::SnowThenRain {
        hyper,
        params: SnowParams::Calibrated,
    });
    let sim = simulator(
        ModelNames::new("HydroMod1")
            .with_pet("Oudin")
            .with_snow("CemaNeige"),
        config,
        series(100, false),
    );
    assert_eq!(sim.n_params(), 8);
    assert_eq!(sim.parameter_names()[6..], ["ctg", "kf"]);
    let mut params = PARAMS.to_vec();
    params.extend([0.25, 3.74]);
    let q = sim.simulate(&params).unwrap();
    assert!(q.iter().all(|&v| v >= 0.0));
}

#[test]
fn snow_chain_differs_from_rain_only() {
    let hyper = SnowHyperParameters::new(vec![500.0, 800.0, 1000.0, 1300.0, 1800.0], 250.0);
    let names = ModelNames::new("HydroMod1")
        .with_pet("Oudin")
        .with_snow("CemaNeige");
    let rain = simulator(names.clone(), RunConfig::new(TimeStep::Daily), series(60, false));
    let snow = simulator(
        names,
        RunConfig::new(TimeStep::Daily).with_snow(SnowRouting::SnowThenRain {
            hyper,
            params: SnowParams::Default,
        }),
        series(60, false),
    );
    assert_eq!(snow.n_params(), 6);
    assert_ne!(rain.simulate(&PARAMS).unwrap(), snow.simulate(&PARAMS).unwrap());
}

#[test]
fn warm_up_changes_initial_state() {
    let full = series(400, true);
    let begin = full.dates()[380];
    let window = full.crop(begin, *full.dates().last().unwrap()).unwrap();
    let warm = WarmUp::select(&full, begin, TimeStep::Daily).unwrap();
    assert!(!warm.is_continuous());

    let cold = simulator(
        ModelNames::new("HydroMod1"),
        RunConfig::new(TimeStep::Daily).with_pet_source(PetSource::Observed),
        window.clone(),
    );
    let warmed = simulator(
        ModelNames::new("HydroMod1"),
        RunConfig::new(TimeStep::Daily)
            .with_pet_source(PetSource::Observed)
            .with_warm_up(warm),
        window,
    );
    assert_ne!(cold.simulate(&PARAMS).unwrap(), warmed.simulate(&PARAMS).unwrap());
}

fn ensemble_config() -> EnsembleConfig {
    EnsembleConfig::new(16, ["R", "T"])
        .with_seed(42)
        .with_uncertainties(Uncertainties::default())
}

#[test]
fn ensemble_run_is_seeded_and_non_negative() {
    let names = ModelNames::new("HydroMod1")
        .with_pet("Oudin")
        .with_assimilation("EnsembleKalmanFilter");
    let config = RunConfig::new(TimeStep::Daily).with_mode(RunMode::Ensemble(ensemble_config()));
    let sim = simulator(names, config, series(120, false));
    assert!(sim.is_ensemble());

    let a = sim.simulate_ensemble(&PARAMS).unwrap();
    let b = sim.simulate_ensemble(&PARAMS).unwrap();
    assert_eq!(a.n_members(), 16);
    assert_eq!(a.mean().len(), 120);
    assert_eq!(a, b);
    assert!(a.members().iter().flatten().all(|&q| q >= 0.0));
}

fn ensemble_flows(obs: ObservationSeries, period: usize) -> Vec<Vec<f64>> {
    let names = ModelNames::new("HydroMod1")
        .with_pet("Oudin")
        .with_assimilation("EnsembleKalmanFilter");
    let config = RunConfig::new(TimeStep::Daily)
        .with_mode(RunMode::Ensemble(ensemble_config().with_period(period)));
    simulator(names, config, obs)
        .simulate_ensemble(&PARAMS)
        .unwrap()
        .members()
        .to_vec()
}

fn without_streamflow(n: usize) -> ObservationSeries {
    let obs = series(n, false);
    ObservationSeries::new(ObservationRecord {
        latitude: obs.latitude(),
        dates: obs.dates().to_vec(),
        precip: obs.precip().to_vec(),
        temp: obs.temp().to_vec(),
        tmin: None,
        tmax: None,
        streamflow: vec![f64::NAN; n],
        pet: None,
    })
    .unwrap()
}

#[test]
fn missing_streamflow_skips_every_analysis() {
    let n = 120;
    let no_analysis = ensemble_flows(series(n, false), n + 1);
    let unobserved = ensemble_flows(without_streamflow(n), 1);
    assert_eq!(unobserved, no_analysis);
}

#[test]
fn observed_streamflow_updates_members() {
    let n = 120;
    let no_analysis = ensemble_flows(series(n, false), n + 1);
    let assimilated = ensemble_flows(series(n, false), 1);
    assert_ne!(assimilated, no_analysis);
}

#[test]
fn members_first_diverge_after_one_period() {
    let (n, period) = (120, 10);
    let no_analysis = ensemble_flows(series(n, false), n + 1);
    let assimilated = ensemble_flows(series(n, false), period);

    // The first analysis follows step `period - 1`; flows are recorded
    // before it, so the trajectories agree up to that step.
    for (a, b) in assimilated.iter().zip(&no_analysis) {
        assert_eq!(a[..period], b[..period]);
    }
    assert!(
        assimilated
            .iter()
            .zip(&no_analysis)
            .any(|(a, b)| a[period] != b[period])
    );
}

#[test]
fn ensemble_requires_ensemble_mode() {
    let sim = simulator(
        ModelNames::new("HydroMod1").with_pet("Oudin"),
        RunConfig::new(TimeStep::Daily),
        series(20, false),
    );
    assert!(matches!(
        sim.simulate_ensemble(&PARAMS),
        Err(SimulationError::InvalidConfig { .. })
    ));
}

#[test]
fn unknown_reservoir_is_a_configuration_error() {
    let models = ModelRegistry::builtin()
        .resolve(
            &ModelNames::new("HydroMod1")
                .with_pet("Oudin")
                .with_assimilation("EnsembleKalmanFilter"),
        )
        .unwrap();
    let config = RunConfig::new(TimeStep::Daily)
        .with_mode(RunMode::Ensemble(EnsembleConfig::new(8, ["Groundwater"])));
    let err = Simulator::new(models, config, series(20, false)).unwrap_err();
    assert!(err.to_string().contains("Groundwater"));
}
