//! The simulation engine: warm-up, main loop, ensemble branch and forecast
//! branch over one model chain.

use chrono::{NaiveDateTime, Timelike};
use hoopla_assimilation::{EnsembleConfig, PerturbedForcing, make_rng};
use hoopla_calendar::TimeStep;
use hoopla_data::{Field, MemberForcing, MeteoForecast, ObservationSeries};
use hoopla_models::{
    DaConfig, DataAssimilation, EnsembleObservation, Pet, PetHyperParameters, PetInputs,
    RainfallRunoff, RunoffInputs, RunoffState, SnowAccounting, SnowHyperParameters, SnowInputs,
    SnowState,
};
use tracing::{debug, info, warn};

use crate::config::{ForecastConfig, PetSource, RunConfig, RunMode, SnowParams, SnowRouting};
use crate::error::SimulationError;
use crate::registry::ModelSet;
use crate::result::{EnsembleRun, ForecastRun};

/// Forcing of one step of the model chain.
#[derive(Debug, Clone, Copy)]
struct StepForcing {
    precip: f64,
    temp: f64,
    tmin: Option<f64>,
    tmax: Option<f64>,
    pet: f64,
}

/// Borrowed forcing series of one realization.
#[derive(Debug, Clone, Copy)]
struct Forcing<'a> {
    precip: &'a [f64],
    temp: &'a [f64],
    tmin: Option<&'a [f64]>,
    tmax: Option<&'a [f64]>,
    pet: &'a [f64],
}

impl<'a> Forcing<'a> {
    fn observed(series: &'a ObservationSeries, pet: &'a [f64]) -> Self {
        Self {
            precip: series.precip(),
            temp: series.temp(),
            tmin: series.tmin(),
            tmax: series.tmax(),
            pet,
        }
    }

    fn at(&self, t: usize) -> StepForcing {
        StepForcing {
            precip: self.precip[t],
            temp: self.temp[t],
            tmin: self.tmin.map(|v| v[t]),
            tmax: self.tmax.map(|v| v[t]),
            pet: self.pet[t],
        }
    }
}

/// How precipitation reaches the rainfall-runoff model.
enum Chain {
    RainOnly,
    SnowThenRain {
        model: Box<dyn SnowAccounting>,
        hyper: SnowHyperParameters,
        /// `None` when the parameters are calibrated.
        fixed: Option<Vec<f64>>,
    },
}

enum PetSupply {
    Observed,
    Computed {
        model: Box<dyn Pet>,
        hyper: PetHyperParameters,
    },
}

enum Mode {
    Deterministic,
    Ensemble {
        config: EnsembleConfig,
        filter: Box<dyn DataAssimilation>,
        da: DaConfig,
    },
}

/// Parameters of each model of the chain.
struct ChainParams<'a> {
    runoff: &'a [f64],
    snow: &'a [f64],
}

#[derive(Debug, Clone)]
struct ChainState {
    runoff: RunoffState,
    snow: Option<SnowState>,
}

/// Runs one model combination over one observation window.
///
/// Everything that does not depend on the parameters (model dispatch,
/// input checks, deterministic PET) is resolved by [`Simulator::new`].
pub struct Simulator {
    runoff: Box<dyn RainfallRunoff>,
    chain: Chain,
    pet: PetSupply,
    mode: Mode,
    time_step: TimeStep,
    obs: ObservationSeries,
    evap: Vec<f64>,
    warm_up: Option<(ObservationSeries, Vec<f64>)>,
}

impl std::fmt::Debug for Simulator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Simulator")
            .field("runoff", &self.runoff.name())
            .field("time_step", &self.time_step)
            .field("steps", &self.obs.len())
            .field("warm_up", &self.warm_up.as_ref().map(|(s, _)| s.len()))
            .finish_non_exhaustive()
    }
}

impl Simulator {
    /// Resolves `config` against `models` for a run over `obs`.
    ///
    /// # Errors
    ///
    /// - [`SimulationError::InvalidConfig`] when the configuration needs a
    ///   model the set lacks, or names a store the rainfall-runoff model
    ///   does not have.
    /// - [`SimulationError::MissingInputs`] when the observations or the
    ///   warm-up lack a field an active model reads.
    /// - Data or model errors for irregular dates or invalid catchment
    ///   descriptors.
    pub fn new(
        models: ModelSet,
        config: RunConfig,
        obs: ObservationSeries,
    ) -> Result<Self, SimulationError> {
        config.validate()?;
        let time_step = config.time_step();
        obs.ensure_time_step(time_step)?;
        let ModelSet {
            runoff,
            pet,
            snow,
            assimilation,
        } = models;

        let pet = match config.pet_source() {
            PetSource::Observed => PetSupply::Observed,
            PetSource::Computed => PetSupply::Computed {
                model: pet.ok_or_else(|| SimulationError::InvalidConfig {
                    reason: "PET is computed but no PET model was given".into(),
                })?,
                hyper: PetHyperParameters {
                    latitude: obs.latitude(),
                },
            },
        };

        let chain = match config.snow() {
            SnowRouting::RainOnly => {
                if let Some(s) = snow {
                    debug!(model = s.name(), "snow model unused by a rain-only run");
                }
                Chain::RainOnly
            }
            SnowRouting::SnowThenRain { hyper, params } => {
                let model = snow.ok_or_else(|| SimulationError::InvalidConfig {
                    reason: "snow routing requested but no snow model was given".into(),
                })?;
                hyper.validate(model.name())?;
                let fixed = match params {
                    SnowParams::Default => Some(model.default_parameters(time_step)),
                    SnowParams::Fixed(v) => Some(v.clone()),
                    SnowParams::Calibrated => None,
                };
                if let Some(v) = &fixed
                    && v.len() != model.n_params()
                {
                    return Err(SimulationError::ParameterCount {
                        expected: model.n_params(),
                        got: v.len(),
                    });
                }
                Chain::SnowThenRain {
                    model,
                    hyper: hyper.clone(),
                    fixed,
                }
            }
        };

        let mode = match config.mode() {
            RunMode::Deterministic => Mode::Deterministic,
            RunMode::Ensemble(e) => {
                let filter = assimilation.ok_or_else(|| SimulationError::InvalidConfig {
                    reason: "ensemble run requested but no assimilation scheme was given"
                        .into(),
                })?;
                let stores = runoff.state_names();
                if let Some(r) = e.reservoirs().iter().find(|r| !stores.contains(&r.as_str())) {
                    return Err(SimulationError::InvalidConfig {
                        reason: format!(
                            "{} has no store '{r}', available: {stores:?}",
                            runoff.name()
                        ),
                    });
                }
                Mode::Ensemble {
                    da: DaConfig::new(e.reservoirs().iter().cloned()),
                    config: e.clone(),
                    filter,
                }
            }
        };

        let mut sim = Self {
            runoff,
            chain,
            pet,
            mode,
            time_step,
            obs,
            evap: Vec::new(),
            warm_up: None,
        };
        sim.check_inputs(&sim.obs)?;
        if let Chain::SnowThenRain { model, .. } = &sim.chain
            && !(sim.obs.has(Field::Tmin) && sim.obs.has(Field::Tmax))
        {
            warn!(
                model = model.name(),
                "Tmin/Tmax not available, snow fraction computed from mean temperature"
            );
        }
        sim.evap = sim.pet_series(sim.obs.dates(), sim.obs.temp(), sim.obs.pet())?;

        if let Some(w) = config.warm_up() {
            let series = w.series().clone();
            sim.check_inputs(&series)?;
            let evap = sim.pet_series(series.dates(), series.temp(), series.pet())?;
            if !w.is_continuous() {
                info!("warm-up on a synthetic mean year");
            }
            sim.warm_up = Some((series, evap));
        }

        info!(
            runoff = sim.runoff.name(),
            steps = sim.obs.len(),
            params = sim.n_params(),
            "simulator ready"
        );
        Ok(sim)
    }

    /// Length of the parameter vector [`Simulator::simulate`] expects.
    pub fn n_params(&self) -> usize {
        self.runoff.n_params()
            + match &self.chain {
                Chain::SnowThenRain {
                    model, fixed: None, ..
                } => model.n_params(),
                _ => 0,
            }
    }

    /// Names of the parameters, in vector order.
    pub fn parameter_names(&self) -> Vec<&'static str> {
        let mut names = self.runoff.parameter_names().to_vec();
        if let Chain::SnowThenRain {
            model, fixed: None, ..
        } = &self.chain
        {
            names.extend_from_slice(model.parameter_names());
        }
        names
    }

    /// The observation window being simulated.
    pub fn observations(&self) -> &ObservationSeries {
        &self.obs
    }

    /// Returns `true` if the run assimilates into an ensemble.
    pub fn is_ensemble(&self) -> bool {
        matches!(self.mode, Mode::Ensemble { .. })
    }

    /// Deterministic streamflow for `params` from the observed forcing.
    ///
    /// Repeated calls with the same parameters give identical output.
    ///
    /// # Errors
    ///
    /// Returns [`SimulationError::ParameterCount`] for a vector of the wrong
    /// length, or the first model error.
    #[tracing::instrument(level = "debug", skip_all)]
    pub fn simulate(&self, params: &[f64]) -> Result<Vec<f64>, SimulationError> {
        self.run_deterministic(params, |_, _, _| Ok(()))
    }

    /// Ensemble streamflow with sequential assimilation.
    ///
    /// Members are stepped with their own perturbed forcing; every
    /// `period` steps with an observed streamflow the assimilation scheme
    /// corrects all member states at once. Reported flows are the values
    /// before correction.
    ///
    /// # Errors
    ///
    /// Returns [`SimulationError::InvalidConfig`] in deterministic mode, or
    /// the first model or assimilation error.
    #[tracing::instrument(skip_all)]
    pub fn simulate_ensemble(&self, params: &[f64]) -> Result<EnsembleRun, SimulationError> {
        self.run_ensemble(params, |_, _, _, _| Ok(()))
    }

    /// Simulates and branches a forecast at every issuance of `meteo`.
    ///
    /// Each issued forecast starts from the state after the issuance step
    /// and is stepped over the horizon with the forecast forcing. In
    /// ensemble mode every assimilated member is combined with every
    /// meteorological member.
    ///
    /// # Errors
    ///
    /// Returns [`SimulationError::ForecastMismatch`] if `meteo` is not aligned
    /// to the simulated window, or any simulation error.
    #[tracing::instrument(skip_all, fields(horizon = meteo.horizon()))]
    pub fn forecast(
        &self,
        params: &[f64],
        meteo: &MeteoForecast,
        config: &ForecastConfig,
    ) -> Result<ForecastRun, SimulationError> {
        config.validate()?;
        if meteo.len() != self.obs.len() {
            return Err(SimulationError::ForecastMismatch {
                expected: self.obs.len(),
                got: meteo.len(),
            });
        }
        let horizon = meteo.horizon();
        let issued_at = |t: usize| {
            meteo.issuance(t).filter(|_| {
                config
                    .issue_hour()
                    .is_none_or(|h| self.obs.dates()[t].hour() == h)
            })
        };
        let mut forecasts: Vec<Option<Vec<Vec<f64>>>> = vec![None; self.obs.len()];

        let run = match &self.mode {
            Mode::Deterministic => {
                let simulated = self.run_deterministic(params, |t, state, p| {
                    if let Some(members) = issued_at(t) {
                        forecasts[t] = self.branch(
                            t,
                            members,
                            horizon,
                            std::slice::from_ref(&state.runoff),
                            std::slice::from_ref(&state.snow),
                            p,
                        )?;
                    }
                    Ok(())
                })?;
                ForecastRun::new(horizon, meteo.n_members(), simulated, forecasts)
            }
            Mode::Ensemble { config, .. } => {
                let ensemble = self.run_ensemble(params, |t, runoff, snow, p| {
                    if let Some(members) = issued_at(t) {
                        forecasts[t] = self.branch(t, members, horizon, runoff, snow, p)?;
                    }
                    Ok(())
                })?;
                ForecastRun::new(
                    horizon,
                    config.members() * meteo.n_members(),
                    ensemble.mean().to_vec(),
                    forecasts,
                )
            }
        };
        info!(issued = run.n_issued(), members = run.n_members(), "forecast finished");
        Ok(run)
    }

    fn check_inputs(&self, series: &ObservationSeries) -> Result<(), SimulationError> {
        let mut required: Vec<(&str, &[Field])> =
            vec![(self.runoff.name(), self.runoff.inputs())];
        match &self.pet {
            PetSupply::Computed { model, .. } => required.push((model.name(), model.inputs())),
            PetSupply::Observed => required.push(("observed PET", &[Field::Pet][..])),
        }
        if let Chain::SnowThenRain { model, .. } = &self.chain {
            required.push((model.name(), model.inputs()));
        }
        if let Mode::Ensemble { filter, .. } = &self.mode {
            required.push((filter.name(), &[Field::Streamflow][..]));
        }
        for (model, fields) in required {
            let missing = series.missing_fields(fields);
            if !missing.is_empty() {
                return Err(SimulationError::MissingInputs {
                    model: model.to_string(),
                    fields: missing,
                });
            }
        }
        Ok(())
    }

    /// PET over `dates`, computed or taken from `observed`.
    fn pet_series(
        &self,
        dates: &[NaiveDateTime],
        temp: &[f64],
        observed: Option<&[f64]>,
    ) -> Result<Vec<f64>, SimulationError> {
        match &self.pet {
            PetSupply::Computed { model, hyper } => {
                let terms = model.prepare(self.time_step, PetInputs { dates, temp }, hyper)?;
                Ok(model.run(&terms)?)
            }
            PetSupply::Observed => {
                observed
                    .map(<[f64]>::to_vec)
                    .ok_or_else(|| SimulationError::MissingInputs {
                        model: "observed PET".into(),
                        fields: vec![Field::Pet],
                    })
            }
        }
    }

    fn split<'a>(&'a self, params: &'a [f64]) -> Result<ChainParams<'a>, SimulationError> {
        let expected = self.n_params();
        if params.len() != expected {
            return Err(SimulationError::ParameterCount {
                expected,
                got: params.len(),
            });
        }
        let (runoff, tail) = params.split_at(self.runoff.n_params());
        let snow = match &self.chain {
            Chain::RainOnly => &[][..],
            Chain::SnowThenRain {
                fixed: Some(v), ..
            } => v.as_slice(),
            Chain::SnowThenRain { fixed: None, .. } => tail,
        };
        Ok(ChainParams { runoff, snow })
    }

    /// Initial states, warmed up when a warm-up is configured.
    fn prepare(&self, p: &ChainParams<'_>) -> Result<ChainState, SimulationError> {
        let runoff = self.runoff.prepare(p.runoff)?;
        let snow = match &self.chain {
            Chain::RainOnly => None,
            Chain::SnowThenRain { model, hyper, .. } => Some(model.prepare(p.snow, hyper)?),
        };
        let mut state = ChainState { runoff, snow };
        if let Some((series, evap)) = &self.warm_up {
            let forcing = Forcing::observed(series, evap);
            for t in 0..series.len() {
                self.step(&mut state.runoff, state.snow.as_mut(), forcing.at(t), p)?;
            }
            debug!(steps = series.len(), "states warmed up");
        }
        Ok(state)
    }

    fn step(
        &self,
        runoff: &mut RunoffState,
        snow: Option<&mut SnowState>,
        f: StepForcing,
        p: &ChainParams<'_>,
    ) -> Result<f64, SimulationError> {
        let water = match (&self.chain, snow) {
            (Chain::SnowThenRain { model, .. }, Some(state)) => model.run(
                SnowInputs {
                    precip: f.precip,
                    temp: f.temp,
                    tmin: f.tmin,
                    tmax: f.tmax,
                },
                p.snow,
                state,
            )?,
            _ => f.precip,
        };
        Ok(self.runoff.run(
            RunoffInputs {
                precip: water,
                pet: f.pet,
            },
            p.runoff,
            runoff,
        )?)
    }

    fn run_deterministic(
        &self,
        params: &[f64],
        mut after_step: impl FnMut(usize, &ChainState, &ChainParams<'_>) -> Result<(), SimulationError>,
    ) -> Result<Vec<f64>, SimulationError> {
        let p = self.split(params)?;
        let mut state = self.prepare(&p)?;
        let forcing = Forcing::observed(&self.obs, &self.evap);
        let mut flow = Vec::with_capacity(self.obs.len());
        for t in 0..self.obs.len() {
            flow.push(self.step(&mut state.runoff, state.snow.as_mut(), forcing.at(t), &p)?);
            after_step(t, &state, &p)?;
        }
        Ok(flow)
    }

    fn run_ensemble(
        &self,
        params: &[f64],
        mut after_step: impl FnMut(
            usize,
            &[RunoffState],
            &[Option<SnowState>],
            &ChainParams<'_>,
        ) -> Result<(), SimulationError>,
    ) -> Result<EnsembleRun, SimulationError> {
        let Mode::Ensemble {
            config,
            filter,
            da,
        } = &self.mode
        else {
            return Err(SimulationError::InvalidConfig {
                reason: "ensemble run requested in deterministic mode".into(),
            });
        };
        let p = self.split(params)?;
        let mut rng = make_rng(config.seed());
        let perturbed = PerturbedForcing::generate(&self.obs, config, &mut rng)?;
        let n = perturbed.members();

        let evap = (0..n)
            .map(|m| {
                self.pet_series(
                    self.obs.dates(),
                    &perturbed.temp_pet[m],
                    perturbed.pet.as_ref().map(|e| e[m].as_slice()),
                )
            })
            .collect::<Result<Vec<_>, _>>()?;
        let forcings: Vec<Forcing<'_>> = (0..n)
            .map(|m| Forcing {
                precip: &perturbed.precip[m],
                temp: &perturbed.temp_snow[m],
                tmin: perturbed.tmin.as_ref().map(|v| v[m].as_slice()),
                tmax: perturbed.tmax.as_ref().map(|v| v[m].as_slice()),
                pet: &evap[m],
            })
            .collect();

        let initial = self.prepare(&p)?;
        let mut runoff = vec![initial.runoff; n];
        let mut snow = vec![initial.snow; n];
        let len = self.obs.len();
        let mut flows = vec![Vec::with_capacity(len); n];
        let mut simulated = vec![0.0; n];
        let mut analyses = 0usize;

        for t in 0..len {
            for (m, (r, s)) in runoff.iter_mut().zip(snow.iter_mut()).enumerate() {
                let q = self.step(r, s.as_mut(), forcings[m].at(t), &p)?;
                simulated[m] = q;
                flows[m].push(q);
            }
            let observed = self.obs.streamflow()[t];
            if (t + 1) % config.period() == 0 && observed.is_finite() {
                let perturbed_q: Vec<f64> = perturbed.streamflow.iter().map(|q| q[t]).collect();
                let errors: Vec<f64> =
                    perturbed.streamflow_errors.iter().map(|e| e[t]).collect();
                let observation = EnsembleObservation {
                    simulated: &simulated,
                    observed,
                    perturbed: &perturbed_q,
                    errors: &errors,
                };
                filter.run(&mut runoff, &observation, da)?;
                analyses += 1;
            }
            after_step(t, runoff.as_slice(), snow.as_slice(), &p)?;
        }
        info!(members = n, analyses, "ensemble run finished");
        Ok(EnsembleRun::new(flows))
    }

    /// Forecast values `[lead][member]` issued after step `t`, or `None`
    /// when an input is missing.
    fn branch(
        &self,
        t: usize,
        members: &[MemberForcing],
        horizon: usize,
        runoff: &[RunoffState],
        snow: &[Option<SnowState>],
        p: &ChainParams<'_>,
    ) -> Result<Option<Vec<Vec<f64>>>, SimulationError> {
        if let Some(k) = members.iter().position(|m| !m.is_complete(horizon)) {
            debug!(step = t, member = k, "incomplete forecast forcing, issuance skipped");
            return Ok(None);
        }
        let origin = self.obs.dates()[t];
        let lead_dates: Vec<NaiveDateTime> = (1..=horizon)
            .map(|l| origin + self.time_step.duration() * l as i32)
            .collect();
        let mut evap = Vec::with_capacity(members.len());
        for m in members {
            let e = match &self.pet {
                PetSupply::Computed { .. } => {
                    Some(self.pet_series(&lead_dates, &m.temp[..horizon], None)?)
                }
                PetSupply::Observed => self
                    .obs
                    .pet()
                    .and_then(|e| e.get(t + 1..=t + horizon))
                    .map(<[f64]>::to_vec),
            };
            let Some(e) = e else {
                debug!(step = t, "no PET over the horizon, issuance skipped");
                return Ok(None);
            };
            evap.push(e);
        }

        let mut values = vec![Vec::with_capacity(runoff.len() * members.len()); horizon];
        for (r0, s0) in runoff.iter().zip(snow) {
            for (m, e) in members.iter().zip(&evap) {
                let forcing = Forcing {
                    precip: &m.precip,
                    temp: &m.temp,
                    tmin: m.tmin.as_deref(),
                    tmax: m.tmax.as_deref(),
                    pet: e,
                };
                let mut r = r0.clone();
                let mut s = s0.clone();
                for (l, row) in values.iter_mut().enumerate() {
                    row.push(self.step(&mut r, s.as_mut(), forcing.at(l), p)?);
                }
            }
        }
        Ok(Some(values))
    }
}
