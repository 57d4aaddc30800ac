//! Shuffled Complex Evolution (SCE-UA).
//!
//! Duan, Sorooshian and Gupta (1992), Water Resources Research 28(4).
//! A population of `ngs * (2n + 1)` points is partitioned into complexes;
//! each complex evolves through competitive simplex steps (reflection,
//! contraction, random mutation) before the complexes are shuffled back
//! into one population. The search stops on the evaluation budget, when
//! the population has collapsed (`peps`), or when the best objective moved
//! by less than `pcento` percent over `kstop` shuffling loops.

use hoopla_data::ParameterBounds;
use rand::Rng;
use rand::rngs::StdRng;
use tracing::{debug, info};

use crate::error::CalibrationError;
use crate::make_rng;
use crate::optimizer::{Optimizer, Point, sort_points, uniform_in};

/// Optimizer name.
pub const NAME: &str = "SCE";

/// Settings of [`ShuffledComplexEvolution`].
#[derive(Debug, Clone, PartialEq)]
pub struct SceConfig {
    complexes: usize,
    kstop: usize,
    pcento: f64,
    peps: f64,
    max_evaluations: usize,
    seed: Option<u64>,
}

impl Default for SceConfig {
    fn default() -> Self {
        Self {
            complexes: 5,
            kstop: 10,
            pcento: 0.1,
            peps: 1e-3,
            max_evaluations: 10_000,
            seed: None,
        }
    }
}

impl SceConfig {
    /// Creates the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the number of complexes (`ngs`).
    pub fn with_complexes(mut self, complexes: usize) -> Self {
        self.complexes = complexes;
        self
    }

    /// Sets the number of shuffling loops the objective must stall over.
    pub fn with_kstop(mut self, kstop: usize) -> Self {
        self.kstop = kstop;
        self
    }

    /// Sets the relative objective change (percent) considered a stall.
    pub fn with_pcento(mut self, pcento: f64) -> Self {
        self.pcento = pcento;
        self
    }

    /// Sets the normalised population spread considered converged.
    pub fn with_peps(mut self, peps: f64) -> Self {
        self.peps = peps;
        self
    }

    /// Sets the evaluation budget.
    pub fn with_max_evaluations(mut self, max_evaluations: usize) -> Self {
        self.max_evaluations = max_evaluations;
        self
    }

    /// Sets the RNG seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Sets the RNG seed if given.
    pub fn with_seed_opt(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    /// Returns the number of complexes.
    pub fn complexes(&self) -> usize {
        self.complexes
    }

    /// Returns the number of shuffling loops in the stall window.
    pub fn kstop(&self) -> usize {
        self.kstop
    }

    /// Returns the minimum relative objective change (%) over the stall window.
    pub fn pcento(&self) -> f64 {
        self.pcento
    }

    /// Returns the normalised parameter-range threshold for convergence.
    pub fn peps(&self) -> f64 {
        self.peps
    }

    /// Returns the evaluation budget.
    pub fn max_evaluations(&self) -> usize {
        self.max_evaluations
    }

    /// Returns the RNG seed, if any.
    pub fn seed(&self) -> Option<u64> {
        self.seed
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`CalibrationError::InvalidConfig`] for zero complexes,
    /// `kstop` or budget, or for non-positive tolerances.
    pub fn validate(&self) -> Result<(), CalibrationError> {
        let invalid = |reason: String| CalibrationError::InvalidConfig {
            optimizer: NAME,
            reason,
        };
        if self.complexes == 0 {
            return Err(invalid("at least one complex is required".into()));
        }
        if self.kstop == 0 {
            return Err(invalid("kstop must be at least 1".into()));
        }
        if self.max_evaluations == 0 {
            return Err(invalid("max_evaluations must be at least 1".into()));
        }
        if !(self.pcento.is_finite() && self.pcento >= 0.0) {
            return Err(invalid(format!("pcento must be >= 0, got {}", self.pcento)));
        }
        if !(self.peps.is_finite() && self.peps > 0.0) {
            return Err(invalid(format!("peps must be > 0, got {}", self.peps)));
        }
        Ok(())
    }
}

/// Why the search ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The evaluation budget is spent.
    MaxEvaluations,
    /// The population collapsed below `peps`.
    PopulationConverged,
    /// The best objective stalled over `kstop` loops.
    ObjectiveStalled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Trial {
    Reflection,
    Contraction,
    Mutation,
}

#[derive(Debug)]
struct Simplex {
    /// Ascending indices into the (sorted) complex; the last is the worst.
    members: Vec<usize>,
    trial: Trial,
}

#[derive(Debug)]
struct Evolution {
    complexes: Vec<Vec<Point>>,
    complex: usize,
    step: usize,
    simplex: Option<Simplex>,
}

#[derive(Debug)]
enum Phase {
    Sampling,
    Evolving(Evolution),
    Finished(StopReason),
}

/// The SCE-UA optimizer.
#[derive(Debug)]
pub struct ShuffledComplexEvolution {
    config: SceConfig,
    bounds: ParameterBounds,
    rng: StdRng,
    /// Points per complex.
    npg: usize,
    /// Points per simplex.
    nps: usize,
    population: Vec<Point>,
    phase: Phase,
    best: Option<Point>,
    criteria: Vec<f64>,
    evaluations: usize,
}

impl ShuffledComplexEvolution {
    /// Creates the optimizer over `bounds`. The initial guess is the first
    /// member of the starting population.
    ///
    /// # Errors
    ///
    /// Returns [`CalibrationError::InvalidConfig`] for an invalid config.
    pub fn new(config: SceConfig, bounds: ParameterBounds) -> Result<Self, CalibrationError> {
        config.validate()?;
        let n = bounds.len();
        let rng = make_rng(config.seed);
        Ok(Self {
            npg: 2 * n + 1,
            nps: n + 1,
            config,
            bounds,
            rng,
            population: Vec::new(),
            phase: Phase::Sampling,
            best: None,
            criteria: Vec::new(),
            evaluations: 0,
        })
    }

    /// Size of the shuffled population.
    pub fn population_size(&self) -> usize {
        self.npg * self.config.complexes
    }

    /// Why the search ended, once it has.
    pub fn stop_reason(&self) -> Option<StopReason> {
        match self.phase {
            Phase::Finished(reason) => Some(reason),
            _ => None,
        }
    }

    /// Normalised geometric range of the population: 1 when it spans the
    /// whole box, 0 when it collapsed onto a point.
    fn spread(&self) -> f64 {
        let mut log_sum = 0.0;
        let mut free = 0usize;
        for (j, (&lo, &hi)) in self.bounds.lower().iter().zip(self.bounds.upper()).enumerate() {
            if hi <= lo {
                continue;
            }
            let (min, max) = self
                .population
                .iter()
                .map(|p| p.x[j])
                .fold((f64::INFINITY, f64::NEG_INFINITY), |(a, b), v| (a.min(v), b.max(v)));
            log_sum += ((max - min) / (hi - lo)).ln();
            free += 1;
        }
        if free == 0 {
            return 0.0;
        }
        (log_sum / free as f64).exp()
    }

    fn check_convergence(&self) -> Option<StopReason> {
        if self.evaluations >= self.config.max_evaluations {
            return Some(StopReason::MaxEvaluations);
        }
        if self.spread() < self.config.peps {
            return Some(StopReason::PopulationConverged);
        }
        let k = self.config.kstop;
        if self.criteria.len() > k {
            let window = &self.criteria[self.criteria.len() - k - 1..];
            let change = (window[k] - window[0]).abs() * 100.0;
            let scale = window.iter().map(|c| c.abs()).sum::<f64>() / window.len() as f64;
            if change == 0.0 || (scale > 0.0 && change / scale < self.config.pcento) {
                return Some(StopReason::ObjectiveStalled);
            }
        }
        None
    }

    fn finish(&mut self, reason: StopReason) {
        info!(
            optimizer = NAME,
            ?reason,
            evaluations = self.evaluations,
            best = self.best.as_ref().map(|p| p.f),
            "search finished"
        );
        self.phase = Phase::Finished(reason);
    }

    /// Deals the sorted population into complexes: complex `k` receives
    /// ranks `k, k + ngs, k + 2 ngs, ...`.
    fn start_evolution(&mut self) {
        let ngs = self.config.complexes;
        let mut complexes = vec![Vec::with_capacity(self.npg); ngs];
        for (rank, point) in std::mem::take(&mut self.population).into_iter().enumerate() {
            complexes[rank % ngs].push(point);
        }
        self.phase = Phase::Evolving(Evolution {
            complexes,
            complex: 0,
            step: 0,
            simplex: None,
        });
    }

    /// Shuffles every complex back into the population and decides whether
    /// to go on.
    fn end_loop(&mut self) {
        let Phase::Evolving(evolution) = std::mem::replace(&mut self.phase, Phase::Sampling) else {
            return;
        };
        let mut population: Vec<Point> = evolution.complexes.into_iter().flatten().collect();
        sort_points(&mut population);
        self.population = population;
        let best = self.population.first().map_or(f64::INFINITY, |p| p.f);
        self.criteria.push(best);
        debug!(
            loop_index = self.criteria.len(),
            best,
            spread = self.spread(),
            evaluations = self.evaluations,
            "complexes shuffled"
        );
        match self.check_convergence() {
            Some(reason) => self.finish(reason),
            None => self.start_evolution(),
        }
    }
}

/// Draws `nps` distinct ranks out of `npg` from a trapezoidal distribution
/// favouring the best points. Rank 0 is always included.
fn select_simplex(npg: usize, nps: usize, rng: &mut impl Rng) -> Vec<usize> {
    let n = npg as f64;
    let mut members = vec![0];
    while members.len() < nps {
        let mut pick = None;
        for _ in 0..1000 {
            let u: f64 = rng.random();
            let rank = (n + 0.5 - ((n + 0.5).powi(2) - n * (n + 1.0) * u).sqrt()).floor();
            let rank = (rank.max(0.0) as usize).min(npg - 1);
            if !members.contains(&rank) {
                pick = Some(rank);
                break;
            }
        }
        let Some(rank) = pick.or_else(|| (0..npg).find(|r| !members.contains(r))) else {
            break;
        };
        members.push(rank);
    }
    members.sort_unstable();
    members
}

impl Optimizer for ShuffledComplexEvolution {
    fn name(&self) -> &'static str {
        NAME
    }

    fn propose(&mut self) -> Option<Vec<f64>> {
        if !matches!(self.phase, Phase::Finished(_))
            && self.evaluations >= self.config.max_evaluations
        {
            self.finish(StopReason::MaxEvaluations);
        }
        match &mut self.phase {
            Phase::Finished(_) => None,
            Phase::Sampling => Some(if self.population.is_empty() {
                self.bounds.initial().to_vec()
            } else {
                uniform_in(&self.bounds, &mut self.rng)
            }),
            Phase::Evolving(evolution) => {
                let simplex = evolution.simplex.get_or_insert_with(|| Simplex {
                    members: select_simplex(self.npg, self.nps, &mut self.rng),
                    trial: Trial::Reflection,
                });
                let complex = &evolution.complexes[evolution.complex];
                let (worst, others) = simplex.members.split_last()?;
                let sw = &complex[*worst].x;
                let centroid: Vec<f64> = (0..sw.len())
                    .map(|j| others.iter().map(|&i| complex[i].x[j]).sum::<f64>() / others.len() as f64)
                    .collect();
                Some(match simplex.trial {
                    Trial::Reflection => {
                        let x: Vec<f64> =
                            centroid.iter().zip(sw).map(|(c, w)| 2.0 * c - w).collect();
                        if self.bounds.contains(&x) {
                            x
                        } else {
                            uniform_in(&self.bounds, &mut self.rng)
                        }
                    }
                    Trial::Contraction => centroid.iter().zip(sw).map(|(c, w)| w + 0.5 * (c - w)).collect(),
                    Trial::Mutation => uniform_in(&self.bounds, &mut self.rng),
                })
            }
        }
    }

    fn observe(&mut self, candidate: Vec<f64>, objective: f64) {
        self.evaluations += 1;
        let point = Point::new(candidate, objective);
        if self.best.as_ref().is_none_or(|b| point.f < b.f) {
            self.best = Some(point.clone());
        }

        if matches!(self.phase, Phase::Sampling) {
            self.population.push(point);
            if self.population.len() == self.population_size() {
                sort_points(&mut self.population);
                debug!(
                    population = self.population.len(),
                    best = self.population[0].f,
                    "initial population evaluated"
                );
                match self.check_convergence() {
                    Some(reason) => self.finish(reason),
                    None => self.start_evolution(),
                }
            }
            return;
        }

        let Phase::Evolving(evolution) = &mut self.phase else {
            return;
        };
        let Some(simplex) = evolution.simplex.as_mut() else {
            return;
        };
        let complex = &mut evolution.complexes[evolution.complex];
        let Some(&worst) = simplex.members.last() else {
            return;
        };
        if point.f > complex[worst].f {
            match simplex.trial {
                Trial::Reflection => {
                    simplex.trial = Trial::Contraction;
                    return;
                }
                Trial::Contraction => {
                    simplex.trial = Trial::Mutation;
                    return;
                }
                Trial::Mutation => {}
            }
        }
        complex[worst] = point;
        sort_points(complex);
        evolution.simplex = None;
        evolution.step += 1;
        if evolution.step == self.npg {
            evolution.step = 0;
            evolution.complex += 1;
        }
        if evolution.complex == evolution.complexes.len() {
            self.end_loop();
        }
    }

    fn best(&self) -> Option<(&[f64], f64)> {
        self.best.as_ref().map(|p| (p.x.as_slice(), p.f))
    }

    fn n_evaluations(&self) -> usize {
        self.evaluations
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bounds(n: usize) -> ParameterBounds {
        ParameterBounds::new(vec![0.9; n], vec![-1.0; n], vec![1.0; n]).unwrap()
    }

    fn shifted_sphere(x: &[f64]) -> f64 {
        let target = [0.3, -0.2, 0.7];
        x.iter().zip(target).map(|(a, b)| (a - b).powi(2)).sum()
    }

    fn drive(opt: &mut ShuffledComplexEvolution, f: impl Fn(&[f64]) -> f64) -> Vec<Vec<f64>> {
        let mut proposed = Vec::new();
        while let Some(x) = opt.propose() {
            let y = f(&x);
            proposed.push(x.clone());
            opt.observe(x, y);
        }
        proposed
    }

    #[test]
    fn finds_sphere_minimum() {
        let mut opt = ShuffledComplexEvolution::new(SceConfig::new().with_seed(42), bounds(3)).unwrap();
        drive(&mut opt, shifted_sphere);
        let (x, f) = opt.best().unwrap();
        assert!(f < 1e-4, "best objective {f}");
        assert!((x[0] - 0.3).abs() < 1e-2);
        assert!((x[1] + 0.2).abs() < 1e-2);
        assert!((x[2] - 0.7).abs() < 1e-2);
        assert!(opt.stop_reason().is_some());
    }

    #[test]
    fn proposals_stay_in_bounds_and_start_at_initial() {
        let b = bounds(3);
        let mut opt = ShuffledComplexEvolution::new(SceConfig::new().with_seed(1), b.clone()).unwrap();
        let proposed = drive(&mut opt, shifted_sphere);
        assert_eq!(proposed[0], vec![0.9; 3]);
        assert!(proposed.iter().all(|x| b.contains(x)));
    }

    #[test]
    fn budget_is_respected() {
        let config = SceConfig::new().with_seed(5).with_max_evaluations(50);
        let mut opt = ShuffledComplexEvolution::new(config, bounds(3)).unwrap();
        drive(&mut opt, shifted_sphere);
        assert_eq!(opt.n_evaluations(), 50);
        assert_eq!(opt.stop_reason(), Some(StopReason::MaxEvaluations));
    }

    #[test]
    fn same_seed_same_search() {
        let run = |seed| {
            let mut opt =
                ShuffledComplexEvolution::new(SceConfig::new().with_seed(seed), bounds(3)).unwrap();
            drive(&mut opt, shifted_sphere);
            (opt.best().unwrap().0.to_vec(), opt.n_evaluations())
        };
        assert_eq!(run(9), run(9));
    }

    #[test]
    fn simplex_is_distinct_and_contains_best() {
        let mut rng = make_rng(Some(0));
        for _ in 0..200 {
            let s = select_simplex(7, 4, &mut rng);
            assert_eq!(s.len(), 4);
            assert_eq!(s[0], 0);
            assert!(s.windows(2).all(|w| w[0] < w[1]));
            assert!(s.iter().all(|&r| r < 7));
        }
    }

    #[test]
    fn invalid_config_is_rejected() {
        assert!(SceConfig::new().with_complexes(0).validate().is_err());
        assert!(SceConfig::new().with_peps(0.0).validate().is_err());
        assert!(SceConfig::new().with_max_evaluations(0).validate().is_err());
        assert!(SceConfig::new().validate().is_ok());
    }
}
