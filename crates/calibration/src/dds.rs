//! Dynamically Dimensioned Search.
//!
//! Tolson and Shoemaker (2007), Water Resources Research 43(1). A single
//! solution is perturbed in a random subset of dimensions whose expected
//! size shrinks as `1 - ln(i) / ln(m)` over the `m` iterations; moves are
//! kept only when they do not worsen the objective.

use hoopla_data::ParameterBounds;
use rand::Rng;
use rand::rngs::StdRng;
use rand_distr::StandardNormal;
use tracing::{debug, info};

use crate::error::CalibrationError;
use crate::make_rng;
use crate::optimizer::{Optimizer, Point};

/// Optimizer name.
pub const NAME: &str = "DDS";

/// Settings of [`DynamicallyDimensionedSearch`].
#[derive(Debug, Clone, PartialEq)]
pub struct DdsConfig {
    perturbation: f64,
    max_iterations: usize,
    seed: Option<u64>,
}

impl Default for DdsConfig {
    fn default() -> Self {
        Self {
            perturbation: 0.2,
            max_iterations: 1000,
            seed: None,
        }
    }
}

impl DdsConfig {
    /// Creates the default configuration (`r = 0.2`, 1000 iterations).
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the perturbation size `r` as a fraction of each range.
    pub fn with_perturbation(mut self, r: f64) -> Self {
        self.perturbation = r;
        self
    }

    /// Sets the number of objective evaluations, the initial guess included.
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
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

    /// Returns the neighbourhood size as a fraction of each range.
    pub fn perturbation(&self) -> f64 {
        self.perturbation
    }

    /// Returns the evaluation budget.
    pub fn max_iterations(&self) -> usize {
        self.max_iterations
    }

    /// Returns the RNG seed, if any.
    pub fn seed(&self) -> Option<u64> {
        self.seed
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`CalibrationError::InvalidConfig`] unless `0 < r <= 1` and
    /// at least one iteration is allowed.
    pub fn validate(&self) -> Result<(), CalibrationError> {
        if !(self.perturbation > 0.0 && self.perturbation <= 1.0) {
            return Err(CalibrationError::InvalidConfig {
                optimizer: NAME,
                reason: format!("r must be in (0, 1], got {}", self.perturbation),
            });
        }
        if self.max_iterations == 0 {
            return Err(CalibrationError::InvalidConfig {
                optimizer: NAME,
                reason: "max_iterations must be at least 1".into(),
            });
        }
        Ok(())
    }
}

/// The DDS optimizer.
#[derive(Debug)]
pub struct DynamicallyDimensionedSearch {
    config: DdsConfig,
    bounds: ParameterBounds,
    rng: StdRng,
    /// Dimensions with a non-empty range.
    free: Vec<usize>,
    best: Option<Point>,
    evaluations: usize,
}

impl DynamicallyDimensionedSearch {
    /// Creates the optimizer; the first candidate is the initial guess.
    ///
    /// # Errors
    ///
    /// Returns [`CalibrationError::InvalidConfig`] for an invalid config.
    pub fn new(config: DdsConfig, bounds: ParameterBounds) -> Result<Self, CalibrationError> {
        config.validate()?;
        let free = bounds
            .lower()
            .iter()
            .zip(bounds.upper())
            .enumerate()
            .filter(|(_, (lo, hi))| hi > lo)
            .map(|(j, _)| j)
            .collect();
        let rng = make_rng(config.seed);
        Ok(Self {
            config,
            bounds,
            rng,
            free,
            best: None,
            evaluations: 0,
        })
    }

    /// Probability of perturbing each dimension at iteration `i`.
    fn inclusion_probability(&self, i: usize) -> f64 {
        let m = self.config.max_iterations;
        if m <= 1 || i == 0 {
            return 1.0;
        }
        1.0 - (i as f64).ln() / (m as f64).ln()
    }

    /// Gaussian step in dimension `j`, reflected at the bounds.
    fn perturb(&mut self, j: usize, value: f64) -> f64 {
        let lo = self.bounds.lower()[j];
        let hi = self.bounds.upper()[j];
        let z: f64 = self.rng.sample(StandardNormal);
        let mut v = value + self.config.perturbation * (hi - lo) * z;
        if v < lo {
            v = lo + (lo - v);
            if v > hi {
                v = lo;
            }
        } else if v > hi {
            v = hi - (v - hi);
            if v < lo {
                v = hi;
            }
        }
        v
    }
}

impl Optimizer for DynamicallyDimensionedSearch {
    fn name(&self) -> &'static str {
        NAME
    }

    fn propose(&mut self) -> Option<Vec<f64>> {
        if self.evaluations >= self.config.max_iterations {
            return None;
        }
        let Some(best) = self.best.as_ref() else {
            return Some(self.bounds.initial().to_vec());
        };
        let mut x = best.x.clone();
        let p = self.inclusion_probability(self.evaluations);

        let mut selected: Vec<usize> = Vec::new();
        for &j in &self.free {
            if self.rng.random::<f64>() < p {
                selected.push(j);
            }
        }
        if selected.is_empty() && !self.free.is_empty() {
            selected.push(self.free[self.rng.random_range(0..self.free.len())]);
        }
        for j in selected {
            x[j] = self.perturb(j, x[j]);
        }
        Some(x)
    }

    fn observe(&mut self, candidate: Vec<f64>, objective: f64) {
        self.evaluations += 1;
        let point = Point::new(candidate, objective);
        if self.best.as_ref().is_none_or(|b| point.f <= b.f) {
            debug!(iteration = self.evaluations, objective = point.f, "improvement accepted");
            self.best = Some(point);
        }
        if self.evaluations == self.config.max_iterations {
            info!(
                optimizer = NAME,
                evaluations = self.evaluations,
                best = self.best.as_ref().map(|p| p.f),
                "search finished"
            );
        }
    }

    fn best(&self) -> Option<(&[f64], f64)> {
        self.best.as_ref().map(|p| (p.x.as_slice(), p.f))
    }

    fn n_evaluations(&self) -> usize {
        self.evaluations
    }
}
