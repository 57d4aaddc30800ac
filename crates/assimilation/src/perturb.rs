//! Ensemble generation by perturbing the observed forcing and streamflow.

use hoopla_data::ObservationSeries;
use rand::Rng;
use rand_distr::{Distribution, Gamma, StandardNormal};
use tracing::debug;

use crate::config::EnsembleConfig;
use crate::error::AssimilationError;

/// Per-member perturbed inputs, indexed `[member][step]`.
#[derive(Debug, Clone, PartialEq)]
pub struct PerturbedForcing {
    /// Precipitation (mm), Gamma-distributed around the observation.
    pub precip: Vec<Vec<f64>>,
    /// Temperature for the PET model (°C).
    pub temp_pet: Vec<Vec<f64>>,
    /// Temperature for the snow model (°C).
    pub temp_snow: Vec<Vec<f64>>,
    /// Minimum temperature, when observed.
    pub tmin: Option<Vec<Vec<f64>>>,
    /// Maximum temperature, when observed.
    pub tmax: Option<Vec<Vec<f64>>>,
    /// Observed PET, when supplied.
    pub pet: Option<Vec<Vec<f64>>>,
    /// Perturbed streamflow observations.
    pub streamflow: Vec<Vec<f64>>,
    /// Observation minus its perturbed value.
    pub streamflow_errors: Vec<Vec<f64>>,
}

impl PerturbedForcing {
    /// Draws `config.members()` realizations of every input of `obs`.
    ///
    /// # Errors
    ///
    /// Returns an error when the configuration does not validate.
    #[tracing::instrument(skip_all, fields(members = config.members(), steps = obs.len()))]
    pub fn generate(
        obs: &ObservationSeries,
        config: &EnsembleConfig,
        rng: &mut impl Rng,
    ) -> Result<Self, AssimilationError> {
        config.validate()?;
        let u = config.uncertainties();
        let n = config.members();

        let temp_pet = (0..n).map(|_| additive(obs.temp(), u.temp_pet, rng)).collect();
        let temp_snow = (0..n).map(|_| additive(obs.temp(), u.temp_snow, rng)).collect();
        let tmin = obs
            .tmin()
            .map(|t| (0..n).map(|_| additive(t, u.tmin, rng)).collect());
        let tmax = obs
            .tmax()
            .map(|t| (0..n).map(|_| additive(t, u.tmax, rng)).collect());
        let precip = (0..n)
            .map(|_| gamma_relative(obs.precip(), u.precip, rng))
            .collect::<Result<Vec<_>, _>>()?;
        let pet = obs.pet().map(|e| {
            (0..n)
                .map(|_| {
                    let mut v = additive(e, u.pet, rng);
                    v.iter_mut().for_each(|x| *x = x.max(0.0));
                    v
                })
                .collect()
        });

        let mut streamflow = Vec::with_capacity(n);
        let mut streamflow_errors = Vec::with_capacity(n);
        for _ in 0..n {
            let q = relative_normal(obs.streamflow(), u.streamflow, rng);
            let e = obs.streamflow().iter().zip(&q).map(|(o, p)| o - p).collect();
            streamflow.push(q);
            streamflow_errors.push(e);
        }

        debug!("perturbed forcing generated");
        Ok(Self {
            precip,
            temp_pet,
            temp_snow,
            tmin,
            tmax,
            pet,
            streamflow,
            streamflow_errors,
        })
    }

    /// Number of members.
    pub fn members(&self) -> usize {
        self.precip.len()
    }
}

/// `x + sd·z` with `z ~ N(0, 1)`. Missing values stay missing.
pub fn additive(values: &[f64], sd: f64, rng: &mut impl Rng) -> Vec<f64> {
    values
        .iter()
        .map(|&x| {
            let z: f64 = StandardNormal.sample(rng);
            x + sd * z
        })
        .collect()
}

/// `x + rel·x·z` with `z ~ N(0, 1)`.
pub fn relative_normal(values: &[f64], rel: f64, rng: &mut impl Rng) -> Vec<f64> {
    values
        .iter()
        .map(|&x| {
            let z: f64 = StandardNormal.sample(rng);
            x + rel * x * z
        })
        .collect()
}

/// Gamma draw with mean `x` and coefficient of variation `cv`.
///
/// Shape is `1/cv²` and scale `cv²·x`. Zero, negative and missing values give
/// zero; `cv = 0` returns the values unchanged.
///
/// # Errors
///
/// Returns [`AssimilationError::InvalidConfig`] if the Gamma distribution
/// cannot be built from `cv`.
pub fn gamma_relative(
    values: &[f64],
    cv: f64,
    rng: &mut impl Rng,
) -> Result<Vec<f64>, AssimilationError> {
    if cv == 0.0 {
        return Ok(values.iter().map(|&x| if x > 0.0 { x } else { 0.0 }).collect());
    }
    let var = cv * cv;
    // Gamma(k, θ) = θ · Gamma(k, 1)
    let unit = Gamma::new(1.0 / var, 1.0).map_err(|e| AssimilationError::InvalidConfig {
        reason: format!("precipitation uncertainty {cv}: {e}"),
    })?;
    Ok(values
        .iter()
        .map(|&x| {
            if x > 0.0 {
                var * x * unit.sample(rng)
            } else {
                0.0
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn gamma_keeps_dry_steps_dry() {
        let mut rng = StdRng::seed_from_u64(1);
        let out = gamma_relative(&[0.0, f64::NAN, -1.0, 5.0], 0.5, &mut rng).unwrap();
        assert_eq!(&out[..3], &[0.0, 0.0, 0.0]);
        assert!(out[3] >= 0.0);
    }

    #[test]
    fn gamma_mean_matches_observation() {
        let mut rng = StdRng::seed_from_u64(7);
        let values = vec![10.0; 20_000];
        let out = gamma_relative(&values, 0.5, &mut rng).unwrap();
        let mean = out.iter().sum::<f64>() / out.len() as f64;
        assert_relative_eq!(mean, 10.0, max_relative = 0.02);
        assert!(out.iter().all(|&p| p >= 0.0));
    }

    #[test]
    fn zero_cv_is_identity() {
        let mut rng = StdRng::seed_from_u64(3);
        let out = gamma_relative(&[1.5, 0.0], 0.0, &mut rng).unwrap();
        assert_eq!(out, vec![1.5, 0.0]);
    }

    #[test]
    fn additive_spread() {
        let mut rng = StdRng::seed_from_u64(11);
        let out = additive(&vec![0.0; 20_000], 2.0, &mut rng);
        let mean = out.iter().sum::<f64>() / out.len() as f64;
        let var = out.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / out.len() as f64;
        assert!(mean.abs() < 0.05);
        assert_relative_eq!(var.sqrt(), 2.0, max_relative = 0.03);
    }

    #[test]
    fn relative_normal_preserves_missing() {
        let mut rng = StdRng::seed_from_u64(5);
        let out = relative_normal(&[f64::NAN, 0.0], 0.1, &mut rng);
        assert!(out[0].is_nan());
        assert_eq!(out[1], 0.0);
    }
}
