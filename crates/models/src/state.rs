//! Structured state records.
//!
//! Each record remembers which model prepared it; stepping a state with a
//! different model fails with [`ModelError::StateMismatch`].

use hoopla_calendar::TimeStep;

use crate::error::ModelError;
use crate::hyper::SnowHyperParameters;

/// State of a rainfall-runoff model.
///
/// Holds the named scalar stores (for example soil, slow and fast routing
/// reservoirs), the unit-hydrograph weights and the routing buffer they are
/// convolved into.
#[derive(Debug, Clone, PartialEq)]
pub struct RunoffState {
    model: &'static str,
    store_names: &'static [&'static str],
    stores: Vec<f64>,
    unit_hydrograph: Vec<f64>,
    routing: Vec<f64>,
}

impl RunoffState {
    /// Builds a state for `model`.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::StateMismatch`] if `stores` and `store_names`
    /// differ in length or the routing buffer and unit hydrograph differ in
    /// length.
    pub fn new(
        model: &'static str,
        store_names: &'static [&'static str],
        stores: Vec<f64>,
        unit_hydrograph: Vec<f64>,
    ) -> Result<Self, ModelError> {
        if stores.len() != store_names.len() {
            return Err(ModelError::StateMismatch {
                model,
                state_model: model.to_string(),
                reason: format!(
                    "{} store values for {} store names",
                    stores.len(),
                    store_names.len()
                ),
            });
        }
        let routing = vec![0.0; unit_hydrograph.len()];
        Ok(Self {
            model,
            store_names,
            stores,
            unit_hydrograph,
            routing,
        })
    }

    /// Name of the model that prepared this state.
    pub fn model(&self) -> &'static str {
        self.model
    }

    /// Names of the scalar stores, in storage order.
    pub fn store_names(&self) -> &'static [&'static str] {
        self.store_names
    }

    /// Scalar store values, in [`store_names`](Self::store_names) order.
    pub fn stores(&self) -> &[f64] {
        &self.stores
    }

    /// Mutable access to the scalar stores.
    pub fn stores_mut(&mut self) -> &mut [f64] {
        &mut self.stores
    }

    /// Value of the store called `name`.
    pub fn store(&self, name: &str) -> Option<f64> {
        let i = self.store_names.iter().position(|n| *n == name)?;
        Some(self.stores[i])
    }

    /// Overwrites the store called `name`.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::UnknownStore`] if no store has that name.
    pub fn set_store(&mut self, name: &str, value: f64) -> Result<(), ModelError> {
        let i = self
            .store_names
            .iter()
            .position(|n| *n == name)
            .ok_or_else(|| ModelError::UnknownStore {
                model: self.model.to_string(),
                name: name.to_string(),
            })?;
        self.stores[i] = value;
        Ok(())
    }

    /// Unit-hydrograph weights.
    pub fn unit_hydrograph(&self) -> &[f64] {
        &self.unit_hydrograph
    }

    /// Routing buffer; element 0 is released at the current step.
    pub fn routing(&self) -> &[f64] {
        &self.routing
    }

    /// Mutable stores and routing buffer with the weights, for stepping.
    pub fn parts_mut(&mut self) -> (&mut [f64], &[f64], &mut [f64]) {
        (&mut self.stores, &self.unit_hydrograph, &mut self.routing)
    }

    /// Fails unless this state was prepared by `model`.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::StateMismatch`].
    pub fn ensure_owner(&self, model: &'static str) -> Result<(), ModelError> {
        if self.model != model {
            return Err(ModelError::StateMismatch {
                model,
                state_model: self.model.to_string(),
                reason: "model name differs".into(),
            });
        }
        Ok(())
    }
}

/// Snow state of one elevation band.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SnowBand {
    /// Snow stock (mm water equivalent).
    pub stock: f64,
    /// Thermal state of the snow pack (°C, never positive).
    pub thermal: f64,
    /// Stock above which the band is fully snow covered (mm).
    pub threshold: f64,
}

/// State of a snow accounting model.
#[derive(Debug, Clone, PartialEq)]
pub struct SnowState {
    model: &'static str,
    hyper: SnowHyperParameters,
    bands: Vec<SnowBand>,
}

impl SnowState {
    /// Builds a state for `model` with one band per elevation of `hyper`.
    pub fn new(model: &'static str, hyper: SnowHyperParameters, bands: Vec<SnowBand>) -> Self {
        Self { model, hyper, bands }
    }

    /// Name of the model that prepared this state.
    pub fn model(&self) -> &'static str {
        self.model
    }

    /// Catchment description the state was prepared with.
    pub fn hyper(&self) -> &SnowHyperParameters {
        &self.hyper
    }

    /// Per-band state.
    pub fn bands(&self) -> &[SnowBand] {
        &self.bands
    }

    /// Catchment-average snow stock (mm).
    pub fn mean_stock(&self) -> f64 {
        if self.bands.is_empty() {
            return 0.0;
        }
        self.bands.iter().map(|b| b.stock).sum::<f64>() / self.bands.len() as f64
    }

    /// Bands and hyper-parameters, for stepping.
    pub fn parts_mut(&mut self) -> (&SnowHyperParameters, &mut [SnowBand]) {
        (&self.hyper, &mut self.bands)
    }

    /// Fails unless this state was prepared by `model`.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::StateMismatch`].
    pub fn ensure_owner(&self, model: &'static str) -> Result<(), ModelError> {
        if self.model != model {
            return Err(ModelError::StateMismatch {
                model,
                state_model: self.model.to_string(),
                reason: "model name differs".into(),
            });
        }
        if self.bands.len() != self.hyper.elevations().len() {
            return Err(ModelError::StateMismatch {
                model,
                state_model: self.model.to_string(),
                reason: format!(
                    "{} bands for {} elevations",
                    self.bands.len(),
                    self.hyper.elevations().len()
                ),
            });
        }
        Ok(())
    }
}

/// Precomputed evapotranspiration terms, one entry per time step.
#[derive(Debug, Clone, PartialEq)]
pub struct PetTerms {
    model: &'static str,
    time_step: TimeStep,
    /// Extraterrestrial radiation (MJ m-2 per time step).
    pub radiation: Vec<f64>,
    /// Latent heat of vaporisation (MJ kg-1).
    pub latent_heat: Vec<f64>,
    /// Mean air temperature (°C).
    pub temp: Vec<f64>,
}

impl PetTerms {
    /// Bundles the terms prepared by `model`.
    pub fn new(
        model: &'static str,
        time_step: TimeStep,
        radiation: Vec<f64>,
        latent_heat: Vec<f64>,
        temp: Vec<f64>,
    ) -> Self {
        Self {
            model,
            time_step,
            radiation,
            latent_heat,
            temp,
        }
    }

    /// Name of the model that prepared the terms.
    pub fn model(&self) -> &'static str {
        self.model
    }

    /// Time step the terms were computed for.
    pub fn time_step(&self) -> TimeStep {
        self.time_step
    }

    /// Number of time steps.
    pub fn len(&self) -> usize {
        self.temp.len()
    }

    /// Returns `true` if there are no time steps.
    pub fn is_empty(&self) -> bool {
        self.temp.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NAMES: &[&str] = &["S", "R"];

    #[test]
    fn named_store_access() {
        let mut s = RunoffState::new("M", NAMES, vec![1.0, 2.0], vec![0.5, 0.5]).unwrap();
        assert_eq!(s.store("R"), Some(2.0));
        assert_eq!(s.store("T"), None);
        s.set_store("S", 4.0).unwrap();
        assert_eq!(s.stores(), &[4.0, 2.0]);
        assert!(matches!(
            s.set_store("T", 1.0),
            Err(ModelError::UnknownStore { .. })
        ));
        assert_eq!(s.routing(), &[0.0, 0.0]);
    }

    #[test]
    fn store_count_must_match_names() {
        assert!(RunoffState::new("M", NAMES, vec![1.0], vec![1.0]).is_err());
    }

    #[test]
    fn owner_check() {
        let s = RunoffState::new("M", NAMES, vec![1.0, 2.0], vec![1.0]).unwrap();
        assert!(s.ensure_owner("M").is_ok());
        assert!(matches!(
            s.ensure_owner("N"),
            Err(ModelError::StateMismatch { .. })
        ));
    }
}
