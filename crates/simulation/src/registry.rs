//! Static name → factory maps for the four model kinds.

use std::collections::BTreeMap;

use hoopla_assimilation::EnsembleKalmanFilter;
use hoopla_models::{
    CemaNeige, DataAssimilation, HydroMod1, Oudin, Pet, RainfallRunoff, SnowAccounting,
};
use tracing::debug;

use crate::error::SimulationError;

/// Builds a rainfall-runoff model.
pub type RunoffFactory = fn() -> Box<dyn RainfallRunoff>;
/// Builds an evapotranspiration model.
pub type PetFactory = fn() -> Box<dyn Pet>;
/// Builds a snow accounting model.
pub type SnowFactory = fn() -> Box<dyn SnowAccounting>;
/// Builds a data-assimilation scheme.
pub type AssimilationFactory = fn() -> Box<dyn DataAssimilation>;

/// Names of the models making up one combination.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ModelNames {
    /// Rainfall-runoff model.
    pub runoff: String,
    /// Evapotranspiration model, when PET is computed.
    pub pet: Option<String>,
    /// Snow accounting model, when snow is simulated.
    pub snow: Option<String>,
    /// Assimilation scheme, for ensemble runs.
    pub assimilation: Option<String>,
}

impl ModelNames {
    /// A combination of `runoff` alone.
    pub fn new(runoff: impl Into<String>) -> Self {
        Self {
            runoff: runoff.into(),
            pet: None,
            snow: None,
            assimilation: None,
        }
    }

    /// Compute PET with `name`.
    pub fn with_pet(mut self, name: impl Into<String>) -> Self {
        self.pet = Some(name.into());
        self
    }

    /// Route precipitation through the snow model `name`.
    pub fn with_snow(mut self, name: impl Into<String>) -> Self {
        self.snow = Some(name.into());
        self
    }

    /// Assimilate with `name`.
    pub fn with_assimilation(mut self, name: impl Into<String>) -> Self {
        self.assimilation = Some(name.into());
        self
    }

    /// Short label such as `HydroMod1_Oudin_CemaNeige`, used for file names.
    pub fn label(&self) -> String {
        [
            Some(self.runoff.as_str()),
            self.pet.as_deref(),
            self.snow.as_deref(),
            self.assimilation.as_deref(),
        ]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join("_")
    }
}

/// Instantiated models of one combination.
pub struct ModelSet {
    /// Rainfall-runoff model.
    pub runoff: Box<dyn RainfallRunoff>,
    /// Evapotranspiration model.
    pub pet: Option<Box<dyn Pet>>,
    /// Snow accounting model.
    pub snow: Option<Box<dyn SnowAccounting>>,
    /// Assimilation scheme.
    pub assimilation: Option<Box<dyn DataAssimilation>>,
}

impl std::fmt::Debug for ModelSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelSet")
            .field("runoff", &self.runoff.name())
            .field("pet", &self.pet.as_ref().map(|m| m.name()))
            .field("snow", &self.snow.as_ref().map(|m| m.name()))
            .field("assimilation", &self.assimilation.as_ref().map(|m| m.name()))
            .finish()
    }
}

/// Name → factory maps, one per model kind.
#[derive(Debug, Clone, Default)]
pub struct ModelRegistry {
    runoff: BTreeMap<String, RunoffFactory>,
    pet: BTreeMap<String, PetFactory>,
    snow: BTreeMap<String, SnowFactory>,
    assimilation: BTreeMap<String, AssimilationFactory>,
}

impl ModelRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Every model shipped with the workspace.
    pub fn builtin() -> Self {
        let mut r = Self::new();
        r.register_runoff("HydroMod1", || Box::new(HydroMod1));
        r.register_pet("Oudin", || Box::new(Oudin));
        r.register_snow("CemaNeige", || Box::new(CemaNeige));
        r.register_assimilation(hoopla_assimilation::ENKF_NAME, || {
            Box::new(EnsembleKalmanFilter)
        });
        r
    }

    /// Adds or replaces a rainfall-runoff model.
    pub fn register_runoff(&mut self, name: impl Into<String>, factory: RunoffFactory) {
        self.runoff.insert(name.into(), factory);
    }

    /// Adds or replaces an evapotranspiration model.
    pub fn register_pet(&mut self, name: impl Into<String>, factory: PetFactory) {
        self.pet.insert(name.into(), factory);
    }

    /// Adds or replaces a snow accounting model.
    pub fn register_snow(&mut self, name: impl Into<String>, factory: SnowFactory) {
        self.snow.insert(name.into(), factory);
    }

    /// Adds or replaces an assimilation scheme.
    pub fn register_assimilation(&mut self, name: impl Into<String>, factory: AssimilationFactory) {
        self.assimilation.insert(name.into(), factory);
    }

    /// Registered rainfall-runoff models, sorted.
    pub fn list_runoff(&self) -> Vec<&str> {
        self.runoff.keys().map(String::as_str).collect()
    }

    /// Registered evapotranspiration models, sorted.
    pub fn list_pet(&self) -> Vec<&str> {
        self.pet.keys().map(String::as_str).collect()
    }

    /// Registered snow models, sorted.
    pub fn list_snow(&self) -> Vec<&str> {
        self.snow.keys().map(String::as_str).collect()
    }

    /// Registered assimilation schemes, sorted.
    pub fn list_assimilation(&self) -> Vec<&str> {
        self.assimilation.keys().map(String::as_str).collect()
    }

    /// Instantiates every model named in `names`.
    ///
    /// # Errors
    ///
    /// Returns [`SimulationError::UnknownModel`] for the first name that is
    /// not registered.
    pub fn resolve(&self, names: &ModelNames) -> Result<ModelSet, SimulationError> {
        let set = ModelSet {
            runoff: lookup(&self.runoff, "rainfall-runoff", &names.runoff)?(),
            pet: names
                .pet
                .as_deref()
                .map(|n| lookup(&self.pet, "pet", n).map(|f| f()))
                .transpose()?,
            snow: names
                .snow
                .as_deref()
                .map(|n| lookup(&self.snow, "snow", n).map(|f| f()))
                .transpose()?,
            assimilation: names
                .assimilation
                .as_deref()
                .map(|n| lookup(&self.assimilation, "assimilation", n).map(|f| f()))
                .transpose()?,
        };
        debug!(?set, "models resolved");
        Ok(set)
    }
}

fn lookup<F: Copy>(
    map: &BTreeMap<String, F>,
    kind: &'static str,
    name: &str,
) -> Result<F, SimulationError> {
    map.get(name).copied().ok_or_else(|| SimulationError::UnknownModel {
        kind,
        name: name.to_string(),
        available: map.keys().cloned().collect::<Vec<_>>().join(", "),
    })
}
