//! # hoopla-models
//!
//! Pluggable model kinds of a lumped hydrological chain and their reference
//! implementations.
//!
//! ## Architecture
//!
//! ```mermaid
//! graph LR
//!     P["P, T, Tmin, Tmax"] -->|"SnowAccounting::run()"| R["runoff depth"]
//!     T["dates, T, latitude"] -->|"Pet::prepare() + run()"| E["PET series"]
//!     R --> RR["RainfallRunoff::run()"]
//!     E --> RR
//!     RR --> Q["simulated streamflow"]
//!     RR -.->|"RunoffState per member"| DA["DataAssimilation::run()"]
//! ```
//!
//! Every model is stepped through a state record created by its own
//! `prepare`; stepping a record with another model is rejected.
//!
//! ## Quick Start
//!
//! ```ignore
//! use hoopla_models::{HydroMod1, RainfallRunoff, RunoffInputs};
//!
//! let params = [100.0, 0.5, 10.0, 2.0, 0.1, 0.5];
//! let mut state = HydroMod1.prepare(&params)?;
//! let q = HydroMod1.run(RunoffInputs { precip: 10.0, pet: 2.0 }, &params, &mut state)?;
//! ```
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `traits` | Contracts of the four model kinds |
//! | `state` | Structured state records |
//! | `hyper` | Catchment descriptors (latitude, elevation bands) |
//! | `hydromod1` | Reference rainfall-runoff model |
//! | `oudin` | Oudin PET |
//! | `cemaneige` | CemaNeige snow accounting |
//! | `error` | Error types |

pub mod cemaneige;
mod error;
mod hydromod1;
mod hyper;
mod oudin;
mod state;
mod traits;

pub use cemaneige::CemaNeige;
pub use error::ModelError;
pub use hydromod1::{HydroMod1, delay_kernel};
pub use hyper::{
    DEFAULT_PRECIP_GRADIENT, DEFAULT_TEMP_GRADIENT, PetHyperParameters, SnowHyperParameters,
};
pub use oudin::Oudin;
pub use state::{PetTerms, RunoffState, SnowBand, SnowState};
pub use traits::{
    DaConfig, DataAssimilation, EnsembleObservation, Pet, PetInputs, RainfallRunoff,
    RunoffInputs, SnowAccounting, SnowInputs,
};
