//! Simulation and forecast engines over pluggable model chains.
//!
//! A [`ModelRegistry`] resolves model names into a [`ModelSet`]; a
//! [`RunConfig`] says how the models are chained; [`Simulator::new`] checks
//! both against an observation window once, after which any number of
//! parameter vectors can be simulated.
//!
//! ```mermaid
//! flowchart LR
//!     W[warm-up] --> M[main loop]
//!     M -->|every period| K[assimilation]
//!     K --> M
//!     M -->|issuance| F[forecast branch]
//! ```
//!
//! | Module      | Role                                          |
//! |-------------|-----------------------------------------------|
//! | `registry`  | name → factory maps                           |
//! | `config`    | PET source, snow routing, warm-up, run mode   |
//! | `simulator` | deterministic, ensemble and forecast loops    |
//! | `result`    | ensemble and forecast outputs                 |

mod config;
mod error;
mod registry;
mod result;
mod simulator;

pub use config::{ForecastConfig, PetSource, RunConfig, RunMode, SnowParams, SnowRouting};
pub use error::SimulationError;
pub use registry::{
    AssimilationFactory, ModelNames, ModelRegistry, ModelSet, PetFactory, RunoffFactory,
    SnowFactory,
};
pub use result::{EnsembleRun, ForecastRun};
pub use simulator::Simulator;
