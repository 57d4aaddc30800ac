//! Calibration of hydrological model chains.
//!
//! A [`Calibrator`] drives an [`Optimizer`] over the parameter box of a
//! [`hoopla_simulation::Simulator`], scoring each candidate against the
//! observed streamflow.
//!
//! ```mermaid
//! flowchart LR
//!     O[Optimizer::propose] --> S[Simulator::simulate]
//!     S --> F[winter filter]
//!     F --> C[Score::evaluate]
//!     C --> T[Optimizer::observe]
//!     T --> O
//! ```
//!
//! | Module | Role |
//! |---|---|
//! | `score` | Score catalog and orientation |
//! | `optimizer` | Ask/tell trait |
//! | `sce` | Shuffled Complex Evolution |
//! | `dds` | Dynamically Dimensioned Search |
//! | `calibrator` | Calibration engine |

mod calibrator;
mod dds;
mod error;
mod optimizer;
mod sce;
mod score;

pub use calibrator::{CalibrationConfig, CalibrationResult, Calibrator, OptimizerKind};
pub use dds::{DdsConfig, DynamicallyDimensionedSearch};
pub use error::CalibrationError;
pub use optimizer::Optimizer;
pub use sce::{SceConfig, ShuffledComplexEvolution, StopReason};
pub use score::{Orientation, Score};

use rand::SeedableRng;
use rand::rngs::StdRng;

/// Seeded RNG when `seed` is given, OS entropy otherwise.
pub(crate) fn make_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_os_rng(),
    }
}
