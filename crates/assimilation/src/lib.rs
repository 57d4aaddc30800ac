//! Ensemble generation and sequential data assimilation.
//!
//! Observed forcing and streamflow are perturbed into an ensemble of `N`
//! members; at every assimilation checkpoint the
//! [`EnsembleKalmanFilter`] pulls the members' reservoir levels toward
//! the perturbed streamflow observations.
//!
//! ```mermaid
//! flowchart LR
//!     O[Observations] --> P[PerturbedForcing]
//!     P --> S[Member runs]
//!     S --> K[EnsembleKalmanFilter]
//!     K --> S
//! ```
//!
//! | Module    | Role                                        |
//! |-----------|---------------------------------------------|
//! | `config`  | ensemble size, period, uncertainties, seed  |
//! | `perturb` | Normal and Gamma perturbations              |
//! | `enkf`    | state analysis                              |

mod config;
mod enkf;
mod error;
mod perturb;

pub use config::{EnsembleConfig, Uncertainties};
pub use enkf::{EnsembleKalmanFilter, NAME as ENKF_NAME};
pub use error::AssimilationError;
pub use perturb::{PerturbedForcing, additive, gamma_relative, relative_normal};

use rand::SeedableRng;
use rand::rngs::StdRng;

/// Builds a seeded or OS-sourced RNG.
pub fn make_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_os_rng(),
    }
}
