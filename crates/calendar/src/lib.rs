//! # hoopla-calendar
//!
//! Date arithmetic shared by the simulation, calibration and data crates.
//!
//! ## Architecture
//!
//! ```mermaid
//! graph LR
//!     A["\"3h\" / \"24h\""] -->|"TimeStep::from_str()"| B["TimeStep"]
//!     B -->|".warm_up_steps()"| C["history length"]
//!     D["NaiveDateTime"] -->|"day_of_year()"| E["fractional DOY"]
//!     D -->|"year_slot()"| F["slot in a 365-day year"]
//!     G["dates"] -->|"find_non_winter_indexes()"| H["scored indices"]
//! ```
//!
//! ## Quick Start
//!
//! ```ignore
//! use hoopla_calendar::{TimeStep, day_of_year, find_non_winter_indexes};
//!
//! let step: TimeStep = "24h".parse().unwrap();
//! assert_eq!(step.steps_per_day(), 1);
//!
//! let keep = find_non_winter_indexes(&dates);
//! ```
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `timestep` | Supported model time steps |
//! | `doy` | Fractional day-of-year and year slots |
//! | `season` | Winter-month filtering |
//! | `error` | Error types |

mod doy;
mod error;
mod season;
mod timestep;

pub use doy::{day_of_year, year_slot};
pub use error::CalendarError;
pub use season::{WINTER_MONTHS, find_non_winter_indexes, is_winter_month};
pub use timestep::TimeStep;
