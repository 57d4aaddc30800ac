//! # hoopla-data
//!
//! Inputs of a lumped hydrological run: the observation series of a
//! catchment, the windows cut from it, meteorological forecasts placed on its
//! timeline, and the parameter bounds a calibration searches.
//!
//! ## Architecture
//!
//! ```mermaid
//! graph LR
//!     A["observations.json"] -->|"read_observations()"| B["ObservationSeries"]
//!     B -->|".crop(begin, end)"| C["run window"]
//!     B -->|"WarmUp::select()"| D["WarmUp::Window | WarmUp::MeanYear"]
//!     E["forecast.json"] -->|"read_forecast()"| F["ForecastRecord"]
//!     F -->|"MeteoForecast::align()"| G["MeteoForecast"]
//!     H["bounds.json"] -->|"read_bounds()"| I["ParameterBounds per model"]
//! ```
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `observed` | Validated observation container and cropping |
//! | `field` | Forcing field names models declare as inputs |
//! | `warmup` | Warm-up window selection with mean-year fallback |
//! | `forecast` | Meteorological forecast alignment |
//! | `bounds` | Parameter bounds |
//! | `reader` | JSON readers |
//! | `nan` | `null` <-> `NaN` serde helpers |
//! | `validate` | Accumulated validation |
//! | `error` | Error types |

mod bounds;
mod error;
mod field;
mod forecast;
pub mod nan;
mod observed;
mod reader;
mod validate;
mod warmup;

pub use bounds::ParameterBounds;
pub use error::DataError;
pub use field::Field;
pub use forecast::{ForecastIssuance, ForecastRecord, MemberForcing, MeteoForecast};
pub use observed::{ObservationRecord, ObservationSeries};
pub use reader::{read_bounds, read_forecast, read_observations};
pub use warmup::WarmUp;
