//! Names of the forcing fields a model can require.

use std::fmt;

use serde::{Deserialize, Serialize};

/// One field of an [`ObservationSeries`](crate::ObservationSeries).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    /// Timestamps.
    Dates,
    /// Precipitation depth per time step (mm).
    Precip,
    /// Mean air temperature (°C).
    Temp,
    /// Minimum air temperature (°C).
    Tmin,
    /// Maximum air temperature (°C).
    Tmax,
    /// Catchment latitude (degrees).
    Latitude,
    /// Observed streamflow (mm per time step).
    Streamflow,
    /// Observed potential evapotranspiration (mm per time step).
    Pet,
}

impl Field {
    /// Field name as used in input files.
    pub fn name(self) -> &'static str {
        match self {
            Field::Dates => "dates",
            Field::Precip => "precip",
            Field::Temp => "temp",
            Field::Tmin => "tmin",
            Field::Tmax => "tmax",
            Field::Latitude => "latitude",
            Field::Streamflow => "streamflow",
            Field::Pet => "pet",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
