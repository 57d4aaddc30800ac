//! CemaNeige process equations, one elevation band at a time.

/// Melt threshold temperature (°C).
pub const T_MELT: f64 = 0.0;

/// Share of potential melt released even without full snow cover.
pub const MIN_SPEED: f64 = 0.1;

/// All-snow threshold of the linear partition (°C).
pub const T_SNOW: f64 = -1.0;

/// All-rain threshold of the linear partition (°C).
pub const T_RAIN: f64 = 3.0;

/// Fraction of mean annual snowfall above which a band is fully covered.
pub const THRESHOLD_FACTOR: f64 = 0.9;

/// Solid fraction from mean temperature, linear between `T_SNOW` and
/// `T_RAIN` (USGS).
pub fn solid_fraction_linear(temp: f64) -> f64 {
    if temp <= T_SNOW {
        1.0
    } else if temp >= T_RAIN {
        0.0
    } else {
        (T_RAIN - temp) / (T_RAIN - T_SNOW)
    }
}

/// Solid fraction from the daily range (Hydrotel): the share of the
/// `tmin..tmax` interval below 0 °C.
pub fn solid_fraction_range(tmin: f64, tmax: f64) -> f64 {
    if tmax <= 0.0 {
        1.0
    } else if tmin >= 0.0 {
        0.0
    } else {
        1.0 - tmax / (tmax - tmin)
    }
}

/// Temperature at `target` elevation with a lapse rate in °C per 100 m.
pub fn extrapolate_temp(temp: f64, reference: f64, target: f64, gradient: f64) -> f64 {
    temp - gradient * (target - reference) / 100.0
}

/// Precipitation per band, scaled exponentially with elevation and
/// normalised so that the band mean equals `precip`.
pub fn distribute_precip(precip: f64, elevations: &[f64], reference: f64, gradient: f64) -> Vec<f64> {
    let weights: Vec<f64> = elevations
        .iter()
        .map(|z| (gradient * (z - reference)).exp())
        .collect();
    let total: f64 = weights.iter().sum();
    let n = elevations.len() as f64;
    weights.iter().map(|w| precip * w * n / total).collect()
}

/// Exponentially smoothed snow pack temperature, capped at 0 °C.
pub fn thermal_state(previous: f64, temp: f64, ctg: f64) -> f64 {
    (ctg * previous + (1.0 - ctg) * temp).min(0.0)
}

/// Degree-day melt when the pack is ripe and air is above `T_MELT`,
/// limited by the stock.
pub fn potential_melt(thermal: f64, temp: f64, kf: f64, stock: f64) -> f64 {
    if thermal == 0.0 && temp > T_MELT {
        (kf * (temp - T_MELT)).min(stock)
    } else {
        0.0
    }
}

/// Fraction of the band covered by snow.
pub fn cover_ratio(stock: f64, threshold: f64) -> f64 {
    if threshold <= 0.0 {
        if stock > 0.0 { 1.0 } else { 0.0 }
    } else if stock >= threshold {
        1.0
    } else {
        stock / threshold
    }
}

/// Melt modulated by snow cover.
pub fn actual_melt(potential: f64, cover: f64) -> f64 {
    ((1.0 - MIN_SPEED) * cover + MIN_SPEED) * potential
}
