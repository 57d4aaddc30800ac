//! NaN-aware statistical helpers shared by the data, assimilation and
//! calibration crates.
//!
//! Functions taking a single slice ignore non-finite entries; functions
//! over paired series ignore every pair where either side is non-finite.

/// Arithmetic mean over the finite entries. Returns NaN if none.
pub fn mean(data: &[f64]) -> f64 {
    let (sum, n) = data
        .iter()
        .filter(|x| x.is_finite())
        .fold((0.0, 0usize), |(s, n), &x| (s + x, n + 1));
    if n == 0 {
        return f64::NAN;
    }
    sum / n as f64
}

/// Sample variance with N-1 denominator over the finite entries.
/// Returns 0.0 if fewer than 2 finite entries.
pub fn variance(data: &[f64]) -> f64 {
    let finite: Vec<f64> = data.iter().copied().filter(|x| x.is_finite()).collect();
    let n = finite.len();
    if n < 2 {
        return 0.0;
    }
    let nf = n as f64;
    let m = finite.iter().sum::<f64>() / nf;
    finite.iter().map(|&x| (x - m) * (x - m)).sum::<f64>() / (nf - 1.0)
}

/// Sample standard deviation with N-1 denominator.
pub fn sd(data: &[f64]) -> f64 {
    variance(data).sqrt()
}

/// Pairs `(x[i], y[i])` where both values are finite.
pub fn finite_pairs(x: &[f64], y: &[f64]) -> Vec<(f64, f64)> {
    x.iter()
        .zip(y.iter())
        .filter(|(xi, yi)| xi.is_finite() && yi.is_finite())
        .map(|(xi, yi)| (*xi, *yi))
        .collect()
}

/// Pearson correlation coefficient.
///
/// Returns `None` if fewer than 3 finite pairs or if either series is
/// constant over those pairs.
pub fn pearson_correlation(x: &[f64], y: &[f64]) -> Option<f64> {
    let pairs = finite_pairs(x, y);
    if pairs.len() < 3 {
        return None;
    }

    let n = pairs.len() as f64;
    let mx: f64 = pairs.iter().map(|(xi, _)| xi).sum::<f64>() / n;
    let my: f64 = pairs.iter().map(|(_, yi)| yi).sum::<f64>() / n;

    let mut sum_xy = 0.0;
    let mut sum_xx = 0.0;
    let mut sum_yy = 0.0;
    for &(xi, yi) in &pairs {
        let dx = xi - mx;
        let dy = yi - my;
        sum_xy += dx * dy;
        sum_xx += dx * dx;
        sum_yy += dy * dy;
    }

    let denom = (sum_xx * sum_yy).sqrt();
    if denom == 0.0 {
        return None;
    }

    Some(sum_xy / denom)
}

/// Mean across members for each timestep of a `[member][step]` matrix.
///
/// Rows shorter than the first are treated as missing at the tail.
pub fn column_means(rows: &[Vec<f64>]) -> Vec<f64> {
    let Some(first) = rows.first() else {
        return Vec::new();
    };
    (0..first.len())
        .map(|t| {
            let column: Vec<f64> = rows.iter().filter_map(|r| r.get(t).copied()).collect();
            mean(&column)
        })
        .collect()
}
