//! Ask/tell interface shared by the global optimizers.
//!
//! The caller owns the objective: it asks for a candidate, evaluates it,
//! and reports the value back. Optimizers always minimise.

use hoopla_data::ParameterBounds;
use rand::Rng;

/// A minimising optimizer driven one evaluation at a time.
pub trait Optimizer {
    /// Name used in logs and result records.
    fn name(&self) -> &'static str;

    /// Next candidate to evaluate, or `None` once a stopping rule fired.
    ///
    /// Every proposed candidate must be passed back to [`Optimizer::observe`]
    /// before the next call.
    fn propose(&mut self) -> Option<Vec<f64>>;

    /// Reports the objective value of the last proposed candidate.
    fn observe(&mut self, candidate: Vec<f64>, objective: f64);

    /// Best candidate seen so far with its objective value.
    fn best(&self) -> Option<(&[f64], f64)>;

    /// Number of objective values observed.
    fn n_evaluations(&self) -> usize;
}

/// A candidate with its objective value.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Point {
    pub(crate) x: Vec<f64>,
    pub(crate) f: f64,
}

impl Point {
    /// NaN objectives rank last.
    pub(crate) fn new(x: Vec<f64>, f: f64) -> Self {
        let f = if f.is_nan() { f64::INFINITY } else { f };
        Self { x, f }
    }
}

/// Sorts points by ascending objective.
pub(crate) fn sort_points(points: &mut [Point]) {
    points.sort_by(|a, b| a.f.total_cmp(&b.f));
}

/// Uniform draw inside the box; fixed dimensions keep their value.
pub(crate) fn uniform_in(bounds: &ParameterBounds, rng: &mut impl Rng) -> Vec<f64> {
    bounds
        .lower()
        .iter()
        .zip(bounds.upper())
        .map(|(&lo, &hi)| (lo + rng.random::<f64>() * (hi - lo)).min(hi))
        .collect()
}
