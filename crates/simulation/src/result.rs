//! Outputs of ensemble and forecast runs.

use hoopla_stats::column_means;

/// Streamflow of every member of an ensemble run.
#[derive(Debug, Clone, PartialEq)]
pub struct EnsembleRun {
    members: Vec<Vec<f64>>,
    mean: Vec<f64>,
}

impl EnsembleRun {
    pub(crate) fn new(members: Vec<Vec<f64>>) -> Self {
        let mean = column_means(&members);
        Self { members, mean }
    }

    /// Streamflow indexed `[member][step]`.
    pub fn members(&self) -> &[Vec<f64>] {
        &self.members
    }

    /// Ensemble-mean streamflow per step.
    pub fn mean(&self) -> &[f64] {
        &self.mean
    }

    /// Number of members.
    pub fn n_members(&self) -> usize {
        self.members.len()
    }
}

/// Forecast streamflow per issuance step, lead time and member.
///
/// Steps without an issuance, or whose inputs were incomplete, hold no
/// values; [`ForecastRun::dense`] fills them with NaN.
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastRun {
    horizon: usize,
    n_members: usize,
    simulated: Vec<f64>,
    forecasts: Vec<Option<Vec<Vec<f64>>>>,
}

impl ForecastRun {
    pub(crate) fn new(
        horizon: usize,
        n_members: usize,
        simulated: Vec<f64>,
        forecasts: Vec<Option<Vec<Vec<f64>>>>,
    ) -> Self {
        Self {
            horizon,
            n_members,
            simulated,
            forecasts,
        }
    }

    /// Number of lead times.
    pub fn horizon(&self) -> usize {
        self.horizon
    }

    /// Forecast members per issuance.
    pub fn n_members(&self) -> usize {
        self.n_members
    }

    /// Streamflow of the underlying simulation (ensemble mean in ensemble
    /// mode).
    pub fn simulated(&self) -> &[f64] {
        &self.simulated
    }

    /// Values issued at `step`, indexed `[lead][member]`.
    pub fn at(&self, step: usize) -> Option<&[Vec<f64>]> {
        self.forecasts.get(step)?.as_deref()
    }

    /// Number of steps with a forecast.
    pub fn n_issued(&self) -> usize {
        self.forecasts.iter().filter(|f| f.is_some()).count()
    }

    /// The `[step][lead][member]` array with NaN where nothing was issued.
    pub fn dense(&self) -> Vec<Vec<Vec<f64>>> {
        self.forecasts
            .iter()
            .map(|f| match f {
                Some(v) => v.clone(),
                None => vec![vec![f64::NAN; self.n_members]; self.horizon],
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ensemble_mean_per_step() {
        let run = EnsembleRun::new(vec![vec![1.0, 2.0], vec![3.0, 6.0]]);
        assert_eq!(run.mean(), &[2.0, 4.0]);
        assert_eq!(run.n_members(), 2);
    }

    #[test]
    fn dense_fills_missing_issuances() {
        let run = ForecastRun::new(2, 1, vec![0.0; 3], vec![
            None,
            Some(vec![vec![1.0], vec![2.0]]),
            None,
        ]);
        let d = run.dense();
        assert_eq!(d.len(), 3);
        assert!(d[0][1][0].is_nan());
        assert_eq!(d[1], vec![vec![1.0], vec![2.0]]);
        assert_eq!(run.n_issued(), 1);
        assert!(run.at(2).is_none());
    }
}
