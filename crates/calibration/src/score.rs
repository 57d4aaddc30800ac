//! Objective score catalog.
//!
//! Every score compares simulated against observed streamflow over the
//! pairs whose observation is present.

use std::fmt;
use std::str::FromStr;

use hoopla_stats::{finite_pairs, pearson_correlation};

use crate::error::CalibrationError;

/// Whether larger or smaller scores are better.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    /// Error metrics: 0 is perfect.
    Minimise,
    /// Efficiency and correlation metrics: 1 is perfect.
    Maximise,
}

/// A named objective score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Score {
    Rmse,
    RmseSqrt,
    RmseLog,
    Mse,
    MseSqrt,
    MseLog,
    Mae,
    Nse,
    NseSqrt,
    NseInv,
    Pve,
    PveAbs,
    Balance,
    R,
    BKge,
    GKge,
    KgeM,
}

impl Score {
    /// Every catalogued score, in catalog order.
    pub const ALL: [Score; 17] = [
        Score::Rmse,
        Score::RmseSqrt,
        Score::RmseLog,
        Score::Mse,
        Score::MseSqrt,
        Score::MseLog,
        Score::Mae,
        Score::Nse,
        Score::NseSqrt,
        Score::NseInv,
        Score::Pve,
        Score::PveAbs,
        Score::Balance,
        Score::R,
        Score::BKge,
        Score::GKge,
        Score::KgeM,
    ];

    /// Catalog name.
    pub fn name(self) -> &'static str {
        match self {
            Score::Rmse => "RMSE",
            Score::RmseSqrt => "RMSEsqrt",
            Score::RmseLog => "RMSElog",
            Score::Mse => "MSE",
            Score::MseSqrt => "MSEsqrt",
            Score::MseLog => "MSElog",
            Score::Mae => "MAE",
            Score::Nse => "NSE",
            Score::NseSqrt => "NSEsqrt",
            Score::NseInv => "NSEinv",
            Score::Pve => "PVE",
            Score::PveAbs => "PVEabs",
            Score::Balance => "Balance",
            Score::R => "r",
            Score::BKge => "bKGE",
            Score::GKge => "gKGE",
            Score::KgeM => "KGEm",
        }
    }

    /// Whether the optimizer should minimise or maximise the score.
    pub fn orientation(self) -> Orientation {
        match self {
            Score::Nse
            | Score::NseSqrt
            | Score::NseInv
            | Score::R
            | Score::BKge
            | Score::GKge
            | Score::KgeM => Orientation::Maximise,
            _ => Orientation::Minimise,
        }
    }

    /// Returns `true` if the score can be evaluated.
    pub fn is_implemented(self) -> bool {
        matches!(
            self,
            Score::Rmse | Score::Mse | Score::Mae | Score::Nse | Score::R
        )
    }

    /// Fails for catalogued scores without an implementation.
    ///
    /// # Errors
    ///
    /// Returns [`CalibrationError::ScoreNotImplemented`].
    pub fn ensure_implemented(self) -> Result<(), CalibrationError> {
        if self.is_implemented() {
            Ok(())
        } else {
            Err(CalibrationError::ScoreNotImplemented { name: self.name() })
        }
    }

    /// Raw score of `simulated` against `observed`.
    ///
    /// Pairs with a missing value are ignored; with no pair left the score
    /// is NaN.
    ///
    /// # Errors
    ///
    /// Returns [`CalibrationError::ScoreNotImplemented`] for placeholders.
    pub fn evaluate(self, observed: &[f64], simulated: &[f64]) -> Result<f64, CalibrationError> {
        self.ensure_implemented()?;
        let pairs = finite_pairs(observed, simulated);
        if pairs.is_empty() {
            return Ok(f64::NAN);
        }
        let n = pairs.len() as f64;
        let sse: f64 = pairs.iter().map(|(o, s)| (o - s).powi(2)).sum();
        Ok(match self {
            Score::Rmse => (sse / n).sqrt(),
            Score::Mse => sse / n,
            Score::Mae => pairs.iter().map(|(o, s)| (o - s).abs()).sum::<f64>() / n,
            Score::Nse => {
                let mean_obs = pairs.iter().map(|(o, _)| o).sum::<f64>() / n;
                let spread: f64 = pairs.iter().map(|(o, _)| (o - mean_obs).powi(2)).sum();
                if spread == 0.0 {
                    f64::NEG_INFINITY
                } else {
                    1.0 - sse / spread
                }
            }
            Score::R => {
                let (o, s): (Vec<f64>, Vec<f64>) = pairs.into_iter().unzip();
                pearson_correlation(&o, &s).unwrap_or(f64::NAN)
            }
            _ => f64::NAN,
        })
    }

    /// The value minimised by the optimizers: the score itself for error
    /// metrics, its negation otherwise. NaN becomes `+inf`.
    pub fn objective(self, raw: f64) -> f64 {
        if raw.is_nan() {
            return f64::INFINITY;
        }
        match self.orientation() {
            Orientation::Minimise => raw,
            Orientation::Maximise => -raw,
        }
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Score {
    type Err = CalibrationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Score::ALL
            .into_iter()
            .find(|score| score.name() == s)
            .ok_or_else(|| CalibrationError::UnknownScore {
                name: s.to_string(),
                available: Score::ALL.map(Score::name).join(", "),
            })
    }
}
