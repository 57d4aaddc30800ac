//! Parameter search bounds.

use serde::{Deserialize, Serialize};

use crate::error::DataError;
use crate::validate::ValidationCollector;

/// Initial guess and box constraints of a parameter vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawBounds", into = "RawBounds")]
pub struct ParameterBounds {
    initial: Vec<f64>,
    lower: Vec<f64>,
    upper: Vec<f64>,
}

#[derive(Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawBounds {
    initial: Vec<f64>,
    lower: Vec<f64>,
    upper: Vec<f64>,
}

impl ParameterBounds {
    /// Creates bounds after validation.
    ///
    /// # Errors
    ///
    /// Returns [`DataError::Validation`] unless the three vectors are
    /// non-empty, equally long, finite, and `lower <= initial <= upper`.
    pub fn new(initial: Vec<f64>, lower: Vec<f64>, upper: Vec<f64>) -> Result<Self, DataError> {
        let mut c = ValidationCollector::new();
        if initial.is_empty() {
            c.push("parameter bounds are empty");
        }
        if lower.len() != initial.len() || upper.len() != initial.len() {
            c.push(format!(
                "bounds lengths differ: initial {}, lower {}, upper {}",
                initial.len(),
                lower.len(),
                upper.len()
            ));
        }
        for (i, ((&x, &lo), &hi)) in initial.iter().zip(&lower).zip(&upper).enumerate() {
            if !(x.is_finite() && lo.is_finite() && hi.is_finite()) {
                c.push(format!("non-finite bound at index {i}"));
            } else if !(lo <= x && x <= hi) {
                c.push(format!("parameter {i}: {lo} <= {x} <= {hi} does not hold"));
            }
        }
        c.finish()?;
        Ok(Self {
            initial,
            lower,
            upper,
        })
    }

    /// Bounds pinned to `values` (`lower = initial = upper`).
    ///
    /// # Errors
    ///
    /// Returns [`DataError::Validation`] if `values` is empty or not finite.
    pub fn fixed(values: Vec<f64>) -> Result<Self, DataError> {
        Self::new(values.clone(), values.clone(), values)
    }

    /// Number of parameters.
    pub fn len(&self) -> usize {
        self.initial.len()
    }

    /// Always `false` for validated bounds.
    pub fn is_empty(&self) -> bool {
        self.initial.is_empty()
    }

    /// Initial guess.
    pub fn initial(&self) -> &[f64] {
        &self.initial
    }

    /// Lower bounds.
    pub fn lower(&self) -> &[f64] {
        &self.lower
    }

    /// Upper bounds.
    pub fn upper(&self) -> &[f64] {
        &self.upper
    }

    /// Returns `true` if every entry of `params` lies within the box.
    pub fn contains(&self, params: &[f64]) -> bool {
        params.len() == self.len()
            && params
                .iter()
                .zip(self.lower.iter().zip(&self.upper))
                .all(|(&x, (&lo, &hi))| lo <= x && x <= hi)
    }

    /// `self` followed by `other`, e.g. rainfall-runoff then snow parameters.
    pub fn concat(&self, other: &ParameterBounds) -> ParameterBounds {
        let join = |a: &[f64], b: &[f64]| [a, b].concat();
        ParameterBounds {
            initial: join(&self.initial, &other.initial),
            lower: join(&self.lower, &other.lower),
            upper: join(&self.upper, &other.upper),
        }
    }
}

impl TryFrom<RawBounds> for ParameterBounds {
    type Error = DataError;

    fn try_from(raw: RawBounds) -> Result<Self, Self::Error> {
        Self::new(raw.initial, raw.lower, raw.upper)
    }
}

impl From<ParameterBounds> for RawBounds {
    fn from(b: ParameterBounds) -> Self {
        RawBounds {
            initial: b.initial,
            lower: b.lower,
            upper: b.upper,
        }
    }
}
