//! Serde helpers mapping JSON `null` to `NaN` and back.
//!
//! JSON has no NaN literal; missing streamflow and skipped forecast rows are
//! written as `null`.

use serde::{Deserialize, Deserializer, Serializer};
use serde::ser::SerializeSeq;

/// Serialize a float slice, writing non-finite values as `null`.
pub fn serialize<S: Serializer>(values: &[f64], serializer: S) -> Result<S::Ok, S::Error> {
    let mut seq = serializer.serialize_seq(Some(values.len()))?;
    for v in values {
        if v.is_finite() {
            seq.serialize_element(v)?;
        } else {
            seq.serialize_element(&Option::<f64>::None)?;
        }
    }
    seq.end()
}

/// Deserialize a float array where `null` entries become `NaN`.
pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<f64>, D::Error> {
    let raw = Vec::<Option<f64>>::deserialize(deserializer)?;
    Ok(raw.into_iter().map(|v| v.unwrap_or(f64::NAN)).collect())
}

/// Same mapping for optional arrays.
pub mod option {
    use super::*;

    /// Serialize an optional float array.
    pub fn serialize<S: Serializer>(
        values: &Option<Vec<f64>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match values {
            Some(v) => super::serialize(v, serializer),
            None => serializer.serialize_none(),
        }
    }

    /// Deserialize an optional float array.
    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Vec<f64>>, D::Error> {
        let raw = Option::<Vec<Option<f64>>>::deserialize(deserializer)?;
        Ok(raw.map(|v| v.into_iter().map(|x| x.unwrap_or(f64::NAN)).collect()))
    }
}

#[cfg(test)]
mod tests {
    use serde::{Deserialize, Serialize};

    #[derive(Serialize, Deserialize)]
    struct Row {
        #[serde(with = "super")]
        q: Vec<f64>,
        #[serde(with = "super::option", default)]
        e: Option<Vec<f64>>,
    }

    #[test]
    fn null_reads_as_nan() {
        let row: Row = serde_json::from_str(r#"{"q": [1.0, null, 3.0]}"#).unwrap();
        assert_eq!(row.q[0], 1.0);
        assert!(row.q[1].is_nan());
        assert!(row.e.is_none());
    }

    #[test]
    fn nan_writes_as_null() {
        let row = Row {
            q: vec![f64::NAN, 2.0],
            e: Some(vec![f64::NAN]),
        };
        let json = serde_json::to_string(&row).unwrap();
        assert_eq!(json, r#"{"q":[null,2.0],"e":[null]}"#);
    }
}
