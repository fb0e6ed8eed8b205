//! Tabular input for bulk export: named columns and rows of text values.

use serde::Deserialize;
use serde_json::Value;
use std::io::Read;

use crate::error::{Result, XlgenError};

/// Text written for absent (`null`) values.
pub const NULL_TEXT: &str = "";

/// An already materialized table.
///
/// Rows may be ragged; each value lands in the column matching its position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dataset {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct RawDataset {
    #[serde(default)]
    columns: Vec<Value>,
    #[serde(default)]
    rows: Vec<Vec<Value>>,
}

impl Dataset {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { columns, rows }
    }

    /// Decode `{"columns": [...], "rows": [[...], ...]}`.
    ///
    /// Strings are taken verbatim, numbers and booleans as their JSON text,
    /// `null` as [`NULL_TEXT`]. Arrays and objects are rejected.
    pub fn from_json_reader<R: Read>(reader: R) -> Result<Self> {
        let raw: RawDataset = serde_json::from_reader(reader)?;
        Self::from_raw(raw)
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let raw: RawDataset = serde_json::from_str(json)?;
        Self::from_raw(raw)
    }

    fn from_raw(raw: RawDataset) -> Result<Self> {
        let columns = raw
            .columns
            .into_iter()
            .map(value_text)
            .collect::<Result<Vec<_>>>()?;
        let rows = raw
            .rows
            .into_iter()
            .map(|row| row.into_iter().map(value_text).collect::<Result<Vec<_>>>())
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { columns, rows })
    }

    /// Number of values, headers included.
    pub fn value_count(&self) -> usize {
        self.columns.len() + self.rows.iter().map(Vec::len).sum::<usize>()
    }
}

/// Canonical text for one JSON value.
fn value_text(value: Value) -> Result<String> {
    match value {
        Value::String(s) => Ok(s),
        Value::Null => Ok(NULL_TEXT.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Number(n) => Ok(n.to_string()),
        other @ (Value::Array(_) | Value::Object(_)) => Err(XlgenError::Format(format!(
            "dataset values must be scalars, got {other}"
        ))),
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::panic
)]
mod tests {
    use super::*;

    #[test]
    fn test_from_json_canonical_text() {
        let ds = Dataset::from_json_str(
            r#"{"columns": ["id", "name", "active"],
                "rows": [[1, "Ann", true], [2.5, null, false], ["003"]]}"#,
        )
        .unwrap();
        assert_eq!(ds.columns, vec!["id", "name", "active"]);
        assert_eq!(ds.rows[0], vec!["1", "Ann", "true"]);
        assert_eq!(ds.rows[1], vec!["2.5", NULL_TEXT, "false"]);
        assert_eq!(ds.rows[2], vec!["003"]);
        assert_eq!(ds.value_count(), 10);
    }

    #[test]
    fn test_missing_fields_default_to_empty() {
        let ds = Dataset::from_json_str("{}").unwrap();
        assert_eq!(ds, Dataset::default());
    }

    #[test]
    fn test_nested_values_rejected() {
        let err = Dataset::from_json_str(r#"{"columns": ["a"], "rows": [[[1]]]}"#).unwrap_err();
        assert!(matches!(err, XlgenError::Format(_)));
    }

    #[test]
    fn test_bad_json() {
        let err = Dataset::from_json_reader("{".as_bytes()).unwrap_err();
        assert!(matches!(err, XlgenError::Json(_)));
    }
}
