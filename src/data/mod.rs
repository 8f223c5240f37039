pub mod loader;
pub mod normalizer;
pub mod parser;
pub mod schema;
pub mod source;
pub mod validator;

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// A single cell after parser-side type coercion.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
}

impl Scalar {
    /// Null cells and whitespace-only text carry no value.
    pub fn is_blank(&self) -> bool {
        match self {
            Scalar::Null => true,
            Scalar::Text(text) => text.trim().is_empty(),
            _ => false,
        }
    }

    /// Text form of the cell, `None` when blank.
    pub fn to_text(&self) -> Option<String> {
        if self.is_blank() {
            None
        } else {
            Some(self.to_string())
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Null => Ok(()),
            Scalar::Bool(value) => write!(f, "{}", value),
            Scalar::Number(value) => match integral(*value) {
                Some(whole) => write!(f, "{}", whole),
                None => write!(f, "{}", value),
            },
            Scalar::Text(text) => f.write_str(text.trim()),
        }
    }
}

/// Returns the value as an `i64` when it has no fractional part and fits.
pub(crate) fn integral(value: f64) -> Option<i64> {
    const LIMIT: f64 = 9_007_199_254_740_992.0; // 2^53
    if value.is_finite() && value.fract() == 0.0 && value.abs() <= LIMIT {
        Some(value as i64)
    } else {
        None
    }
}

/// One parsed CSV row keyed by the header exactly as it appeared in the file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawRecord {
    fields: Vec<(String, Scalar)>,
}

impl RawRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, column: impl Into<String>, value: Scalar) {
        let column = column.into();
        match self.fields.iter_mut().find(|(name, _)| *name == column) {
            Some((_, slot)) => *slot = value,
            None => self.fields.push((column, value)),
        }
    }

    pub fn with(mut self, column: impl Into<String>, value: Scalar) -> Self {
        self.insert(column, value);
        self
    }

    pub fn get(&self, column: &str) -> Option<&Scalar> {
        self.fields
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Scalar)> {
        self.fields.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, Scalar)> for RawRecord {
    fn from_iter<I: IntoIterator<Item = (K, Scalar)>>(iter: I) -> Self {
        let mut record = RawRecord::new();
        for (column, value) in iter {
            record.insert(column, value);
        }
        record
    }
}

/// Externally assigned cluster key.
///
/// Variant order defines the ascending sort used for cluster rollups:
/// numeric ids first, then text ids, then records without a cluster.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ClusterId {
    Number(i64),
    Text(String),
    Unassigned,
}

impl fmt::Display for ClusterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClusterId::Number(id) => write!(f, "{}", id),
            ClusterId::Text(id) => f.write_str(id),
            ClusterId::Unassigned => f.write_str("Unassigned"),
        }
    }
}

/// Normalized asset row consumed by aggregation and rendering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalRecord {
    pub ticker: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,
    pub return_value: f64,
    pub volatility: f64,
    pub cluster: ClusterId,
    pub cluster_label: String,
}

#[derive(Debug, Error, PartialEq)]
pub enum DataError {
    #[error("record {row}: column '{column}' is not a number: {value:?}")]
    InvalidNumber {
        row: usize,
        column: &'static str,
        value: String,
    },
}

pub type Result<T> = std::result::Result<T, DataError>;
