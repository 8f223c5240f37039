use super::schema::{CanonicalField, KeyIndex};
use super::RawRecord;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("dataset contains no records")]
    Empty,
    #[error("missing required column(s): {}", .0.join(", "))]
    MissingColumns(Vec<&'static str>),
}

pub type Result<T> = std::result::Result<T, ValidationError>;

/// Gates a parsed dataset on the columns of its first record.
///
/// Every required field (ticker, return, volatility, cluster) must be present
/// under one of its accepted names. Later rows are not inspected.
pub fn validate(records: &[RawRecord]) -> Result<()> {
    let first = records.first().ok_or(ValidationError::Empty)?;
    let index = KeyIndex::new(first);

    let missing: Vec<&'static str> = CanonicalField::REQUIRED
        .iter()
        .filter(|field| !index.has(**field))
        .map(|field| field.column_name())
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(ValidationError::MissingColumns(missing))
    }
}
