use super::source::{DatasetFetcher, DatasetLocation, FetchError, UploadedFile};
use super::{RawRecord, Scalar};
use csv::ReaderBuilder;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("dataset unavailable: {0}")]
    Unavailable(#[from] FetchError),
    #[error("malformed CSV: {0}")]
    Csv(#[from] csv::Error),
}

pub type Result<T> = std::result::Result<T, ParseError>;

/// Input handed to the parser: the automatic default resource or a user upload.
#[derive(Debug, Clone)]
pub enum CsvInput {
    Remote(DatasetLocation),
    Upload(UploadedFile),
}

/// Header-keyed CSV parsing with one fixed configuration for every source.
#[derive(Clone)]
pub struct CsvParser {
    fetcher: Arc<dyn DatasetFetcher>,
}

impl CsvParser {
    pub fn new(fetcher: Arc<dyn DatasetFetcher>) -> Self {
        Self { fetcher }
    }

    /// Produces every record of the input, or the first failure.
    pub async fn parse(&self, input: &CsvInput) -> Result<Vec<RawRecord>> {
        match input {
            CsvInput::Remote(location) => {
                let bytes = self.fetcher.fetch(location).await?;
                parse_records(&bytes)
            }
            CsvInput::Upload(file) => parse_records(&file.bytes),
        }
    }
}

pub fn parse_records(bytes: &[u8]) -> Result<Vec<RawRecord>> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(bytes);

    let headers: Vec<String> = rdr.headers()?.iter().map(|s| s.to_string()).collect();

    let mut records = Vec::new();
    for result in rdr.records() {
        let row = result?;
        // Delimiter-only rows (`,,,`) count as blank lines too; they carry
        // no ticker and normalization would drop them anyway
        if row.iter().all(str::is_empty) {
            continue;
        }
        // Short rows simply lack the trailing columns
        let record: RawRecord = headers
            .iter()
            .zip(row.iter())
            .map(|(column, value)| (column.as_str(), coerce_scalar(value)))
            .collect();
        records.push(record);
    }
    Ok(records)
}

/// Converts a raw cell into a typed scalar where the reading is unambiguous.
///
/// Integers written with leading zeros (`0050`) stay text so identifiers survive.
pub fn coerce_scalar(raw: &str) -> Scalar {
    let value = raw.trim();
    if value.is_empty() {
        return Scalar::Null;
    }
    if value.eq_ignore_ascii_case("true") {
        return Scalar::Bool(true);
    }
    if value.eq_ignore_ascii_case("false") {
        return Scalar::Bool(false);
    }
    if is_numeric_literal(value) {
        if let Ok(number) = value.parse::<f64>() {
            if number.is_finite() {
                return Scalar::Number(number);
            }
        }
    }
    Scalar::Text(value.to_string())
}

fn is_numeric_literal(value: &str) -> bool {
    let unsigned = value.strip_prefix(|c: char| c == '-' || c == '+').unwrap_or(value);
    let starts_ok = unsigned
        .chars()
        .next()
        .map_or(false, |c| c.is_ascii_digit() || c == '.');
    let leading_zero = unsigned.len() > 1
        && unsigned.starts_with('0')
        && unsigned[1..].starts_with(|c: char| c.is_ascii_digit());
    starts_ok && !leading_zero
}
