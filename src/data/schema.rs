use super::{RawRecord, Scalar};
use std::collections::HashMap;

/// Fields of the canonical record that can be read from a CSV column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CanonicalField {
    Ticker,
    CompanyName,
    ReturnValue,
    Volatility,
    Cluster,
    ClusterLabel,
}

impl CanonicalField {
    /// Columns a dataset must expose to be accepted.
    pub const REQUIRED: [CanonicalField; 4] = [
        CanonicalField::Ticker,
        CanonicalField::ReturnValue,
        CanonicalField::Volatility,
        CanonicalField::Cluster,
    ];

    /// Accepted column names in lookup order, already lowercased.
    pub fn aliases(self) -> &'static [&'static str] {
        match self {
            CanonicalField::Ticker => &["ticker"],
            CanonicalField::CompanyName => &["company_name", "name", "companyname"],
            CanonicalField::ReturnValue => &["return", "returnvalue"],
            CanonicalField::Volatility => &["volatility"],
            CanonicalField::Cluster => &["cluster"],
            CanonicalField::ClusterLabel => &["cluster_label", "clusterlabel"],
        }
    }

    /// Column name as users write it in the CSV header.
    pub fn column_name(self) -> &'static str {
        match self {
            CanonicalField::Ticker => "Ticker",
            CanonicalField::CompanyName => "company_name",
            CanonicalField::ReturnValue => "Return",
            CanonicalField::Volatility => "Volatility",
            CanonicalField::Cluster => "Cluster",
            CanonicalField::ClusterLabel => "Cluster_Label",
        }
    }
}

/// Case-normalized view of one record's columns.
///
/// When a file carries the same column under two casings, the one appearing
/// first in the header wins.
#[derive(Debug)]
pub struct KeyIndex<'a> {
    columns: HashMap<String, &'a Scalar>,
}

impl<'a> KeyIndex<'a> {
    pub fn new(record: &'a RawRecord) -> Self {
        let mut columns = HashMap::new();
        for (name, value) in record.iter() {
            columns
                .entry(name.trim().to_lowercase())
                .or_insert(value);
        }
        Self { columns }
    }

    pub fn has(&self, field: CanonicalField) -> bool {
        field
            .aliases()
            .iter()
            .any(|alias| self.columns.contains_key(*alias))
    }

    /// First alias present in the record, blank or not.
    pub fn lookup(&self, field: CanonicalField) -> Option<&'a Scalar> {
        field
            .aliases()
            .iter()
            .find_map(|alias| self.columns.get(*alias).copied())
    }

    /// First alias carrying a non-blank value, rendered as text.
    pub fn lookup_text(&self, field: CanonicalField) -> Option<String> {
        field
            .aliases()
            .iter()
            .filter_map(|alias| self.columns.get(*alias))
            .find_map(|value| value.to_text())
    }
}
