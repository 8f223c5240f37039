use super::schema::{CanonicalField, KeyIndex};
use super::{integral, CanonicalRecord, ClusterId, DataError, RawRecord, Result, Scalar};

/// Maps raw rows onto the canonical schema.
///
/// Rows without a ticker are dropped silently; the survivors keep their
/// input order. A numeric field holding something that is not a number fails
/// the whole batch.
pub fn normalize(records: &[RawRecord]) -> Result<Vec<CanonicalRecord>> {
    let mut normalized = Vec::with_capacity(records.len());
    for (i, record) in records.iter().enumerate() {
        if let Some(canonical) = normalize_record(i + 1, record)? {
            normalized.push(canonical);
        }
    }
    Ok(normalized)
}

fn normalize_record(row: usize, record: &RawRecord) -> Result<Option<CanonicalRecord>> {
    let index = KeyIndex::new(record);

    let ticker = match index.lookup_text(CanonicalField::Ticker) {
        Some(ticker) => ticker,
        None => return Ok(None),
    };

    let return_value = number_field(row, &index, CanonicalField::ReturnValue)?;
    let volatility = number_field(row, &index, CanonicalField::Volatility)?;
    let cluster = cluster_id(index.lookup(CanonicalField::Cluster));
    let cluster_label = index
        .lookup_text(CanonicalField::ClusterLabel)
        .unwrap_or_else(|| synthesize_label(&cluster));

    Ok(Some(CanonicalRecord {
        ticker,
        company_name: index.lookup_text(CanonicalField::CompanyName),
        return_value,
        volatility,
        cluster,
        cluster_label,
    }))
}

/// Absent and empty cells read as zero.
fn number_field(row: usize, index: &KeyIndex<'_>, field: CanonicalField) -> Result<f64> {
    let invalid = |value: &str| DataError::InvalidNumber {
        row,
        column: field.column_name(),
        value: value.to_string(),
    };

    match index.lookup(field) {
        None => Ok(0.0),
        Some(value) if value.is_blank() => Ok(0.0),
        Some(Scalar::Number(number)) => Ok(*number),
        Some(Scalar::Text(text)) => match text.trim().parse::<f64>() {
            Ok(number) if number.is_finite() => Ok(number),
            _ => Err(invalid(text.trim())),
        },
        Some(value) => Err(invalid(&value.to_string())),
    }
}

fn cluster_id(value: Option<&Scalar>) -> ClusterId {
    match value {
        None => ClusterId::Unassigned,
        Some(value) if value.is_blank() => ClusterId::Unassigned,
        Some(Scalar::Number(number)) => match integral(*number) {
            Some(id) => ClusterId::Number(id),
            None => ClusterId::Text(number.to_string()),
        },
        Some(value) => ClusterId::Text(value.to_string()),
    }
}

fn synthesize_label(cluster: &ClusterId) -> String {
    match cluster {
        ClusterId::Unassigned => cluster.to_string(),
        id => format!("Cluster {}", id),
    }
}
