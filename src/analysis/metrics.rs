use crate::data::CanonicalRecord;
use serde::Serialize;

/// Header KPIs recomputed from the working set on every page initialization.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSummary {
    pub total_count: usize,
    pub average_return: f64,
    pub average_volatility: f64,
    #[serde(rename = "topPerformerTicker")]
    pub top_performer: Option<String>,
}

impl MetricsSummary {
    /// Summarizes the records; an empty set yields zeros and no top performer.
    pub fn from_records(records: &[CanonicalRecord]) -> Self {
        if records.is_empty() {
            return Self::empty();
        }

        let n = records.len() as f64;
        let average_return = records.iter().map(|r| r.return_value).sum::<f64>() / n;
        let average_volatility = records.iter().map(|r| r.volatility).sum::<f64>() / n;

        Self {
            total_count: records.len(),
            average_return,
            average_volatility,
            top_performer: top_performer(records).map(|r| r.ticker.clone()),
        }
    }

    pub fn empty() -> Self {
        Self {
            total_count: 0,
            average_return: 0.0,
            average_volatility: 0.0,
            top_performer: None,
        }
    }

    /// Ticker shown in the KPI card, `-` when there is none.
    pub fn top_performer_display(&self) -> &str {
        self.top_performer.as_deref().unwrap_or("-")
    }
}

/// First record reaching the highest return, scanning in input order.
pub fn top_performer(records: &[CanonicalRecord]) -> Option<&CanonicalRecord> {
    let mut best: Option<&CanonicalRecord> = None;
    for record in records {
        match best {
            Some(current) if record.return_value <= current.return_value => {}
            _ => best = Some(record),
        }
    }
    best
}
