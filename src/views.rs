//! Page projections handed to renderers.
//!
//! These only reshape [`PageData`]; nothing here feeds back into loading.

use crate::data::loader::PageData;
use crate::data::{CanonicalRecord, ClusterId};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageKind {
    Dashboard,
    Cluster,
    Datagrid,
}

impl FromStr for PageKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dashboard" => Ok(PageKind::Dashboard),
            "cluster" => Ok(PageKind::Cluster),
            "datagrid" => Ok(PageKind::Datagrid),
            other => Err(format!(
                "unknown page '{other}' (expected dashboard, cluster or datagrid)"
            )),
        }
    }
}

impl fmt::Display for PageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PageKind::Dashboard => "dashboard",
            PageKind::Cluster => "cluster",
            PageKind::Datagrid => "datagrid",
        };
        f.write_str(name)
    }
}

/// One marker of the risk/return scatter plot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScatterPoint {
    pub x: f64,
    pub y: f64,
    pub group: ClusterId,
    pub tooltip: String,
}

/// One bar of the cluster distribution chart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClusterBar {
    pub label: String,
    pub count: usize,
}

pub fn scatter_points(page: &PageData) -> Vec<ScatterPoint> {
    page.records
        .iter()
        .map(|record| {
            let mut lines = vec![record.ticker.as_str()];
            if let Some(company) = record.company_name.as_deref() {
                lines.push(company);
            }
            lines.push(record.cluster_label.as_str());
            ScatterPoint {
                x: record.volatility,
                y: record.return_value,
                group: record.cluster.clone(),
                tooltip: lines.join("\n"),
            }
        })
        .collect()
}

pub fn cluster_bars(page: &PageData) -> Vec<ClusterBar> {
    page.clusters
        .iter()
        .map(|cluster| ClusterBar {
            label: cluster.label.clone(),
            count: cluster.member_count,
        })
        .collect()
}

/// Fraction rendered as a percentage with two decimals, e.g. `0.1234` -> `12.34%`.
pub fn format_percent(value: f64) -> String {
    format!("{:.2}%", value * 100.0)
}

/// Text of a grid row as the search box sees it.
pub fn grid_row_text(record: &CanonicalRecord) -> String {
    [
        record.ticker.as_str(),
        record.company_name.as_deref().unwrap_or(""),
        record.cluster_label.as_str(),
        &format_percent(record.return_value),
        &format_percent(record.volatility),
    ]
    .join(" ")
}

/// Rows whose text contains the query, ignoring case. A blank query keeps all rows.
pub fn filter_grid<'a>(records: &'a [CanonicalRecord], query: &str) -> Vec<&'a CanonicalRecord> {
    let needle = query.trim().to_lowercase();
    records
        .iter()
        .filter(|record| needle.is_empty() || grid_row_text(record).to_lowercase().contains(&needle))
        .collect()
}
