use crate::data::{CanonicalRecord, ClusterId};
use serde::Serialize;
use std::collections::BTreeMap;

/// Per-cluster rollup behind the cluster page's KPI cards and bar chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterAggregate {
    pub cluster_id: ClusterId,
    pub label: String,
    pub member_count: usize,
    pub average_return: f64,
}

impl ClusterAggregate {
    /// One aggregate per distinct cluster, in ascending cluster id order.
    ///
    /// The label is taken from the first member seen for that cluster.
    pub fn from_records(records: &[CanonicalRecord]) -> Vec<ClusterAggregate> {
        let mut groups: BTreeMap<&ClusterId, (&str, usize, f64)> = BTreeMap::new();
        for record in records {
            let entry = groups
                .entry(&record.cluster)
                .or_insert((record.cluster_label.as_str(), 0, 0.0));
            entry.1 += 1;
            entry.2 += record.return_value;
        }

        groups
            .into_iter()
            .map(|(id, (label, count, return_sum))| ClusterAggregate {
                cluster_id: id.clone(),
                label: label.to_string(),
                member_count: count,
                average_return: return_sum / count as f64,
            })
            .collect()
    }
}
