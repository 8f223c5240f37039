pub mod clusters;
pub mod metrics;

pub use clusters::ClusterAggregate;
pub use metrics::MetricsSummary;
