//! Risk/return dashboard data pipeline.
//!
//! Loads an asset dataset (ticker, return, volatility, cluster) from CSV,
//! normalizes it into [`CanonicalRecord`]s, keeps it in session storage and
//! derives the summaries the dashboard pages render.

pub mod analysis;
pub mod config;
pub mod data;
pub mod session;
pub mod views;

pub use analysis::{ClusterAggregate, MetricsSummary};
pub use config::DashboardConfig;
pub use data::loader::{DashboardLoader, DataOrigin, LoadError, LoadState, PageData, UploadPrompt};
pub use data::source::{DatasetFetcher, DatasetLocation, SourceFetcher, UploadedFile};
pub use data::{CanonicalRecord, ClusterId, RawRecord, Scalar};
