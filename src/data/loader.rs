use super::normalizer::normalize;
use super::parser::{CsvInput, CsvParser, ParseError};
use super::source::{DatasetFetcher, UploadedFile};
use super::validator::{validate, ValidationError};
use super::{CanonicalRecord, DataError};
use crate::analysis::{ClusterAggregate, MetricsSummary};
use crate::config::DashboardConfig;
use crate::session::{SessionCache, SessionStorage};
use serde::Serialize;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("error reading file: {0}")]
    Parse(#[from] ParseError),
    #[error("wrong file format, {0}")]
    Validation(#[from] ValidationError),
    #[error("invalid data: {0}")]
    InvalidData(#[from] DataError),
    #[error("dataset already loaded for this page")]
    AlreadyLoaded,
}

pub type Result<T> = std::result::Result<T, LoadError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DataOrigin {
    Cache,
    AutoFetch,
    ManualUpload,
}

impl fmt::Display for DataOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DataOrigin::Cache => "session cache",
            DataOrigin::AutoFetch => "automatic fetch",
            DataOrigin::ManualUpload => "manual upload",
        };
        f.write_str(name)
    }
}

/// Everything a page needs to render, independent of the page type.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageData {
    pub origin: DataOrigin,
    pub records: Vec<CanonicalRecord>,
    pub summary: MetricsSummary,
    pub clusters: Vec<ClusterAggregate>,
}

impl PageData {
    pub fn from_records(origin: DataOrigin, records: Vec<CanonicalRecord>) -> Self {
        let summary = MetricsSummary::from_records(&records);
        let clusters = ClusterAggregate::from_records(&records);
        Self {
            origin,
            records,
            summary,
            clusters,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LoadState {
    Ready(PageData),
    /// Automatic loading failed; the upload request is open.
    AwaitingUpload,
}

/// State of the blocking upload request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadPrompt {
    pub open: bool,
    pub selected_file: Option<String>,
    pub last_error: Option<String>,
}

/// Resolves the page dataset: session cache, then the default resource,
/// then user uploads.
///
/// The first successful source settles the page. Any completion arriving
/// after that is discarded and never touches the cache.
pub struct DashboardLoader<S: SessionStorage> {
    config: DashboardConfig,
    parser: CsvParser,
    cache: SessionCache<S>,
    settled: OnceLock<PageData>,
    prompt: Mutex<UploadPrompt>,
}

impl<S: SessionStorage> DashboardLoader<S> {
    pub fn new(config: DashboardConfig, storage: S, fetcher: Arc<dyn DatasetFetcher>) -> Self {
        let cache = SessionCache::new(storage, config.storage_key.clone());
        Self {
            config,
            parser: CsvParser::new(fetcher),
            cache,
            settled: OnceLock::new(),
            prompt: Mutex::default(),
        }
    }

    pub fn config(&self) -> &DashboardConfig {
        &self.config
    }

    pub fn cache(&self) -> &SessionCache<S> {
        &self.cache
    }

    /// The settled page data, if any source has won.
    pub fn page(&self) -> Option<&PageData> {
        self.settled.get()
    }

    pub fn prompt(&self) -> UploadPrompt {
        self.prompt_state().clone()
    }

    /// Page initialization: cache hit, otherwise one automatic fetch attempt.
    pub async fn initialize(&self) -> LoadState {
        if let Some(page) = self.page() {
            return LoadState::Ready(page.clone());
        }

        if let Some(records) = self.cache.load() {
            info!(records = records.len(), "dataset restored from session cache");
            let (page, _) = self.settle(DataOrigin::Cache, records);
            return LoadState::Ready(page.clone());
        }

        let location = match self.config.default_location() {
            Ok(location) => location,
            Err(e) => {
                warn!(error = %e, "default dataset location unusable");
                return self.request_upload();
            }
        };

        match self.ingest(&CsvInput::Remote(location.clone())).await {
            Ok(records) => {
                let (page, won) = self.settle(DataOrigin::AutoFetch, records);
                if won {
                    info!(%location, records = page.records.len(), "dataset loaded automatically");
                }
                LoadState::Ready(page.clone())
            }
            Err(e) => {
                warn!(%location, error = %e, "automatic load failed, waiting for manual upload");
                self.request_upload()
            }
        }
    }

    /// Manual upload path. A rejected file leaves the request open for retry.
    pub async fn submit_upload(&self, file: UploadedFile) -> Result<PageData> {
        if self.page().is_some() {
            return Err(LoadError::AlreadyLoaded);
        }
        self.prompt_state().selected_file = Some(file.name.clone());

        let outcome = match self.ingest(&CsvInput::Upload(file)).await {
            Ok(records) => match self.settle(DataOrigin::ManualUpload, records) {
                (page, true) => Ok(page.clone()),
                (_, false) => Err(LoadError::AlreadyLoaded),
            },
            Err(e) => Err(e),
        };

        if let Err(e) = &outcome {
            self.record_rejection(e);
        }
        outcome
    }

    fn record_rejection(&self, error: &LoadError) {
        match error {
            // Lost to another source; the prompt is already closed
            LoadError::AlreadyLoaded => debug!("manual upload discarded, page already settled"),
            e => {
                warn!(error = %e, "manual upload rejected");
                self.prompt_state().last_error = Some(e.to_string());
            }
        }
    }

    /// Parse, validate and normalize one input.
    async fn ingest(&self, input: &CsvInput) -> Result<Vec<CanonicalRecord>> {
        let raw = self.parser.parse(input).await?;
        validate(&raw)?;
        let records = normalize(&raw)?;
        debug!(
            raw = raw.len(),
            kept = records.len(),
            "normalized dataset"
        );
        Ok(records)
    }

    /// Single-assignment settle; returns the winning page and whether this call won.
    fn settle(&self, origin: DataOrigin, records: Vec<CanonicalRecord>) -> (&PageData, bool) {
        let mut won = false;
        let page = self.settled.get_or_init(|| {
            won = true;
            PageData::from_records(origin, records)
        });

        if won {
            if origin != DataOrigin::Cache {
                self.cache.store(&page.records);
            }
            let mut prompt = self.prompt_state();
            prompt.open = false;
            prompt.last_error = None;
        } else {
            debug!(%origin, winner = %page.origin, "discarding late dataset completion");
        }
        (page, won)
    }

    fn request_upload(&self) -> LoadState {
        if let Some(page) = self.page() {
            return LoadState::Ready(page.clone());
        }
        self.prompt_state().open = true;
        LoadState::AwaitingUpload
    }

    fn prompt_state(&self) -> MutexGuard<'_, UploadPrompt> {
        self.prompt.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
