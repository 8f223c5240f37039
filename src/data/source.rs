use async_trait::async_trait;
use reqwest::Url;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("invalid dataset location '{location}': {reason}")]
    InvalidLocation { location: String, reason: String },
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, FetchError>;

/// Where the automatically loaded dataset lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatasetLocation {
    Url(Url),
    Path(PathBuf),
}

impl DatasetLocation {
    /// Resolves `name` relative to a page base, which is either an
    /// `http(s)://` URL or a local directory.
    pub fn resolve(base: &str, name: &str) -> Result<Self> {
        let invalid = |reason: String| FetchError::InvalidLocation {
            location: format!("{base} + {name}"),
            reason,
        };

        if base.starts_with("http://") || base.starts_with("https://") {
            let base_url = Url::parse(base).map_err(|e| invalid(e.to_string()))?;
            let url = base_url.join(name).map_err(|e| invalid(e.to_string()))?;
            Ok(DatasetLocation::Url(url))
        } else {
            Ok(DatasetLocation::Path(Path::new(base).join(name)))
        }
    }
}

impl fmt::Display for DatasetLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatasetLocation::Url(url) => write!(f, "{}", url),
            DatasetLocation::Path(path) => write!(f, "{}", path.display()),
        }
    }
}

/// A file handed over by the user through the upload request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl UploadedFile {
    pub fn new(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
        }
    }

    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await.map_err(|source| FetchError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self { name, bytes })
    }
}

#[async_trait]
pub trait DatasetFetcher: Send + Sync {
    async fn fetch(&self, location: &DatasetLocation) -> Result<Vec<u8>>;
}

/// Fetches over HTTP(S) or from the local filesystem.
#[derive(Debug, Clone)]
pub struct SourceFetcher {
    client: reqwest::Client,
}

impl SourceFetcher {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl DatasetFetcher for SourceFetcher {
    async fn fetch(&self, location: &DatasetLocation) -> Result<Vec<u8>> {
        debug!(%location, "fetching dataset");
        match location {
            DatasetLocation::Url(url) => {
                let response = self
                    .client
                    .get(url.clone())
                    .send()
                    .await?
                    .error_for_status()?;
                Ok(response.bytes().await?.to_vec())
            }
            DatasetLocation::Path(path) => {
                tokio::fs::read(path).await.map_err(|source| FetchError::Io {
                    path: path.clone(),
                    source,
                })
            }
        }
    }
}
