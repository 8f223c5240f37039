use approx::assert_relative_eq;
use async_trait::async_trait;
use risk_dashboard::data::source::FetchError;
use risk_dashboard::session::{FileStorage, MemoryStorage, SessionCache, SessionStorage};
use risk_dashboard::{
    ClusterId, DashboardConfig, DashboardLoader, DataOrigin, DatasetFetcher, DatasetLocation,
    LoadError, LoadState, SourceFetcher, UploadedFile,
};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/data")
        .join(name)
}

fn config_for(base: &Path, session_dir: &Path) -> DashboardConfig {
    DashboardConfig {
        base_location: base.display().to_string(),
        session_dir: session_dir.to_path_buf(),
        fetch_timeout_secs: 2,
        ..DashboardConfig::default()
    }
}

fn file_fetcher() -> Arc<dyn DatasetFetcher> {
    Arc::new(SourceFetcher::new(Duration::from_secs(2)).unwrap())
}

/// Serves a fixed body after a delay and counts calls.
struct SlowFetcher {
    body: &'static str,
    delay: Duration,
    calls: AtomicUsize,
}

#[async_trait]
impl DatasetFetcher for SlowFetcher {
    async fn fetch(&self, _location: &DatasetLocation) -> Result<Vec<u8>, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        Ok(self.body.as_bytes().to_vec())
    }
}

#[tokio::test]
async fn test_manual_upload_end_to_end() {
    let base = tempfile::tempdir().unwrap();
    let session = tempfile::tempdir().unwrap();
    let config = config_for(base.path(), session.path());
    let loader = DashboardLoader::new(
        config.clone(),
        FileStorage::new(session.path()),
        file_fetcher(),
    );

    // Nothing at the default location
    assert_eq!(loader.initialize().await, LoadState::AwaitingUpload);
    assert!(loader.prompt().open);

    let file = UploadedFile::from_path(fixture("well_formed.csv")).await.unwrap();
    let page = loader.submit_upload(file).await.unwrap();

    assert_eq!(page.origin, DataOrigin::ManualUpload);
    assert_eq!(page.summary.total_count, 3);
    assert_eq!(page.summary.top_performer.as_deref(), Some("ANTM"));
    let members: usize = page.clusters.iter().map(|c| c.member_count).sum();
    assert_eq!(members, 3);
    assert_eq!(page.clusters.len(), 2);

    let prompt = loader.prompt();
    assert!(!prompt.open);
    assert_eq!(prompt.selected_file.as_deref(), Some("well_formed.csv"));

    let cache = SessionCache::new(FileStorage::new(session.path()), config.storage_key);
    assert_eq!(cache.load(), Some(page.records));
}

#[tokio::test]
async fn test_manual_upload_missing_return_keeps_prompt_open() {
    let base = tempfile::tempdir().unwrap();
    let session = tempfile::tempdir().unwrap();
    let config = config_for(base.path(), session.path());
    let storage = FileStorage::new(session.path());
    let loader = DashboardLoader::new(config.clone(), storage.clone(), file_fetcher());

    assert_eq!(loader.initialize().await, LoadState::AwaitingUpload);

    let file = UploadedFile::from_path(fixture("missing_return.csv")).await.unwrap();
    let err = loader.submit_upload(file).await.unwrap_err();

    assert!(matches!(err, LoadError::Validation(_)));
    assert!(err.to_string().contains("Return"));

    let prompt = loader.prompt();
    assert!(prompt.open);
    assert!(prompt.last_error.unwrap().contains("Return"));
    assert_eq!(storage.get(&config.storage_key).unwrap(), None);
    assert!(loader.page().is_none());

    // Retry with a good file on the same open request
    let file = UploadedFile::from_path(fixture("well_formed.csv")).await.unwrap();
    assert!(loader.submit_upload(file).await.is_ok());
    assert!(!loader.prompt().open);
}

#[tokio::test]
async fn test_manual_upload_malformed_bytes_reports_parse_error() {
    let loader = DashboardLoader::new(
        DashboardConfig::default(),
        MemoryStorage::new(),
        Arc::new(SlowFetcher {
            body: "Ticker\n",
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        }),
    );
    assert_eq!(loader.initialize().await, LoadState::AwaitingUpload);

    let file = UploadedFile::new("broken.csv", b"Ticker,Return\n\xff,1\n".to_vec());
    let err = loader.submit_upload(file).await.unwrap_err();

    assert!(matches!(err, LoadError::Parse(_)));
    assert!(err.to_string().starts_with("error reading file"));
    assert!(loader.prompt().open);
}

#[tokio::test]
async fn test_auto_load_from_page_directory() {
    let session = tempfile::tempdir().unwrap();
    let config = config_for(&fixture(""), session.path());
    let loader = DashboardLoader::new(config, MemoryStorage::new(), file_fetcher());

    let LoadState::Ready(page) = loader.initialize().await else {
        panic!("default dataset should load");
    };

    assert_eq!(page.origin, DataOrigin::AutoFetch);
    let tickers: Vec<_> = page.records.iter().map(|r| r.ticker.as_str()).collect();
    assert_eq!(tickers, vec!["BBRI", "ADRO", "UNVR", "GOTO"]);
    assert_eq!(page.records[0].company_name.as_deref(), Some("Bank Rakyat Indonesia"));
    assert_eq!(page.records[1].cluster_label, "Cluster 2");

    // ADRO and GOTO tie on return; the earlier row wins
    assert_eq!(page.summary.top_performer.as_deref(), Some("ADRO"));

    let ids: Vec<_> = page.clusters.iter().map(|c| c.cluster_id.clone()).collect();
    assert_eq!(
        ids,
        vec![ClusterId::Number(0), ClusterId::Number(1), ClusterId::Number(2)]
    );
    assert_eq!(page.clusters[0].label, "Defensive Banks");
    assert_relative_eq!(page.clusters[0].average_return, 0.017, epsilon = 1e-12);
}

#[tokio::test]
async fn test_cache_hit_skips_fetch() {
    let storage = Arc::new(MemoryStorage::new());
    let fetcher = Arc::new(SlowFetcher {
        body: "Ticker,Return,Volatility,Cluster\nAAA,0.1,0.2,1\n",
        delay: Duration::ZERO,
        calls: AtomicUsize::new(0),
    });

    let first = DashboardLoader::new(
        DashboardConfig::default(),
        SharedStorage(storage.clone()),
        fetcher.clone(),
    );
    let LoadState::Ready(fetched) = first.initialize().await else {
        panic!("first page should load");
    };

    // Next page of the same session
    let second = DashboardLoader::new(
        DashboardConfig::default(),
        SharedStorage(storage),
        fetcher.clone(),
    );
    let LoadState::Ready(cached) = second.initialize().await else {
        panic!("second page should hit the cache");
    };

    assert_eq!(cached.origin, DataOrigin::Cache);
    assert_eq!(cached.records, fetched.records);
    assert_eq!(cached.summary, fetched.summary);
    assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_late_fetch_does_not_overwrite_upload() {
    let storage = Arc::new(MemoryStorage::new());
    let loader = DashboardLoader::new(
        DashboardConfig::default(),
        SharedStorage(storage.clone()),
        Arc::new(SlowFetcher {
            body: "Ticker,Return,Volatility,Cluster\nLATE,0.9,0.2,1\n",
            delay: Duration::from_millis(50),
            calls: AtomicUsize::new(0),
        }),
    );

    let upload = UploadedFile::new(
        "mine.csv",
        "Ticker,Return,Volatility,Cluster\nMINE,0.1,0.2,1\n",
    );
    let (state, uploaded) = tokio::join!(loader.initialize(), loader.submit_upload(upload));

    let uploaded = uploaded.unwrap();
    assert_eq!(uploaded.origin, DataOrigin::ManualUpload);
    let LoadState::Ready(page) = state else {
        panic!("initialize should report the settled page");
    };
    assert_eq!(page, uploaded);

    let cache = SessionCache::new(SharedStorage(storage), "quantum_r_data_v2");
    let cached = cache.load().unwrap();
    assert_eq!(cached[0].ticker, "MINE");
}

#[tokio::test]
async fn test_cache_write_failure_still_renders() {
    let loader = DashboardLoader::new(
        DashboardConfig::default(),
        MemoryStorage::with_quota(8),
        Arc::new(SlowFetcher {
            body: "Ticker,Return,Volatility,Cluster\nAAA,0.1,0.2,1\n",
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        }),
    );

    let LoadState::Ready(page) = loader.initialize().await else {
        panic!("page should render without the cache");
    };
    assert_eq!(page.summary.total_count, 1);
    assert_eq!(loader.cache().load(), None);
}

#[tokio::test]
async fn test_invalid_number_rejects_upload() {
    let loader = DashboardLoader::new(
        DashboardConfig::default(),
        MemoryStorage::new(),
        Arc::new(SlowFetcher {
            body: "",
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        }),
    );
    assert_eq!(loader.initialize().await, LoadState::AwaitingUpload);

    let file = UploadedFile::new(
        "bad.csv",
        "Ticker,Return,Volatility,Cluster\nAAA,12%,0.2,1\n",
    );
    let err = loader.submit_upload(file).await.unwrap_err();

    assert!(matches!(err, LoadError::InvalidData(_)));
    assert!(loader.prompt().open);
    assert_eq!(loader.cache().load(), None);
}

#[tokio::test]
async fn test_unusable_default_location_opens_prompt() {
    let config = DashboardConfig {
        base_location: "http://".to_string(),
        ..DashboardConfig::default()
    };
    let fetcher = Arc::new(SlowFetcher {
        body: "Ticker,Return,Volatility,Cluster\nAAA,0.1,0.2,1\n",
        delay: Duration::ZERO,
        calls: AtomicUsize::new(0),
    });
    let loader = DashboardLoader::new(config, MemoryStorage::new(), fetcher.clone());

    assert_eq!(loader.initialize().await, LoadState::AwaitingUpload);
    assert!(loader.prompt().open);
    assert_eq!(fetcher.calls.load(Ordering::SeqCst), 0);
    assert_eq!(loader.cache().load(), None);

    let file = UploadedFile::from_path(fixture("well_formed.csv")).await.unwrap();
    let page = loader.submit_upload(file).await.unwrap();
    assert_eq!(page.origin, DataOrigin::ManualUpload);
}

#[tokio::test]
async fn test_silent_server_times_out_to_upload() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    // Accepts connections and never answers
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });

    let config = DashboardConfig {
        base_location: format!("http://{addr}/"),
        fetch_timeout_secs: 1,
        ..DashboardConfig::default()
    };
    let fetcher = Arc::new(SourceFetcher::new(config.fetch_timeout()).unwrap());
    let loader = DashboardLoader::new(config, MemoryStorage::new(), fetcher);

    let state = tokio::time::timeout(Duration::from_secs(10), loader.initialize())
        .await
        .expect("fetch timeout should fire before the test deadline");
    assert_eq!(state, LoadState::AwaitingUpload);
    assert!(loader.prompt().open);
    assert!(loader.page().is_none());
}

/// Storage shared between loaders, standing in for one browser session.
struct SharedStorage(Arc<MemoryStorage>);

impl SessionStorage for SharedStorage {
    fn get(&self, key: &str) -> risk_dashboard::session::storage::Result<Option<String>> {
        self.0.get(key)
    }

    fn set(&self, key: &str, value: &str) -> risk_dashboard::session::storage::Result<()> {
        self.0.set(key, value)
    }

    fn remove(&self, key: &str) -> risk_dashboard::session::storage::Result<()> {
        self.0.remove(key)
    }
}
