use anyhow::{Context, Result};
use clap::Parser;
use risk_dashboard::session::{FileStorage, SessionCache};
use risk_dashboard::views::{self, PageKind};
use risk_dashboard::{
    DashboardConfig, DashboardLoader, LoadState, PageData, SourceFetcher, UploadedFile,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "risk-dashboard", about = "Risk/return dashboard over a clustered asset CSV")]
struct Args {
    /// YAML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Page base the default dataset is resolved against (URL or directory)
    #[arg(long)]
    base: Option<String>,

    /// Directory backing the session cache
    #[arg(long)]
    session_dir: Option<PathBuf>,

    /// Page to render: dashboard, cluster or datagrid
    #[arg(long, default_value = "dashboard")]
    page: PageKind,

    /// Datagrid search text
    #[arg(long)]
    search: Option<String>,

    /// Files to offer if the automatic load fails, tried in order
    #[arg(long = "upload")]
    uploads: Vec<PathBuf>,

    /// Clear the session cache and exit
    #[arg(long)]
    end_session: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => DashboardConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => DashboardConfig::default(),
    };
    if let Some(base) = &args.base {
        config.base_location = base.clone();
    }
    if let Some(dir) = &args.session_dir {
        config.session_dir = dir.clone();
    }

    let storage = FileStorage::new(&config.session_dir).with_quota(config.cache_quota_bytes);

    if args.end_session {
        SessionCache::new(storage, config.storage_key.clone()).end_session()?;
        println!("Session cache cleared");
        return Ok(());
    }

    let fetcher = Arc::new(SourceFetcher::new(config.fetch_timeout())?);
    let loader = DashboardLoader::new(config, storage, fetcher);

    let page = match loader.initialize().await {
        LoadState::Ready(page) => page,
        LoadState::AwaitingUpload => match await_upload(&loader, &args.uploads).await? {
            Some(page) => page,
            None => {
                println!("No dataset loaded.");
                return Ok(());
            }
        },
    };

    println!("Total assets: {} (source: {})", page.summary.total_count, page.origin);
    match args.page {
        PageKind::Dashboard => print_dashboard(&page),
        PageKind::Cluster => print_clusters(&page),
        PageKind::Datagrid => print_datagrid(&page, args.search.as_deref().unwrap_or("")),
    }

    Ok(())
}

/// Blocking upload request: queued files first, then paths typed on stdin.
async fn await_upload(
    loader: &DashboardLoader<FileStorage>,
    queued: &[PathBuf],
) -> Result<Option<PageData>> {
    match loader.config().default_location() {
        Ok(location) => println!("Could not load {} automatically.", location),
        Err(_) => println!(
            "Could not load {} automatically.",
            loader.config().default_source
        ),
    }

    for path in queued {
        if let Some(page) = try_upload(loader, path).await {
            return Ok(Some(page));
        }
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        println!("Upload a CSV with Ticker, Return, Volatility and Cluster columns (path):");
        let Some(line) = lines.next_line().await? else {
            return Ok(None);
        };
        let path = line.trim();
        if path.is_empty() {
            continue;
        }
        if let Some(page) = try_upload(loader, Path::new(path)).await {
            return Ok(Some(page));
        }
    }
}

async fn try_upload(loader: &DashboardLoader<FileStorage>, path: &Path) -> Option<PageData> {
    println!("Selected file: {}", path.display());
    let file = match UploadedFile::from_path(path).await {
        Ok(file) => file,
        Err(e) => {
            println!("Error reading file: {}", e);
            return None;
        }
    };
    match loader.submit_upload(file).await {
        Ok(page) => Some(page),
        Err(e) => {
            println!("Upload rejected: {}", e);
            None
        }
    }
}

fn print_dashboard(page: &PageData) {
    let summary = &page.summary;
    println!("\n=== Risk vs Return Landscape ===");
    println!("Average Return: {}", views::format_percent(summary.average_return));
    println!(
        "Average Volatility: {}",
        views::format_percent(summary.average_volatility)
    );
    println!("Top Performer: {}", summary.top_performer_display());

    println!(
        "\n{:<10} {:>12} {:>12} {:<20}",
        "Ticker", "Volatility", "Return", "Cluster"
    );
    println!("{:-<57}", "");
    for (record, point) in page.records.iter().zip(views::scatter_points(page)) {
        println!(
            "{:<10} {:>12} {:>12} {:<20}",
            record.ticker,
            views::format_percent(point.x),
            views::format_percent(point.y),
            record.cluster_label
        );
    }
}

fn print_clusters(page: &PageData) {
    println!("\n=== Cluster Distribution ===");
    for cluster in &page.clusters {
        println!(
            "{}: {} Assets (avg return {})",
            cluster.label,
            cluster.member_count,
            views::format_percent(cluster.average_return)
        );
    }

    println!();
    let bars = views::cluster_bars(page);
    let widest = bars.iter().map(|bar| bar.count).max().unwrap_or(0);
    for bar in bars {
        let width = if widest == 0 { 0 } else { bar.count * 40 / widest };
        println!("{:<20} {:<40} {}", bar.label, "#".repeat(width), bar.count);
    }
}

fn print_datagrid(page: &PageData, search: &str) {
    let rows = views::filter_grid(&page.records, search);
    println!(
        "\n{:<10} {:<30} {:<20} {:>10} {:>10}  {}",
        "Ticker", "Company", "Cluster", "Return", "Volatility", "Status"
    );
    println!("{:-<92}", "");
    for record in &rows {
        let status = if record.return_value > 0.0 { "+" } else { "-" };
        println!(
            "{:<10} {:<30} {:<20} {:>10} {:>10}  {}",
            record.ticker,
            record.company_name.as_deref().unwrap_or(""),
            record.cluster_label,
            views::format_percent(record.return_value),
            views::format_percent(record.volatility),
            status
        );
    }
    println!("\n{} of {} rows", rows.len(), page.records.len());
}
