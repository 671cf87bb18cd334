//! Bounded-concurrency download manager
//!
//! Every enqueued URL becomes a task that waits for one of `concurrency`
//! semaphore permits and then runs the per-URL pipeline:
//!
//! 1. Claim the URL in the session state (each URL is processed once)
//! 2. Check the host against the allowed-domain set
//! 3. Resolve the destination `<root>/<host>/<filename>`
//! 4. Skip if the destination already holds data
//! 5. Resolve name collisions with a numeric suffix
//! 6. Stop here in dry-run mode
//! 7. Fetch with retries
//! 8. Drop empty bodies
//! 9. Drop bodies already seen this session
//! 10. Drop images below the minimum dimensions
//! 11. Wait the request delay before taking the next URL

use crate::config::DownloadConfig;
use crate::crawler::MediaSink;
use crate::download::fetcher::{fetch_with_retry, RetryPolicy};
use crate::download::target::{reserve_path, unique_path, MediaFile};
use crate::inspect::ContentInspector;
use crate::state::CrawlState;
use crate::url::{extract_domain, MediaKind};
use reqwest::Client;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Download manager settings
#[derive(Debug, Clone)]
pub struct DownloadOptions {
    /// Directory that per-host directories are created in
    pub output_root: PathBuf,

    /// Maximum number of downloads in flight
    pub concurrency: usize,

    pub retry: RetryPolicy,

    /// Delay a worker waits after a fetch before taking another URL
    pub request_delay: Duration,

    /// Minimum image width; 0 disables the check
    pub min_width: u32,

    /// Minimum image height; 0 disables the check
    pub min_height: u32,

    /// Skip URLs whose destination already exists and is non-empty
    pub skip_existing: bool,

    /// Drop downloads whose bytes match an earlier download
    pub content_dedup: bool,

    /// Report intended downloads without touching the network or disk
    pub dry_run: bool,
}

impl DownloadOptions {
    /// Builds options from the `[download]` config section
    pub fn from_config(config: &DownloadConfig, output_root: PathBuf, dry_run: bool) -> Self {
        Self {
            output_root,
            concurrency: config.concurrency.max(1) as usize,
            retry: RetryPolicy {
                attempts: config.max_retries.max(1),
                delay: Duration::from_millis(config.retry_delay_ms),
            },
            request_delay: Duration::from_millis(config.request_delay_ms),
            min_width: config.min_width,
            min_height: config.min_height,
            skip_existing: config.skip_existing,
            content_dedup: config.content_dedup,
            dry_run,
        }
    }

    fn checks_dimensions(&self) -> bool {
        self.min_width > 0 || self.min_height > 0
    }
}

/// Why a URL was not saved
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// Another task already claimed this URL
    AlreadyQueued,

    /// The host is not in the allowed-domain set
    DomainNotAllowed,

    /// No destination filename could be derived
    NoFilename,

    /// The destination already exists and is non-empty
    AlreadyPresent,

    /// The bytes match a file saved earlier in the session
    Duplicate,

    /// The image is smaller than the configured minimum
    TooSmall { width: u32, height: u32 },

    /// Shutdown was requested before the download started
    Cancelled,
}

impl SkipReason {
    /// Short stable label used in summaries
    pub fn label(&self) -> &'static str {
        match self {
            Self::AlreadyQueued => "already queued",
            Self::DomainNotAllowed => "domain not allowed",
            Self::NoFilename => "no filename",
            Self::AlreadyPresent => "already present",
            Self::Duplicate => "duplicate content",
            Self::TooSmall { .. } => "too small",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooSmall { width, height } => write!(f, "too small ({}x{})", width, height),
            other => f.write_str(other.label()),
        }
    }
}

/// Result of processing one URL
#[derive(Debug)]
pub enum DownloadOutcome {
    Saved { url: Url, path: PathBuf, bytes: u64 },
    Skipped { url: Url, reason: SkipReason },
    Failed { url: Url, error: String },
    DryRun { url: Url, path: PathBuf },
}

impl DownloadOutcome {
    /// Whether the pipeline reached the network for this URL
    fn fetched(&self) -> bool {
        match self {
            Self::Saved { .. } | Self::Failed { .. } => true,
            Self::Skipped { reason, .. } => matches!(
                reason,
                SkipReason::Duplicate | SkipReason::TooSmall { .. }
            ),
            Self::DryRun { .. } => false,
        }
    }
}

/// Aggregate counters for a download session
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DownloadStats {
    pub saved: usize,
    pub bytes: u64,
    pub failed: usize,
    pub dry_run: usize,

    /// Skip counts by [`SkipReason::label`]
    pub skipped: BTreeMap<&'static str, usize>,

    /// Paths written this session, in completion order
    pub saved_paths: Vec<PathBuf>,
}

impl DownloadStats {
    fn record(&mut self, outcome: &DownloadOutcome) {
        match outcome {
            DownloadOutcome::Saved { path, bytes, .. } => {
                self.saved += 1;
                self.bytes += bytes;
                self.saved_paths.push(path.clone());
            }
            DownloadOutcome::Skipped { reason, .. } => {
                *self.skipped.entry(reason.label()).or_default() += 1;
            }
            DownloadOutcome::Failed { .. } => self.failed += 1,
            DownloadOutcome::DryRun { .. } => self.dry_run += 1,
        }
    }

    /// Total skipped URLs across all reasons
    pub fn skipped_total(&self) -> usize {
        self.skipped.values().sum()
    }

    /// Skips for one reason
    pub fn skipped_for(&self, reason: &SkipReason) -> usize {
        self.skipped.get(reason.label()).copied().unwrap_or(0)
    }
}

/// State shared by every download task
struct Pipeline {
    client: Client,
    state: Arc<CrawlState>,
    inspector: Arc<dyn ContentInspector>,
    options: DownloadOptions,
    shutdown: CancellationToken,
}

/// Runs downloads with bounded concurrency
pub struct DownloadManager {
    pipeline: Arc<Pipeline>,
    permits: Arc<Semaphore>,
    tasks: JoinSet<DownloadOutcome>,
    stats: DownloadStats,
}

impl DownloadManager {
    pub fn new(
        client: Client,
        state: Arc<CrawlState>,
        inspector: Arc<dyn ContentInspector>,
        options: DownloadOptions,
        shutdown: CancellationToken,
    ) -> Self {
        let permits = Arc::new(Semaphore::new(options.concurrency.max(1)));
        Self {
            pipeline: Arc::new(Pipeline {
                client,
                state,
                inspector,
                options,
                shutdown,
            }),
            permits,
            tasks: JoinSet::new(),
            stats: DownloadStats::default(),
        }
    }

    /// Queues URLs for download; returns immediately
    ///
    /// Must be called from within a tokio runtime.
    pub fn enqueue<I>(&mut self, urls: I)
    where
        I: IntoIterator<Item = Url>,
    {
        for url in urls {
            let pipeline = Arc::clone(&self.pipeline);
            let permits = Arc::clone(&self.permits);

            self.tasks.spawn(async move {
                let Ok(_permit) = permits.acquire_owned().await else {
                    return DownloadOutcome::Skipped {
                        url,
                        reason: SkipReason::Cancelled,
                    };
                };

                let outcome = pipeline.process(url).await;
                log_outcome(&outcome, pipeline.options.dry_run);

                if outcome.fetched() && !pipeline.options.request_delay.is_zero() {
                    tokio::select! {
                        _ = tokio::time::sleep(pipeline.options.request_delay) => {}
                        _ = pipeline.shutdown.cancelled() => {}
                    }
                }

                outcome
            });
        }
    }

    /// Number of tasks queued or running
    pub fn pending(&self) -> usize {
        self.tasks.len()
    }

    /// Waits until every queued download has finished
    ///
    /// Returns the cumulative statistics of this manager, including
    /// downloads that completed before earlier calls.
    pub async fn wait_for_completion(&mut self) -> DownloadStats {
        while let Some(joined) = self.tasks.join_next().await {
            match joined {
                Ok(outcome) => self.stats.record(&outcome),
                Err(e) => {
                    tracing::error!("Download task failed: {}", e);
                    self.stats.failed += 1;
                }
            }
        }

        self.stats.clone()
    }

    /// Runs the pipeline for one URL in the current task
    ///
    /// Bypasses the concurrency limit and request delay.
    pub async fn process(&self, url: Url) -> DownloadOutcome {
        self.pipeline.process(url).await
    }
}

impl MediaSink for DownloadManager {
    fn submit(&mut self, urls: Vec<Url>) {
        self.enqueue(urls);
    }
}

impl Pipeline {
    async fn process(&self, url: Url) -> DownloadOutcome {
        if !self.state.claim_download(url.as_str()) {
            return skipped(url, SkipReason::AlreadyQueued);
        }

        if self.shutdown.is_cancelled() {
            return skipped(url, SkipReason::Cancelled);
        }

        let allowed = extract_domain(&url)
            .map(|host| self.state.is_allowed(&host))
            .unwrap_or(false);
        if !allowed {
            return skipped(url, SkipReason::DomainNotAllowed);
        }

        let Some(target) = MediaFile::resolve(&url, &self.options.output_root) else {
            return skipped(url, SkipReason::NoFilename);
        };

        if !self.options.dry_run {
            if let Err(e) = tokio::fs::create_dir_all(target.directory()).await {
                return failed(
                    url,
                    format!("cannot create {}: {}", target.directory().display(), e),
                );
            }
        }

        if self.options.skip_existing && has_data(&target.filepath).await {
            return skipped(url, SkipReason::AlreadyPresent);
        }

        if self.options.dry_run {
            let path = unique_path(&target.filepath).await;
            return DownloadOutcome::DryRun { url, path };
        }

        let path = match reserve_path(&target.filepath).await {
            Ok(path) => path,
            Err(e) => return failed(url, format!("cannot reserve destination: {}", e)),
        };

        let bytes = match fetch_with_retry(&self.client, &url, &path, self.options.retry).await {
            Ok(bytes) => bytes,
            Err(e) => return failed(url, e.to_string()),
        };

        if bytes == 0 {
            discard(&path).await;
            return failed(url, "empty response body".to_string());
        }

        if self.options.content_dedup {
            match self.content_hash(&path).await {
                Some(hash) if !self.state.register_content_hash(&hash) => {
                    discard(&path).await;
                    return skipped(url, SkipReason::Duplicate);
                }
                Some(_) => {}
                None => tracing::warn!("Could not hash {}, keeping it", path.display()),
            }
        }

        if self.options.checks_dimensions() && MediaKind::from_path(&path) == Some(MediaKind::Image)
        {
            match self.dimensions(&path).await {
                Some((width, height))
                    if width < self.options.min_width || height < self.options.min_height =>
                {
                    discard(&path).await;
                    return skipped(url, SkipReason::TooSmall { width, height });
                }
                Some(_) => {}
                None => tracing::debug!(
                    "Could not read dimensions of {}, keeping it",
                    path.display()
                ),
            }
        }

        DownloadOutcome::Saved { url, path, bytes }
    }

    async fn content_hash(&self, path: &Path) -> Option<String> {
        let inspector = Arc::clone(&self.inspector);
        let path = path.to_path_buf();
        match tokio::task::spawn_blocking(move || inspector.content_hash(&path)).await {
            Ok(Ok(hash)) => Some(hash),
            Ok(Err(e)) => {
                tracing::debug!("Hashing failed: {}", e);
                None
            }
            Err(e) => {
                tracing::debug!("Hashing task failed: {}", e);
                None
            }
        }
    }

    async fn dimensions(&self, path: &Path) -> Option<(u32, u32)> {
        let inspector = Arc::clone(&self.inspector);
        let path = path.to_path_buf();
        tokio::task::spawn_blocking(move || inspector.dimensions(&path))
            .await
            .ok()
            .flatten()
    }
}

fn skipped(url: Url, reason: SkipReason) -> DownloadOutcome {
    DownloadOutcome::Skipped { url, reason }
}

fn failed(url: Url, error: String) -> DownloadOutcome {
    DownloadOutcome::Failed { url, error }
}

async fn has_data(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|m| m.is_file() && m.len() > 0)
        .unwrap_or(false)
}

async fn discard(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        tracing::warn!("Failed to remove {}: {}", path.display(), e);
    }
}

fn log_outcome(outcome: &DownloadOutcome, dry_run: bool) {
    match outcome {
        DownloadOutcome::Saved { url, path, bytes } => {
            tracing::info!("Saved {} -> {} ({} bytes)", url, path.display(), bytes);
        }
        DownloadOutcome::Skipped { url, reason } => {
            tracing::debug!(dry_run, "Skipped {}: {}", url, reason);
        }
        DownloadOutcome::Failed { url, error } => {
            tracing::warn!("Failed to download {}: {}", url, error);
        }
        DownloadOutcome::DryRun { url, path } => {
            tracing::info!(dry_run, "Would download {} -> {}", url, path.display());
        }
    }
}
