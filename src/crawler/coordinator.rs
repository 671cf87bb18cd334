//! Harvest coordinator - session orchestration
//!
//! A harvest session runs these stages in order:
//! 1. Render the seed page and derive the allowed-domain set
//! 2. Crawl depth-first, streaming media URLs into the download manager
//! 3. Wait for every download to settle
//! 4. Run the deduplication pass over the output tree (unless disabled)
//! 5. Close the renderer, whatever happened before

use crate::config::{Config, DedupConfig, RendererKind};
use crate::crawler::engine::{CrawlOptions, Crawler};
use crate::dedup::{DedupOptions, DedupReport, Deduplicator};
use crate::download::{build_http_client, build_page_client, DownloadManager, DownloadOptions};
use crate::inspect::{ContentInspector, ImageInspector};
use crate::output::HarvestSummary;
use crate::render::{HttpRenderer, Renderer};
use crate::state::CrawlState;
use crate::url::discover_allowed_domains;
use crate::{HarvestError, Result};
use chrono::{DateTime, Utc};
use reqwest::Client;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Runs one harvest session from a seed URL
pub struct Harvester {
    config: Config,
    output_root: PathBuf,
    dry_run: bool,
    renderer: Arc<dyn Renderer>,
    client: Client,
    inspector: Arc<dyn ContentInspector>,
    shutdown: CancellationToken,
}

impl Harvester {
    /// Starts the configured renderer and builds the download client
    ///
    /// # Errors
    ///
    /// Returns `RendererInit` if the renderer cannot start, or `Http` if the
    /// HTTP client cannot be built.
    pub async fn launch(
        config: Config,
        output_root: PathBuf,
        dry_run: bool,
        shutdown: CancellationToken,
    ) -> Result<Self> {
        let request_timeout = Duration::from_secs(config.download.request_timeout_secs);
        let client = build_http_client(&config.user_agent, request_timeout)?;
        let renderer = start_renderer(&config).await?;

        Ok(Self::with_components(
            config,
            output_root,
            dry_run,
            renderer,
            client,
            Arc::new(ImageInspector),
            shutdown,
        ))
    }

    /// Assembles a harvester from already constructed parts
    pub fn with_components(
        config: Config,
        output_root: PathBuf,
        dry_run: bool,
        renderer: Arc<dyn Renderer>,
        client: Client,
        inspector: Arc<dyn ContentInspector>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            config,
            output_root,
            dry_run,
            renderer,
            client,
            inspector,
            shutdown,
        }
    }

    /// Runs the session and closes the renderer
    ///
    /// Consumes the harvester, so the renderer is closed exactly once.
    ///
    /// # Errors
    ///
    /// Returns `SeedUnreachable` if not a single page could be rendered and
    /// the session was not cancelled.
    pub async fn run(self, seed: &Url) -> Result<HarvestSummary> {
        let started_at = Utc::now();
        let result = self.harvest(seed, started_at).await;

        if let Err(e) = self.renderer.close().await {
            tracing::warn!("Failed to close renderer: {}", e);
        }

        result
    }

    async fn harvest(&self, seed: &Url, started_at: DateTime<Utc>) -> Result<HarvestSummary> {
        let navigation_timeout = Duration::from_millis(self.config.crawler.navigation_timeout_ms);

        tracing::info!(
            dry_run = self.dry_run,
            "Starting harvest of {} (depth {}) into {}",
            seed,
            self.config.crawler.depth,
            self.output_root.display()
        );

        let allowed = discover_allowed_domains(self.renderer.as_ref(), seed, navigation_timeout).await;
        let state = Arc::new(CrawlState::new(allowed));

        let mut downloads = DownloadManager::new(
            self.client.clone(),
            Arc::clone(&state),
            Arc::clone(&self.inspector),
            DownloadOptions::from_config(
                &self.config.download,
                self.output_root.clone(),
                self.dry_run,
            ),
            self.shutdown.clone(),
        );

        let crawler = Crawler::new(
            Arc::clone(&self.renderer),
            Arc::clone(&state),
            seed,
            CrawlOptions { navigation_timeout },
            self.shutdown.clone(),
        );

        let crawl = crawler
            .crawl(seed, self.config.crawler.depth, &mut downloads)
            .await;

        if downloads.pending() > 0 {
            tracing::info!("Waiting for {} pending downloads", downloads.pending());
        }
        let download_stats = downloads.wait_for_completion().await;

        if crawl.pages_rendered == 0 && !crawl.cancelled {
            return Err(HarvestError::SeedUnreachable {
                url: seed.to_string(),
            });
        }

        let dedup = if !self.config.dedup.enabled {
            tracing::debug!("Deduplication disabled");
            None
        } else if crawl.cancelled || self.shutdown.is_cancelled() {
            tracing::info!("Skipping deduplication after shutdown");
            None
        } else if !self.output_root.is_dir() {
            tracing::debug!("No output directory, skipping deduplication");
            None
        } else {
            let options = DedupOptions::pipeline(&self.config.dedup, self.dry_run);
            Some(dedup_blocking(Arc::clone(&self.inspector), &self.output_root, options).await?)
        };

        Ok(HarvestSummary {
            seed: seed.to_string(),
            output_root: self.output_root.clone(),
            allowed_domains: state.allowed_domains().iter().cloned().collect(),
            crawl,
            downloads: download_stats,
            dedup,
            dry_run: self.dry_run,
            started_at,
            finished_at: Utc::now(),
        })
    }
}

/// Starts the renderer selected in the config
async fn start_renderer(config: &Config) -> Result<Arc<dyn Renderer>> {
    match config.crawler.renderer {
        RendererKind::Http => {
            let timeout = Duration::from_millis(config.crawler.navigation_timeout_ms);
            let client = build_page_client(&config.user_agent, timeout)?;
            tracing::info!("Using static HTTP renderer");
            Ok(Arc::new(HttpRenderer::new(client)))
        }

        #[cfg(feature = "browser")]
        RendererKind::Browser => {
            use crate::render::{BrowserOptions, BrowserRenderer};

            let options = BrowserOptions {
                user_agent: config.user_agent.header_value(),
                settle: Duration::from_millis(config.crawler.settle_ms),
            };
            let renderer = BrowserRenderer::launch(options)
                .await
                .map_err(HarvestError::RendererInit)?;
            tracing::info!("Using headless browser renderer");
            Ok(Arc::new(renderer))
        }

        #[cfg(not(feature = "browser"))]
        RendererKind::Browser => Err(HarvestError::RendererInit(
            "this build does not include the `browser` feature".to_string(),
        )),
    }
}

/// Deduplicates an existing directory of media
///
/// Runs the identical-content and visual phases only; filename patterns are
/// not trusted outside a harvest's own output.
///
/// # Errors
///
/// Returns `InvalidDirectory` if `dir` is missing or not a directory.
pub async fn run_dedup(dir: &Path, config: &DedupConfig, dry_run: bool) -> Result<DedupReport> {
    let is_dir = tokio::fs::metadata(dir)
        .await
        .map(|m| m.is_dir())
        .unwrap_or(false);
    if !is_dir {
        return Err(HarvestError::InvalidDirectory {
            path: dir.to_path_buf(),
        });
    }

    let options = DedupOptions::standalone(config, dry_run);
    dedup_blocking(Arc::new(ImageInspector), dir, options).await
}

async fn dedup_blocking(
    inspector: Arc<dyn ContentInspector>,
    root: &Path,
    options: DedupOptions,
) -> Result<DedupReport> {
    let root = root.to_path_buf();
    tokio::task::spawn_blocking(move || Deduplicator::new(inspector.as_ref(), options).run(&root))
        .await
        .map_err(|e| HarvestError::Io(io::Error::other(e.to_string())))
}
