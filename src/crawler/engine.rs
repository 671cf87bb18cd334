//! Depth-bounded crawl engine
//!
//! Pages are visited depth-first in link document order using an explicit
//! work-list of `(url, remaining depth)` pairs. Each page is marked visited
//! before it is rendered, its media references are handed to the sink, and
//! only then are its links pushed. The shutdown token is checked before every
//! page and between renderer calls; a cancelled crawl returns what it has.

use crate::crawler::extract::{resolve_page_links, MediaReferences};
use crate::crawler::sink::{CollectSink, MediaSink};
use crate::render::{Extraction, RenderError, Renderer};
use crate::state::CrawlState;
use crate::url::extract_domain;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Crawl engine settings
#[derive(Debug, Clone)]
pub struct CrawlOptions {
    /// Upper bound on a single page navigation
    pub navigation_timeout: Duration,
}

impl Default for CrawlOptions {
    fn default() -> Self {
        Self {
            navigation_timeout: Duration::from_secs(30),
        }
    }
}

/// Counters describing one crawl
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlReport {
    /// Pages rendered successfully
    pub pages_rendered: usize,

    /// Pages that could not be rendered
    pub pages_failed: usize,

    /// Media URLs handed to the sink (deduplicated per page only)
    pub media_found: usize,

    /// Whether the crawl stopped early on shutdown
    pub cancelled: bool,
}

/// Why a page visit ended without links
enum VisitError {
    Render(RenderError),
    Cancelled,
}

/// Crawls pages of one site through a renderer
pub struct Crawler {
    renderer: Arc<dyn Renderer>,
    state: Arc<CrawlState>,
    seed_host: String,
    options: CrawlOptions,
    shutdown: CancellationToken,
}

impl Crawler {
    /// Creates a crawler confined to the seed URL's site
    pub fn new(
        renderer: Arc<dyn Renderer>,
        state: Arc<CrawlState>,
        seed: &Url,
        options: CrawlOptions,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            renderer,
            state,
            seed_host: extract_domain(seed).unwrap_or_default(),
            options,
            shutdown,
        }
    }

    /// Crawls from `start`, following links at most `depth` hops
    ///
    /// Media URLs are written to `sink` page by page, so a download manager
    /// used as the sink starts working before the crawl finishes.
    pub async fn crawl(&self, start: &Url, depth: u32, sink: &mut dyn MediaSink) -> CrawlReport {
        let mut report = CrawlReport::default();
        let mut work: Vec<(Url, u32)> = vec![(start.clone(), depth)];

        while let Some((url, remaining)) = work.pop() {
            if self.shutdown.is_cancelled() {
                tracing::info!("Shutdown requested, stopping crawl");
                report.cancelled = true;
                break;
            }

            if !self.state.mark_visited(url.as_str()) {
                tracing::trace!("Already visited {}", url);
                continue;
            }

            tracing::info!("Crawling {} (depth remaining {})", url, remaining);

            match self.visit(&url, remaining, sink, &mut report).await {
                Ok(links) => {
                    report.pages_rendered += 1;
                    let next = remaining.saturating_sub(1);
                    // Reversed so the first link on the page is visited first
                    for link in links.into_iter().rev() {
                        if !self.state.is_visited(link.as_str()) {
                            work.push((link, next));
                        }
                    }
                }
                Err(VisitError::Render(e)) => {
                    report.pages_failed += 1;
                    tracing::warn!("Failed to render {}: {}", url, e);
                }
                Err(VisitError::Cancelled) => {
                    report.pages_rendered += 1;
                    report.cancelled = true;
                    tracing::info!("Shutdown requested, stopping crawl");
                    break;
                }
            }
        }

        tracing::info!(
            "Crawl finished: {} pages rendered, {} failed, {} media URLs",
            report.pages_rendered,
            report.pages_failed,
            report.media_found
        );

        report
    }

    /// Crawls and returns the discovered media URLs instead of streaming them
    pub async fn crawl_collect(&self, start: &Url, depth: u32) -> (Vec<Url>, CrawlReport) {
        let mut sink = CollectSink::new();
        let report = self.crawl(start, depth, &mut sink).await;
        (sink.into_urls(), report)
    }

    /// Renders one page, emits its media and returns the links to follow
    async fn visit(
        &self,
        url: &Url,
        remaining: u32,
        sink: &mut dyn MediaSink,
        report: &mut CrawlReport,
    ) -> Result<Vec<Url>, VisitError> {
        let base = self
            .renderer
            .navigate(url, self.options.navigation_timeout)
            .await
            .map_err(VisitError::Render)?;

        if self.shutdown.is_cancelled() {
            return Err(VisitError::Cancelled);
        }

        let media = MediaReferences::extract(self.renderer.as_ref())
            .await
            .resolve(&base);

        tracing::debug!("Found {} media URLs on {}", media.len(), url);
        report.media_found += media.len();
        if !media.is_empty() {
            sink.submit(media);
        }

        if remaining == 0 {
            return Ok(Vec::new());
        }

        if self.shutdown.is_cancelled() {
            return Err(VisitError::Cancelled);
        }

        let anchors = match self.renderer.extract(Extraction::Anchors).await {
            Ok(anchors) => anchors,
            Err(e) => {
                tracing::warn!("Link extraction failed on {}: {}", url, e);
                Vec::new()
            }
        };

        let links = resolve_page_links(&anchors, &base, &self.seed_host);
        tracing::debug!("Following {} links from {}", links.len(), url);
        Ok(links)
    }
}
