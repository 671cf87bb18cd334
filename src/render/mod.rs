//! Page rendering
//!
//! The crawl engine and the domain policy only talk to a [`Renderer`]: load a
//! page, run extraction queries against it, close it at the end of the
//! session. Two implementations ship with the crate:
//!
//! - [`BrowserRenderer`] drives headless Chromium so that lazily loaded and
//!   script-inserted media is visible (cargo feature `browser`)
//! - [`HttpRenderer`] fetches the static HTML and answers the same queries
//!   with CSS selectors

#[cfg(feature = "browser")]
mod browser;
mod http;

#[cfg(feature = "browser")]
pub use browser::{BrowserOptions, BrowserRenderer};
pub use http::HttpRenderer;

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Errors raised by a renderer
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Navigation timed out for {url}")]
    Timeout { url: String },

    #[error("Navigation failed for {url}: {message}")]
    Navigation { url: String, message: String },

    #[error("HTTP {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("Extraction script failed: {0}")]
    Script(String),

    #[error("No page is loaded")]
    NoPage,

    #[error("Renderer is closed")]
    Closed,
}

/// Extraction queries a renderer can answer for the loaded page
///
/// Every query returns raw attribute values; resolving them into absolute
/// URLs is left to the caller, against the URL returned by
/// [`Renderer::navigate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Extraction {
    /// Every `src` and `href` attribute on any element
    LinkedResources,

    /// Single-URL media attributes: image sources, common lazy-load data
    /// attributes, video sources and posters, and social preview meta tags
    MediaSources,

    /// `srcset` and `data-srcset` candidate lists
    SourceSets,

    /// Inline `style` attributes that declare a background image
    InlineStyles,

    /// `href` of every anchor
    Anchors,
}

impl Extraction {
    /// CSS selector and attribute pairs answering this query on static HTML
    pub fn selectors(self) -> &'static [(&'static str, &'static str)] {
        match self {
            Self::LinkedResources => &[("[src]", "src"), ("[href]", "href")],
            Self::MediaSources => &[
                ("img[src]", "src"),
                ("img[data-src]", "data-src"),
                ("img[data-lazy-src]", "data-lazy-src"),
                ("img[data-original]", "data-original"),
                ("img[data-lazy]", "data-lazy"),
                ("video[src]", "src"),
                ("video[poster]", "poster"),
                ("video source[src]", "src"),
                ("picture source[src]", "src"),
                ("meta[property='og:image'][content]", "content"),
                ("meta[property='og:image:url'][content]", "content"),
                ("meta[name='twitter:image'][content]", "content"),
                ("meta[property='twitter:image'][content]", "content"),
            ],
            Self::SourceSets => &[
                ("img[srcset]", "srcset"),
                ("img[data-srcset]", "data-srcset"),
                ("source[srcset]", "srcset"),
                ("source[data-srcset]", "data-srcset"),
            ],
            Self::InlineStyles => &[("[style*='background']", "style")],
            Self::Anchors => &[("a[href]", "href")],
        }
    }

    /// JavaScript evaluating to a `string[]` answering this query in a live page
    ///
    /// The script reads attributes rather than DOM properties so both renderer
    /// implementations return the same raw values.
    pub fn script(self) -> String {
        let pairs = self
            .selectors()
            .iter()
            .map(|(selector, attr)| format!("[{:?},{:?}]", selector, attr))
            .collect::<Vec<_>>()
            .join(",");

        format!(
            "(() => {{ const out = []; for (const [sel, attr] of [{}]) {{ \
             for (const el of document.querySelectorAll(sel)) {{ \
             const v = el.getAttribute(attr); if (v) out.push(v); }} }} return out; }})()",
            pairs
        )
    }
}

/// A scriptable page renderer
///
/// A renderer holds at most one loaded page at a time. Extraction queries
/// always run against the page loaded by the last successful `navigate`.
#[async_trait]
pub trait Renderer: Send + Sync {
    /// Loads `url`, waiting at most `timeout` for it to settle
    ///
    /// Returns the final URL of the page after redirects.
    async fn navigate(&self, url: &Url, timeout: Duration) -> Result<Url, RenderError>;

    /// Runs an extraction query against the loaded page
    async fn extract(&self, query: Extraction) -> Result<Vec<String>, RenderError>;

    /// Releases the renderer's resources; further calls fail with `Closed`
    async fn close(&self) -> Result<(), RenderError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_script_mentions_every_selector() {
        for query in [
            Extraction::LinkedResources,
            Extraction::MediaSources,
            Extraction::SourceSets,
            Extraction::InlineStyles,
            Extraction::Anchors,
        ] {
            let script = query.script();
            for (selector, attr) in query.selectors() {
                assert!(script.contains(&format!("{:?}", selector)));
                assert!(script.contains(&format!("{:?}", attr)));
            }
        }
    }

    #[test]
    fn test_selectors_parse() {
        for query in [
            Extraction::LinkedResources,
            Extraction::MediaSources,
            Extraction::SourceSets,
            Extraction::InlineStyles,
            Extraction::Anchors,
        ] {
            for (selector, _) in query.selectors() {
                assert!(
                    scraper::Selector::parse(selector).is_ok(),
                    "bad selector {}",
                    selector
                );
            }
        }
    }
}
