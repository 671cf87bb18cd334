//! Destinations for media URLs discovered by the crawl engine
//!
//! The engine always writes to a [`MediaSink`]. Streaming into the download
//! manager and collecting for later submission are two sinks, not two code
//! paths.

use url::Url;

/// Receives media URLs as pages are processed
pub trait MediaSink: Send {
    /// Accepts the media URLs found on one page
    fn submit(&mut self, urls: Vec<Url>);
}

/// Sink that accumulates URLs in discovery order
#[derive(Debug, Default)]
pub struct CollectSink {
    urls: Vec<Url>,
}

impl CollectSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// URLs collected so far
    pub fn urls(&self) -> &[Url] {
        &self.urls
    }

    pub fn into_urls(self) -> Vec<Url> {
        self.urls
    }
}

impl MediaSink for CollectSink {
    fn submit(&mut self, urls: Vec<Url>) {
        self.urls.extend(urls);
    }
}
