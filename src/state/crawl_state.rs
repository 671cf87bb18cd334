//! Session state for one harvest
//!
//! All membership checks are combined with their insert under a single lock
//! acquisition, so two workers racing on the same key cannot both win.
use std::collections::{BTreeSet, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Shared state of a single crawl session
///
/// The allowed-domain set is fixed at construction. The other sets only
/// grow for the lifetime of the session.
#[derive(Debug)]
pub struct CrawlState {
    /// Hosts eligible for link-following or asset download
    allowed_domains: BTreeSet<String>,

    /// Page URLs already traversed
    visited_pages: Mutex<HashSet<String>>,

    /// Asset URLs already handed to the download manager
    downloaded_urls: Mutex<HashSet<String>>,

    /// Content digests of downloads that were kept
    content_hashes: Mutex<HashSet<String>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl CrawlState {
    /// Creates the state for a session with a fixed allowlist
    pub fn new(allowed_domains: BTreeSet<String>) -> Self {
        Self {
            allowed_domains: allowed_domains
                .into_iter()
                .map(|d| d.to_ascii_lowercase())
                .collect(),
            visited_pages: Mutex::new(HashSet::new()),
            downloaded_urls: Mutex::new(HashSet::new()),
            content_hashes: Mutex::new(HashSet::new()),
        }
    }

    /// The allowed domains for this session
    pub fn allowed_domains(&self) -> &BTreeSet<String> {
        &self.allowed_domains
    }

    /// Returns true if the host may be downloaded from
    pub fn is_allowed(&self, host: &str) -> bool {
        self.allowed_domains.contains(&host.to_ascii_lowercase())
    }

    /// Marks a page as visited
    ///
    /// Returns true if the page had not been visited before.
    pub fn mark_visited(&self, url: &str) -> bool {
        lock(&self.visited_pages).insert(url.to_string())
    }

    /// Returns true if the page has been visited
    pub fn is_visited(&self, url: &str) -> bool {
        lock(&self.visited_pages).contains(url)
    }

    /// Number of pages visited so far
    pub fn visited_count(&self) -> usize {
        lock(&self.visited_pages).len()
    }

    /// Claims an asset URL for download
    ///
    /// Returns true for exactly one caller per URL per session.
    pub fn claim_download(&self, url: &str) -> bool {
        lock(&self.downloaded_urls).insert(url.to_string())
    }

    /// Number of asset URLs claimed so far
    pub fn claimed_count(&self) -> usize {
        lock(&self.downloaded_urls).len()
    }

    /// Registers the content digest of a kept download
    ///
    /// Returns false if the digest was already registered, meaning the file
    /// is a byte-identical duplicate of an earlier download.
    pub fn register_content_hash(&self, digest: &str) -> bool {
        lock(&self.content_hashes).insert(digest.to_string())
    }
}
