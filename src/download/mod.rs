//! Media download module
//!
//! This module contains:
//! - HTTP clients and the retrying, redirect-following fetcher
//! - Destination path resolution and collision handling
//! - The bounded-concurrency download manager and its per-URL pipeline

mod fetcher;
mod manager;
mod target;

pub use fetcher::{
    build_http_client, build_page_client, fetch_to_file, fetch_with_retry, FetchError,
    RetryPolicy, MAX_REDIRECTS,
};
pub use manager::{DownloadManager, DownloadOptions, DownloadOutcome, DownloadStats, SkipReason};
pub use target::{filename_from_url, sanitize_filename, split_extension, MediaFile};
