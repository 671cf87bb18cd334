//! HTTP fetching for media downloads
//!
//! This module handles:
//! - Building HTTP clients with the configured user agent
//! - Manual redirect handling (max 10 hops, not counted as retries)
//! - Streaming response bodies to disk
//! - Fixed-delay retries with cleanup of partial files

use crate::config::UserAgentConfig;
use reqwest::header::LOCATION;
use reqwest::{redirect::Policy, Client};
use std::io;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use url::Url;

/// Maximum redirect hops followed for a single attempt
pub const MAX_REDIRECTS: usize = 10;

/// Errors from a single fetch attempt
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Unexpected status {status} from {url}")]
    Status { url: String, status: u16 },

    #[error("Redirect from {url} has no usable Location header")]
    BadRedirect { url: String },

    #[error("Too many redirects starting at {url}")]
    TooManyRedirects { url: String },

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// How often and how patiently a URL is retried
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub attempts: u32,

    /// Fixed wait between attempts
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            delay: Duration::from_secs(1),
        }
    }
}

/// Builds the HTTP client used for media downloads
///
/// Redirects are not followed by the client; [`fetch_to_file`] handles them
/// so that a redirect never consumes a retry.
pub fn build_http_client(config: &UserAgentConfig, timeout: Duration) -> Result<Client, reqwest::Error> {
    base_builder(config, timeout)
        .redirect(Policy::none())
        .build()
}

/// Builds the HTTP client used to load pages for static rendering
///
/// Unlike the download client this one follows redirects itself, so the
/// response URL is the final page URL.
pub fn build_page_client(config: &UserAgentConfig, timeout: Duration) -> Result<Client, reqwest::Error> {
    base_builder(config, timeout)
        .redirect(Policy::limited(MAX_REDIRECTS))
        .build()
}

fn base_builder(config: &UserAgentConfig, timeout: Duration) -> reqwest::ClientBuilder {
    Client::builder()
        .user_agent(config.header_value())
        .timeout(timeout)
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
}

/// Downloads `url` into `dest`, following redirects
///
/// The body is streamed to the file chunk by chunk. The file is truncated
/// first, so a retry never appends to an earlier partial body.
///
/// # Returns
///
/// * `Ok(u64)` - Number of bytes written
/// * `Err(FetchError)` - The attempt failed; `dest` may hold partial data
pub async fn fetch_to_file(client: &Client, url: &Url, dest: &Path) -> Result<u64, FetchError> {
    let mut current = url.clone();

    for _ in 0..=MAX_REDIRECTS {
        let mut response = client.get(current.as_str()).send().await?;
        let status = response.status();

        if status.is_redirection() {
            let next = response
                .headers()
                .get(LOCATION)
                .and_then(|v| v.to_str().ok())
                .and_then(|location| current.join(location).ok())
                .ok_or_else(|| FetchError::BadRedirect {
                    url: current.to_string(),
                })?;

            tracing::debug!("Redirect {} -> {}", current, next);
            current = next;
            continue;
        }

        if !status.is_success() {
            return Err(FetchError::Status {
                url: current.to_string(),
                status: status.as_u16(),
            });
        }

        let mut file = tokio::fs::File::create(dest).await?;
        let mut written = 0u64;
        while let Some(chunk) = response.chunk().await? {
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;

        return Ok(written);
    }

    Err(FetchError::TooManyRedirects {
        url: url.to_string(),
    })
}

/// Downloads `url` into `dest`, retrying failed attempts
///
/// Any non-success status or stream error counts as a failed attempt. After
/// the last failure the partial file is removed and the last error returned.
pub async fn fetch_with_retry(
    client: &Client,
    url: &Url,
    dest: &Path,
    policy: RetryPolicy,
) -> Result<u64, FetchError> {
    let attempts = policy.attempts.max(1);
    let mut attempt = 1;

    loop {
        match fetch_to_file(client, url, dest).await {
            Ok(bytes) => return Ok(bytes),
            Err(e) if attempt < attempts => {
                tracing::debug!(
                    "Attempt {}/{} for {} failed: {}, retrying in {:?}",
                    attempt,
                    attempts,
                    url,
                    e,
                    policy.delay
                );
                attempt += 1;
                tokio::time::sleep(policy.delay).await;
            }
            Err(e) => {
                if let Err(remove_err) = tokio::fs::remove_file(dest).await {
                    if remove_err.kind() != io::ErrorKind::NotFound {
                        tracing::warn!(
                            "Failed to remove partial file {}: {}",
                            dest.display(),
                            remove_err
                        );
                    }
                }
                return Err(e);
            }
        }
    }
}
