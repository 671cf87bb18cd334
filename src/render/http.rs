//! Static HTML renderer
//!
//! Fetches a page over plain HTTP and answers extraction queries with
//! `scraper` selectors. Content inserted by scripts is not visible.

use super::{Extraction, RenderError, Renderer};
use async_trait::async_trait;
use reqwest::Client;
use scraper::{Html, Selector};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;
use url::Url;

struct LoadedPage {
    url: Url,
    html: String,
}

/// Renderer backed by a plain HTTP client
pub struct HttpRenderer {
    client: Client,
    page: Mutex<Option<LoadedPage>>,
    closed: AtomicBool,
}

impl HttpRenderer {
    /// Creates a renderer that fetches pages with `client`
    ///
    /// The client should follow redirects; the final URL becomes the base for
    /// extracted references.
    pub fn new(client: Client) -> Self {
        Self {
            client,
            page: Mutex::new(None),
            closed: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl Renderer for HttpRenderer {
    async fn navigate(&self, url: &Url, timeout: Duration) -> Result<Url, RenderError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(RenderError::Closed);
        }

        let load = async {
            let response = self
                .client
                .get(url.as_str())
                .send()
                .await
                .map_err(|e| RenderError::Navigation {
                    url: url.to_string(),
                    message: e.to_string(),
                })?;

            let status = response.status();
            if !status.is_success() {
                return Err(RenderError::Status {
                    url: url.to_string(),
                    status: status.as_u16(),
                });
            }

            let final_url = response.url().clone();
            let html = response.text().await.map_err(|e| RenderError::Navigation {
                url: url.to_string(),
                message: e.to_string(),
            })?;

            Ok(LoadedPage {
                url: final_url,
                html,
            })
        };

        let loaded = tokio::time::timeout(timeout, load)
            .await
            .map_err(|_| RenderError::Timeout {
                url: url.to_string(),
            })??;

        let final_url = loaded.url.clone();
        *self.page.lock().await = Some(loaded);
        Ok(final_url)
    }

    async fn extract(&self, query: Extraction) -> Result<Vec<String>, RenderError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(RenderError::Closed);
        }

        let guard = self.page.lock().await;
        let page = guard.as_ref().ok_or(RenderError::NoPage)?;
        Ok(select_attributes(&page.html, query))
    }

    async fn close(&self) -> Result<(), RenderError> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Err(RenderError::Closed);
        }
        *self.page.lock().await = None;
        tracing::debug!("HTTP renderer closed");
        Ok(())
    }
}

/// Answers an extraction query against static HTML, in selector order
fn select_attributes(html: &str, query: Extraction) -> Vec<String> {
    let document = Html::parse_document(html);
    let mut values = Vec::new();

    for (selector, attr) in query.selectors() {
        let Ok(selector) = Selector::parse(selector) else {
            continue;
        };
        for element in document.select(&selector) {
            if let Some(value) = element.value().attr(attr) {
                if !value.trim().is_empty() {
                    values.push(value.to_string());
                }
            }
        }
    }

    values
}
