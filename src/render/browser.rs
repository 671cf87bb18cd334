//! Headless Chromium renderer
//!
//! Pages are loaded in a single browser tab. After navigation completes the
//! renderer waits a bounded settle period so that lazy loaders and late
//! XHR-driven galleries can populate the DOM before extraction.

use super::{Extraction, RenderError, Renderer};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::Page;
use futures::StreamExt;
use std::future::Future;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use url::Url;

/// Launch options for the headless browser
#[derive(Debug, Clone)]
pub struct BrowserOptions {
    /// User agent reported by the browser
    pub user_agent: String,

    /// Longest wait after navigation for late network activity
    pub settle: Duration,
}

struct BrowserSession {
    browser: Browser,
    page: Page,
    handler: JoinHandle<()>,
}

/// Renderer backed by headless Chromium
pub struct BrowserRenderer {
    session: Mutex<Option<BrowserSession>>,
    settle: Duration,
}

impl BrowserRenderer {
    /// Launches a headless browser with one blank tab
    ///
    /// Failing to launch is fatal for a harvest session.
    pub async fn launch(options: BrowserOptions) -> Result<Self, String> {
        let config = BrowserConfig::builder()
            .no_sandbox()
            .arg("--disable-gpu")
            .arg("--disable-dev-shm-usage")
            .arg("--mute-audio")
            .arg(format!("--user-agent={}", options.user_agent))
            .build()
            .map_err(|e| format!("Browser config error: {e}"))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| format!("Browser launch failed: {e}"))?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    tracing::trace!("Browser handler error: {e}");
                }
            }
        });

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| format!("Failed to open browser tab: {e}"))?;

        tracing::info!("Headless browser launched");

        Ok(Self {
            session: Mutex::new(Some(BrowserSession {
                browser,
                page,
                handler,
            })),
            settle: options.settle,
        })
    }
}

#[async_trait]
impl Renderer for BrowserRenderer {
    async fn navigate(&self, url: &Url, timeout: Duration) -> Result<Url, RenderError> {
        let guard = self.session.lock().await;
        let session = guard.as_ref().ok_or(RenderError::Closed)?;

        let navigation = async {
            session
                .page
                .goto(url.as_str())
                .await
                .map_err(|e| RenderError::Navigation {
                    url: url.to_string(),
                    message: e.to_string(),
                })?;
            Ok::<_, RenderError>(())
        };

        tokio::time::timeout(timeout, navigation)
            .await
            .map_err(|_| RenderError::Timeout {
                url: url.to_string(),
            })??;

        settle(session.page.wait_for_navigation(), self.settle).await;

        let final_url = session
            .page
            .url()
            .await
            .ok()
            .flatten()
            .and_then(|u| Url::parse(&u).ok())
            .unwrap_or_else(|| url.clone());

        Ok(final_url)
    }

    async fn extract(&self, query: Extraction) -> Result<Vec<String>, RenderError> {
        let guard = self.session.lock().await;
        let session = guard.as_ref().ok_or(RenderError::Closed)?;

        let result = session
            .page
            .evaluate(query.script())
            .await
            .map_err(|e| RenderError::Script(e.to_string()))?;

        result
            .into_value::<Vec<String>>()
            .map_err(|e| RenderError::Script(e.to_string()))
    }

    async fn close(&self) -> Result<(), RenderError> {
        let mut guard = self.session.lock().await;
        let Some(mut session) = guard.take() else {
            return Err(RenderError::Closed);
        };

        if let Err(e) = session.page.close().await {
            tracing::debug!("Page close error: {e}");
        }
        if let Err(e) = session.browser.close().await {
            tracing::warn!("Failed to close browser: {e}");
        }
        let _ = session.browser.wait().await;
        session.handler.abort();

        tracing::info!("Headless browser closed");
        Ok(())
    }
}

/// Waits for late page activity to finish, for at most `budget`
///
/// A page that keeps polling is abandoned at the deadline.
async fn settle<F: Future>(activity: F, budget: Duration) {
    if tokio::time::timeout(budget, activity).await.is_err() {
        tracing::trace!("Page still busy after {:?}", budget);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[tokio::test]
    async fn test_settle_stops_at_budget() {
        let start = Instant::now();
        settle(std::future::pending::<()>(), Duration::from_millis(300)).await;
        let elapsed = start.elapsed();

        assert!(elapsed >= Duration::from_millis(300));
        assert!(elapsed < Duration::from_millis(600));
    }

    #[tokio::test]
    async fn test_settle_returns_when_page_is_idle() {
        let start = Instant::now();
        settle(async {}, Duration::from_secs(10)).await;
        assert!(start.elapsed() < Duration::from_secs(1));
    }
}
