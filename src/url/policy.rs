//! Allowed-domain discovery
//!
//! A site's own media commonly lives on a different host than its pages. The
//! policy admits the seed host plus any host observed serving media on the
//! seed page whose name looks like an asset host. Unrelated third-party hosts
//! (ads, trackers, link previews) are dropped. This is a recall heuristic,
//! not a security boundary.

use super::{extract_domain, is_media_url, normalize_url, same_site};
use crate::render::{Extraction, Renderer};
use std::collections::BTreeSet;
use std::time::Duration;
use url::Url;

/// Host name fragments that mark a host as an asset host
pub const ASSET_HOST_MARKERS: &[&str] = &[
    "cdn",
    "static",
    "images",
    "img",
    "media",
    "assets",
    "photos",
    "cloudfront",
    "akamai",
    "fastly",
    "cloudinary",
    "imgix",
    "amazonaws",
    "googleusercontent",
    "wp.com",
    "squarespace",
    "shopify",
];

/// Returns true if the host name contains an asset host marker
pub fn is_asset_host(host: &str) -> bool {
    let host = host.to_ascii_lowercase();
    ASSET_HOST_MARKERS.iter().any(|marker| host.contains(marker))
}

/// Computes the allowed-domain set from hosts observed serving media
///
/// The seed host is always included. Observed hosts are kept when they are
/// the seed host (or its `www.` variant) or look like an asset host.
pub fn select_allowed_domains<I, S>(seed_host: &str, observed: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let seed_host = seed_host.to_ascii_lowercase();
    let mut allowed = BTreeSet::new();
    allowed.insert(seed_host.clone());

    for host in observed {
        let host = host.as_ref().to_ascii_lowercase();
        if host.is_empty() || allowed.contains(&host) {
            continue;
        }

        if same_site(&host, &seed_host) || is_asset_host(&host) {
            tracing::debug!(domain = %host, "Allowing domain");
            allowed.insert(host);
        } else {
            tracing::debug!(domain = %host, "Ignoring third-party domain");
        }
    }

    allowed
}

/// Renders the seed page and computes the session's allowed domains
///
/// Every `src`/`href` on the seed page is resolved against it; references
/// that are media files contribute their host. If the seed page cannot be
/// rendered, only the seed host is allowed.
pub async fn discover_allowed_domains(
    renderer: &dyn Renderer,
    seed: &Url,
    timeout: Duration,
) -> BTreeSet<String> {
    let seed_host = extract_domain(seed).unwrap_or_default();

    let base = match renderer.navigate(seed, timeout).await {
        Ok(final_url) => final_url,
        Err(e) => {
            tracing::warn!("Domain discovery could not render {}: {}", seed, e);
            return select_allowed_domains(&seed_host, std::iter::empty::<&str>());
        }
    };

    let references = match renderer.extract(Extraction::LinkedResources).await {
        Ok(refs) => refs,
        Err(e) => {
            tracing::warn!("Domain discovery extraction failed on {}: {}", seed, e);
            Vec::new()
        }
    };

    let observed: Vec<String> = references
        .iter()
        .filter_map(|raw| normalize_url(raw, &base).ok())
        .filter(is_media_url)
        .filter_map(|url| extract_domain(&url))
        .collect();

    let allowed = select_allowed_domains(&seed_host, &observed);
    tracing::info!(
        "Allowed domains ({}): {}",
        allowed.len(),
        allowed.iter().cloned().collect::<Vec<_>>().join(", ")
    );
    allowed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::RenderError;
    use async_trait::async_trait;

    struct SeedPage {
        references: Vec<&'static str>,
        fail: bool,
    }

    #[async_trait]
    impl Renderer for SeedPage {
        async fn navigate(&self, url: &Url, _timeout: Duration) -> Result<Url, RenderError> {
            if self.fail {
                return Err(RenderError::Navigation {
                    url: url.to_string(),
                    message: "connection refused".to_string(),
                });
            }
            Ok(url.clone())
        }

        async fn extract(&self, query: Extraction) -> Result<Vec<String>, RenderError> {
            assert_eq!(query, Extraction::LinkedResources);
            Ok(self.references.iter().map(|s| s.to_string()).collect())
        }

        async fn close(&self) -> Result<(), RenderError> {
            Ok(())
        }
    }

    fn seed() -> Url {
        Url::parse("https://example.com/").unwrap()
    }

    #[test]
    fn test_seed_only_when_nothing_observed() {
        let allowed = select_allowed_domains("example.com", Vec::<String>::new());
        assert_eq!(allowed.into_iter().collect::<Vec<_>>(), vec!["example.com"]);
    }

    #[test]
    fn test_asset_hosts_admitted() {
        let allowed = select_allowed_domains(
            "example.com",
            ["assets.examplecdn.net", "ads.example-tracking.com", "www.example.com"],
        );
        assert!(allowed.contains("example.com"));
        assert!(allowed.contains("www.example.com"));
        assert!(allowed.contains("assets.examplecdn.net"));
        assert!(!allowed.contains("ads.example-tracking.com"));
    }

    #[test]
    fn test_asset_host_markers() {
        assert!(is_asset_host("d1234.cloudfront.net"));
        assert!(is_asset_host("i0.wp.com"));
        assert!(is_asset_host("STATIC.example.org"));
        assert!(!is_asset_host("tracker.example.org"));
        assert!(!is_asset_host("preview.linkservice.io"));
    }

    #[tokio::test]
    async fn test_discover_keeps_only_media_hosts() {
        let renderer = SeedPage {
            references: vec![
                "/logo.png",
                "https://assets.examplecdn.net/banner.jpg",
                "https://ads.example-tracking.com/pixel.gif",
                "https://static.example.org/app.js",
                "https://images.example.org/page.html",
                "mailto:hi@example.com",
            ],
            fail: false,
        };

        let allowed =
            discover_allowed_domains(&renderer, &seed(), Duration::from_secs(1)).await;

        let expected: BTreeSet<String> = ["example.com", "assets.examplecdn.net"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(allowed, expected);
    }

    #[tokio::test]
    async fn test_discover_falls_back_to_seed_host() {
        let renderer = SeedPage {
            references: vec!["https://cdn.example.net/a.png"],
            fail: true,
        };

        let allowed =
            discover_allowed_domains(&renderer, &seed(), Duration::from_secs(1)).await;
        assert_eq!(allowed.len(), 1);
        assert!(allowed.contains("example.com"));
    }
}
