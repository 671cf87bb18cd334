//! Reference extraction for rendered pages
//!
//! This module turns the raw attribute values a renderer returns into
//! absolute URLs:
//! - Media references (image and video sources, srcset candidates, inline
//!   background images, social preview images)
//! - Links to follow (anchors on the seed site)

use crate::render::{Extraction, Renderer};
use crate::url::{extract_domain, is_media_url, normalize_url, same_site};
use std::collections::HashSet;
use url::Url;

/// Raw media references gathered from one page
#[derive(Debug, Clone, Default)]
pub struct MediaReferences {
    /// Single-URL attributes (img src, lazy-load attributes, posters, meta)
    pub sources: Vec<String>,

    /// Raw `srcset` values
    pub source_sets: Vec<String>,

    /// Inline style attributes mentioning a background
    pub styles: Vec<String>,
}

impl MediaReferences {
    /// Runs the media extraction queries against the loaded page
    ///
    /// A failed query contributes nothing; the others are still used.
    pub async fn extract(renderer: &dyn Renderer) -> Self {
        Self {
            sources: run_query(renderer, Extraction::MediaSources).await,
            source_sets: run_query(renderer, Extraction::SourceSets).await,
            styles: run_query(renderer, Extraction::InlineStyles).await,
        }
    }

    /// Resolves all references to absolute media URLs
    ///
    /// References that do not resolve or are not media files are dropped.
    /// The result keeps first-seen order and contains no duplicates.
    pub fn resolve(&self, base: &Url) -> Vec<Url> {
        let candidates = self
            .sources
            .iter()
            .map(String::as_str)
            .chain(self.source_sets.iter().flat_map(|s| parse_srcset(s)))
            .chain(self.styles.iter().flat_map(|s| parse_style_urls(s)));

        let mut seen = HashSet::new();
        candidates
            .filter_map(|raw| normalize_url(raw, base).ok())
            .filter(is_media_url)
            .filter(|url| seen.insert(url.to_string()))
            .collect()
    }
}

async fn run_query(renderer: &dyn Renderer, query: Extraction) -> Vec<String> {
    match renderer.extract(query).await {
        Ok(values) => values,
        Err(e) => {
            tracing::warn!("Extraction query {:?} failed: {}", query, e);
            Vec::new()
        }
    }
}

/// Splits a `srcset` value into its candidate URLs
///
/// Each candidate is a URL followed by optional width or density
/// descriptors; candidates are separated by commas. Commas inside a URL are
/// kept, since a URL only ends at whitespace.
pub fn parse_srcset(value: &str) -> Vec<&str> {
    let mut urls = Vec::new();
    let mut rest = value;

    loop {
        rest = rest.trim_start_matches(|c: char| c.is_whitespace() || c == ',');
        if rest.is_empty() {
            break;
        }

        let end = rest.find(char::is_whitespace).unwrap_or(rest.len());
        let (candidate, after) = rest.split_at(end);

        if let Some(url) = candidate.strip_suffix(',') {
            // No descriptors: "a.png, b.png"
            let url = url.trim_end_matches(',');
            if !url.is_empty() {
                urls.push(url);
            }
            rest = after;
            continue;
        }

        urls.push(candidate);

        // Skip descriptors up to the next separating comma
        rest = match after.find(',') {
            Some(idx) => &after[idx + 1..],
            None => "",
        };
    }

    urls
}

/// Extracts every `url(...)` reference from an inline style declaration
pub fn parse_style_urls(style: &str) -> Vec<&str> {
    let mut urls = Vec::new();
    let mut rest = style;

    while let Some(start) = find_ascii_case_insensitive(rest, "url(") {
        let after = &rest[start + 4..];
        let Some(end) = after.find(')') else {
            break;
        };

        let inner = after[..end]
            .trim()
            .trim_matches(|c| c == '"' || c == '\'')
            .trim();
        if !inner.is_empty() {
            urls.push(inner);
        }
        rest = &after[end + 1..];
    }

    urls
}

fn find_ascii_case_insensitive(haystack: &str, needle: &str) -> Option<usize> {
    haystack
        .as_bytes()
        .windows(needle.len())
        .position(|w| w.eq_ignore_ascii_case(needle.as_bytes()))
}

/// Resolves anchors into the links the crawl should follow
///
/// # Link Rules
///
/// **Excluded:**
/// - `javascript:` and `mailto:` (and other non-fetchable) links
/// - Bare same-page fragments such as `#top`
/// - Links off the seed site (only the seed host or its `www.` variant is
///   followed; asset hosts are never crawled as pages)
/// - Links that point at media files
///
/// **Rewritten:**
/// - Client-side router links (`#/gallery/2`) become the equivalent path
///   (`/gallery/2`)
///
/// The result keeps document order without duplicates.
pub fn resolve_page_links(anchors: &[String], base: &Url, seed_host: &str) -> Vec<Url> {
    let mut seen = HashSet::new();
    let mut links = Vec::new();

    for href in anchors {
        let href = href.trim();

        let rewritten;
        let href = if let Some(route) = href.strip_prefix("#/") {
            rewritten = format!("/{}", route);
            rewritten.as_str()
        } else if href.starts_with('#') {
            continue;
        } else {
            href
        };

        let Ok(url) = normalize_url(href, base) else {
            continue;
        };

        let on_site = extract_domain(&url)
            .map(|host| same_site(&host, seed_host))
            .unwrap_or(false);
        if !on_site || is_media_url(&url) {
            continue;
        }

        if seen.insert(url.to_string()) {
            links.push(url);
        }
    }

    links
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::RenderError;
    use async_trait::async_trait;
    use std::time::Duration;

    /// Renderer whose source-set query always fails
    struct BrokenSourceSets;

    #[async_trait]
    impl Renderer for BrokenSourceSets {
        async fn navigate(&self, url: &Url, _timeout: Duration) -> Result<Url, RenderError> {
            Ok(url.clone())
        }

        async fn extract(&self, query: Extraction) -> Result<Vec<String>, RenderError> {
            match query {
                Extraction::MediaSources => Ok(vec!["/img/a.png".to_string()]),
                Extraction::SourceSets => Err(RenderError::Script("boom".to_string())),
                Extraction::InlineStyles => {
                    Ok(vec!["background-image: url(/img/bg.jpg)".to_string()])
                }
                _ => Ok(Vec::new()),
            }
        }

        async fn close(&self) -> Result<(), RenderError> {
            Ok(())
        }
    }

    fn base_url() -> Url {
        Url::parse("https://example.com/gallery/index.html").unwrap()
    }

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_failed_query_keeps_other_references() {
        let refs = MediaReferences::extract(&BrokenSourceSets).await;

        assert!(refs.source_sets.is_empty());
        let urls: Vec<String> = refs.resolve(&base_url()).iter().map(Url::to_string).collect();
        assert_eq!(
            urls,
            vec!["https://example.com/img/a.png", "https://example.com/img/bg.jpg"]
        );
    }

    #[test]
    fn test_srcset_with_descriptors() {
        assert_eq!(
            parse_srcset("a.png 1x, b.png 2x,c.png 3x"),
            vec!["a.png", "b.png", "c.png"]
        );
        assert_eq!(
            parse_srcset(" /s.jpg 480w,\n /m.jpg 800w "),
            vec!["/s.jpg", "/m.jpg"]
        );
    }

    #[test]
    fn test_srcset_without_descriptors() {
        assert_eq!(parse_srcset("a.png, b.png"), vec!["a.png", "b.png"]);
        assert_eq!(parse_srcset("a.png"), vec!["a.png"]);
        assert!(parse_srcset("  ").is_empty());
    }

    #[test]
    fn test_srcset_url_with_commas() {
        assert_eq!(
            parse_srcset("https://img.example.net/w_100,h_100/a.jpg 100w, /b.jpg 200w"),
            vec!["https://img.example.net/w_100,h_100/a.jpg", "/b.jpg"]
        );
    }

    #[test]
    fn test_style_urls() {
        assert_eq!(
            parse_style_urls("background-image: url('/bg.jpg'); color: red"),
            vec!["/bg.jpg"]
        );
        assert_eq!(
            parse_style_urls(r#"background: URL( "a.png" ) no-repeat, url(b.webp)"#),
            vec!["a.png", "b.webp"]
        );
        assert!(parse_style_urls("background-color: #fff").is_empty());
        assert!(parse_style_urls("background: url(unterminated").is_empty());
    }

    #[test]
    fn test_resolve_media_references() {
        let refs = MediaReferences {
            sources: strings(&["thumb.jpg", "/poster.png", "/page.html", "thumb.jpg"]),
            source_sets: strings(&["/a-1x.png 1x, /a-2x.png 2x"]),
            styles: strings(&["background-image:url(//cdn.example.net/bg.webp)"]),
        };

        let urls: Vec<String> = refs
            .resolve(&base_url())
            .into_iter()
            .map(|u| u.to_string())
            .collect();

        assert_eq!(
            urls,
            vec![
                "https://example.com/gallery/thumb.jpg",
                "https://example.com/poster.png",
                "https://example.com/a-1x.png",
                "https://example.com/a-2x.png",
                "https://cdn.example.net/bg.webp",
            ]
        );
    }

    #[test]
    fn test_links_skip_special_schemes_and_fragments() {
        let anchors = strings(&[
            "javascript:void(0)",
            "mailto:test@example.com",
            "#section",
            "/about",
        ]);
        let links = resolve_page_links(&anchors, &base_url(), "example.com");
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].as_str(), "https://example.com/about");
    }

    #[test]
    fn test_links_rewrite_router_fragments() {
        let anchors = strings(&["#/photos/2"]);
        let links = resolve_page_links(&anchors, &base_url(), "example.com");
        assert_eq!(links[0].as_str(), "https://example.com/photos/2");
    }

    #[test]
    fn test_links_stay_on_seed_site() {
        let anchors = strings(&[
            "https://www.example.com/a",
            "https://cdn.example.com/b",
            "https://other.org/c",
            "page2.html",
        ]);
        let links: Vec<String> = resolve_page_links(&anchors, &base_url(), "example.com")
            .into_iter()
            .map(|u| u.to_string())
            .collect();
        assert_eq!(
            links,
            vec![
                "https://www.example.com/a",
                "https://example.com/gallery/page2.html"
            ]
        );
    }

    #[test]
    fn test_links_skip_media_and_duplicates() {
        let anchors = strings(&["/full.jpg", "/next", "/next#top", "/next"]);
        let links = resolve_page_links(&anchors, &base_url(), "example.com");
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].as_str(), "https://example.com/next");
    }
}
