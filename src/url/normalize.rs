use crate::UrlError;
use url::Url;

/// Schemes that never lead to a fetchable resource
const NON_FETCHABLE_PREFIXES: &[&str] = &["javascript:", "mailto:", "tel:", "data:", "blob:", "about:"];

/// Resolves a raw reference found on a page into an absolute URL
///
/// # Normalization Steps
///
/// 1. Trim surrounding whitespace; reject empty references
/// 2. Reject script, mail, phone, data and blob references
/// 3. Resolve against `base` (handles relative paths, root-relative paths
///    and protocol-relative `//host/path` references)
/// 4. Require an HTTP(S) scheme and a host
/// 5. Remove the fragment
///
/// The host is lowercased and dot segments are removed by the parser. The
/// query string is preserved, since asset hosts commonly use it to select
/// a rendition.
///
/// Normalization is idempotent: feeding the output back in with any base
/// yields the same URL.
///
/// # Examples
///
/// ```
/// use sumi_harvest::url::normalize_url;
/// use url::Url;
///
/// let base = Url::parse("https://example.com/gallery/").unwrap();
/// let url = normalize_url("../img/a.png#top", &base).unwrap();
/// assert_eq!(url.as_str(), "https://example.com/img/a.png");
///
/// let url = normalize_url("//CDN.example.net/b.jpg", &base).unwrap();
/// assert_eq!(url.as_str(), "https://cdn.example.net/b.jpg");
/// ```
pub fn normalize_url(raw: &str, base: &Url) -> Result<Url, UrlError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(UrlError::Unsupported("empty reference".to_string()));
    }

    let lowered = raw.to_ascii_lowercase();
    if NON_FETCHABLE_PREFIXES.iter().any(|p| lowered.starts_with(p)) {
        return Err(UrlError::Unsupported(raw.to_string()));
    }

    let mut url = base
        .join(raw)
        .map_err(|e| UrlError::Parse(format!("{}: {}", raw, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(url.scheme().to_string()));
    }

    if url.host_str().map_or(true, str::is_empty) {
        return Err(UrlError::MissingDomain);
    }

    url.set_fragment(None);
    Ok(url)
}

/// Parses a seed URL given on the command line
///
/// A bare host such as `example.com/gallery` is treated as HTTPS.
pub fn parse_seed_url(raw: &str) -> Result<Url, UrlError> {
    let raw = raw.trim();
    let candidate = if raw.contains("://") {
        raw.to_string()
    } else {
        format!("https://{}", raw)
    };

    let mut url = Url::parse(&candidate).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(url.scheme().to_string()));
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err(UrlError::MissingDomain);
    }

    url.set_fragment(None);
    Ok(url)
}
