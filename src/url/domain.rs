use url::Url;

/// Extracts the domain from a URL
///
/// This function retrieves the host portion of a URL and converts it to lowercase.
/// If the URL has no host (which shouldn't happen for valid HTTP(S) URLs), it returns None.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use sumi_harvest::url::extract_domain;
///
/// let url = Url::parse("https://EXAMPLE.COM/path").unwrap();
/// assert_eq!(extract_domain(&url), Some("example.com".to_string()));
///
/// let url = Url::parse("https://assets.cdn.example.com:8443/a.png").unwrap();
/// assert_eq!(extract_domain(&url), Some("assets.cdn.example.com".to_string()));
/// ```
pub fn extract_domain(url: &Url) -> Option<String> {
    url.host_str().map(|h| h.to_lowercase())
}

/// Returns true if `host` is the seed host or its `www.` variant
///
/// The comparison works in both directions, so a seed of `www.example.com`
/// also accepts `example.com`.
pub fn same_site(host: &str, seed_host: &str) -> bool {
    let host = host.to_ascii_lowercase();
    let seed = seed_host.to_ascii_lowercase();

    if host == seed {
        return true;
    }

    let bare = |h: &str| h.strip_prefix("www.").map(str::to_string);
    bare(&host).as_deref() == Some(seed.as_str()) || bare(&seed).as_deref() == Some(host.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_simple_domain() {
        let url = Url::parse("https://example.com/").unwrap();
        assert_eq!(extract_domain(&url), Some("example.com".to_string()));
    }

    #[test]
    fn test_extract_subdomain() {
        let url = Url::parse("https://images.example.com/post").unwrap();
        assert_eq!(extract_domain(&url), Some("images.example.com".to_string()));
    }

    #[test]
    fn test_extract_with_port() {
        let url = Url::parse("http://example.com:8080/").unwrap();
        assert_eq!(extract_domain(&url), Some("example.com".to_string()));
    }

    #[test]
    fn test_extract_mixed_case() {
        let url = Url::parse("https://Example.COM/").unwrap();
        assert_eq!(extract_domain(&url), Some("example.com".to_string()));
    }

    #[test]
    fn test_same_site_exact() {
        assert!(same_site("example.com", "example.com"));
        assert!(same_site("EXAMPLE.com", "example.com"));
    }

    #[test]
    fn test_same_site_www_variant() {
        assert!(same_site("www.example.com", "example.com"));
        assert!(same_site("example.com", "www.example.com"));
    }

    #[test]
    fn test_same_site_rejects_other_hosts() {
        assert!(!same_site("cdn.example.com", "example.com"));
        assert!(!same_site("www.cdn.example.com", "example.com"));
        assert!(!same_site("example.com.evil.net", "example.com"));
        assert!(!same_site("www.www.example.com", "example.com"));
    }
}
