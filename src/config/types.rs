use serde::Deserialize;

/// Main configuration structure for Sumi-Harvest
///
/// Every section is optional in the TOML file; missing keys take the
/// defaults below.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub crawler: CrawlerConfig,
    pub download: DownloadConfig,
    pub dedup: DedupConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
}

/// Which renderer drives page loads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RendererKind {
    /// Headless Chromium
    Browser,
    /// Static HTML over plain HTTP
    Http,
}

impl Default for RendererKind {
    fn default() -> Self {
        if cfg!(feature = "browser") {
            Self::Browser
        } else {
            Self::Http
        }
    }
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CrawlerConfig {
    /// Maximum number of link hops from the seed page
    pub depth: u32,

    /// Upper bound on a single page navigation (milliseconds)
    #[serde(rename = "navigation-timeout-ms")]
    pub navigation_timeout_ms: u64,

    /// Extra wait after navigation for late network activity (milliseconds)
    #[serde(rename = "settle-ms")]
    pub settle_ms: u64,

    /// Renderer used for page loads
    pub renderer: RendererKind,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            depth: 1,
            navigation_timeout_ms: 30_000,
            settle_ms: 1_500,
            renderer: RendererKind::default(),
        }
    }
}

/// Download manager configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DownloadConfig {
    /// Number of concurrent download workers
    pub concurrency: u32,

    /// Fetch attempts per URL
    #[serde(rename = "max-retries")]
    pub max_retries: u32,

    /// Fixed delay between attempts (milliseconds)
    #[serde(rename = "retry-delay-ms")]
    pub retry_delay_ms: u64,

    /// Delay before a worker takes its next URL (milliseconds)
    #[serde(rename = "request-delay-ms")]
    pub request_delay_ms: u64,

    /// Per-request timeout (seconds)
    #[serde(rename = "request-timeout-secs")]
    pub request_timeout_secs: u64,

    /// Minimum image width in pixels; 0 disables the check
    #[serde(rename = "min-width")]
    pub min_width: u32,

    /// Minimum image height in pixels; 0 disables the check
    #[serde(rename = "min-height")]
    pub min_height: u32,

    /// Skip URLs whose destination already exists and is non-empty
    #[serde(rename = "skip-existing")]
    pub skip_existing: bool,

    /// Drop downloads whose bytes match an earlier download
    #[serde(rename = "content-dedup")]
    pub content_dedup: bool,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            concurrency: 5,
            max_retries: 3,
            retry_delay_ms: 1_000,
            request_delay_ms: 250,
            request_timeout_secs: 30,
            min_width: 0,
            min_height: 0,
            skip_existing: true,
            content_dedup: true,
        }
    }
}

/// Post-download deduplication configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DedupConfig {
    /// Run the deduplication pass after downloads settle
    pub enabled: bool,

    /// Run visual-similarity clustering
    pub visual: bool,

    /// Largest hamming distance at which two images count as the same
    #[serde(rename = "visual-threshold")]
    pub visual_threshold: u32,
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            visual: true,
            visual_threshold: 5,
        }
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: Option<String>,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: Option<String>,
}

impl Default for UserAgentConfig {
    fn default() -> Self {
        Self {
            crawler_name: "SumiHarvest".to_string(),
            crawler_version: env!("CARGO_PKG_VERSION").to_string(),
            contact_url: None,
            contact_email: None,
        }
    }
}

impl UserAgentConfig {
    /// Formats the user agent header value
    ///
    /// Format: `Name/Version (+ContactURL; ContactEmail)`, with the
    /// parenthesized part omitted when no contact details are configured.
    pub fn header_value(&self) -> String {
        let contact: Vec<String> = self
            .contact_url
            .iter()
            .map(|u| format!("+{}", u))
            .chain(self.contact_email.iter().cloned())
            .collect();

        if contact.is_empty() {
            format!("{}/{}", self.crawler_name, self.crawler_version)
        } else {
            format!(
                "{}/{} ({})",
                self.crawler_name,
                self.crawler_version,
                contact.join("; ")
            )
        }
    }
}
