use crate::config::types::Config;
use crate::config::validation::validate;
use crate::ConfigError;
use std::path::Path;

/// Loads and parses a configuration file from the given path
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok(Config)` - Successfully loaded and validated configuration
/// * `Err(ConfigError)` - Failed to load, parse, or validate the configuration
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parses and validates configuration from TOML text
pub fn parse_config(content: &str) -> Result<Config, ConfigError> {
    let config: Config = toml::from_str(content)?;
    validate(&config)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RendererKind;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_load_valid_config() {
        let config_content = r#"
[crawler]
depth = 3
navigation-timeout-ms = 20000
renderer = "http"

[download]
concurrency = 8
min-width = 200
min-height = 150

[dedup]
visual-threshold = 8

[user-agent]
crawler-name = "TestHarvester"
crawler-version = "1.0"
contact-email = "admin@example.com"
"#;

        let file = create_temp_config(config_content);
        let config = load_config(file.path()).unwrap();

        assert_eq!(config.crawler.depth, 3);
        assert_eq!(config.crawler.navigation_timeout_ms, 20_000);
        assert_eq!(config.crawler.renderer, RendererKind::Http);
        assert_eq!(config.download.concurrency, 8);
        assert_eq!(config.download.min_width, 200);
        assert_eq!(config.download.max_retries, 3);
        assert_eq!(config.dedup.visual_threshold, 8);
        assert!(config.dedup.enabled);
        assert_eq!(config.user_agent.crawler_name, "TestHarvester");
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = parse_config("").unwrap();
        assert_eq!(config.crawler.depth, 1);
        assert_eq!(config.download.concurrency, 5);
        assert_eq!(config.download.max_retries, 3);
        assert!(config.download.content_dedup);
        assert!(config.dedup.visual);
    }

    #[test]
    fn test_load_config_with_invalid_path() {
        let result = load_config(Path::new("/nonexistent/harvest.toml"));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[test]
    fn test_load_config_with_invalid_toml() {
        let file = create_temp_config("this is not valid TOML {{{");
        let result = load_config(file.path());
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_unknown_renderer_rejected() {
        let result = parse_config("[crawler]\nrenderer = \"lynx\"\n");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_load_config_with_validation_error() {
        let result = parse_config("[download]\nconcurrency = 0\n");
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }
}
