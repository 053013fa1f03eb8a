//! Configuration management for Pricelens.
//!
//! Configuration is read from `~/.config/pricelens/config.toml` at startup.
//! If the file doesn't exist, a default configuration with comments is created.

use serde::Deserialize;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::engine::EngineConfig;
use crate::pipeline::PipelineConfig;

/// Main configuration struct.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub browser: EngineConfig,
    pub pipeline: PipelineConfig,
    pub sink: SinkConfig,
}

/// Where rows go and whether a run starts from an empty sink.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SinkConfig {
    /// SQLite database path; the platform data directory when unset
    pub db_path: Option<PathBuf>,

    /// Clear the sink and rewrite the header before each run (default: true)
    pub clear_before_run: bool,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            db_path: None,
            clear_before_run: true,
        }
    }
}

impl Config {
    /// Load configuration from the default path.
    ///
    /// If the config file doesn't exist, creates a default one with comments.
    /// Missing fields in the config file will use default values.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::default_config_path()?;
        Self::load_from(&config_path)
    }

    /// Load configuration from `path`, creating it with defaults when absent.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            Self::create_default_config(path)?;
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Get the default config file path: `~/.config/pricelens/config.toml`
    pub fn default_config_path() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(config_dir.join("pricelens").join("config.toml"))
    }

    fn create_default_config(path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let mut file = fs::File::create(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        file.write_all(Self::default_config_content().as_bytes())
            .map_err(|e| ConfigError::Io {
                path: path.to_path_buf(),
                source: e,
            })?;

        Ok(())
    }

    /// Generate the default config file content with comments.
    fn default_config_content() -> String {
        r##"# Pricelens Configuration
#
# Durations ending in _secs are seconds, those ending in _ms milliseconds.

[browser]
# Run browser in headless mode (no visible window)
headless = true

# Chrome/Chromium binary; autodetected when commented out
# chrome_executable = "/usr/bin/chromium"

window_width = 1920
window_height = 1080

# Timeout for a single browser request in seconds
request_timeout_secs = 30

[pipeline]
# Storefront search page; {code} is replaced by the product code
search_url_template = "https://shopping.yahoo.co.jp/search?first=1&tab_ex=commerce&fr=shp-prop&p={code}"

# Listings written per code
max_listings_per_code = 5

# Attempts at switching prices to shipping-inclusive display
mode_switch_attempts = 3

navigation_timeout_secs = 30
confirm_timeout_secs = 10
poll_interval_ms = 1000

# Fixed waits for the page to settle after each step
search_settle_ms = 3000
product_settle_ms = 5000
list_view_settle_ms = 3000
control_settle_ms = 1000
confirmed_settle_ms = 3000
reload_settle_ms = 5000
enrichment_settle_ms = 2000

# Listing layouts tried in order; the first one with rows wins
layout_selectors = [
    "li[class*='elItem']",
    "div[class*='LoopList__item']",
    "div[class*='SearchResultItem']",
]

# Merchant storefront host, used to derive shop ids from item links
store_domain = "store.shopping.yahoo.co.jp"

[sink]
# SQLite database; defaults to the platform data directory
# db_path = "/path/to/pricelens.db"

# Clear previous rows before each run
clear_before_run = true
"##
        .to_string()
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("Failed to read/write config file at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_deserializes() {
        let content = Config::default_config_content();
        let config: Config = toml::from_str(&content).expect("Default config should be valid TOML");

        assert!(config.browser.headless);
        assert_eq!(config.pipeline.max_listings_per_code, 5);
        assert_eq!(config.pipeline.mode_switch_attempts, 3);
        assert_eq!(config.pipeline.layout_selectors.len(), 3);
        assert_eq!(
            config.pipeline.search_url_template,
            PipelineConfig::default().search_url_template
        );
        assert!(config.sink.clear_before_run);
        assert!(config.sink.db_path.is_none());
    }

    #[test]
    fn test_partial_config() {
        let content = r##"
[pipeline]
max_listings_per_code = 3

[sink]
clear_before_run = false
"##;
        let config: Config = toml::from_str(content).expect("Partial config should work");

        // Custom values
        assert_eq!(config.pipeline.max_listings_per_code, 3);
        assert!(!config.sink.clear_before_run);
        // Default values
        assert_eq!(config.pipeline.confirm_timeout_secs, 10);
        assert_eq!(config.browser.window_width, 1920);
    }

    #[test]
    fn test_empty_config() {
        let config: Config = toml::from_str("").expect("Empty config should work");

        assert!(config.browser.headless);
        assert_eq!(config.pipeline.poll_interval_ms, 1000);
        assert!(config.sink.clear_before_run);
    }

    #[test]
    fn test_load_from_creates_default_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pricelens").join("config.toml");

        let config = Config::load_from(&path).unwrap();

        assert!(path.exists());
        assert_eq!(config.pipeline.max_listings_per_code, 5);
        let reloaded = Config::load_from(&path).unwrap();
        assert_eq!(reloaded.pipeline.reload_settle_ms, 5000);
    }

    #[test]
    fn test_invalid_config_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[pipeline\nmax_listings_per_code = ").unwrap();

        let err = Config::load_from(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }
}
