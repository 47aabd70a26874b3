//! Application configuration loaded from an optional `config.toml`.
//!
//! ```toml
//! window-size = 20
//! quote-normalization = "blanket"   # or "python-literal"
//! log-level = "info"
//! ```
//!
//! Every key is optional; a missing file means all defaults.

use anyhow::{Context, bail};
use log::LevelFilter;
use serde::Deserialize;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

use crate::analyzer::pipeline::{DEFAULT_WINDOW_SIZE, MAX_WINDOW_SIZE};
use crate::analyzer::{AnalysisConfig, QuoteNormalization};

/// Environment variable that overrides the config file location.
pub const CONFIG_PATH_ENV: &str = "TRAINING_VISUALIZER_CONFIG";
const DEFAULT_CONFIG_FILE: &str = "config.toml";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct AppConfig {
    /// Trailing window for recent statistics and moving averages (1..=1000).
    #[serde(alias = "windowSize")]
    pub window_size: NonZeroUsize,
    #[serde(alias = "quoteNormalization")]
    pub quote_normalization: QuoteNormalization,
    /// Log level for this application (off, error, warn, info, debug, trace).
    pub log_level: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            window_size: DEFAULT_WINDOW_SIZE,
            quote_normalization: QuoteNormalization::default(),
            log_level: "info".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(config_path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(config_path).with_context(|| format!("Failed to read config file {}", config_path.display()))?;
        Self::parse(&content).with_context(|| format!("Failed to parse config file {}", config_path.display()))
    }

    /// Load configuration if the file exists.
    ///
    /// # Returns
    /// * `Ok(None)` when there is no file at `config_path`
    /// * `Ok(Some(config))` when the file was loaded and validated
    /// * `Err` when the file exists but cannot be read or is invalid
    pub fn load_optional(config_path: &Path) -> anyhow::Result<Option<Self>> {
        if !config_path.exists() {
            return Ok(None);
        }
        Self::load(config_path).map(Some)
    }

    fn parse(content: &str) -> anyhow::Result<Self> {
        let config: AppConfig = toml::from_str(content)?;
        if config.window_size.get() > MAX_WINDOW_SIZE {
            bail!("window-size {} exceeds the maximum of {}", config.window_size, MAX_WINDOW_SIZE);
        }
        if config.log_level.parse::<LevelFilter>().is_err() {
            bail!("Invalid log-level '{}'", config.log_level);
        }
        Ok(config)
    }

    /// Where to look for the config file: `$TRAINING_VISUALIZER_CONFIG` or `./config.toml`.
    pub fn config_path() -> PathBuf {
        std::env::var_os(CONFIG_PATH_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE))
    }

    pub fn log_level_filter(&self) -> LevelFilter {
        self.log_level.parse().unwrap_or(LevelFilter::Info)
    }

    /// The subset of settings the analyzer pipeline needs.
    pub fn analysis(&self) -> AnalysisConfig {
        AnalysisConfig {
            window_size: self.window_size,
            quote_normalization: self.quote_normalization,
        }
    }
}
