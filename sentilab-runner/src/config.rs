//! Pipeline configuration, loaded from TOML.
//!
//! Every section is optional; missing keys fall back to their defaults.
//!
//! ```toml
//! [input]
//! price_dir = "data/yfinance_data"
//! ratings_file = "data/raw_analyst_ratings.csv"
//!
//! [merge]
//! join = "left"
//!
//! [indicators]
//! sma_periods = [20, 50]
//!
//! [sentiment]
//! neutral_band = 0.01
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use sentilab_core::data::IngestOptions;
use sentilab_core::data::ingest::DEFAULT_FILE_SUFFIX;
use sentilab_core::enrich::{IndicatorConfig, IndicatorConfigError};
use sentilab_core::merge::JoinMode;
use sentilab_core::sentiment::{SentimentThresholds, ThresholdError};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("indicator config: {0}")]
    Indicators(#[from] IndicatorConfigError),

    #[error("sentiment config: {0}")]
    Sentiment(#[from] ThresholdError),

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    pub price_dir: PathBuf,
    pub ratings_file: PathBuf,
    /// Stripped from price file names to obtain the symbol.
    pub file_suffix: String,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            price_dir: PathBuf::from("data/yfinance_data"),
            ratings_file: PathBuf::from("data/raw_analyst_ratings.csv"),
            file_suffix: DEFAULT_FILE_SUFFIX.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    pub parallel: bool,
    /// Wall-clock limit for the price directory; 0 disables it.
    pub timeout_secs: u64,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            parallel: true,
            timeout_secs: 300,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MergeConfig {
    pub join: JoinMode,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub dir: PathBuf,
    /// Appended to the symbol to name each merged file.
    pub file_suffix: String,
    pub write_summary: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("processed_data"),
            file_suffix: "_processed".to_string(),
            write_summary: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Restrict the correlation to one symbol. All symbols when unset.
    pub correlation_symbol: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub input: InputConfig,
    pub ingest: IngestConfig,
    pub merge: MergeConfig,
    pub indicators: IndicatorConfig,
    pub sentiment: SentimentThresholds,
    pub output: OutputConfig,
    pub analysis: AnalysisConfig,
}

impl PipelineConfig {
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.indicators.validate()?;

        self.sentiment.validate()?;
        if self.input.price_dir.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("input.price_dir is empty".into()));
        }
        if self.input.ratings_file.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("input.ratings_file is empty".into()));
        }
        if self.output.file_suffix.contains(['/', '\\']) {
            return Err(ConfigError::Invalid(format!(
                "output.file_suffix must not contain path separators: '{}'",
                self.output.file_suffix
            )));
        }
        if let Some(symbol) = &self.analysis.correlation_symbol {
            if symbol.trim().is_empty() {
                return Err(ConfigError::Invalid("analysis.correlation_symbol is empty".into()));
            }
        }
        Ok(())
    }

    pub fn ingest_options(&self) -> IngestOptions {
        IngestOptions {
            file_suffix: self.input.file_suffix.clone(),
            parallel: self.ingest.parallel,
            timeout: (self.ingest.timeout_secs > 0)
                .then(|| Duration::from_secs(self.ingest.timeout_secs)),
        }
    }
}
