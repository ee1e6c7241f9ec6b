//! `dupforge.toml`: optional project config.
//!
//! Precedence for every value: CLI flag > config file > built-in default.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use dupforge_inject::inject::validate_rate;
use dupforge_inject::DEFAULT_RATE;

use crate::exit_codes::EXIT_INVALID_CONFIG;
use crate::CliError;

pub const DEFAULT_CONFIG_FILE: &str = "dupforge.toml";
pub const DEFAULT_RAW_PATH: &str = "data/raw/invoices_raw.csv";
pub const DEFAULT_PROCESSED_PATH: &str = "data/processed/invoices_with_anomalies.csv";
pub const DEFAULT_DATASET: &str = "pradumn203/payment-date-prediction-for-invoices-dataset";
pub const DEFAULT_API_BASE: &str = "https://www.kaggle.com/api/v1";

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DupforgeConfig {
    pub paths: PathsConfig,
    pub inject: InjectConfig,
    pub source: SourceConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PathsConfig {
    pub raw: PathBuf,
    pub processed: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            raw: PathBuf::from(DEFAULT_RAW_PATH),
            processed: PathBuf::from(DEFAULT_PROCESSED_PATH),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InjectConfig {
    pub rate: f64,
    pub seed: Option<u64>,
}

impl Default for InjectConfig {
    fn default() -> Self {
        Self {
            rate: DEFAULT_RATE,
            seed: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SourceConfig {
    /// Kaggle dataset reference, `owner/slug`.
    pub dataset: String,
    pub api_base: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            dataset: DEFAULT_DATASET.to_string(),
            api_base: DEFAULT_API_BASE.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub enum ConfigError {
    Read { path: PathBuf, message: String },
    Parse(String),
    Validation(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Read { path, message } => {
                write!(f, "cannot read config {}: {message}", path.display())
            }
            Self::Parse(msg) => write!(f, "config parse error: {msg}"),
            Self::Validation(msg) => write!(f, "config validation error: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<ConfigError> for CliError {
    fn from(e: ConfigError) -> Self {
        CliError {
            code: EXIT_INVALID_CONFIG,
            message: e.to_string(),
            hint: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl DupforgeConfig {
    pub fn from_toml(input: &str) -> Result<Self, ConfigError> {
        let config: DupforgeConfig =
            toml::from_str(input).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_rate(self.inject.rate)
            .map_err(|e| ConfigError::Validation(format!("inject.rate: {e}")))?;

        split_dataset(&self.source.dataset).map_err(ConfigError::Validation)?;

        if self.source.api_base.trim().is_empty() {
            return Err(ConfigError::Validation("source.api_base must not be empty".into()));
        }

        Ok(())
    }

    /// Load the config for this run.
    ///
    /// An explicit path must exist. Without one, `./dupforge.toml` is used
    /// when present and built-in defaults otherwise.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match explicit {
            Some(p) => p.to_path_buf(),
            None => {
                let default = PathBuf::from(DEFAULT_CONFIG_FILE);
                if !default.exists() {
                    log::debug!("no {DEFAULT_CONFIG_FILE} found; using defaults");
                    return Ok(Self::default());
                }
                default
            }
        };

        let text = std::fs::read_to_string(&path).map_err(|e| ConfigError::Read {
            path: path.clone(),
            message: e.to_string(),
        })?;
        log::debug!("loaded config from {}", path.display());
        Self::from_toml(&text)
    }
}

/// Split `owner/slug`, rejecting anything else.
pub fn split_dataset(dataset: &str) -> Result<(&str, &str), String> {
    match dataset.split_once('/') {
        Some((owner, slug))
            if !owner.is_empty() && !slug.is_empty() && !slug.contains('/') =>
        {
            Ok((owner, slug))
        }
        _ => Err(format!("dataset must look like 'owner/slug', got '{dataset}'")),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
