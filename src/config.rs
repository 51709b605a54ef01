//! Service configuration.
//!
//! Both binaries read the same TOML file (default `aqmon.toml`). Every
//! section is optional; missing keys take the defaults below. The OpenAQ
//! API key may be left out of the file and supplied through the
//! `OPENAQ_API_KEY` environment variable (a `.env` file is honoured).
//!
//! ```toml
//! [api]
//! endpoint = "https://api.openaq.org/v2/measurements"
//! limit = 1000
//!
//! [store]
//! path = "air.db"
//!
//! [transform]
//! coordinates = "null"
//! timestamp = "fail"
//!
//! [dashboard]
//! top_n = 10
//! threshold = 50
//! ```

use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_PATH: &str = "aqmon.toml";
pub const API_KEY_ENV: &str = "OPENAQ_API_KEY";

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    Io { path: String, message: String },
    Parse(String),
    Invalid(String),
    /// Ingestion needs a key and neither the file nor the environment has one.
    MissingApiKey,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io { path, message } => write!(f, "Cannot read {}: {}", path, message),
            ConfigError::Parse(msg) => write!(f, "Config parse error: {}", msg),
            ConfigError::Invalid(msg) => write!(f, "Invalid config: {}", msg),
            ConfigError::MissingApiKey => {
                write!(f, "No API key: set api.api_key or {}", API_KEY_ENV)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api: ApiConfig,
    pub store: StoreConfig,
    pub transform: TransformConfig,
    pub dashboard: DashboardConfig,
    pub logging: LoggingConfig,
}

/// Remote measurements endpoint and the fixed query it is sent.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub endpoint: String,
    pub api_key: Option<String>,
    pub limit: u32,
    pub page: u32,
    pub order_by: String,
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.openaq.org/v2/measurements".to_string(),
            api_key: None,
            limit: 1000,
            page: 1,
            order_by: "datetime".to_string(),
            timeout_secs: 30,
        }
    }
}

impl ApiConfig {
    pub fn require_api_key(&self) -> Result<&str, ConfigError> {
        self.api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or(ConfigError::MissingApiKey)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self { path: PathBuf::from("air.db") }
    }
}

/// What to do with a record whose optional field is absent or malformed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Fallback {
    /// Keep the record with the field set to NULL.
    Null,
    /// Silently drop the record.
    Drop,
    /// Abort the whole batch with a `TransformError`.
    Fail,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TransformConfig {
    /// Source fields discarded before any other processing.
    pub dropped_fields: Vec<String>,
    pub coordinates: Fallback,
    /// `null` is not accepted: every stored row needs a timestamp.
    pub timestamp: Fallback,
}

impl Default for TransformConfig {
    fn default() -> Self {
        Self {
            dropped_fields: ["city", "isAnalysis", "isMobile", "entity", "sensorType"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            coordinates: Fallback::Null,
            timestamp: Fallback::Fail,
        }
    }
}

/// An integer dashboard control: its initial value and inclusive bounds.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct Slider {
    pub default: u32,
    pub min: u32,
    pub max: u32,
}

impl Slider {
    pub fn clamp(&self, value: u32) -> u32 {
        value.clamp(self.min, self.max)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    pub top_n: Slider,
    pub threshold: Slider,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            top_n: Slider { default: 10, min: 5, max: 20 },
            threshold: Slider { default: 50, min: 0, max: 200 },
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub file: Option<PathBuf>,
    pub timestamps: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string(), file: None, timestamps: false }
    }
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

impl Config {
    /// Parse and validate configuration from TOML text. Does not consult
    /// the environment.
    pub fn from_toml_str(text: &str) -> Result<Config, ConfigError> {
        let config: Config =
            toml::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from `path`, falling back to defaults when the
    /// file does not exist, then apply the `OPENAQ_API_KEY` override.
    pub fn load(path: &Path) -> Result<Config, ConfigError> {
        dotenv::dotenv().ok();
        Config::load_with_env_key(path, std::env::var(API_KEY_ENV).ok())
    }

    /// `load` with the environment's API key passed in.
    fn load_with_env_key(path: &Path, env_key: Option<String>) -> Result<Config, ConfigError> {
        let mut config = if path.exists() {
            let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
                path: path.display().to_string(),
                message: e.to_string(),
            })?;
            Config::from_toml_str(&text)?
        } else {
            Config::default()
        };

        if let Some(key) = env_key.filter(|k| !k.trim().is_empty()) {
            config.api.api_key = Some(key);
        }

        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.transform.timestamp == Fallback::Null {
            return Err(ConfigError::Invalid(
                "transform.timestamp cannot be \"null\"; use \"drop\" or \"fail\"".to_string(),
            ));
        }
        for (name, slider) in [("top_n", &self.dashboard.top_n), ("threshold", &self.dashboard.threshold)] {
            if slider.min > slider.max || slider.default < slider.min || slider.default > slider.max {
                return Err(ConfigError::Invalid(format!(
                    "dashboard.{}: default {} not within {}..={}",
                    name, slider.default, slider.min, slider.max
                )));
            }
        }
        if self.dashboard.top_n.min == 0 {
            return Err(ConfigError::Invalid("dashboard.top_n.min must be at least 1".to_string()));
        }
        if self.api.limit == 0 {
            return Err(ConfigError::Invalid("api.limit must be positive".to_string()));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
