//! services/client/src/config.rs
//!
//! Defines the shell's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::path::PathBuf;

use chrono::Duration;
use godam_core::{IdentityClass, SessionSettings};
use tracing::Level;

/// Upper bound for every duration setting, in seconds (ten years).
const MAX_DURATION_SECS: u64 = 10 * 365 * 24 * 60 * 60;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub api_base_url: String,
    pub storage_path: PathBuf,
    pub log_level: Level,
    pub start_path: String,
    pub identity: IdentityClass,
    /// Token handed over by an external login flow, stored at startup.
    pub session_token: Option<String>,
    pub token_ttl_secs: u64,
    pub sweep_interval_secs: u64,
    pub poll_interval_secs: u64,
    pub low_stock_threshold: i64,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test builds so tests stay hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        // --- Backend and Storage ---
        let api_base_url = std::env::var("GODAM_API_BASE_URL")
            .unwrap_or_else(|_| "http://localhost:3000/api".to_string());
        reqwest::Url::parse(&api_base_url).map_err(|e| {
            ConfigError::InvalidValue("GODAM_API_BASE_URL".to_string(), e.to_string())
        })?;
        let api_base_url = api_base_url.trim_end_matches('/').to_string();

        let storage_path = std::env::var("GODAM_STORAGE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./godam-storage.json"));

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        // --- Session Shell ---
        let start_path =
            std::env::var("GODAM_START_PATH").unwrap_or_else(|_| "/dashboard".to_string());
        let identity = std::env::var("GODAM_IDENTITY")
            .unwrap_or_else(|_| "admin".to_string())
            .parse::<IdentityClass>()
            .map_err(|e| ConfigError::InvalidValue("GODAM_IDENTITY".to_string(), e))?;
        let session_token = std::env::var("GODAM_SESSION_TOKEN")
            .ok()
            .filter(|token| !token.trim().is_empty());

        // --- Timers and Thresholds ---
        let token_ttl_secs = positive_var("GODAM_TOKEN_TTL_SECS", 3600)?;
        let sweep_interval_secs = positive_var("GODAM_SWEEP_INTERVAL_SECS", 300)?;
        let poll_interval_secs = positive_var("GODAM_POLL_INTERVAL_SECS", 300)?;
        let low_stock_threshold = match std::env::var("GODAM_LOW_STOCK_THRESHOLD") {
            Ok(raw) => raw.trim().parse::<i64>().map_err(|e| {
                ConfigError::InvalidValue("GODAM_LOW_STOCK_THRESHOLD".to_string(), e.to_string())
            })?,
            Err(_) => 10,
        };

        Ok(Self {
            api_base_url,
            storage_path,
            log_level,
            start_path,
            identity,
            session_token,
            token_ttl_secs,
            sweep_interval_secs,
            poll_interval_secs,
            low_stock_threshold,
        })
    }

    /// Session timings with the configured overrides applied.
    pub fn session_settings(&self) -> SessionSettings {
        let defaults = SessionSettings::default();
        SessionSettings {
            token_ttl: seconds(self.token_ttl_secs).unwrap_or(defaults.token_ttl),
            sweep_interval: seconds(self.sweep_interval_secs).unwrap_or(defaults.sweep_interval),
            ..defaults
        }
    }

    pub fn poll_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.poll_interval_secs)
    }
}

fn seconds(secs: u64) -> Option<Duration> {
    Duration::try_seconds(i64::try_from(secs).ok()?)
}

/// Reads a duration in seconds that must lie in `1..=MAX_DURATION_SECS`.
fn positive_var(name: &str, default: u64) -> Result<u64, ConfigError> {
    let Ok(raw) = std::env::var(name) else {
        return Ok(default);
    };
    match raw.trim().parse::<u64>() {
        Ok(0) => Err(ConfigError::InvalidValue(
            name.to_string(),
            "must be greater than zero".to_string(),
        )),
        Ok(value) if value > MAX_DURATION_SECS => Err(ConfigError::InvalidValue(
            name.to_string(),
            format!("must be at most {} seconds", MAX_DURATION_SECS),
        )),
        Ok(value) => Ok(value),
        Err(e) => Err(ConfigError::InvalidValue(name.to_string(), e.to_string())),
    }
}
