//! Application configuration.

use std::path::Path;
use std::time::Duration;

use crate::error::{AppError, AppResult};
use ontap_client::HttpClientConfig;
use ontap_core::LocationIdentifier;
use ontap_dashboard::DashboardConfig;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Default config path when neither `--config` nor `ONTAP_CONFIG` is given.
pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Environment variable that overrides `api_token`.
pub const API_TOKEN_ENV: &str = "ONTAP_API_TOKEN";

/// Logging configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Default log filter (e.g. "info,ontap=debug"). `RUST_LOG` wins.
    #[serde(default)]
    pub log_level: Option<String>,
}

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Backend base URL.
    #[serde(default = "default_api_url")]
    pub api_url: String,
    /// Bearer token for the backend.
    #[serde(default)]
    pub api_token: Option<String>,
    /// Per-request timeout (ms).
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    /// Location id or slug to show.
    #[serde(default)]
    pub location: String,
    /// Re-run the bootstrap chain this often (seconds). 0 disables.
    #[serde(default = "default_rebootstrap_interval_secs")]
    pub rebootstrap_interval_secs: u64,
    /// Dashboard server.
    #[serde(default)]
    pub dashboard: DashboardConfig,
    /// Logging.
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

fn default_api_url() -> String {
    "http://localhost:3000/api".to_string()
}

fn default_request_timeout_ms() -> u64 {
    10_000
}

fn default_rebootstrap_interval_secs() -> u64 {
    900
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            api_token: None,
            request_timeout_ms: default_request_timeout_ms(),
            location: String::new(),
            rebootstrap_interval_secs: default_rebootstrap_interval_secs(),
            dashboard: DashboardConfig::default(),
            telemetry: TelemetryConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &str) -> AppResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| AppError::Config(format!("Failed to read config: {e}")))?;
        Self::from_toml(&content)
    }

    /// Parse configuration from TOML text.
    pub fn from_toml(content: &str) -> AppResult<Self> {
        toml::from_str(content).map_err(|e| AppError::Config(format!("Failed to parse config: {e}")))
    }

    /// Load from `path`, falling back to defaults when the default path
    /// does not exist. An explicitly given path must exist.
    pub fn load(path: Option<&str>) -> AppResult<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None if Path::new(DEFAULT_CONFIG_PATH).exists() => Self::from_file(DEFAULT_CONFIG_PATH),
            None => {
                warn!(path = DEFAULT_CONFIG_PATH, "Config file not found, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Apply environment overrides.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(token) = std::env::var(API_TOKEN_ENV) {
            if !token.is_empty() {
                self.api_token = Some(token);
            }
        }
        self
    }

    /// Reject configurations the service cannot start with.
    pub fn validate(&self) -> AppResult<()> {
        if self.api_url.trim().is_empty() {
            return Err(AppError::Config("api_url must be set".to_string()));
        }
        if self.request_timeout_ms == 0 {
            return Err(AppError::Config(
                "request_timeout_ms must be positive".to_string(),
            ));
        }
        LocationIdentifier::parse(&self.location)
            .map_err(|e| AppError::Config(format!("location: {e}")))?;
        Ok(())
    }

    /// Backend client settings.
    pub fn http_client_config(&self) -> HttpClientConfig {
        HttpClientConfig {
            base_url: self.api_url.clone(),
            token: self.api_token.clone(),
            timeout: Duration::from_millis(self.request_timeout_ms),
        }
    }

    /// Re-bootstrap period, if enabled.
    pub fn rebootstrap_interval(&self) -> Option<Duration> {
        (self.rebootstrap_interval_secs > 0)
            .then(|| Duration::from_secs(self.rebootstrap_interval_secs))
    }
}
