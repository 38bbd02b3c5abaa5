use std::time::Duration;

use serde::Deserialize;

use crate::sources::transport::HttpTimeouts;
use crate::utils::constants::{
    DEFAULT_CONNECT_TIMEOUT_MS, DEFAULT_MIN_VALIDITY_SECS, DEFAULT_READ_TIMEOUT_MS,
    DEFAULT_WRITE_TIMEOUT_MS,
};

/// ================================
/// Global service-wide settings
/// ================================
#[derive(Debug, Deserialize, Clone)]
pub struct SettingsConfig {
    /// a token is refreshed when it expires within this many seconds
    pub min_validity_seconds: Option<u64>,
    pub http: Option<HttpConfig>,
    #[serde(default)]
    pub metrics: MetricsConfig,
    pub server: ServerConfig,
    pub logging: Option<LoggingConfig>
}

impl SettingsConfig {
    pub fn min_validity(&self) -> Duration {
        Duration::from_secs(self.min_validity_seconds.unwrap_or(DEFAULT_MIN_VALIDITY_SECS))
    }

    pub fn timeouts(&self) -> HttpTimeouts {
        let http = self.http.clone().unwrap_or_default();
        HttpTimeouts {
            connect: Duration::from_millis(http.connect_timeout_ms.unwrap_or(DEFAULT_CONNECT_TIMEOUT_MS)),
            write: Duration::from_millis(http.write_timeout_ms.unwrap_or(DEFAULT_WRITE_TIMEOUT_MS)),
            read: Duration::from_millis(http.read_timeout_ms.unwrap_or(DEFAULT_READ_TIMEOUT_MS)),
        }
    }
}

/// Transport timeouts, milliseconds
#[derive(Debug, Deserialize, Clone, Default)]
pub struct HttpConfig {
    pub connect_timeout_ms: Option<u64>,
    pub write_timeout_ms: Option<u64>,
    pub read_timeout_ms: Option<u64>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct MetricsConfig {
    #[serde(default = "default_metrics_path")]
    pub path: String,
    #[serde(default)]
    pub is_enabled: bool,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self { path: default_metrics_path(), is_enabled: false }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: String
}

/// ================================
/// Logging
/// ================================
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    pub level: String, // allowed: trace, debug, info, warn, error
    pub format: LogFormat,
}

impl LoggingConfig {
    pub fn new (level: String, format: LogFormat) -> Self {
        Self { level, format }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Compact,
}

fn default_metrics_path() -> String {
    "/metrics".to_string()
}
