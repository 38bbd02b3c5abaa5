//! Configuration validation with aggregated errors.
//! - Aggregates all issues into Vec<String>
//! - Checks the token client section (endpoint, credentials, scopes)
//!   and the service settings (server, metrics, logging, timeouts)

use reqwest::Url;
use tracing::{error, info};

use crate::config::client::{ClientConfig, ServiceConfig};
use crate::config::settings::{HttpConfig, SettingsConfig};

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Public entrypoint: returns Ok(()) or Err(Vec<String>) containing all issues.
pub fn validate_service_config(cfg: &ServiceConfig) -> Result<(), Vec<String>> {
    let mut errors: Vec<String> = Vec::new();

    validate_client(&cfg.client, &mut errors);
    validate_settings(&cfg.settings, &mut errors);

    if errors.is_empty() {
        info!("config is valid");
        Ok(())
    } else {
        for e in &errors {
            error!("config error: {}", e);
        }
        Err(errors)
    }
}

fn validate_client(client: &ClientConfig, errors: &mut Vec<String>) {
    match Url::parse(client.endpoint.trim()) {
        Ok(url) if matches!(url.scheme(), "http" | "https") && url.has_host() => {}
        Ok(_) => errors.push(format!(
            "client.endpoint '{}' must be an absolute http(s) URL",
            client.endpoint
        )),
        Err(e) => errors.push(format!(
            "client.endpoint '{}' is not a valid URL: {}",
            client.endpoint, e
        )),
    }

    if client.client_id.trim().is_empty() {
        errors.push("client.client_id must not be empty".to_string());
    }

    for scope in &client.scopes {
        if scope.trim().contains(char::is_whitespace) {
            errors.push(format!(
                "client.scopes entry '{}' must be a single scope without whitespace",
                scope
            ));
        }
    }
}

fn validate_settings(settings: &SettingsConfig, errors: &mut Vec<String>) {
    if settings.server.host.trim().is_empty() {
        errors.push("settings.server.host must not be empty".to_string());
    }
    if settings.server.port.parse::<u16>().is_err() {
        errors.push(format!(
            "settings.server.port '{}' must be a port number",
            settings.server.port
        ));
    }

    if settings.metrics.is_enabled && !settings.metrics.path.starts_with('/') {
        errors.push(format!(
            "settings.metrics.path '{}' must start with '/'",
            settings.metrics.path
        ));
    }

    if let Some(logging) = &settings.logging {
        if !LOG_LEVELS.contains(&logging.level.to_lowercase().as_str()) {
            errors.push(format!(
                "settings.logging.level '{}' must be one of {:?}",
                logging.level, LOG_LEVELS
            ));
        }
    }

    if let Some(http) = &settings.http {
        validate_timeouts(http, errors);
    }
}

fn validate_timeouts(http: &HttpConfig, errors: &mut Vec<String>) {
    let timeouts = [
        ("connect_timeout_ms", http.connect_timeout_ms),
        ("write_timeout_ms", http.write_timeout_ms),
        ("read_timeout_ms", http.read_timeout_ms),
    ];
    for (name, value) in timeouts {
        if value == Some(0) {
            errors.push(format!("settings.http.{} must be greater than 0", name));
        }
    }
}
