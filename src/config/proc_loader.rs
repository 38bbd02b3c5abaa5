use std::path::Path;
use crate::config::client::ServiceConfig;
use crate::config::settings::{LogFormat, LoggingConfig};
use crate::config::proc_validator;
use crate::observability::metrics::get_metrics;
use anyhow::{anyhow, Result};
use regex::Regex;
use tracing::{debug, error};

/// Load and validate config from YAML file
pub async fn file_to_config(path: &Path) -> Result<ServiceConfig> {
    let content = tokio::fs::read_to_string(path).await?;

    let expanded = expand_env_vars(&content)?;
    parse_config(expanded).await
}

pub async fn parse_config(content: String) -> Result<ServiceConfig> {
    let metrics = get_metrics().await;
    let mut service_config: ServiceConfig = serde_yaml::from_str(&content)
        .inspect_err(|e| {
            error!("parse config error: {}", e);
        })?;

    // Apply defaults
    if service_config.settings.logging.is_none() {
        service_config.settings.logging = Some(LoggingConfig::new("info".to_owned(), LogFormat::Compact));
    }
    service_config.client.scopes.retain(|scope| !scope.trim().is_empty());

    debug!("validation config ...");
    if let Err(errors) = proc_validator::validate_service_config(&service_config) {
        metrics.config_validation_errors.inc_by(errors.len() as u64);
        return Err(anyhow!("config is not valid:\n  - {}", errors.join("\n  - ")));
    }

    Ok(service_config)
}

/// Replace `${VAR}` and `${VAR:default}` with environment values
fn expand_env_vars(input: &str) -> Result<String> {
    let re = Regex::new(r"\$\{(\w+)(?::([^\}]+))?\}")?;
    Ok(re
        .replace_all(input, |caps: &regex::Captures| {
            let var = &caps[1];
            let default = caps.get(2).map(|m| m.as_str()).unwrap_or("");
            std::env::var(var).unwrap_or_else(|_| default.to_string())
        })
        .to_string())
}
