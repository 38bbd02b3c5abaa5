use serde::Deserialize;
use std::{env, fmt, fs};

use anyhow::{anyhow, Result};

use crate::client::builder::TokenClientBuilder;
use crate::config::settings::SettingsConfig;

/// ================================
/// Full service configuration
/// ================================
#[derive(Debug, Deserialize, Clone)]
pub struct ServiceConfig {
    pub settings: SettingsConfig,
    pub client: ClientConfig,
}

/// ================================
/// Token client
/// ================================
#[derive(Debug, Deserialize, Clone)]
pub struct ClientConfig {
    pub endpoint: String,
    pub client_id: String,
    pub client_secret: SecretValue,
    #[serde(default)]
    pub scopes: Vec<String>,
}

impl ClientConfig {
    /// Builder pre-filled from this section, secret resolved.
    pub fn builder(&self, settings: &SettingsConfig) -> Result<TokenClientBuilder> {
        let secret = self.client_secret.resolve()?;
        Ok(TokenClientBuilder::new()
            .endpoint(self.endpoint.as_str())
            .credentials(self.client_id.as_str(), secret)
            .scopes(self.scopes.iter().cloned())
            .timeouts(settings.timeouts()))
    }
}

/// Where a secret value comes from
#[derive(Deserialize, Clone)]
#[serde(untagged)]
pub enum SecretValue {
    Plain(String),
    Literal {
        value: String,
    },
    FromEnv {
        from_env: String,
    },
    FromFile {
        path: String,
    },
}

impl SecretValue {
    pub fn resolve(&self) -> Result<String> {
        match self {
            SecretValue::Plain(value) | SecretValue::Literal { value } => Ok(value.to_owned()),
            SecretValue::FromEnv { from_env } => env::var(from_env)
                .map_err(|err| anyhow!("client secret env '{}': {}", from_env, err)),
            SecretValue::FromFile { path } => fs::read_to_string(path)
                .map(|res| res.trim().to_string())
                .map_err(|err| anyhow!("client secret file '{}': {}", path, err)),
        }
    }
}

impl fmt::Debug for SecretValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SecretValue::Plain(_) | SecretValue::Literal { .. } => f.write_str("Literal(<redacted>)"),
            SecretValue::FromEnv { from_env } => f.debug_struct("FromEnv").field("from_env", from_env).finish(),
            SecretValue::FromFile { path } => f.debug_struct("FromFile").field("path", path).finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;

    #[test]
    fn secret_value_shapes() {
        let plain: SecretValue = serde_yaml::from_str("s3cret").unwrap();
        assert_eq!(plain.resolve().unwrap(), "s3cret");

        let literal: SecretValue = serde_yaml::from_str("value: s3cret").unwrap();
        assert_eq!(literal.resolve().unwrap(), "s3cret");
        assert!(!format!("{:?}", literal).contains("s3cret"));
    }

    #[test]
    #[serial]
    fn secret_from_env() {
        env::set_var("TOKEN_CLIENT_TEST_SECRET", "from-env");
        let value: SecretValue = serde_yaml::from_str("from_env: TOKEN_CLIENT_TEST_SECRET").unwrap();
        assert_eq!(value.resolve().unwrap(), "from-env");

        env::remove_var("TOKEN_CLIENT_TEST_SECRET");
        assert!(value.resolve().is_err());
    }

    #[test]
    fn secret_from_file_is_trimmed() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "  from-file  ").unwrap();
        let value = SecretValue::FromFile {
            path: file.path().to_string_lossy().into_owned(),
        };
        assert_eq!(value.resolve().unwrap(), "from-file");
    }
}
