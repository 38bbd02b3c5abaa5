use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use reqwest::Url;

use crate::client::token_client::TokenClient;
use crate::error::TokenError;
use crate::helpers::time::{Clock, SystemClock};
use crate::sources::transport::{HttpTimeouts, HttpTransport, ReqwestTransport};
use crate::utils::constants::{CLIENT_CREDENTIALS, CLIENT_ID, CLIENT_SECRET, GRANT_TYPE, SCOPE};

/// Validated, immutable settings of one token client.
#[derive(Clone, PartialEq, Eq)]
pub struct TokenClientConfig {
    endpoint: Url,
    client_id: String,
    client_secret: String,
    scopes: Vec<String>,
}

impl TokenClientConfig {
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn scopes(&self) -> &[String] {
        &self.scopes
    }

    /// Body parameters of the `client_credentials` grant.
    pub(crate) fn form_params(&self) -> Vec<(String, String)> {
        let mut form = vec![
            (GRANT_TYPE.to_owned(), CLIENT_CREDENTIALS.to_owned()),
            (CLIENT_ID.to_owned(), self.client_id.clone()),
            (CLIENT_SECRET.to_owned(), self.client_secret.clone()),
        ];
        if !self.scopes.is_empty() {
            form.push((SCOPE.to_owned(), self.scopes.join(" ")));
        }
        form
    }
}

impl fmt::Debug for TokenClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenClientConfig")
            .field("endpoint", &self.endpoint.as_str())
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("scopes", &self.scopes)
            .finish()
    }
}

/// Collects client settings. Nothing is checked until [`TokenClientBuilder::build`].
pub struct TokenClientBuilder<H = ReqwestTransport> {
    endpoint: Option<String>,
    client_id: Option<String>,
    client_secret: Option<String>,
    scopes: Vec<String>,
    http_client: Option<H>,
    clock: Option<Arc<dyn Clock>>,
    timeouts: HttpTimeouts,
}

impl TokenClientBuilder<ReqwestTransport> {
    pub fn new() -> Self {
        Self {
            endpoint: None,
            client_id: None,
            client_secret: None,
            scopes: Vec::new(),
            http_client: None,
            clock: None,
            timeouts: HttpTimeouts::default(),
        }
    }
}

impl Default for TokenClientBuilder<ReqwestTransport> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H> TokenClientBuilder<H> {
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    pub fn credentials(mut self, client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        self.client_id = Some(client_id.into());
        self.client_secret = Some(client_secret.into());
        self
    }

    pub fn scope(mut self, scope: impl Into<String>) -> Self {
        self.scopes.push(scope.into());
        self
    }

    pub fn scopes<I, S>(mut self, scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.scopes.extend(scopes.into_iter().map(Into::into));
        self
    }

    /// Use `http_client` instead of building the default transport.
    pub fn http_client<T>(self, http_client: T) -> TokenClientBuilder<T> {
        TokenClientBuilder {
            endpoint: self.endpoint,
            client_id: self.client_id,
            client_secret: self.client_secret,
            scopes: self.scopes,
            http_client: Some(http_client),
            clock: self.clock,
            timeouts: self.timeouts,
        }
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn timeouts(mut self, timeouts: HttpTimeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.timeouts.connect = timeout;
        self
    }

    pub fn write_timeout(mut self, timeout: Duration) -> Self {
        self.timeouts.write = timeout;
        self
    }

    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.timeouts.read = timeout;
        self
    }
}

impl<H: HttpTransport> TokenClientBuilder<H> {
    /// Validates the settings and creates the client. Fails without touching the network.
    pub fn build(self) -> Result<TokenClient<H>, TokenError> {
        let endpoint = parse_endpoint(self.endpoint.as_deref())?;

        let client_id = match self.client_id {
            Some(id) if !id.trim().is_empty() => id,
            _ => return Err(TokenError::configuration("client id is required")),
        };
        let client_secret = self
            .client_secret
            .ok_or_else(|| TokenError::configuration("client secret is required"))?;
        let scopes = normalize_scopes(self.scopes)?;

        let http_client = match self.http_client {
            Some(http_client) => http_client,
            None => H::with_timeouts(&self.timeouts).map_err(|e| {
                TokenError::configuration(format!("cannot create HTTP client: {}", e))
            })?,
        };
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));

        let config = TokenClientConfig {
            endpoint,
            client_id,
            client_secret,
            scopes,
        };
        Ok(TokenClient::from_parts(config, http_client, clock))
    }
}

fn parse_endpoint(endpoint: Option<&str>) -> Result<Url, TokenError> {
    let raw = endpoint
        .map(str::trim)
        .filter(|raw| !raw.is_empty())
        .ok_or_else(|| TokenError::configuration("token endpoint is required"))?;

    let url = Url::parse(raw).map_err(|e| {
        TokenError::configuration(format!("token endpoint '{}' is not a valid URL: {}", raw, e))
    })?;

    match url.scheme() {
        "http" | "https" if url.has_host() => Ok(url),
        _ => Err(TokenError::configuration(format!(
            "token endpoint '{}' must be an absolute http(s) URL",
            raw
        ))),
    }
}

/// Trims, drops blanks and duplicates, keeps first-seen order.
fn normalize_scopes(scopes: Vec<String>) -> Result<Vec<String>, TokenError> {
    let mut normalized: Vec<String> = Vec::with_capacity(scopes.len());
    for scope in scopes {
        let scope = scope.trim();
        if scope.is_empty() {
            continue;
        }
        if scope.contains(char::is_whitespace) {
            return Err(TokenError::configuration(format!(
                "scope '{}' must not contain whitespace",
                scope
            )));
        }
        if !normalized.iter().any(|known| known == scope) {
            normalized.push(scope.to_owned());
        }
    }
    Ok(normalized)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TokenErrorKind;

    fn builder() -> TokenClientBuilder {
        TokenClientBuilder::new()
            .endpoint("http://localhost:8089/oauth/token")
            .credentials("client", "secret")
    }

    fn config_error(builder: TokenClientBuilder) -> String {
        match builder.build() {
            Err(err) => {
                assert_eq!(err.kind(), TokenErrorKind::Configuration);
                err.to_string()
            }
            Ok(client) => panic!("expected configuration error, got {:?}", client),
        }
    }

    #[test]
    fn builds_with_endpoint_and_credentials() {
        let client = builder().scopes(["read", "write"]).build().unwrap();
        let config = client.config();

        assert_eq!(config.endpoint().as_str(), "http://localhost:8089/oauth/token");
        assert_eq!(config.client_id(), "client");
        assert_eq!(config.scopes(), ["read".to_owned(), "write".to_owned()]);
    }

    #[test]
    fn missing_endpoint_fails() {
        let msg = config_error(TokenClientBuilder::new().credentials("client", "secret"));
        assert!(msg.contains("endpoint is required"));
    }

    #[test]
    fn relative_or_non_http_endpoint_fails() {
        config_error(builder().endpoint("/oauth/token"));
        config_error(builder().endpoint("ftp://localhost/oauth/token"));
        config_error(builder().endpoint("   "));
    }

    #[test]
    fn missing_credentials_fail() {
        let no_credentials = TokenClientBuilder::new().endpoint("http://localhost/oauth/token");
        assert!(config_error(no_credentials).contains("client id"));
        config_error(builder().credentials("  ", "secret"));
    }

    #[test]
    fn scopes_are_an_ordered_set() {
        let client = builder()
            .scope("write")
            .scopes(vec!["read", " write ", "", "read"])
            .build()
            .unwrap();
        assert_eq!(client.config().scopes(), ["write".to_owned(), "read".to_owned()]);
    }

    #[test]
    fn scope_with_whitespace_fails() {
        assert!(config_error(builder().scope("read write")).contains("whitespace"));
    }

    #[test]
    fn form_contains_grant_and_joined_scopes() {
        let client = builder().scopes(["read", "write"]).build().unwrap();
        let form = client.config().form_params();

        assert_eq!(
            form,
            vec![
                ("grant_type".to_owned(), "client_credentials".to_owned()),
                ("client_id".to_owned(), "client".to_owned()),
                ("client_secret".to_owned(), "secret".to_owned()),
                ("scope".to_owned(), "read write".to_owned()),
            ]
        );
    }

    #[test]
    fn form_omits_scope_when_none_configured() {
        let client = builder().build().unwrap();
        assert!(client
            .config()
            .form_params()
            .iter()
            .all(|(key, _)| key != "scope"));
    }

    #[test]
    fn debug_redacts_secret() {
        let client = builder().build().unwrap();
        let rendered = format!("{:?}", client.config());
        assert!(rendered.contains("<redacted>"));
        assert!(!rendered.contains("\"secret\""));
    }
}
