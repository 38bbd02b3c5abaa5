//! Failure type shared by every token client operation.
//!
//! Callers see one type, [`TokenError`]: either a parsed token comes back or
//! this does. The variants exist for logging and metrics, the contract does not
//! depend on which one fired.

use std::fmt;
use std::sync::Arc;

use http::StatusCode;
use serde::Deserialize;
use thiserror::Error;

/// Upper bound on how much of a response body is kept for diagnostics.
pub const BODY_EXCERPT_LIMIT: usize = 512;

#[derive(Debug, Clone, Error)]
pub enum TokenError {
    /// Builder input was missing or invalid. Raised before any request is sent.
    #[error("invalid token client configuration: {0}")]
    Configuration(String),

    /// The request never produced an HTTP response (refused, DNS, timeout, ...).
    #[error("token request to {endpoint} failed: {source}")]
    Transport {
        endpoint: String,
        #[source]
        source: Arc<dyn std::error::Error + Send + Sync>,
    },

    /// The token endpoint answered with a non-success status.
    #[error("token endpoint rejected the request with status {status}{}", describe_rejection(.error.as_ref()))]
    Rejected {
        status: StatusCode,
        error: Option<OAuthErrorResponse>,
        body: Option<String>,
    },

    /// Success status, but the body is not a usable token response.
    #[error("malformed token response: {reason}")]
    Malformed { reason: String, body: Option<String> },
}

/// Coarse classification of a [`TokenError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenErrorKind {
    Configuration,
    Transport,
    Rejected,
    Malformed,
}

impl TokenErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenErrorKind::Configuration => "configuration",
            TokenErrorKind::Transport => "transport",
            TokenErrorKind::Rejected => "rejected",
            TokenErrorKind::Malformed => "malformed",
        }
    }
}

impl fmt::Display for TokenErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TokenError {
    pub fn kind(&self) -> TokenErrorKind {
        match self {
            TokenError::Configuration(_) => TokenErrorKind::Configuration,
            TokenError::Transport { .. } => TokenErrorKind::Transport,
            TokenError::Rejected { .. } => TokenErrorKind::Rejected,
            TokenError::Malformed { .. } => TokenErrorKind::Malformed,
        }
    }

    pub(crate) fn configuration(message: impl Into<String>) -> Self {
        TokenError::Configuration(message.into())
    }

    pub(crate) fn transport(
        endpoint: impl Into<String>,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        TokenError::Transport {
            endpoint: endpoint.into(),
            source: Arc::from(source),
        }
    }

    pub(crate) fn rejected(status: StatusCode, body: &str) -> Self {
        TokenError::Rejected {
            status,
            error: serde_json::from_str::<OAuthErrorResponse>(body).ok(),
            body: body_excerpt(body),
        }
    }

    pub(crate) fn malformed(reason: impl Into<String>, body: &str) -> Self {
        TokenError::Malformed {
            reason: reason.into(),
            body: body_excerpt(body),
        }
    }

    /// HTTP status of a rejected request.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            TokenError::Rejected { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Leading part of the response body, when the server sent one.
    pub fn body(&self) -> Option<&str> {
        match self {
            TokenError::Rejected { body, .. } | TokenError::Malformed { body, .. } => {
                body.as_deref()
            }
            _ => None,
        }
    }
}

/// Error payload of RFC 6749 section 5.2. Only used to enrich diagnostics.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct OAuthErrorResponse {
    pub error: String,
    #[serde(default)]
    pub error_description: Option<String>,
    #[serde(default)]
    pub error_uri: Option<String>,
}

impl fmt::Display for OAuthErrorResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.error)?;
        if let Some(description) = &self.error_description {
            write!(f, ": {}", description)?;
        }
        if let Some(uri) = &self.error_uri {
            write!(f, " (see {})", uri)?;
        }
        Ok(())
    }
}

fn describe_rejection(error: Option<&OAuthErrorResponse>) -> String {
    error.map(|e| format!(" ({})", e)).unwrap_or_default()
}

fn body_excerpt(body: &str) -> Option<String> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return None;
    }
    if trimmed.len() <= BODY_EXCERPT_LIMIT {
        return Some(trimmed.to_owned());
    }
    let mut end = BODY_EXCERPT_LIMIT;
    while !trimmed.is_char_boundary(end) {
        end -= 1;
    }
    Some(format!("{}...", &trimmed[..end]))
}
