use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::helpers::time::duration_millis;

pub const BEARER: &str = "bearer";

/// Token issued by the authorization server, as decoded from one exchange.
///
/// `issue_date` is the local time at which the response arrived, so expiry never
/// depends on the server clock agreeing with ours.
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct AccessTokenDetails {
    pub(crate) access_token: String,
    pub(crate) token_type: String,
    pub(crate) expires_in: i64,
    pub(crate) issue_date: i64,
    pub(crate) scope: Option<String>,
    #[serde(rename = "sub")]
    pub(crate) subject: Option<String>,
    #[serde(rename = "iss")]
    pub(crate) issuer: Option<String>,
    #[serde(rename = "iat")]
    pub(crate) issued_at: Option<i64>,
    #[serde(rename = "jti")]
    pub(crate) json_web_token_id: Option<String>,
    #[serde(rename = "aud", skip_serializing_if = "Vec::is_empty")]
    pub(crate) audience: Vec<String>,
}

impl AccessTokenDetails {
    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    pub fn token_type(&self) -> &str {
        &self.token_type
    }

    /// Lifetime in seconds as stated by the server at issuance.
    pub fn expires_in(&self) -> i64 {
        self.expires_in
    }

    /// Local receipt time, unix seconds.
    pub fn issue_date(&self) -> i64 {
        self.issue_date
    }

    pub fn scope(&self) -> Option<&str> {
        self.scope.as_deref()
    }

    pub fn subject(&self) -> Option<&str> {
        self.subject.as_deref()
    }

    pub fn issuer(&self) -> Option<&str> {
        self.issuer.as_deref()
    }

    /// `iat` as reported by the server. Informational only.
    pub fn issued_at(&self) -> Option<i64> {
        self.issued_at
    }

    pub fn json_web_token_id(&self) -> Option<&str> {
        self.json_web_token_id.as_deref()
    }

    pub fn audience(&self) -> &[String] {
        &self.audience
    }

    /// Expiry instant, unix seconds.
    pub fn expires_at(&self) -> i64 {
        self.issue_date.saturating_add(self.expires_in)
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now.timestamp_millis() >= self.expires_at_millis()
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        !self.access_token.is_empty() && !self.is_expired_at(now)
    }

    pub fn is_valid(&self) -> bool {
        self.is_valid_at(Utc::now())
    }

    /// True when `now + duration` is still strictly before expiry.
    pub fn is_valid_for_at(&self, now: DateTime<Utc>, duration: Duration) -> bool {
        now.timestamp_millis().saturating_add(duration_millis(duration)) < self.expires_at_millis()
    }

    pub fn is_valid_for(&self, duration: Duration) -> bool {
        self.is_valid_for_at(Utc::now(), duration)
    }

    /// Value for an `Authorization` header on downstream calls.
    pub fn authorization_header(&self) -> String {
        format!("Bearer {}", self.access_token)
    }

    fn expires_at_millis(&self) -> i64 {
        self.expires_at().saturating_mul(1000)
    }
}

impl fmt::Debug for AccessTokenDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessTokenDetails")
            .field("access_token", &"<redacted>")
            .field("token_type", &self.token_type)
            .field("expires_in", &self.expires_in)
            .field("issue_date", &self.issue_date)
            .field("scope", &self.scope)
            .field("subject", &self.subject)
            .field("issuer", &self.issuer)
            .field("issued_at", &self.issued_at)
            .field("json_web_token_id", &self.json_web_token_id)
            .field("audience", &self.audience)
            .finish()
    }
}

#[cfg(test)]
pub(crate) fn sample_details(issue_date: i64, expires_in: i64) -> AccessTokenDetails {
    AccessTokenDetails {
        access_token: "abc.def.ghi".to_owned(),
        token_type: BEARER.to_owned(),
        expires_in,
        issue_date,
        scope: Some("read".to_owned()),
        subject: None,
        issuer: None,
        issued_at: None,
        json_web_token_id: None,
        audience: Vec::new(),
    }
}
