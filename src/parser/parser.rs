use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::cache::token::{AccessTokenDetails, BEARER};
use crate::error::TokenError;

/// Successful token endpoint response. Required fields are not `Option`, and a
/// present field of the wrong type fails the whole parse.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
    #[serde(default)]
    token_type: Option<String>,
    #[serde(default)]
    scope: Option<String>,
    #[serde(default)]
    sub: Option<String>,
    #[serde(default)]
    iss: Option<String>,
    #[serde(default)]
    iat: Option<i64>,
    #[serde(default)]
    jti: Option<String>,
    #[serde(default)]
    aud: Option<Audience>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Audience {
    One(String),
    Many(Vec<String>),
}

impl Audience {
    fn into_vec(self) -> Vec<String> {
        match self {
            Audience::One(aud) => vec![aud],
            Audience::Many(aud) => aud,
        }
    }
}

/// Claims read from an unverified JWT payload. Everything is optional and loosely typed.
#[derive(Debug, Default, Deserialize)]
struct JwtClaims {
    #[serde(default)]
    sub: Option<Value>,
    #[serde(default)]
    iss: Option<Value>,
    #[serde(default)]
    iat: Option<Value>,
    #[serde(default)]
    jti: Option<Value>,
    #[serde(default)]
    scope: Option<Value>,
    #[serde(default)]
    aud: Option<Value>,
}

/// Parse a 2xx token endpoint body received at `issue_date` (unix seconds).
pub fn parse_token_response(body: &str, issue_date: i64) -> Result<AccessTokenDetails, TokenError> {
    let response: TokenResponse = serde_json::from_str(body)
        .map_err(|e| TokenError::malformed(format!("cannot decode token response: {}", e), body))?;

    if response.access_token.trim().is_empty() {
        return Err(TokenError::malformed("access_token is empty", body));
    }

    let token_type = match response.token_type {
        Some(token_type) if token_type.eq_ignore_ascii_case(BEARER) => token_type,
        Some(token_type) => {
            return Err(TokenError::malformed(
                format!("unsupported token_type '{}'", token_type),
                body,
            ))
        }
        None => BEARER.to_owned(),
    };

    let claims = decode_jwt_claims(&response.access_token).unwrap_or_default();

    Ok(AccessTokenDetails {
        token_type,
        expires_in: response.expires_in,
        issue_date,
        scope: response.scope.or_else(|| claim_scope(claims.scope.as_ref())),
        subject: response.sub.or_else(|| claim_string(claims.sub.as_ref())),
        issuer: response.iss.or_else(|| claim_string(claims.iss.as_ref())),
        issued_at: response.iat.or_else(|| claims.iat.as_ref().and_then(Value::as_i64)),
        json_web_token_id: response.jti.or_else(|| claim_string(claims.jti.as_ref())),
        audience: response
            .aud
            .map(Audience::into_vec)
            .unwrap_or_else(|| claim_list(claims.aud.as_ref())),
        access_token: response.access_token,
    })
}

/// Best effort: opaque tokens and undecodable payloads yield `None`.
fn decode_jwt_claims(token: &str) -> Option<JwtClaims> {
    let mut parts = token.split('.');
    let (_, payload, _) = (parts.next()?, parts.next()?, parts.next()?);
    if parts.next().is_some() {
        return None;
    }

    let decoded = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .map_err(|e| debug!(error = %e, "access token payload is not base64url"))
        .ok()?;

    serde_json::from_slice::<JwtClaims>(&decoded)
        .map_err(|e| debug!(error = %e, "access token payload is not a JSON claim set"))
        .ok()
}

fn claim_string(value: Option<&Value>) -> Option<String> {
    value.and_then(Value::as_str).map(str::to_owned)
}

fn claim_list(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::String(single)) => vec![single.to_owned()],
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_owned)
            .collect(),
        _ => Vec::new(),
    }
}

/// `scope` claims come either space separated or as an array.
fn claim_scope(value: Option<&Value>) -> Option<String> {
    let scopes = claim_list(value);
    if scopes.is_empty() {
        None
    } else {
        Some(scopes.join(" "))
    }
}
