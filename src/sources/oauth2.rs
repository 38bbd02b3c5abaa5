use tracing::{debug, warn};

use crate::cache::token::AccessTokenDetails;
use crate::client::builder::TokenClientConfig;
use crate::error::TokenError;
use crate::helpers::time::Clock;
use crate::parser::parser::parse_token_response;
use crate::sources::transport::{FormRequest, HttpTransport};
use crate::utils::constants::SCOPE;

/// Performs one `client_credentials` exchange. No retries.
pub async fn exchange<H: HttpTransport>(
    config: &TokenClientConfig,
    http_client: &H,
    clock: &dyn Clock,
) -> Result<AccessTokenDetails, TokenError> {
    let request = FormRequest::new(config.endpoint().clone(), config.form_params());
    debug!(
        endpoint = %config.endpoint(),
        client_id = config.client_id(),
        scope = request.param(SCOPE).unwrap_or_default(),
        "requesting client_credentials token"
    );

    let response = http_client
        .post_form(request)
        .await
        .map_err(|e| TokenError::transport(config.endpoint().as_str(), e))?;
    let received_at = clock.now();

    let body = response.body_text();
    if !response.status.is_success() {
        return Err(TokenError::rejected(response.status, &body));
    }

    if let Some(content_type) = response.content_type().filter(|ct| !ct.contains("json")) {
        warn!(content_type, "token endpoint answered without a JSON content type");
    }

    let details = parse_token_response(&body, received_at.timestamp())?;
    if details.is_expired_at(received_at) {
        return Err(TokenError::malformed(
            format!("issued token is already expired (expires_in = {})", details.expires_in()),
            &body,
        ));
    }
    Ok(details)
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use http::{HeaderMap, HeaderValue, StatusCode};

    use super::*;
    use crate::client::token_client::TokenClient;
    use crate::error::TokenErrorKind;
    use crate::helpers::time::ManualClock;
    use crate::sources::transport::{HttpResponse, HttpTimeouts, TransportError};

    const NOW: i64 = 1_504_083_931;

    /// Replays one canned outcome and remembers the last request.
    #[derive(Default)]
    struct CannedTransport {
        status: Option<StatusCode>,
        content_type: &'static str,
        body: &'static str,
        seen: Mutex<Option<FormRequest>>,
    }

    impl CannedTransport {
        fn answering(status: StatusCode, content_type: &'static str, body: &'static str) -> Self {
            Self {
                status: Some(status),
                content_type,
                body,
                seen: Mutex::new(None),
            }
        }
    }

    impl HttpTransport for CannedTransport {
        fn with_timeouts(_: &HttpTimeouts) -> Result<Self, TransportError> {
            Ok(Self::default())
        }

        async fn post_form(&self, request: FormRequest) -> Result<HttpResponse, TransportError> {
            *self.seen.lock().unwrap() = Some(request);
            let status = self.status.ok_or("connection refused")?;
            let mut headers = HeaderMap::new();
            headers.insert(
                http::header::CONTENT_TYPE,
                HeaderValue::from_static(self.content_type),
            );
            Ok(HttpResponse {
                status,
                headers,
                body: self.body.as_bytes().to_vec(),
            })
        }
    }

    fn config() -> TokenClientConfig {
        TokenClient::builder()
            .endpoint("http://localhost:8089/oauth/token")
            .credentials("client", "secret")
            .scope("read")
            .http_client(CannedTransport::default())
            .build()
            .unwrap()
            .config()
            .clone()
    }

    async fn run(transport: CannedTransport) -> (Result<AccessTokenDetails, TokenError>, Option<FormRequest>) {
        let result = exchange(&config(), &transport, &ManualClock::at_unix(NOW)).await;
        let seen = transport.seen.lock().unwrap().take();
        (result, seen)
    }

    #[tokio::test]
    async fn success_records_local_receipt_time() {
        let (result, seen) = run(CannedTransport::answering(
            StatusCode::OK,
            "application/json",
            r#"{"access_token":"abc","token_type":"bearer","expires_in":1799,"iat":1}"#,
        ))
        .await;

        let details = result.unwrap();
        assert_eq!(details.issue_date(), NOW);
        assert_eq!(details.issued_at(), Some(1));
        assert_eq!(details.expires_at(), NOW + 1799);

        let request = seen.unwrap();
        assert_eq!(request.url.as_str(), "http://localhost:8089/oauth/token");
        assert_eq!(request.headers.get(http::header::ACCEPT).unwrap(), "application/json");
        assert_eq!(request.param("grant_type"), Some("client_credentials"));
        assert_eq!(request.param("client_id"), Some("client"));
        assert_eq!(request.param("client_secret"), Some("secret"));
        assert_eq!(request.param("scope"), Some("read"));
    }

    #[tokio::test]
    async fn non_success_status_is_rejection_whatever_the_body() {
        let (result, _) = run(CannedTransport::answering(
            StatusCode::UNAUTHORIZED,
            "application/json",
            r#"{"access_token":"abc","token_type":"bearer","expires_in":"tomorrow"}"#,
        ))
        .await;
        assert_eq!(result.unwrap_err().kind(), TokenErrorKind::Rejected);
    }

    #[tokio::test]
    async fn html_success_is_malformed() {
        let (result, _) = run(CannedTransport::answering(
            StatusCode::OK,
            "application/html",
            "<html>Oops, no JSON here</html>",
        ))
        .await;
        let err = result.unwrap_err();
        assert_eq!(err.kind(), TokenErrorKind::Malformed);
        assert_eq!(err.body(), Some("<html>Oops, no JSON here</html>"));
    }

    #[tokio::test]
    async fn zero_lifetime_is_already_expired() {
        let (result, _) = run(CannedTransport::answering(
            StatusCode::OK,
            "application/json",
            r#"{"access_token":"abc","expires_in":0}"#,
        ))
        .await;
        let err = result.unwrap_err();
        assert_eq!(err.kind(), TokenErrorKind::Malformed);
        assert!(err.to_string().contains("already expired"));
    }

    #[tokio::test]
    async fn transport_failure_is_transport_error() {
        let (result, seen) = run(CannedTransport::default()).await;
        let err = result.unwrap_err();
        assert_eq!(err.kind(), TokenErrorKind::Transport);
        assert!(err.to_string().contains("connection refused"));
        assert!(seen.is_some());
    }
}
