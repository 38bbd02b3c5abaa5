//! HTTP transport used for the token exchange.
//!
//! The client only needs "POST a form, get status + headers + body back". Anything
//! able to do that can stand in for the default reqwest transport.

use std::future::Future;
use std::time::Duration;

use http::header::ACCEPT;
use http::{HeaderMap, HeaderValue, StatusCode};
use reqwest::{redirect, Client, Url};

use crate::utils::constants::{
    DEFAULT_CONNECT_TIMEOUT_MS, DEFAULT_READ_TIMEOUT_MS, DEFAULT_WRITE_TIMEOUT_MS,
};

pub type TransportError = Box<dyn std::error::Error + Send + Sync>;

/// Connect / write / read timeouts for a transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpTimeouts {
    pub connect: Duration,
    pub write: Duration,
    pub read: Duration,
}

impl Default for HttpTimeouts {
    fn default() -> Self {
        Self {
            connect: Duration::from_millis(DEFAULT_CONNECT_TIMEOUT_MS),
            write: Duration::from_millis(DEFAULT_WRITE_TIMEOUT_MS),
            read: Duration::from_millis(DEFAULT_READ_TIMEOUT_MS),
        }
    }
}

/// Form-encoded POST.
#[derive(Debug, Clone)]
pub struct FormRequest {
    pub url: Url,
    pub headers: HeaderMap,
    pub form: Vec<(String, String)>,
}

impl FormRequest {
    pub fn new(url: Url, form: Vec<(String, String)>) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        Self { url, headers, form }
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.form
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn content_type(&self) -> Option<&str> {
        self.headers
            .get(http::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
    }
}

pub trait HttpTransport: Send + Sync + 'static {
    /// Builds the transport used when none was injected.
    fn with_timeouts(timeouts: &HttpTimeouts) -> Result<Self, TransportError>
    where
        Self: Sized;

    fn post_form(
        &self,
        request: FormRequest,
    ) -> impl Future<Output = Result<HttpResponse, TransportError>> + Send;
}

#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// Wraps an existing client as is, redirect and timeout policy included.
    pub fn from_client(client: Client) -> Self {
        Self { client }
    }
}

impl HttpTransport for ReqwestTransport {
    fn with_timeouts(timeouts: &HttpTimeouts) -> Result<Self, TransportError> {
        // reqwest has no separate write timeout, it is folded into the total.
        let client = Client::builder()
            .redirect(redirect::Policy::none())
            .connect_timeout(timeouts.connect)
            .read_timeout(timeouts.read)
            .timeout(timeouts.connect + timeouts.write + timeouts.read)
            .build()?;
        Ok(Self { client })
    }

    async fn post_form(&self, request: FormRequest) -> Result<HttpResponse, TransportError> {
        let response = self
            .client
            .post(request.url)
            .headers(request.headers)
            .form(&request.form)
            .send()
            .await?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await?.to_vec();

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}
