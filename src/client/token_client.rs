use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt, Shared};
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::cache::token::AccessTokenDetails;
use crate::cache::token_cache::TokenCache;
use crate::client::builder::{TokenClientBuilder, TokenClientConfig};
use crate::error::{TokenError, TokenErrorKind};
use crate::helpers::time::{get_instant, Clock};
use crate::observability::metrics::get_metrics;
use crate::sources::oauth2::exchange;
use crate::sources::transport::{HttpTransport, ReqwestTransport};

type ExchangeResult = Result<Arc<AccessTokenDetails>, TokenError>;
type InFlight = Shared<BoxFuture<'static, ExchangeResult>>;

/// Client-credentials token client.
///
/// Keeps the last issued token and hands it out while it is valid for the
/// requested horizon. When it is not, one exchange runs and every caller that
/// shows up meanwhile waits for that same exchange. Clones share cache and
/// in-flight state.
pub struct TokenClient<H = ReqwestTransport> {
    inner: Arc<Inner<H>>,
}

struct Inner<H> {
    config: TokenClientConfig,
    http_client: H,
    clock: Arc<dyn Clock>,
    cache: TokenCache,
    // Some only while an exchange is running.
    in_flight: Mutex<Option<InFlight>>,
}

impl TokenClient<ReqwestTransport> {
    pub fn builder() -> TokenClientBuilder<ReqwestTransport> {
        TokenClientBuilder::new()
    }
}

impl<H> Clone for TokenClient<H> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<H> fmt::Debug for TokenClient<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenClient")
            .field("config", &self.inner.config)
            .field("clock", &self.inner.clock)
            .field("cached", &self.inner.cache.get())
            .finish()
    }
}

impl<H: HttpTransport> TokenClient<H> {
    pub(crate) fn from_parts(config: TokenClientConfig, http_client: H, clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                http_client,
                clock,
                cache: TokenCache::new(),
                in_flight: Mutex::new(None),
            }),
        }
    }

    pub fn config(&self) -> &TokenClientConfig {
        &self.inner.config
    }

    /// Last token obtained, whether or not it is still valid.
    pub fn cached_token(&self) -> Option<Arc<AccessTokenDetails>> {
        self.inner.cache.get()
    }

    /// Whether the cached token is still valid `duration` from now. Never does I/O.
    pub fn is_token_valid_for(&self, duration: Duration) -> bool {
        self.inner.cached_valid_for(duration).is_some()
    }

    #[cfg(test)]
    pub(crate) fn shared_count(&self) -> usize {
        Arc::strong_count(&self.inner)
    }

    /// A token that has not expired yet.
    pub async fn get_valid_token(&self) -> ExchangeResult {
        self.get_valid_token_for(Duration::ZERO).await
    }

    /// A token valid for at least `min_validity`, exchanging credentials if the
    /// cached one falls short.
    pub async fn get_valid_token_for(&self, min_validity: Duration) -> ExchangeResult {
        if let Some(token) = self.inner.cache_hit(min_validity).await {
            return Ok(token);
        }

        let flight = {
            let mut in_flight = self.inner.in_flight.lock().await;

            // an exchange may have completed while we waited for the lock
            if let Some(token) = self.inner.cache_hit(min_validity).await {
                return Ok(token);
            }

            match in_flight.as_ref() {
                Some(flight) => {
                    debug!(client_id = self.inner.config.client_id(), "joining token exchange in flight");
                    flight.clone()
                }
                None => {
                    let flight = Inner::spawn_refresh(&self.inner);
                    *in_flight = Some(flight.clone());
                    flight
                }
            }
        };

        flight.await
    }
}

impl<H: HttpTransport> Inner<H> {
    fn cached_valid_for(&self, min_validity: Duration) -> Option<Arc<AccessTokenDetails>> {
        self.cache.get_valid_for(self.clock.now(), min_validity)
    }

    async fn cache_hit(&self, min_validity: Duration) -> Option<Arc<AccessTokenDetails>> {
        let token = self.cached_valid_for(min_validity)?;
        get_metrics()
            .await
            .token_cache_hits
            .with_label_values(&[self.config.client_id()])
            .inc();
        debug!(
            client_id = self.config.client_id(),
            expires_at = token.expires_at(),
            "reusing cached token"
        );
        Some(token)
    }

    /// Starts the exchange on its own task so it completes even when every
    /// waiter goes away. Waiters share the task's outcome.
    fn spawn_refresh(this: &Arc<Self>) -> InFlight {
        let inner = Arc::clone(this);
        let task = tokio::spawn(async move { inner.refresh().await });

        // Weak: the slot holding this future must not keep the client alive.
        let weak = Arc::downgrade(this);
        async move {
            match task.await {
                Ok(result) => result,
                Err(join_err) => {
                    let endpoint = match weak.upgrade() {
                        Some(inner) => {
                            // refresh never reached its own cleanup
                            inner.in_flight.lock().await.take();
                            inner.config.endpoint().to_string()
                        }
                        None => String::new(),
                    };
                    error!(error = %join_err, "token exchange task did not complete");
                    Err(TokenError::transport(endpoint, Box::new(join_err)))
                }
            }
        }
        .boxed()
        .shared()
    }

    /// Runs one exchange, stores a successful result, then clears the in-flight
    /// slot. The cache is written first so later callers find the new token.
    async fn refresh(&self) -> ExchangeResult {
        let metrics = get_metrics().await;
        let client_id = self.config.client_id();
        let start = get_instant();
        metrics
            .token_exchange_requests
            .with_label_values(&[client_id])
            .inc();

        let result = exchange(&self.config, &self.http_client, self.clock.as_ref())
            .await
            .map(Arc::new);

        metrics
            .token_exchange_duration
            .with_label_values(&[client_id])
            .observe(start.elapsed().as_secs_f64());

        match &result {
            Ok(token) => {
                self.cache.set(Arc::clone(token));
                metrics
                    .token_expiry_unix
                    .with_label_values(&[client_id])
                    .set(token.expires_at());
                info!(
                    client_id,
                    expires_in = token.expires_in(),
                    expires_at = token.expires_at(),
                    scope = token.scope().unwrap_or_default(),
                    "obtained access token"
                );
            }
            Err(err) => {
                metrics
                    .token_exchange_failures
                    .with_label_values(&[client_id, err.kind().as_str()])
                    .inc();
                match err.kind() {
                    TokenErrorKind::Transport => error!(client_id, error = %err, "token exchange failed"),
                    _ => warn!(client_id, error = %err, body = err.body().unwrap_or_default(), "token exchange failed"),
                }
            }
        }

        self.in_flight.lock().await.take();
        result
    }
}
