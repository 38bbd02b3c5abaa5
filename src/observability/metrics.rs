use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, IntGaugeVec, Opts, Registry};
use tracing::info;
use std::sync::Arc;
use tokio::sync::OnceCell;


// Declare the static OnceCell to hold the Metrics.
static METRICS_INSTANCE: OnceCell<Arc<Metrics>> = OnceCell::const_new();

/// Asynchronously initializes and gets a reference to the static `Metrics`.
pub async fn get_metrics() -> &'static Arc<Metrics> {
    METRICS_INSTANCE.get_or_init(|| async {
        info!("Initializing Metrics ...");
        // metric names and labels are static, construction cannot fail at runtime
        Arc::new(Metrics::new().expect("static metric definitions are valid"))
    }).await
}


#[derive(Clone)]
pub struct Metrics {
    pub registry: Registry,

    // Exchange metrics
    pub token_exchange_requests: IntCounterVec,
    pub token_exchange_failures: IntCounterVec,
    pub token_exchange_duration: HistogramVec,

    // Cache metrics
    pub token_cache_hits: IntCounterVec,
    pub token_expiry_unix: IntGaugeVec,

    // Config/runtime
    pub config_validation_errors: IntCounter,
    pub up: IntGauge,
}

impl Metrics {
    fn new() -> prometheus::Result<Self> {
        let registry = Registry::new_custom(Some("tokenclient".into()), None)?;

        let metrics = Self {
            // Exchange
            token_exchange_requests: IntCounterVec::new(Opts::new("token_exchange_requests_total", "Token exchanges started"), &["client"])?,
            token_exchange_failures: IntCounterVec::new(Opts::new("token_exchange_failures_total", "Token exchange failures by reason"), &["client", "reason"])?,
            token_exchange_duration: HistogramVec::new(HistogramOpts::new("token_exchange_duration_seconds", "Token exchange duration seconds").buckets(vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]), &["client"])?,

            // Cache
            token_cache_hits: IntCounterVec::new(Opts::new("token_cache_hits_total", "Requests served from the cached token"), &["client"])?,
            token_expiry_unix: IntGaugeVec::new(Opts::new("token_expiry_unix_seconds", "Expiry of the cached token"), &["client"])?,

            // Config/runtime
            config_validation_errors: IntCounter::new("config_validation_errors_total", "Validation errors during startup")?,
            up: IntGauge::new("up", "1 if service is healthy")?,

            registry,
        };

        // Register all metrics in the registry
        let reg = &metrics.registry;
        reg.register(Box::new(metrics.token_exchange_requests.clone()))?;
        reg.register(Box::new(metrics.token_exchange_failures.clone()))?;
        reg.register(Box::new(metrics.token_exchange_duration.clone()))?;
        reg.register(Box::new(metrics.token_cache_hits.clone()))?;
        reg.register(Box::new(metrics.token_expiry_unix.clone()))?;
        reg.register(Box::new(metrics.config_validation_errors.clone()))?;
        reg.register(Box::new(metrics.up.clone()))?;

        Ok(metrics)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prometheus::{Encoder, TextEncoder};

    #[tokio::test]
    async fn registry_exposes_prefixed_families() {
        let metrics = get_metrics().await;
        metrics.token_exchange_requests.with_label_values(&["metrics-test"]).inc();

        let mut buffer = Vec::new();
        TextEncoder::new()
            .encode(&metrics.registry.gather(), &mut buffer)
            .unwrap();
        let text = String::from_utf8(buffer).unwrap();
        assert!(text.contains("tokenclient_token_exchange_requests_total{client=\"metrics-test\"}"));
    }
}
