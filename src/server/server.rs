use anyhow::Result;
use axum::routing::get;
use axum::Router;
use tracing::info;

use crate::client::token_client::TokenClient;
use crate::config::settings::SettingsConfig;
use crate::observability::metrics::{get_metrics, Metrics};
use crate::observability::routes::MetricsState;
use crate::server::token_route::TokenState;

#[derive(Clone)]
pub struct AppState {
    pub metrics_state: MetricsState,
    pub token_state: TokenState,
}

impl AppState {
    pub fn new(
        metrics: &Metrics,
        client: TokenClient,
        settings_config: &SettingsConfig,
    ) -> Self {
        Self {
            metrics_state: MetricsState::new(metrics.registry.clone()),
            token_state: TokenState::new(client, settings_config.min_validity()),
        }
    }
}

pub fn router(state: AppState, settings_config: &SettingsConfig) -> Router {
    Router::new()
        .route("/healthz", get(|| async { "ok" }))
        .merge(state.token_state.router())
        .merge(state.metrics_state.router(&settings_config.metrics))
        .with_state(state)
}

/// Serve the token and metrics routes until the listener fails.
pub async fn start(settings_config: &SettingsConfig, client: TokenClient) -> Result<()> {
    let metrics = get_metrics().await;
    let state = AppState::new(metrics, client, settings_config);
    let app = router(state, settings_config);

    let bind_addr = format!("{}:{}", settings_config.server.host, settings_config.server.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("listening on {}", bind_addr);
    metrics.up.set(1);
    axum::serve(listener, app).await?;
    metrics.up.set(0);

    Ok(())
}
