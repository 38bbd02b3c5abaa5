use std::time::Duration;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use serde_json::json;
use tracing::info;

use crate::cache::token::AccessTokenDetails;
use crate::client::token_client::TokenClient;
use crate::server::server::AppState;

pub const TOKEN_PATH: &str = "/token";

#[derive(Clone)]
pub struct TokenState {
    client: TokenClient,
    min_validity: Duration,
}

impl TokenState {
    pub fn new(client: TokenClient, min_validity: Duration) -> Self {
        Self { client, min_validity }
    }

    pub fn router(&self) -> Router<AppState> {
        info!("served path: {}", TOKEN_PATH);
        Router::new().route(TOKEN_PATH, get(handle_token))
    }
}

#[derive(Serialize)]
struct TokenBody<'a> {
    #[serde(flatten)]
    details: &'a AccessTokenDetails,
    expires_at: i64,
}

async fn handle_token(State(state): State<AppState>) -> Response {
    let token_state = &state.token_state;
    match token_state.client.get_valid_token_for(token_state.min_validity).await {
        Ok(token) => {
            let body = TokenBody {
                details: &token,
                expires_at: token.expires_at(),
            };
            (StatusCode::OK, Json(body)).into_response()
        }
        Err(err) => (
            StatusCode::BAD_GATEWAY,
            Json(json!({ "error": err.kind().as_str(), "message": err.to_string() })),
        )
            .into_response(),
    }
}
