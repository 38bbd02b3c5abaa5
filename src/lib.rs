//! # OAuth2 Client-Credentials Token Client
//!
//! Obtains bearer tokens with the `client_credentials` grant, keeps the most
//! recent one, and refreshes it lazily when callers need a token that stays
//! valid longer than the cached one does. Concurrent callers share a single
//! exchange.
//!
//! Modules:
//! - `client`: `TokenClient` and its builder
//! - `cache`: `AccessTokenDetails` and the single-slot token cache
//! - `sources`: the token exchange and the pluggable HTTP transport
//! - `parser`: strict decoding of token endpoint responses
//! - `config`, `server`, `observability`, `utils`: the standalone token service

pub mod cache;
pub mod client;
pub mod config;
pub mod error;
pub mod helpers;
pub mod observability;
pub mod parser;
pub mod server;
pub mod sources;
pub mod utils;

#[cfg(test)]
mod tests;

pub use crate::cache::token::AccessTokenDetails;
pub use crate::client::builder::{TokenClientBuilder, TokenClientConfig};
pub use crate::client::token_client::TokenClient;
pub use crate::config::client::ServiceConfig;
pub use crate::error::{TokenError, TokenErrorKind};
pub use crate::helpers::time::{Clock, ManualClock, SystemClock};
pub use crate::sources::transport::{FormRequest, HttpResponse, HttpTimeouts, HttpTransport, ReqwestTransport};
