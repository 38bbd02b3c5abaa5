//! Shared constants and invariants

pub const DEFAULT_MIN_VALIDITY_SECS: u64 = 60;

// Default transport timeouts
pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 10_000;
pub const DEFAULT_WRITE_TIMEOUT_MS: u64 = 10_000;
pub const DEFAULT_READ_TIMEOUT_MS: u64 = 30_000;

// client_credentials form parameters
pub const GRANT_TYPE: &str = "grant_type";
pub const CLIENT_CREDENTIALS: &str = "client_credentials";
pub const CLIENT_ID: &str = "client_id";
pub const CLIENT_SECRET: &str = "client_secret";
pub const SCOPE: &str = "scope";
