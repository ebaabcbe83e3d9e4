//! Server configuration loaded from environment variables.
//!
//! All settings have sensible defaults so the server can start with zero
//! configuration for local development.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use podium_shared::constants::{DEFAULT_HTTP_PORT, MAX_LIST_LIMIT};

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Socket address for the HTTP (axum) API server.
    /// Env: `HTTP_ADDR`
    /// Default: `0.0.0.0:8000`
    pub http_addr: SocketAddr,

    /// SQLite database file.
    /// Env: `DATABASE_PATH`
    /// Default: `./podium.db`
    pub database_path: PathBuf,

    /// Ed25519 public key of the token issuer (hex-encoded, 64 chars).
    /// Env: `TOKEN_PUBKEY`
    /// Default: all-zeros, which verifies no token (development only).
    pub token_pubkey: [u8; 32],

    /// Upper bound for the `limit` query parameter of the post listing.
    /// Env: `MAX_LIST_LIMIT`
    /// Default: `200`
    pub max_list_limit: u32,

    /// How long a statement waits on a locked database before failing.
    /// Env: `DB_BUSY_TIMEOUT_MS`
    /// Default: `5000`
    pub db_busy_timeout: Duration,

    /// Maximum accepted request body.
    /// Env: `MAX_BODY_BYTES`
    /// Default: 1 MiB
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: ([0, 0, 0, 0], DEFAULT_HTTP_PORT).into(),
            database_path: PathBuf::from("./podium.db"),
            token_pubkey: [0u8; 32],
            max_list_limit: MAX_LIST_LIMIT,
            db_busy_timeout: Duration::from_millis(5000),
            max_body_bytes: 1024 * 1024, // 1 MiB
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an injectable variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(addr) = lookup("HTTP_ADDR") {
            if let Ok(parsed) = addr.parse::<SocketAddr>() {
                config.http_addr = parsed;
            } else {
                tracing::warn!(
                    value = %addr,
                    "Invalid HTTP_ADDR, using default"
                );
            }
        }

        if let Some(path) = lookup("DATABASE_PATH") {
            config.database_path = PathBuf::from(path);
        }

        if let Some(hex_key) = lookup("TOKEN_PUBKEY") {
            match parse_hex_pubkey(&hex_key) {
                Ok(key) => config.token_pubkey = key,
                Err(e) => {
                    tracing::warn!(
                        error = %e,
                        "Invalid TOKEN_PUBKEY, using default (dev-only)"
                    );
                }
            }
        }

        if let Some(val) = lookup("MAX_LIST_LIMIT") {
            match val.parse::<u32>() {
                Ok(n) if n > 0 => config.max_list_limit = n,
                _ => tracing::warn!(value = %val, "Invalid MAX_LIST_LIMIT, using default"),
            }
        }

        if let Some(val) = lookup("DB_BUSY_TIMEOUT_MS") {
            match val.parse::<u64>() {
                Ok(ms) => config.db_busy_timeout = Duration::from_millis(ms),
                Err(_) => tracing::warn!(value = %val, "Invalid DB_BUSY_TIMEOUT_MS, using default"),
            }
        }

        if let Some(val) = lookup("MAX_BODY_BYTES") {
            match val.parse::<usize>() {
                Ok(n) if n > 0 => config.max_body_bytes = n,
                _ => tracing::warn!(value = %val, "Invalid MAX_BODY_BYTES, using default"),
            }
        }

        // RUST_LOG is handled directly by tracing-subscriber's EnvFilter,
        // so we do not store it here.

        config
    }
}

/// Parse a 64-character hex string into a 32-byte array.
fn parse_hex_pubkey(hex: &str) -> Result<[u8; 32], String> {
    let hex = hex.trim();
    if hex.len() != 64 {
        return Err(format!("expected 64 hex chars, got {}", hex.len()));
    }

    let bytes = hex::decode(hex).map_err(|e| format!("invalid hex: {e}"))?;
    let mut key = [0u8; 32];
    key.copy_from_slice(&bytes);
    Ok(key)
}
