//! # podium-server
//!
//! HTTP backend for the Podium content-sharing platform.
//!
//! This binary provides:
//! - **Post listing** with per-post rating rollups and the viewer's own rating
//! - **Half-point star ratings** with replace-on-revote semantics
//! - **User-to-user votes** (toggle) and per-candidate tallies
//! - **Profile statistics** (submissions, views, votes, derived score)
//! - **Ownership-checked post mutation** (update, status, delete)

mod api;
mod auth;
mod config;
mod error;

use std::sync::Arc;

use tracing::info;
use tracing_subscriber::EnvFilter;

use podium_shared::constants::APP_NAME;
use podium_store::Database;

use crate::api::AppState;
use crate::auth::SignedTokenVerifier;
use crate::config::ServerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // -----------------------------------------------------------------------
    // 1. Initialize tracing (respects RUST_LOG env var)
    // -----------------------------------------------------------------------
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,podium_server=debug")),
        )
        .init();

    info!("Starting {} server v{}", APP_NAME, env!("CARGO_PKG_VERSION"));

    // -----------------------------------------------------------------------
    // 2. Load configuration
    // -----------------------------------------------------------------------
    let config = ServerConfig::from_env();
    info!(?config, "Loaded configuration");
    if config.token_pubkey == [0u8; 32] {
        tracing::warn!("TOKEN_PUBKEY not set; every bearer token will be rejected");
    }

    // -----------------------------------------------------------------------
    // 3. Open the database (runs pending migrations)
    // -----------------------------------------------------------------------
    let db_path = config.database_path.clone();
    let busy_timeout = config.db_busy_timeout;
    let db = tokio::task::spawn_blocking(move || Database::open_at(&db_path, busy_timeout))
        .await??;
    info!(
        path = %config.database_path.display(),
        score_scheme = ?db.score_scheme(),
        "Database ready"
    );

    let verifier = Arc::new(SignedTokenVerifier::new(config.token_pubkey));
    let http_addr = config.http_addr;
    let app_state = AppState::new(db, verifier, config);

    // -----------------------------------------------------------------------
    // 4. Run the HTTP API server (blocks until shutdown)
    // -----------------------------------------------------------------------
    tokio::select! {
        result = api::serve(app_state, http_addr) => {
            if let Err(e) = result {
                tracing::error!(error = %e, "HTTP server failed");
                return Err(e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
    }

    Ok(())
}
