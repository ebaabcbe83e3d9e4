use std::sync::{Arc, Mutex};

use axum::{
    async_trait,
    extract::{rejection::JsonRejection, DefaultBodyLimit, FromRequest, Request},
    http::Method,
    routing::{delete, get, post},
    Json, Router,
};
use serde::{de::DeserializeOwned, Deserialize, Deserializer, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use podium_store::Database;

use crate::auth::IdentityVerifier;
use crate::config::ServerConfig;
use crate::error::ApiError;

mod posts;
mod users;

#[cfg(test)]
mod tests;

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Mutex<Database>>,
    pub verifier: Arc<dyn IdentityVerifier>,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    pub fn new(db: Database, verifier: Arc<dyn IdentityVerifier>, config: ServerConfig) -> Self {
        Self {
            db: Arc::new(Mutex::new(db)),
            verifier,
            config: Arc::new(config),
        }
    }

    /// Run `f` against the database on the blocking pool.
    ///
    /// rusqlite calls block, so they never run on an async worker thread.
    pub async fn run_db<T, F>(&self, f: F) -> Result<T, ApiError>
    where
        F: FnOnce(&mut Database) -> Result<T, ApiError> + Send + 'static,
        T: Send + 'static,
    {
        let db = Arc::clone(&self.db);
        tokio::task::spawn_blocking(move || {
            let mut guard = db
                .lock()
                .map_err(|_| ApiError::Storage("database mutex poisoned".into()))?;
            f(&mut guard)
        })
        .await
        .map_err(|e| ApiError::Storage(format!("database task failed: {e}")))?
    }
}

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers(Any);

    let body_limit = state.config.max_body_bytes;

    Router::new()
        .route("/health", get(health_check))
        .route("/api/posts", get(posts::list_posts).post(posts::create_post))
        .route("/api/posts/update", post(posts::update_post))
        .route("/api/posts/status", post(posts::update_status))
        .route("/api/posts/view", post(posts::increment_views))
        .route("/api/posts/vote", post(posts::submit_rating))
        .route("/api/posts/:id", delete(posts::delete_post))
        .route(
            "/api/users/profile",
            get(users::get_profile).post(users::update_profile),
        )
        .route("/api/users/vote", post(users::toggle_vote))
        .route("/api/users/votes", get(users::list_votes))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// JSON body extractor whose rejections use the API's error shape.
pub struct ApiJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(ApiJson(value)),
            Err(rejection) => Err(json_rejection(rejection)),
        }
    }
}

fn json_rejection(rejection: JsonRejection) -> ApiError {
    ApiError::InvalidInput(format!("Invalid input: {}", rejection.body_text()))
}

/// Distinguishes an absent field (`None`) from an explicit `null`
/// (`Some(None)`).  Use with `#[serde(default)]`.
pub(crate) fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

pub async fn serve(state: AppState, addr: std::net::SocketAddr) -> anyhow::Result<()> {
    let app = build_router(state);

    info!(addr = %addr, "Starting HTTP API server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
