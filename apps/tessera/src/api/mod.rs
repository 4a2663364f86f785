//! # HTTP API Module
//!
//! Axum-based HTTP API for the Tessera document store.
//!
//! ## Endpoints
//!
//! - `GET /health` - Health check
//! - `GET /status` - Store status (counts, declared collections)
//! - `POST /schema` - Declare a collection schema
//! - `POST /document` - Insert a document
//! - `POST /fetch` - Fetch a document or collection (rule-gated)
//! - `POST /retract` - Tombstone a document
//!
//! ## Configuration
//!
//! - `TESSERA_API_KEY`: Optional API key for authentication
//! - `TESSERA_RATE_LIMIT`: Requests per second (default: 100)
//! - `TESSERA_CORS_ORIGINS`: Comma-separated allowed origins, or `*`

mod auth;
mod handlers;
mod middleware;
mod types;

pub use auth::ApiKey;
pub use middleware::Throttle;

// Re-exported for integration tests.
#[allow(unused_imports)]
pub use handlers::*;
#[allow(unused_imports)]
pub use types::*;

use axum::{
    Router,
    http::{HeaderValue, Method, header},
    routing::{get, post},
};
use std::sync::Arc;
use tessera_core::{Session, TesseraError};
use tokio::sync::RwLock;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

// =============================================================================
// APPLICATION STATE
// =============================================================================

/// Shared application state.
///
/// The session holds the triple log, declared schemas, and connection-scoped
/// variables; handlers take a read or write lock as needed.
#[derive(Clone)]
pub struct AppState {
    pub session: Arc<RwLock<Session>>,
}

impl AppState {
    pub fn new(session: Session) -> Self {
        Self {
            session: Arc::new(RwLock::new(session)),
        }
    }
}

// =============================================================================
// ROUTER
// =============================================================================

/// Build the CORS layer from environment configuration.
///
/// - `TESSERA_CORS_ORIGINS=*` allows any origin (logged as a warning)
/// - `TESSERA_CORS_ORIGINS=a,b` allows the listed origins
/// - unset falls back to localhost development origins
fn build_cors_layer() -> CorsLayer {
    match std::env::var("TESSERA_CORS_ORIGINS") {
        Ok(origins) if origins == "*" => {
            tracing::warn!("CORS configured to allow all origins");
            CorsLayer::permissive()
        }
        Ok(origins) => {
            let parsed: Vec<HeaderValue> = origins
                .split(',')
                .filter_map(|o| o.trim().parse().ok())
                .collect();
            if parsed.is_empty() {
                tracing::warn!("TESSERA_CORS_ORIGINS contained no valid origins, using localhost");
                build_localhost_cors()
            } else {
                CorsLayer::new()
                    .allow_origin(parsed)
                    .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
                    .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
            }
        }
        Err(_) => build_localhost_cors(),
    }
}

/// Default CORS configuration for local development.
fn build_localhost_cors() -> CorsLayer {
    let origins: Vec<HeaderValue> = [
        "http://localhost:3000",
        "http://localhost:8080",
        "http://127.0.0.1:3000",
        "http://127.0.0.1:8080",
    ]
    .iter()
    .filter_map(|o| o.parse().ok())
    .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}

/// Create the API router with all endpoints.
pub fn create_router(state: AppState) -> Router {
    let mut router = Router::new()
        .route("/health", get(handlers::health_handler))
        .route("/status", get(handlers::status_handler))
        .route("/schema", post(handlers::schema_handler))
        .route("/document", post(handlers::document_handler))
        .route("/fetch", post(handlers::fetch_handler))
        .route("/retract", post(handlers::retract_handler));

    // Apply authentication middleware if API key is configured
    match ApiKey::from_env() {
        Some(key) => {
            tracing::info!("API key authentication enabled");
            router = router.layer(axum::middleware::from_fn_with_state(
                key,
                auth::require_api_key,
            ));
        }
        None => {
            tracing::warn!("API key authentication disabled (TESSERA_API_KEY not set)");
        }
    }

    // Apply rate limiting
    let throttle = Throttle::from_env();
    tracing::info!(
        requests_per_second = throttle.per_second(),
        "Rate limiting enabled"
    );
    router = router.layer(axum::middleware::from_fn_with_state(
        throttle,
        middleware::throttle_requests,
    ));

    router
        .layer(axum::extract::DefaultBodyLimit::max(2 * 1024 * 1024))
        .layer(build_cors_layer())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// =============================================================================
// SERVER
// =============================================================================

/// Run the API server on the given address.
pub async fn run_server(addr: &str, session: Session) -> Result<(), TesseraError> {
    let state = AppState::new(session);
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| TesseraError::IoError(format!("Failed to bind {}: {}", addr, e)))?;

    tracing::info!("API server listening on {}", addr);

    axum::serve(listener, app)
        .await
        .map_err(|e| TesseraError::IoError(e.to_string()))?;

    Ok(())
}
