//! HTTP API gateway for Banter.
//!
//! Exposes the chat and session endpoints under `/api` plus a `/health`
//! probe. Built on Axum; handlers live in [`api`].

pub mod api;

use axum::extract::DefaultBodyLimit;
use axum::http::{HeaderValue, Method, header};
use axum::{Router, response::Json, routing::get};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing::{info, warn};

use banter_agent::ChatOrchestrator;
use banter_config::{AppConfig, GatewayConfig};
use banter_core::engine::ChatEngine;
use banter_core::error::{Error, Result};
use banter_core::store::SessionStore;
use banter_memory::SqliteSessionStore;

/// Shared application state for the gateway.
pub struct AppState {
    pub orchestrator: Arc<ChatOrchestrator>,
    pub store: Arc<dyn SessionStore>,
}

impl AppState {
    pub fn new(orchestrator: Arc<ChatOrchestrator>) -> Self {
        let store = orchestrator.store().clone();
        Self {
            orchestrator,
            store,
        }
    }
}

pub type SharedState = Arc<AppState>;

/// Build the full router.
///
/// Layers applied:
/// - CORS (any origin unless `cors_allowed_origins` is set)
/// - Request body size limit (`max_body_bytes`)
/// - HTTP trace logging
pub fn build_router(state: SharedState, config: &GatewayConfig) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .nest("/api", api::api_router(state))
        .layer(DefaultBodyLimit::max(config.max_body_bytes))
        .layer(cors_layer(&config.cors_allowed_origins))
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE]);

    if allowed_origins.is_empty() {
        return cors.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    cors.allow_origin(AllowOrigin::list(origins))
}

/// Start the gateway HTTP server.
///
/// Opens the session store and the engine client once, then serves until
/// Ctrl-C. Missing credentials fail before the port is bound.
pub async fn start(config: AppConfig) -> Result<()> {
    let engine = banter_providers::build_from_config(&config)?;
    let store: Arc<dyn SessionStore> = Arc::new(
        SqliteSessionStore::new(&config.database.path, config.database.max_connections).await?,
    );
    let orchestrator = Arc::new(ChatOrchestrator::new(engine, store, config.token_limit));

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| Error::Config {
            message: format!("cannot bind {addr}: {e}"),
        })?;
    info!(
        addr = %addr,
        model = orchestrator.engine().model(),
        token_limit = orchestrator.token_limit(),
        "Banter gateway listening"
    );

    let state = Arc::new(AppState::new(orchestrator));
    let app = build_router(state, &config.gateway);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| Error::Internal(format!("server error: {e}")))?;

    info!("Gateway stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}
