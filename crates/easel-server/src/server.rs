use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use easel_pipeline::{Coordinator, SessionRegistry};

use crate::handlers;

/// Server configuration.
pub struct ServerConfig {
    pub port: u16,
    pub keep_alive_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8090,
            keep_alive_secs: 15,
        }
    }
}

/// Shared application state passed to Axum handlers.
#[derive(Clone)]
pub struct AppState {
    pub coordinator: Arc<Coordinator>,
    pub registry: Arc<SessionRegistry>,
    pub keep_alive_secs: u64,
}

/// Build the Axum router with all routes.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/generation/slides", post(handlers::generate))
        .route("/api/generation/progress/{session_id}", get(handlers::progress))
        .route("/api/generation/status", get(handlers::status))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Create and start the server. Returns a handle that keeps it alive.
pub async fn start(config: ServerConfig, coordinator: Arc<Coordinator>) -> Result<ServerHandle, std::io::Error> {
    let registry = Arc::clone(coordinator.registry());
    let state = AppState {
        coordinator,
        registry,
        keep_alive_secs: config.keep_alive_secs,
    };

    let router = build_router(state);
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    let local_addr = listener.local_addr()?;

    tracing::info!(port = local_addr.port(), "Easel server started");

    let server_handle = tokio::spawn(async move {
        axum::serve(listener, router).await.ok();
    });

    Ok(ServerHandle {
        port: local_addr.port(),
        _server: server_handle,
    })
}

/// Handle returned by `start()`; dropping it does not stop the server.
pub struct ServerHandle {
    pub port: u16,
    _server: tokio::task::JoinHandle<()>,
}
