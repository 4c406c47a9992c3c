//! API server initialization

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::get;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use super::auth::AuthGate;
use super::routes::{health, tools};
use super::types::ApiError;
use crate::core::ShutdownService;
use crate::core::config::ServerConfig;
use crate::core::constants::DEFAULT_BODY_LIMIT;

pub struct ApiServer {
    config: ServerConfig,
    gate: Arc<AuthGate>,
    shutdown: ShutdownService,
}

impl ApiServer {
    pub fn new(config: ServerConfig, gate: Arc<AuthGate>, shutdown: ShutdownService) -> Self {
        Self {
            config,
            gate,
            shutdown,
        }
    }

    /// Serve until the shutdown signal fires
    pub async fn start(self) -> Result<()> {
        let Self {
            config,
            gate,
            shutdown,
        } = self;

        let addr = SocketAddr::new(
            config
                .host
                .parse()
                .with_context(|| format!("Invalid server host: {}", config.host))?,
            config.port,
        );

        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("Failed to bind {}", addr))?;
        tracing::info!(%addr, auth_enabled = gate.is_enabled(), "Server listening");

        axum::serve(
            listener,
            router(gate).into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown.wait())
        .await?;

        tracing::debug!("Server stopped");
        Ok(())
    }
}

/// Build the full HTTP router
pub fn router(gate: Arc<AuthGate>) -> Router {
    Router::new()
        .route("/api/v1/health", get(health::health))
        .nest("/api/v1/tools", tools::routes(gate))
        .fallback(handle_404)
        .layer(TraceLayer::new_for_http())
        .layer(DefaultBodyLimit::max(DEFAULT_BODY_LIMIT))
}

async fn handle_404() -> ApiError {
    ApiError::not_found("NOT_FOUND", "No such endpoint")
}
