//! # Rallybot Liveness API
//!
//! A small HTTP server that lets a process supervisor or container orchestrator
//! check that the bot process is up. It carries no rally state.

/// Configuration module for the liveness server
pub mod config;
/// Route definitions
pub mod routes;

use std::sync::Arc;

use axum::Router;
use chrono::{DateTime, Utc};
use eyre::Result;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Shared state for the liveness routes
pub struct LivenessState {
    /// When the process started serving
    pub started_at: DateTime<Utc>,
}

/// Build the liveness router
pub fn app(state: Arc<LivenessState>) -> Router {
    Router::new()
        .merge(routes::health::routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Starts the liveness server if a port is configured
///
/// # Arguments
///
/// * `config` - Host and optional port to bind to
///
/// # Returns
///
/// * `Ok(())` immediately when disabled, otherwise when the server stops
/// * `Err` if the address can't be bound or serving fails
pub async fn start_server(config: config::HealthConfig) -> Result<()> {
    let Some(addr) = config.server_addr() else {
        info!("HEALTH_PORT not set, liveness server disabled");
        return Ok(());
    };

    let state = Arc::new(LivenessState {
        started_at: Utc::now(),
    });

    let listener = TcpListener::bind(&addr).await?;
    info!("Liveness server listening on http://{}", addr);
    axum::serve(listener, app(state)).await?;

    Ok(())
}
