use axum::{Json, Router, extract::State, routing::get};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;

use crate::LivenessState;

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    started_at: DateTime<Utc>,
    uptime_secs: i64,
}

#[derive(Serialize)]
struct VersionResponse {
    name: &'static str,
    version: &'static str,
}

async fn health_check(State(state): State<Arc<LivenessState>>) -> Json<HealthResponse> {
    let uptime = Utc::now() - state.started_at;

    Json(HealthResponse {
        status: "ok",
        started_at: state.started_at,
        uptime_secs: uptime.num_seconds().max(0),
    })
}

async fn version() -> Json<VersionResponse> {
    Json(VersionResponse {
        name: "rallybot",
        version: env!("CARGO_PKG_VERSION"),
    })
}

pub fn routes() -> Router<Arc<LivenessState>> {
    Router::new()
        .route("/health", get(health_check))
        .route("/version", get(version))
}
