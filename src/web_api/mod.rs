//! WebAPI - HTTP and WebSocket Endpoints
//!
//! ## Responsibilities
//!
//! - Route registration
//! - WebSocket lifecycle and command dispatch
//! - Health and history REST endpoints

mod routes;

pub use routes::create_router;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;

use crate::state::AppState;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub camera_open: bool,
    pub streaming: bool,
    pub scheduler_running: bool,
    pub viewer_count: u64,
    pub analysis_service_ok: bool,
}

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let analysis_ok = state.ai_client.health_check().await;

    let response = HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        camera_open: state.frame_source.is_open(),
        streaming: state.broadcaster.is_streaming(),
        scheduler_running: state.scheduler.is_running().await,
        viewer_count: state.sessions.count(),
        analysis_service_ok: analysis_ok,
    };

    Json(response)
}
