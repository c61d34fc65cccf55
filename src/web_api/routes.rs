//! API Routes

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use futures::{SinkExt, StreamExt};
use std::time::Duration;

use crate::capture_scheduler::SchedulerConfig;
use crate::error::SchedulerError;
use crate::realtime_hub::{ClientCommand, HistoryMessage, HubMessage, ViewerCountMessage};
use crate::state::AppState;

/// Create API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(super::health_check))
        .route("/api/history", get(get_history))
        .route("/api/scheduler", get(get_scheduler_state))
        .route("/ws", get(websocket_handler))
        .with_state(state)
}

/// GET /api/history - full analysis history
async fn get_history(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.response_log.all().await)
}

/// GET /api/scheduler - scheduler state
async fn get_scheduler_state(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.scheduler.state().await)
}

// ========================================
// WebSocket Handler
// ========================================

/// WebSocket upgrade handler
async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_websocket(socket, state))
}

/// Handle one viewer connection
async fn handle_websocket(socket: WebSocket, state: AppState) {
    let (mut sender, mut receiver) = socket.split();

    let (conn_id, mut rx) = state.hub.register().await;
    let count = state.sessions.on_connect();
    state
        .hub
        .broadcast(HubMessage::ViewerCount(ViewerCountMessage { count }))
        .await;

    // Replay history and scheduler state to the new viewer only
    state
        .hub
        .send_to(
            &conn_id,
            HubMessage::History(HistoryMessage {
                records: state.response_log.all().await,
            }),
        )
        .await;
    state
        .hub
        .send_to(
            &conn_id,
            HubMessage::SchedulerState(state.scheduler.state().await),
        )
        .await;

    // Forward hub messages to the socket
    let mut send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if sender.send(Message::Text(msg)).await.is_err() {
                break;
            }
        }
    });

    // Read and dispatch client commands
    let dispatch_state = state.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(result) = receiver.next().await {
            match result {
                Ok(Message::Text(text)) => match serde_json::from_str::<ClientCommand>(&text) {
                    Ok(cmd) => dispatch(&dispatch_state, cmd).await,
                    Err(e) => {
                        tracing::warn!(error = %e, raw = %text, "Unparseable client command");
                    }
                },
                Ok(Message::Close(_)) => break,
                Err(e) => {
                    tracing::warn!(connection_id = %conn_id, error = %e, "WebSocket error");
                    break;
                }
                _ => {}
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    state.hub.unregister(&conn_id).await;
    let count = state.sessions.on_disconnect();
    state
        .hub
        .broadcast(HubMessage::ViewerCount(ViewerCountMessage { count }))
        .await;
}

/// Dispatch one client command
async fn dispatch(state: &AppState, cmd: ClientCommand) {
    match cmd {
        ClientCommand::StartStream => {
            if let Err(e) = state.broadcaster.start().await {
                tracing::error!(error = %e, "Failed to start stream");
                state
                    .hub
                    .status(format!("Failed to start camera: {e}"))
                    .await;
            }
        }
        ClientCommand::StopStream => {
            state.broadcaster.stop().await;
        }
        ClientCommand::StartScheduler {
            interval_secs,
            prompt,
            model,
        } => {
            if interval_secs == 0 {
                state.hub.status("Interval must be at least 1 second").await;
                return;
            }
            let config = SchedulerConfig {
                interval: Duration::from_secs(interval_secs),
                prompt,
                model: model.unwrap_or_else(|| state.config.analysis_model.clone()),
            };
            // AlreadyRunning is a benign no-op
            if let Err(SchedulerError::AlreadyRunning) = state.scheduler.start(config).await {
                tracing::debug!("start-scheduler ignored, already running");
            }
        }
        ClientCommand::StopScheduler => {
            state.scheduler.stop().await;
        }
        ClientCommand::ManualCapture { prompt, model } => {
            // Failure is already reported as a status event
            if let Err(e) = state.manual.capture(prompt, model).await {
                tracing::warn!(error = %e, "Manual capture rejected");
            }
        }
        ClientCommand::ClearHistory => {
            state.response_log.clear().await;
            state.hub.broadcast(HubMessage::HistoryCleared).await;
        }
    }
}
