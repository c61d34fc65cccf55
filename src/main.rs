//! camwatch - Single-Camera Web Monitor
//!
//! Main entry point: builds the component graph, registers routes and serves
//! the web front-end.

use camwatch::{
    ai_client::AiClient,
    analysis_pipeline::AnalysisPipeline,
    capture_scheduler::CaptureScheduler,
    frame_source::FrameSource,
    manual_capture::ManualCaptureHandler,
    realtime_hub::RealtimeHub,
    response_log::ResponseLog,
    session_registry::SessionRegistry,
    snapshot_store::SnapshotStore,
    state::{AppConfig, AppState},
    stream_broadcaster::StreamBroadcaster,
    web_api,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "camwatch=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting camwatch v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config = AppConfig::default();
    tracing::info!(
        camera_index = config.camera_index,
        frame_width = config.frame_width,
        frame_height = config.frame_height,
        analysis_url = %config.analysis_url,
        snapshot_dir = %config.snapshot_dir.display(),
        "Configuration loaded"
    );

    // Initialize components
    let frame_source = Arc::new(FrameSource::new(config.camera_index));
    let sessions = Arc::new(SessionRegistry::new());
    let hub = Arc::new(RealtimeHub::new());
    let response_log = Arc::new(ResponseLog::new());
    let ai_client = Arc::new(AiClient::with_timeout(
        config.analysis_url.clone(),
        config.analysis_timeout,
    ));
    let snapshots = Arc::new(SnapshotStore::new(config.snapshot_dir.clone()).await?);
    let pipeline = Arc::new(AnalysisPipeline::new(
        ai_client.clone(),
        snapshots,
        response_log.clone(),
        hub.clone(),
        config.jpeg_quality,
    ));
    let broadcaster = Arc::new(StreamBroadcaster::new(
        frame_source.clone(),
        sessions.clone(),
        hub.clone(),
        config.frame_width,
        config.frame_height,
        config.jpeg_quality,
    ));
    let scheduler = Arc::new(CaptureScheduler::new(
        frame_source.clone(),
        pipeline.clone(),
        hub.clone(),
    ));
    let manual = Arc::new(ManualCaptureHandler::new(
        frame_source.clone(),
        pipeline.clone(),
        hub.clone(),
        config.analysis_model.clone(),
    ));

    let state = AppState {
        config: config.clone(),
        frame_source: frame_source.clone(),
        sessions,
        hub,
        response_log,
        ai_client,
        pipeline,
        broadcaster: broadcaster.clone(),
        scheduler: scheduler.clone(),
        manual,
    };

    // Create router with static file serving
    let serve_dir = ServeDir::new(&config.static_dir)
        .not_found_service(ServeFile::new(format!("{}/index.html", config.static_dir)));

    let app = web_api::create_router(state)
        .fallback_service(serve_dir)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http());

    tracing::info!(static_dir = %config.static_dir, "Static file serving enabled");

    // Start server
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Stop producers and release the camera so the activity light goes out
    tracing::info!("Shutting down");
    scheduler.stop().await;
    broadcaster.stop().await;
    frame_source.close().await;

    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
