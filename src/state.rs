//! Application state
//!
//! Holds all shared components and configuration. Components are built once
//! in main and passed around as Arcs; there is no ambient global state.

use crate::ai_client::AiClient;
use crate::analysis_pipeline::AnalysisPipeline;
use crate::capture_scheduler::CaptureScheduler;
use crate::frame_source::FrameSource;
use crate::manual_capture::ManualCaptureHandler;
use crate::realtime_hub::RealtimeHub;
use crate::response_log::ResponseLog;
use crate::session_registry::SessionRegistry;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// Local camera device index
    pub camera_index: u32,
    /// Requested capture width
    pub frame_width: u32,
    /// Requested capture height
    pub frame_height: u32,
    /// JPEG quality for stream frames and snapshots
    pub jpeg_quality: u8,
    /// Directory for captured snapshots
    pub snapshot_dir: PathBuf,
    /// Analysis service endpoint (Ollama-style generate API)
    pub analysis_url: String,
    /// Default analysis model
    pub analysis_model: String,
    /// Analysis request deadline
    pub analysis_timeout: Duration,
    /// Static front-end directory
    pub static_dir: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: std::env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(5000),
            camera_index: std::env::var("CAMERA_INDEX")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(0),
            frame_width: std::env::var("FRAME_WIDTH")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(672),
            frame_height: std::env::var("FRAME_HEIGHT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(672),
            jpeg_quality: std::env::var("JPEG_QUALITY")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(85),
            snapshot_dir: std::env::var("SNAPSHOT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("snapshots")),
            analysis_url: std::env::var("ANALYSIS_URL")
                .unwrap_or_else(|_| "http://localhost:11434/api/generate".to_string()),
            analysis_model: std::env::var("ANALYSIS_MODEL")
                .unwrap_or_else(|_| "llava".to_string()),
            analysis_timeout: Duration::from_secs(
                std::env::var("ANALYSIS_TIMEOUT_SECS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(30),
            ),
            static_dir: std::env::var("STATIC_DIR").unwrap_or_else(|_| "static".to_string()),
        }
    }
}

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Application config
    pub config: AppConfig,
    /// FrameSource (exclusive camera access)
    pub frame_source: Arc<FrameSource>,
    /// SessionRegistry (viewer count)
    pub sessions: Arc<SessionRegistry>,
    /// RealtimeHub (WebSocket distribution)
    pub hub: Arc<RealtimeHub>,
    /// ResponseLog (analysis history)
    pub response_log: Arc<ResponseLog>,
    /// AiClient (analysis service adapter)
    pub ai_client: Arc<AiClient>,
    /// AnalysisPipeline (capture -> record)
    pub pipeline: Arc<AnalysisPipeline>,
    /// StreamBroadcaster (live push loop)
    pub broadcaster: Arc<crate::stream_broadcaster::StreamBroadcaster>,
    /// CaptureScheduler (periodic capture)
    pub scheduler: Arc<CaptureScheduler>,
    /// ManualCaptureHandler (one-shot capture)
    pub manual: Arc<ManualCaptureHandler>,
}
