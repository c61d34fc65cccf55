//! camwatch Library
//!
//! Single-camera web monitor: live WebSocket streaming with periodic and
//! on-demand AI frame analysis.
//!
//! ## Architecture (9 Components)
//!
//! 1. FrameSource - Exclusive camera access (open/read/close)
//! 2. StreamBroadcaster - Live frame push loop, gated on viewer presence
//! 3. CaptureScheduler - Drift-corrected periodic capture
//! 4. ManualCaptureHandler - One-shot capture requests
//! 5. AnalysisPipeline - Frame -> snapshot -> service call -> record
//! 6. AiClient - Analysis service adapter
//! 7. ResponseLog - Append-only analysis history
//! 8. SessionRegistry - Connected viewer count
//! 9. RealtimeHub / WebAPI - WebSocket distribution and routes
//!
//! ## Design Principles
//!
//! - All camera access serializes through FrameSource
//! - Capture loops degrade on transient failure, never terminate
//! - Analysis errors are data (record text), not exceptions

pub mod ai_client;
pub mod analysis_pipeline;
pub mod capture_scheduler;
pub mod error;
pub mod frame_source;
pub mod manual_capture;
pub mod realtime_hub;
pub mod response_log;
pub mod session_registry;
pub mod snapshot_store;
pub mod state;
pub mod stream_broadcaster;
pub mod web_api;

pub use error::{Error, Result};
pub use state::AppState;
