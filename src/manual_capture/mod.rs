//! ManualCaptureHandler - On-Demand Capture
//!
//! Services one-shot capture requests from viewers. The analysis runs on its
//! own task so a slow service call never blocks the websocket read loop, and
//! the handler fails fast when the camera is closed rather than initializing
//! hardware behind the scheduler's back.

use crate::analysis_pipeline::AnalysisPipeline;
use crate::error::CameraError;
use crate::frame_source::FrameSource;
use crate::realtime_hub::RealtimeHub;
use crate::response_log::Origin;
use std::sync::Arc;

/// ManualCaptureHandler instance
pub struct ManualCaptureHandler {
    frame_source: Arc<FrameSource>,
    pipeline: Arc<AnalysisPipeline>,
    hub: Arc<RealtimeHub>,
    default_model: String,
}

impl ManualCaptureHandler {
    /// Create new ManualCaptureHandler
    pub fn new(
        frame_source: Arc<FrameSource>,
        pipeline: Arc<AnalysisPipeline>,
        hub: Arc<RealtimeHub>,
        default_model: String,
    ) -> Self {
        Self {
            frame_source,
            pipeline,
            hub,
            default_model,
        }
    }

    /// Capture one frame and analyze it.
    ///
    /// Returns immediately after spawning the analysis task; progress is
    /// reported through status events. Fails fast when the camera is closed.
    pub async fn capture(
        &self,
        prompt: String,
        model: Option<String>,
    ) -> Result<(), CameraError> {
        if !self.frame_source.is_open() {
            self.hub.status("Camera unavailable").await;
            return Err(CameraError::Unavailable("camera is not open".to_string()));
        }

        let model = model.unwrap_or_else(|| self.default_model.clone());
        let frame_source = self.frame_source.clone();
        let pipeline = self.pipeline.clone();
        let hub = self.hub.clone();

        tokio::spawn(async move {
            hub.status("Analyzing snapshot...").await;

            match frame_source.read_frame().await {
                Ok(frame) => {
                    let record = pipeline.run(frame, prompt, model, Origin::Manual).await;
                    hub.status(format!("Analysis #{} complete", record.id)).await;
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Manual capture failed");
                    hub.status(format!("Capture failed: {e}")).await;
                }
            }
        });

        Ok(())
    }
}
