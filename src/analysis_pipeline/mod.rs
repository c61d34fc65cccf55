//! AnalysisPipeline - Frame to Record
//!
//! ## Responsibilities
//!
//! - Encode a raw frame and persist the snapshot
//! - Invoke the analysis service through [`AiClient`]
//! - Classify every outcome into displayable response text
//! - Append to the [`ResponseLog`] and notify viewers
//!
//! The pipeline is shared by the scheduler and the manual capture handler and
//! never fails: service errors become record text, so a dead or slow analysis
//! backend degrades the log, not the capture loops.

use crate::ai_client::AiClient;
use crate::error::AnalysisError;
use crate::frame_source::Frame;
use crate::realtime_hub::{HubMessage, RealtimeHub};
use crate::response_log::{AnalysisRecord, Origin, ResponseLog};
use crate::snapshot_store::SnapshotStore;
use std::sync::Arc;

/// AnalysisPipeline instance
pub struct AnalysisPipeline {
    ai_client: Arc<AiClient>,
    snapshots: Arc<SnapshotStore>,
    log: Arc<ResponseLog>,
    hub: Arc<RealtimeHub>,
    jpeg_quality: u8,
}

impl AnalysisPipeline {
    /// Create new AnalysisPipeline
    pub fn new(
        ai_client: Arc<AiClient>,
        snapshots: Arc<SnapshotStore>,
        log: Arc<ResponseLog>,
        hub: Arc<RealtimeHub>,
        jpeg_quality: u8,
    ) -> Self {
        Self {
            ai_client,
            snapshots,
            log,
            hub,
            jpeg_quality,
        }
    }

    /// Run the full pipeline on one frame. Always produces a record.
    pub async fn run(
        &self,
        frame: Frame,
        prompt: String,
        model: String,
        origin: Origin,
    ) -> AnalysisRecord {
        let jpeg = match frame.to_jpeg(self.jpeg_quality) {
            Ok(data) => data,
            Err(e) => {
                tracing::error!(error = %e, "Frame encode failed");
                return self
                    .finish(prompt, model, format!("Error: {e}"), None, origin)
                    .await;
            }
        };

        // Snapshot write failure is logged but does not stop the analysis
        let snapshot_path = match self.snapshots.save(&jpeg).await {
            Ok(path) => Some(path),
            Err(e) => {
                tracing::warn!(error = %e, "Snapshot write failed");
                None
            }
        };

        let file_name = snapshot_path
            .as_ref()
            .and_then(|p| p.file_name())
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "snapshot.jpg".to_string());

        let result = self
            .ai_client
            .generate(&file_name, &model, &prompt, &jpeg)
            .await;
        let response_text = response_text(result);

        self.finish(
            prompt,
            model,
            response_text,
            snapshot_path.map(|p| p.display().to_string()),
            origin,
        )
        .await
    }

    async fn finish(
        &self,
        prompt: String,
        model: String,
        response_text: String,
        snapshot_path: Option<String>,
        origin: Origin,
    ) -> AnalysisRecord {
        let record = self
            .log
            .append(prompt, model, response_text, snapshot_path, origin)
            .await;

        tracing::info!(
            record_id = record.id,
            origin = ?record.origin,
            "Analysis complete"
        );

        self.hub
            .broadcast(HubMessage::NewRecord(record.clone()))
            .await;
        record
    }
}

/// Map a service outcome to displayable record text. Errors are data here,
/// not failures.
pub(crate) fn response_text(result: Result<String, AnalysisError>) -> String {
    match result {
        Ok(answer) => answer,
        Err(AnalysisError::Timeout) => "Error: analysis request timed out".to_string(),
        Err(AnalysisError::ConnectionFailed(detail)) => {
            format!("Error: could not connect to analysis service ({detail})")
        }
        Err(AnalysisError::MalformedResponse(detail)) => {
            format!("Error: invalid response format ({detail})")
        }
        Err(AnalysisError::HttpError(code)) => {
            format!("Error: analysis service returned HTTP {code}")
        }
    }
}
