//! Shared test fixtures: scripted camera grabbers and pipeline plumbing.

#![allow(dead_code)]

use camwatch::ai_client::AiClient;
use camwatch::analysis_pipeline::AnalysisPipeline;
use camwatch::error::CameraError;
use camwatch::frame_source::{Frame, FrameGrabber, FrameSource};
use camwatch::realtime_hub::RealtimeHub;
use camwatch::response_log::ResponseLog;
use camwatch::snapshot_store::SnapshotStore;
use std::path::PathBuf;
use std::sync::mpsc::Receiver;
use std::sync::Arc;
use std::time::Duration;

/// Grabber that returns a tiny frame on every read, no hardware involved
pub struct StubGrabber {
    open: bool,
}

impl StubGrabber {
    pub fn new() -> Self {
        Self { open: false }
    }
}

impl FrameGrabber for StubGrabber {
    fn open(&mut self, _width: u32, _height: u32) -> Result<(), CameraError> {
        self.open = true;
        Ok(())
    }

    fn read(&mut self) -> Result<Frame, CameraError> {
        if !self.open {
            return Err(CameraError::Unavailable("not open".to_string()));
        }
        Ok(test_frame())
    }

    fn close(&mut self) {
        self.open = false;
    }
}

/// Grabber whose reads block until the test releases a token through the
/// gate channel. Lets tests hold a firing in flight deliberately.
pub struct GatedGrabber {
    open: bool,
    gate: Receiver<()>,
}

impl GatedGrabber {
    pub fn new(gate: Receiver<()>) -> Self {
        Self { open: false, gate }
    }
}

impl FrameGrabber for GatedGrabber {
    fn open(&mut self, _width: u32, _height: u32) -> Result<(), CameraError> {
        self.open = true;
        Ok(())
    }

    fn read(&mut self) -> Result<Frame, CameraError> {
        if !self.open {
            return Err(CameraError::Unavailable("not open".to_string()));
        }
        self.gate
            .recv()
            .map_err(|_| CameraError::ReadFailed("gate closed".to_string()))?;
        Ok(test_frame())
    }

    fn close(&mut self) {
        self.open = false;
    }
}

pub fn test_frame() -> Frame {
    Frame {
        data: vec![0u8; 12],
        width: 2,
        height: 2,
    }
}

pub fn stub_source() -> FrameSource {
    FrameSource::with_grabber(|| Box::new(StubGrabber::new()))
}

pub fn gated_source(gate: Receiver<()>) -> FrameSource {
    FrameSource::with_grabber(move || Box::new(GatedGrabber::new(gate)))
}

/// Fresh temp directory for snapshots
pub fn temp_dir() -> PathBuf {
    std::env::temp_dir().join(format!("camwatch-test-{}", uuid::Uuid::new_v4()))
}

/// Pipeline wired to the given endpoint, with its log, hub and snapshot dir
pub async fn test_pipeline(
    endpoint: &str,
    timeout: Duration,
) -> (Arc<AnalysisPipeline>, Arc<ResponseLog>, Arc<RealtimeHub>, PathBuf) {
    let dir = temp_dir();
    let log = Arc::new(ResponseLog::new());
    let hub = Arc::new(RealtimeHub::new());
    let snapshots = Arc::new(SnapshotStore::new(dir.clone()).await.unwrap());
    let ai_client = Arc::new(AiClient::with_timeout(endpoint.to_string(), timeout));
    let pipeline = Arc::new(AnalysisPipeline::new(
        ai_client,
        snapshots,
        log.clone(),
        hub.clone(),
        85,
    ));
    (pipeline, log, hub, dir)
}

/// Let spawned tasks and the camera worker thread make progress without
/// advancing the paused clock.
pub async fn settle() {
    for _ in 0..20 {
        for _ in 0..5 {
            tokio::task::yield_now().await;
        }
        // Real sleep so the camera worker thread can respond; the paused
        // tokio clock does not move here.
        std::thread::sleep(Duration::from_millis(1));
    }
}

/// Advance paused time in small steps, letting tasks run between steps
pub async fn advance_stepped(total: Duration, step: Duration) {
    let mut remaining = total;
    while remaining > Duration::ZERO {
        let chunk = remaining.min(step);
        tokio::time::advance(chunk).await;
        remaining -= chunk;
        settle().await;
    }
}
