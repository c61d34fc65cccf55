//! StreamBroadcaster - Live Frame Push Loop
//!
//! ## Responsibilities
//!
//! - Pull frames from the FrameSource at ~30 fps while streaming
//! - Encode to JPEG and broadcast to every connected viewer
//! - Skip all capture and encode work while nobody is watching
//! - Close the camera handle when the loop stops
//!
//! Backpressure is structural: the tick uses `try_read_frame` and drops the
//! cycle when a capture holds the hardware, and the zero-viewer check comes
//! before any hardware access.

use crate::frame_source::FrameSource;
use crate::realtime_hub::{FrameMessage, HubMessage, RealtimeHub};
use crate::session_registry::SessionRegistry;
use base64::Engine;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Tick period, ~30 frames/second upper bound
const TICK_PERIOD: Duration = Duration::from_millis(33);

/// StreamBroadcaster instance
pub struct StreamBroadcaster {
    frame_source: Arc<FrameSource>,
    sessions: Arc<SessionRegistry>,
    hub: Arc<RealtimeHub>,
    width: u32,
    height: u32,
    jpeg_quality: u8,
    streaming: Arc<AtomicBool>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl StreamBroadcaster {
    /// Create new StreamBroadcaster
    pub fn new(
        frame_source: Arc<FrameSource>,
        sessions: Arc<SessionRegistry>,
        hub: Arc<RealtimeHub>,
        width: u32,
        height: u32,
        jpeg_quality: u8,
    ) -> Self {
        Self {
            frame_source,
            sessions,
            hub,
            width,
            height,
            jpeg_quality,
            streaming: Arc::new(AtomicBool::new(false)),
            task: Mutex::new(None),
        }
    }

    /// Start streaming. No-op when already running; fails and stays stopped
    /// when the camera cannot be opened.
    pub async fn start(&self) -> crate::error::Result<()> {
        let mut task = self.task.lock().await;
        if self.streaming.load(Ordering::SeqCst) {
            tracing::warn!("Stream already running");
            return Ok(());
        }

        self.frame_source.open(self.width, self.height).await?;
        self.streaming.store(true, Ordering::SeqCst);

        let frame_source = self.frame_source.clone();
        let sessions = self.sessions.clone();
        let hub = self.hub.clone();
        let streaming = self.streaming.clone();
        let quality = self.jpeg_quality;

        *task = Some(tokio::spawn(async move {
            Self::run_loop(frame_source, sessions, hub, streaming, quality).await;
        }));

        tracing::info!(width = self.width, height = self.height, "Stream started");
        self.hub.status("Stream started").await;
        Ok(())
    }

    /// Stop streaming. Waits for the loop to observe the flag and release the
    /// camera, so no hardware access happens after this returns.
    pub async fn stop(&self) {
        let mut task = self.task.lock().await;
        self.streaming.store(false, Ordering::SeqCst);

        if let Some(handle) = task.take() {
            let _ = handle.await;
            tracing::info!("Stream stopped");
            self.hub.status("Stream stopped").await;
        }
    }

    /// Whether the tick loop is active
    pub fn is_streaming(&self) -> bool {
        self.streaming.load(Ordering::SeqCst)
    }

    async fn run_loop(
        frame_source: Arc<FrameSource>,
        sessions: Arc<SessionRegistry>,
        hub: Arc<RealtimeHub>,
        streaming: Arc<AtomicBool>,
        quality: u8,
    ) {
        let mut ticker = tokio::time::interval(TICK_PERIOD);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;

            if !streaming.load(Ordering::SeqCst) {
                break;
            }

            // Races with a concurrent stop/start can leave the handle closed
            // for a tick; just retry next cycle.
            if !frame_source.is_open() {
                continue;
            }

            // Pure backpressure: nobody watching, nothing captured
            if sessions.count() == 0 {
                continue;
            }

            let frame = match frame_source.try_read_frame().await {
                None => continue, // hardware busy with a capture, skip this cycle
                Some(Err(e)) => {
                    tracing::debug!(error = %e, "Frame read miss");
                    continue;
                }
                Some(Ok(frame)) => frame,
            };

            let jpeg = match frame.to_jpeg(quality) {
                Ok(data) => data,
                Err(e) => {
                    tracing::warn!(error = %e, "Frame encode failed");
                    continue;
                }
            };

            hub.broadcast(HubMessage::Frame(FrameMessage {
                image: base64::engine::general_purpose::STANDARD.encode(&jpeg),
            }))
            .await;
        }

        frame_source.close().await;
        tracing::debug!("Stream loop terminated");
    }
}
