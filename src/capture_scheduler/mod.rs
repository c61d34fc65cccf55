//! CaptureScheduler - Drift-Corrected Periodic Capture
//!
//! ## Responsibilities
//!
//! - Fire capture-and-analyze at a fixed cadence, independent of viewers
//! - Re-arm the next firing before running the capture body, so analysis
//!   latency never stretches the period
//! - Resynchronize instead of burst-firing when a firing lands late
//! - Guarantee no firings or hardware reads after stop() returns
//!
//! Each firing reads one frame inside the timer task, then hands the frame to
//! the pipeline on a detached task. A slow analysis service therefore delays
//! nothing but its own record.

use crate::analysis_pipeline::AnalysisPipeline;
use crate::frame_source::FrameSource;
use crate::realtime_hub::{HubMessage, RealtimeHub, SchedulerStateMessage};
use crate::response_log::Origin;
use crate::error::SchedulerError;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tokio_util::sync::CancellationToken;

/// Lateness beyond which the schedule resynchronizes to "now" instead of
/// catching up with a burst of missed firings.
pub const DRIFT_TOLERANCE: Duration = Duration::from_millis(500);

/// Recent firings kept for inspection
const EVENT_HISTORY: usize = 64;

/// Scheduler configuration, replaced atomically by start()
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub interval: Duration,
    pub prompt: String,
    pub model: String,
}

/// One firing of the schedule, immutable once recorded
#[derive(Debug, Clone, Copy)]
pub struct CaptureEvent {
    pub seq: u64,
    pub scheduled_at: Instant,
    pub fired_at: Instant,
    pub drift: Duration,
}

struct Running {
    config: SchedulerConfig,
    token: CancellationToken,
    handle: JoinHandle<()>,
}

/// CaptureScheduler instance
pub struct CaptureScheduler {
    frame_source: Arc<FrameSource>,
    pipeline: Arc<AnalysisPipeline>,
    hub: Arc<RealtimeHub>,
    running: Mutex<Option<Running>>,
    events: Arc<std::sync::Mutex<VecDeque<CaptureEvent>>>,
}

impl CaptureScheduler {
    /// Create new CaptureScheduler
    pub fn new(
        frame_source: Arc<FrameSource>,
        pipeline: Arc<AnalysisPipeline>,
        hub: Arc<RealtimeHub>,
    ) -> Self {
        Self {
            frame_source,
            pipeline,
            hub,
            running: Mutex::new(None),
            events: Arc::new(std::sync::Mutex::new(VecDeque::new())),
        }
    }

    /// Start the schedule, arming the first firing at now + interval.
    ///
    /// Returns [`SchedulerError::AlreadyRunning`] when a schedule is active;
    /// callers treat that as a benign no-op.
    pub async fn start(&self, config: SchedulerConfig) -> Result<(), SchedulerError> {
        let mut running = self.running.lock().await;
        if running.is_some() {
            tracing::warn!("Scheduler already running");
            return Err(SchedulerError::AlreadyRunning);
        }

        let token = CancellationToken::new();
        let handle = tokio::spawn(Self::timer_loop(
            self.frame_source.clone(),
            self.pipeline.clone(),
            config.clone(),
            token.clone(),
            self.events.clone(),
        ));

        tracing::info!(
            interval_secs = config.interval.as_secs_f64(),
            model = %config.model,
            "Scheduler started"
        );

        *running = Some(Running {
            config,
            token,
            handle,
        });
        drop(running);

        self.broadcast_state().await;
        Ok(())
    }

    /// Stop the schedule. Cancels the pending timer and waits for the timer
    /// task, so no firing or hardware read happens after this returns.
    pub async fn stop(&self) {
        let taken = {
            let mut running = self.running.lock().await;
            running.take()
        };

        if let Some(run) = taken {
            run.token.cancel();
            let _ = run.handle.await;
            tracing::info!("Scheduler stopped");
            self.broadcast_state().await;
        }
    }

    /// Whether a schedule is active
    pub async fn is_running(&self) -> bool {
        self.running.lock().await.is_some()
    }

    /// Current state for the push channel
    pub async fn state(&self) -> SchedulerStateMessage {
        let running = self.running.lock().await;
        match running.as_ref() {
            Some(run) => SchedulerStateMessage {
                running: true,
                interval_secs: Some(run.config.interval.as_secs()),
                prompt: Some(run.config.prompt.clone()),
                model: Some(run.config.model.clone()),
            },
            None => SchedulerStateMessage {
                running: false,
                interval_secs: None,
                prompt: None,
                model: None,
            },
        }
    }

    /// Recent firings, oldest first
    pub fn events(&self) -> Vec<CaptureEvent> {
        self.events.lock().expect("events lock poisoned").iter().copied().collect()
    }

    async fn broadcast_state(&self) {
        let state = self.state().await;
        self.hub.broadcast(HubMessage::SchedulerState(state)).await;
    }

    async fn timer_loop(
        frame_source: Arc<FrameSource>,
        pipeline: Arc<AnalysisPipeline>,
        config: SchedulerConfig,
        token: CancellationToken,
        events: Arc<std::sync::Mutex<VecDeque<CaptureEvent>>>,
    ) {
        let interval = config.interval;
        let mut seq: u64 = 0;
        let mut target = Instant::now() + interval;

        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                _ = sleep_until(target) => {}
            }
            if token.is_cancelled() {
                break;
            }

            let fired_at = Instant::now();
            let drift = fired_at.duration_since(target);
            seq += 1;

            {
                let mut history = events.lock().expect("events lock poisoned");
                if history.len() >= EVENT_HISTORY {
                    history.pop_front();
                }
                history.push_back(CaptureEvent {
                    seq,
                    scheduled_at: target,
                    fired_at,
                    drift,
                });
            }

            // Re-arm before the capture body so cadence is set by the
            // schedule, not by how long this firing takes.
            target = next_target(fired_at, target, interval, DRIFT_TOLERANCE);

            tracing::debug!(
                seq,
                drift_ms = drift.as_millis() as u64,
                "Scheduler firing"
            );

            match frame_source.read_frame().await {
                Ok(frame) => {
                    let pipeline = pipeline.clone();
                    let prompt = config.prompt.clone();
                    let model = config.model.clone();
                    tokio::spawn(async move {
                        pipeline.run(frame, prompt, model, Origin::Auto).await;
                    });
                }
                Err(e) => {
                    // Camera unavailable or a read miss: skip this firing's
                    // capture, keep the rhythm.
                    tracing::warn!(seq, error = %e, "Scheduled capture skipped");
                }
            }
        }

        tracing::debug!("Scheduler timer loop terminated");
    }
}

/// Next firing target given when the last one actually fired.
///
/// Holds the original cadence while lateness stays within `tolerance`;
/// beyond that the epoch resynchronizes to "now" so a stalled system resumes
/// a clean rhythm instead of burst-firing missed events.
pub(crate) fn next_target(
    now: Instant,
    last_target: Instant,
    interval: Duration,
    tolerance: Duration,
) -> Instant {
    if now.duration_since(last_target) > tolerance {
        now + interval
    } else {
        last_target + interval
    }
}
