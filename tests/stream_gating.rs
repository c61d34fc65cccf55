//! StreamBroadcaster viewer gating and shutdown behavior.

mod common;

use camwatch::realtime_hub::RealtimeHub;
use camwatch::session_registry::SessionRegistry;
use camwatch::stream_broadcaster::StreamBroadcaster;
use common::{advance_stepped, settle, stub_source};
use std::sync::Arc;
use std::time::Duration;

fn broadcaster(
    source: Arc<camwatch::frame_source::FrameSource>,
    sessions: Arc<SessionRegistry>,
    hub: Arc<RealtimeHub>,
) -> StreamBroadcaster {
    StreamBroadcaster::new(source, sessions, hub, 672, 672, 85)
}

#[tokio::test(start_paused = true)]
async fn zero_viewers_means_zero_reads() {
    let source = Arc::new(stub_source());
    let sessions = Arc::new(SessionRegistry::new());
    let hub = Arc::new(RealtimeHub::new());
    let caster = broadcaster(source.clone(), sessions.clone(), hub.clone());

    caster.start().await.unwrap();
    assert!(caster.is_streaming());
    assert!(source.is_open());

    // Many tick periods with nobody watching: no hardware access at all
    advance_stepped(Duration::from_millis(660), Duration::from_millis(33)).await;
    assert_eq!(source.read_count(), 0);

    // A viewer connects: frames start flowing
    let (_conn_id, mut rx) = hub.register().await;
    sessions.on_connect();
    advance_stepped(Duration::from_millis(330), Duration::from_millis(33)).await;

    assert!(source.read_count() > 0);
    let msg = rx.try_recv().expect("viewer should have received a frame");
    assert!(msg.contains(r#""type":"frame""#));

    // Viewer leaves: reads stop again
    sessions.on_disconnect();
    settle().await;
    let reads_after_leave = source.read_count();
    advance_stepped(Duration::from_millis(330), Duration::from_millis(33)).await;
    assert_eq!(source.read_count(), reads_after_leave);

    caster.stop().await;
}

#[tokio::test(start_paused = true)]
async fn stop_closes_camera_and_halts_reads() {
    let source = Arc::new(stub_source());
    let sessions = Arc::new(SessionRegistry::new());
    let hub = Arc::new(RealtimeHub::new());
    let caster = broadcaster(source.clone(), sessions.clone(), hub.clone());

    sessions.on_connect();
    caster.start().await.unwrap();
    advance_stepped(Duration::from_millis(330), Duration::from_millis(33)).await;
    assert!(source.read_count() > 0);

    caster.stop().await;
    assert!(!caster.is_streaming());
    assert!(!source.is_open(), "stop must release the camera handle");

    let reads_at_stop = source.read_count();
    advance_stepped(Duration::from_millis(660), Duration::from_millis(33)).await;
    assert_eq!(
        source.read_count(),
        reads_at_stop,
        "no hardware access after stop() returns"
    );
}

#[tokio::test(start_paused = true)]
async fn start_is_idempotent_and_restartable() {
    let source = Arc::new(stub_source());
    let sessions = Arc::new(SessionRegistry::new());
    let hub = Arc::new(RealtimeHub::new());
    let caster = broadcaster(source.clone(), sessions.clone(), hub.clone());

    caster.start().await.unwrap();
    // Second start is a no-op, not an error
    caster.start().await.unwrap();
    assert!(caster.is_streaming());

    caster.stop().await;
    assert!(!caster.is_streaming());

    caster.start().await.unwrap();
    assert!(caster.is_streaming());
    assert!(source.is_open());
    caster.stop().await;
}
