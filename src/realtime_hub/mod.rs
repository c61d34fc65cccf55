//! RealtimeHub - WebSocket Distribution
//!
//! ## Responsibilities
//!
//! - WebSocket connection management
//! - Event broadcasting (frames, status, analysis records)
//! - History replay to newly connected viewers
//!
//! Frames are pushed as base64 JPEG payloads inside `frame` events; everything
//! else is small JSON. Each connection gets an unbounded channel drained by its
//! socket task, so one slow client never blocks a broadcast.

use crate::response_log::AnalysisRecord;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::mpsc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Server -> client events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
#[serde(rename_all = "kebab-case")]
pub enum HubMessage {
    /// One encoded video frame (base64 JPEG)
    Frame(FrameMessage),
    /// Free-text status line
    Status(StatusMessage),
    /// Current number of connected viewers
    ViewerCount(ViewerCountMessage),
    /// Full analysis history, sent once on connect
    History(HistoryMessage),
    /// Scheduler running flag and configuration
    SchedulerState(SchedulerStateMessage),
    /// A single freshly appended analysis record
    NewRecord(AnalysisRecord),
    /// The history was cleared as a whole
    HistoryCleared,
}

/// Frame payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameMessage {
    pub image: String,
}

/// Status payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusMessage {
    pub message: String,
}

/// Viewer count payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViewerCountMessage {
    pub count: u64,
}

/// History payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryMessage {
    pub records: Vec<AnalysisRecord>,
}

/// Scheduler state payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerStateMessage {
    pub running: bool,
    pub interval_secs: Option<u64>,
    pub prompt: Option<String>,
    pub model: Option<String>,
}

/// Client -> server commands
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", content = "data")]
#[serde(rename_all = "kebab-case")]
pub enum ClientCommand {
    StartStream,
    StopStream,
    StartScheduler {
        interval_secs: u64,
        prompt: String,
        model: Option<String>,
    },
    StopScheduler,
    ManualCapture {
        prompt: String,
        model: Option<String>,
    },
    ClearHistory,
}

/// Client connection
struct ClientConnection {
    id: Uuid,
    tx: mpsc::UnboundedSender<String>,
}

/// RealtimeHub instance
pub struct RealtimeHub {
    connections: RwLock<HashMap<Uuid, ClientConnection>>,
}

impl RealtimeHub {
    /// Create new RealtimeHub
    pub fn new() -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
        }
    }

    /// Register a new client
    pub async fn register(&self) -> (Uuid, mpsc::UnboundedReceiver<String>) {
        let id = Uuid::new_v4();
        let (tx, rx) = mpsc::unbounded_channel();

        {
            let mut connections = self.connections.write().await;
            connections.insert(id, ClientConnection { id, tx });
        }

        tracing::info!(connection_id = %id, "Client registered");
        (id, rx)
    }

    /// Unregister a client
    pub async fn unregister(&self, id: &Uuid) {
        let mut connections = self.connections.write().await;
        if connections.remove(id).is_some() {
            tracing::info!(connection_id = %id, "Client unregistered");
        }
    }

    /// Broadcast a message to all clients
    pub async fn broadcast(&self, message: HubMessage) {
        let json = match serde_json::to_string(&message) {
            Ok(j) => j,
            Err(e) => {
                tracing::error!(error = %e, "Failed to serialize message");
                return;
            }
        };

        let connections = self.connections.read().await;
        for conn in connections.values() {
            if let Err(e) = conn.tx.send(json.clone()) {
                tracing::warn!(connection_id = %conn.id, error = %e, "Failed to send message");
            }
        }
    }

    /// Send a message to one client (history replay on connect)
    pub async fn send_to(&self, id: &Uuid, message: HubMessage) {
        let json = match serde_json::to_string(&message) {
            Ok(j) => j,
            Err(e) => {
                tracing::error!(error = %e, "Failed to serialize message");
                return;
            }
        };

        let connections = self.connections.read().await;
        if let Some(conn) = connections.get(id) {
            if let Err(e) = conn.tx.send(json) {
                tracing::warn!(connection_id = %conn.id, error = %e, "Failed to send message");
            }
        }
    }

    /// Convenience: broadcast a free-text status line
    pub async fn status(&self, message: impl Into<String>) {
        self.broadcast(HubMessage::Status(StatusMessage {
            message: message.into(),
        }))
        .await;
    }
}

impl Default for RealtimeHub {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::response_log::Origin;

    #[test]
    fn event_names_are_kebab_case() {
        let json = serde_json::to_string(&HubMessage::ViewerCount(ViewerCountMessage {
            count: 3,
        }))
        .unwrap();
        assert!(json.contains(r#""type":"viewer-count""#));

        let json = serde_json::to_string(&HubMessage::HistoryCleared).unwrap();
        assert!(json.contains(r#""type":"history-cleared""#));

        let record = AnalysisRecord {
            id: 1,
            timestamp: chrono::Utc::now(),
            prompt: "p".into(),
            model: "m".into(),
            response_text: "r".into(),
            snapshot_path: None,
            origin: Origin::Auto,
        };
        let json = serde_json::to_string(&HubMessage::NewRecord(record)).unwrap();
        assert!(json.contains(r#""type":"new-record""#));
        assert!(json.contains(r#""origin":"auto""#));
    }

    #[test]
    fn client_commands_parse() {
        let cmd: ClientCommand = serde_json::from_str(r#"{"type":"start-stream"}"#).unwrap();
        assert!(matches!(cmd, ClientCommand::StartStream));

        let cmd: ClientCommand = serde_json::from_str(
            r#"{"type":"start-scheduler","data":{"interval_secs":5,"prompt":"what is this?"}}"#,
        )
        .unwrap();
        match cmd {
            ClientCommand::StartScheduler {
                interval_secs,
                prompt,
                model,
            } => {
                assert_eq!(interval_secs, 5);
                assert_eq!(prompt, "what is this?");
                assert!(model.is_none());
            }
            other => panic!("unexpected command: {other:?}"),
        }

        let cmd: ClientCommand = serde_json::from_str(
            r#"{"type":"manual-capture","data":{"prompt":"p","model":"llava"}}"#,
        )
        .unwrap();
        assert!(matches!(cmd, ClientCommand::ManualCapture { .. }));
    }

    #[tokio::test]
    async fn broadcast_reaches_all_registered_clients() {
        let hub = RealtimeHub::new();
        let (id_a, mut rx_a) = hub.register().await;
        let (_id_b, mut rx_b) = hub.register().await;

        hub.status("hello").await;
        assert!(rx_a.recv().await.unwrap().contains("hello"));
        assert!(rx_b.recv().await.unwrap().contains("hello"));

        hub.unregister(&id_a).await;
        hub.status("again").await;
        assert!(rx_b.recv().await.unwrap().contains("again"));
        assert!(rx_a.try_recv().is_err());
    }
}
