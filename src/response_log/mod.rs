//! ResponseLog - Analysis Result Recording
//!
//! Append-only in-memory log of analysis results, replayed to newly connected
//! viewers. Ids are dense and strictly increasing within a log lifetime;
//! clearing the log resets the counter.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

/// Where a record came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Origin {
    /// Periodic scheduler firing
    Auto,
    /// Explicit capture request
    Manual,
}

/// One analysis result. Immutable once appended.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisRecord {
    pub id: u64,
    pub timestamp: DateTime<Utc>,
    pub prompt: String,
    pub model: String,
    pub response_text: String,
    /// Path of the snapshot written for this capture, if the write succeeded
    pub snapshot_path: Option<String>,
    pub origin: Origin,
}

struct LogInner {
    records: Vec<AnalysisRecord>,
    next_id: u64,
}

/// ResponseLog instance
pub struct ResponseLog {
    inner: RwLock<LogInner>,
}

impl ResponseLog {
    /// Create an empty log
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(LogInner {
                records: Vec::new(),
                next_id: 1,
            }),
        }
    }

    /// Append a record, assigning the next id. Returns the stored record.
    pub async fn append(
        &self,
        prompt: String,
        model: String,
        response_text: String,
        snapshot_path: Option<String>,
        origin: Origin,
    ) -> AnalysisRecord {
        let mut inner = self.inner.write().await;
        let record = AnalysisRecord {
            id: inner.next_id,
            timestamp: Utc::now(),
            prompt,
            model,
            response_text,
            snapshot_path,
            origin,
        };
        inner.next_id += 1;
        inner.records.push(record.clone());

        tracing::debug!(record_id = record.id, origin = ?record.origin, "Analysis record appended");
        record
    }

    /// All records in append order
    pub async fn all(&self) -> Vec<AnalysisRecord> {
        self.inner.read().await.records.clone()
    }

    /// Number of records
    pub async fn len(&self) -> usize {
        self.inner.read().await.records.len()
    }

    /// Reset to empty; the next append produces id 1 again.
    pub async fn clear(&self) {
        let mut inner = self.inner.write().await;
        inner.records.clear();
        inner.next_id = 1;
        tracing::info!("Response log cleared");
    }
}

impl Default for ResponseLog {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn ids_are_dense_from_one() {
        let log = ResponseLog::new();
        for i in 0..5 {
            let rec = log
                .append(
                    "p".to_string(),
                    "m".to_string(),
                    format!("r{i}"),
                    None,
                    if i % 2 == 0 { Origin::Auto } else { Origin::Manual },
                )
                .await;
            assert_eq!(rec.id, i + 1);
        }

        let all = log.all().await;
        let ids: Vec<u64> = all.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![1, 2, 3, 4, 5]);
    }

    #[tokio::test]
    async fn clear_resets_id_counter() {
        let log = ResponseLog::new();
        log.append("p".into(), "m".into(), "r".into(), None, Origin::Auto)
            .await;
        log.append("p".into(), "m".into(), "r".into(), None, Origin::Auto)
            .await;

        log.clear().await;
        assert_eq!(log.len().await, 0);

        let rec = log
            .append("p".into(), "m".into(), "r".into(), None, Origin::Manual)
            .await;
        assert_eq!(rec.id, 1);
    }
}
