//! SnapshotStore - Captured Frame Persistence
//!
//! Writes each analyzed frame to the snapshot directory with a
//! timestamp-derived filename. Millisecond precision keeps names
//! collision-free when captures land within the same second.

use crate::error::Result;
use chrono::{DateTime, Utc};
use std::path::PathBuf;
use tokio::fs;

/// SnapshotStore instance
pub struct SnapshotStore {
    dir: PathBuf,
}

impl SnapshotStore {
    /// Create the store, making the directory if needed
    pub async fn new(dir: PathBuf) -> Result<Self> {
        fs::create_dir_all(&dir).await?;
        Ok(Self { dir })
    }

    /// Filename for a capture at the given instant
    pub fn file_name(at: DateTime<Utc>) -> String {
        format!("snapshot_{}.jpg", at.format("%Y%m%d_%H%M%S_%3f"))
    }

    /// Write JPEG bytes, returning the path of the new file
    pub async fn save(&self, data: &[u8]) -> Result<PathBuf> {
        let path = self.dir.join(Self::file_name(Utc::now()));
        fs::write(&path, data).await?;

        tracing::debug!(
            path = %path.display(),
            size = data.len(),
            "Saved snapshot"
        );
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn file_name_has_millisecond_precision() {
        let at = Utc
            .with_ymd_and_hms(2026, 8, 25, 14, 30, 5)
            .unwrap()
            .checked_add_signed(chrono::Duration::milliseconds(42))
            .unwrap();
        assert_eq!(SnapshotStore::file_name(at), "snapshot_20260825_143005_042.jpg");
    }

    #[tokio::test]
    async fn save_writes_into_directory() {
        let dir = std::env::temp_dir().join(format!("camwatch-test-{}", uuid::Uuid::new_v4()));
        let store = SnapshotStore::new(dir.clone()).await.unwrap();

        let path = store.save(b"\xff\xd8\xff\xd9").await.unwrap();
        assert!(path.starts_with(&dir));
        assert_eq!(tokio::fs::read(&path).await.unwrap(), b"\xff\xd8\xff\xd9");

        let _ = tokio::fs::remove_dir_all(&dir).await;
    }
}
