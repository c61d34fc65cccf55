//! SessionRegistry - Connected Viewer Count
//!
//! Tracks how many viewers are connected to the push channel. The
//! StreamBroadcaster consults this each tick and skips all capture and encode
//! work while nobody is watching.

use std::sync::atomic::{AtomicU64, Ordering};

/// SessionRegistry instance
pub struct SessionRegistry {
    count: AtomicU64,
}

impl SessionRegistry {
    /// Create with zero viewers
    pub fn new() -> Self {
        Self {
            count: AtomicU64::new(0),
        }
    }

    /// Record a viewer connect; returns the new count.
    pub fn on_connect(&self) -> u64 {
        let count = self.count.fetch_add(1, Ordering::SeqCst) + 1;
        tracing::info!(viewer_count = count, "Viewer connected");
        count
    }

    /// Record a viewer disconnect; floored at zero. Returns the new count.
    pub fn on_disconnect(&self) -> u64 {
        let prev = self
            .count
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |c| {
                Some(c.saturating_sub(1))
            })
            .unwrap_or(0);
        let count = prev.saturating_sub(1);
        tracing::info!(viewer_count = count, "Viewer disconnected");
        count
    }

    /// Current viewer count
    pub fn count(&self) -> u64 {
        self.count.load(Ordering::SeqCst)
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn count_tracks_connects_and_disconnects() {
        let registry = SessionRegistry::new();
        assert_eq!(registry.count(), 0);

        assert_eq!(registry.on_connect(), 1);
        assert_eq!(registry.on_connect(), 2);
        assert_eq!(registry.on_disconnect(), 1);
        assert_eq!(registry.on_disconnect(), 0);
    }

    #[test]
    fn disconnect_is_floored_at_zero() {
        let registry = SessionRegistry::new();
        assert_eq!(registry.on_disconnect(), 0);
        assert_eq!(registry.on_disconnect(), 0);
        assert_eq!(registry.count(), 0);

        // Still usable afterwards
        assert_eq!(registry.on_connect(), 1);
    }
}
