//! Shared state store
//!
//! ## Responsibilities
//!
//! - Process-wide classification + dispatch snapshot under one lock
//! - Latest rendered frame under its own independent lock
//!
//! All mutation goes through accessor methods; the raw locks are never
//! exposed. The store lock and the frame lock are never held together.

use crate::dispatch::DispatchState;
use crate::incident::Incident;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

/// Most recent classification result, as exposed to the API and logging
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassificationSnapshot {
    /// Multi-incident summary, or "Normal Flow"
    pub headline: String,
    pub location_gps: String,
    pub timestamp: String,
    pub objects_detected: Vec<String>,
    /// Rendered multi-incident string (same as headline when active)
    pub events: String,
    pub report_text: String,
    pub resources_needed: Vec<String>,
    pub active_incidents: Vec<Incident>,
}

impl Default for ClassificationSnapshot {
    fn default() -> Self {
        Self {
            headline: "Initializing...".to_string(),
            location_gps: "N/A".to_string(),
            timestamp: "N/A".to_string(),
            objects_detected: Vec::new(),
            events: String::new(),
            report_text: "Please wait for initialization...".to_string(),
            resources_needed: Vec::new(),
            active_incidents: Vec::new(),
        }
    }
}

/// Everything guarded by the store lock
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreState {
    pub classification: ClassificationSnapshot,
    pub dispatch: DispatchState,
}

/// Process-wide store. Cheap to share, mutation funneled through methods.
#[derive(Default)]
pub struct SharedStore {
    inner: RwLock<StoreState>,
}

impl SharedStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the classification half of the snapshot
    pub async fn update_classification(&self, classification: ClassificationSnapshot) {
        let mut state = self.inner.write().await;
        state.classification = classification;
    }

    /// Consistent copy of the full state
    pub async fn snapshot(&self) -> StoreState {
        self.inner.read().await.clone()
    }

    pub async fn classification(&self) -> ClassificationSnapshot {
        self.inner.read().await.classification.clone()
    }

    pub async fn dispatch(&self) -> DispatchState {
        self.inner.read().await.dispatch.clone()
    }

    /// Run one dispatch-state transition under the store lock
    pub async fn with_dispatch<R>(&self, f: impl FnOnce(&mut DispatchState) -> R) -> R {
        let mut state = self.inner.write().await;
        f(&mut state.dispatch)
    }
}

/// Latest rendered frame (annotated JPEG). Written at frame rate by the
/// classification loop, read by frame-serving handlers; kept on a separate
/// lock so frame traffic never contends with state transitions.
#[derive(Default)]
pub struct FrameCache {
    frame: RwLock<Option<Vec<u8>>>,
}

impl FrameCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn store(&self, jpeg: Vec<u8>) {
        let mut frame = self.frame.write().await;
        *frame = Some(jpeg);
    }

    pub async fn latest(&self) -> Option<Vec<u8>> {
        self.frame.read().await.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::CycleStatus;

    #[tokio::test]
    async fn test_classification_update_and_snapshot() {
        let store = SharedStore::new();
        let mut classification = ClassificationSnapshot::default();
        classification.headline = "1. Fire (P1)".to_string();
        classification.resources_needed = vec!["Fire Truck".to_string()];

        store.update_classification(classification).await;

        let snapshot = store.snapshot().await;
        assert_eq!(snapshot.classification.headline, "1. Fire (P1)");
        assert_eq!(snapshot.dispatch.status, CycleStatus::NotSent);
    }

    #[tokio::test]
    async fn test_with_dispatch_mutates_under_lock() {
        let store = SharedStore::new();
        let claimed = store
            .with_dispatch(|d| d.try_begin_cycle("c1".to_string(), chrono::Utc::now()))
            .await;
        assert!(claimed);
        assert_eq!(store.dispatch().await.status, CycleStatus::Sent);
    }

    #[tokio::test]
    async fn test_frame_cache_round_trip() {
        let cache = FrameCache::new();
        assert!(cache.latest().await.is_none());
        cache.store(vec![0xFF, 0xD8, 0xFF]).await;
        assert_eq!(cache.latest().await, Some(vec![0xFF, 0xD8, 0xFF]));
    }
}
