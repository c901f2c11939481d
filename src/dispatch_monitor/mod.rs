//! Dispatch monitor
//!
//! ## Responsibilities
//!
//! - Periodic check for active incidents without a dispatched cycle
//! - Trigger automatic dispatch (fire-and-forget)
//!
//! The trigger itself is only a hint; the coordinator's cycle claim under
//! the store lock is what prevents double dispatch against concurrent
//! manual requests.

use crate::dispatch::{CycleStatus, DispatchCoordinator};
use crate::messaging::MessageTransport;
use crate::store::{SharedStore, StoreState};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::interval;

/// Monitor worker
pub struct DispatchMonitor<T: MessageTransport> {
    store: Arc<SharedStore>,
    coordinator: Arc<DispatchCoordinator<T>>,
    tick: Duration,
    running: Arc<RwLock<bool>>,
}

impl<T: MessageTransport> DispatchMonitor<T> {
    pub fn new(store: Arc<SharedStore>, coordinator: Arc<DispatchCoordinator<T>>) -> Self {
        Self {
            store,
            coordinator,
            tick: Duration::from_secs(1),
            running: Arc::new(RwLock::new(false)),
        }
    }

    pub fn with_tick(mut self, tick: Duration) -> Self {
        self.tick = tick;
        self
    }

    /// Start the monitor as a background task
    pub async fn start(self: Arc<Self>) {
        {
            let mut running = self.running.write().await;
            if *running {
                tracing::warn!("Dispatch monitor already running");
                return;
            }
            *running = true;
        }

        tracing::info!("Dispatch monitor started");

        let monitor = Arc::clone(&self);
        tokio::spawn(async move {
            let mut ticker = interval(monitor.tick);
            loop {
                ticker.tick().await;

                {
                    let running = monitor.running.read().await;
                    if !*running {
                        break;
                    }
                }

                let state = monitor.store.snapshot().await;
                if should_dispatch(&state) {
                    tracing::info!(
                        headline = %state.classification.headline,
                        "Monitor triggering automatic dispatch"
                    );
                    monitor.coordinator.spawn_initiate();
                }
            }

            tracing::info!("Dispatch monitor stopped");
        });
    }

    pub async fn stop(&self) {
        let mut running = self.running.write().await;
        *running = false;
        tracing::info!("Stopping dispatch monitor");
    }
}

/// An undispatched, non-Normal-Flow incident that actually needs resources
fn should_dispatch(state: &StoreState) -> bool {
    let c = &state.classification;
    c.headline != "Normal Flow"
        && c.headline != "Initializing..."
        && !c.resources_needed.is_empty()
        && state.dispatch.status != CycleStatus::Sent
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::DispatchState;
    use crate::store::ClassificationSnapshot;
    use chrono::Utc;

    fn state(headline: &str, resources: Vec<&str>, status: CycleStatus) -> StoreState {
        let mut dispatch = DispatchState::default();
        if status == CycleStatus::Sent {
            dispatch.try_begin_cycle("c".to_string(), Utc::now());
        }
        StoreState {
            classification: ClassificationSnapshot {
                headline: headline.to_string(),
                resources_needed: resources.into_iter().map(String::from).collect(),
                ..Default::default()
            },
            dispatch,
        }
    }

    #[test]
    fn test_dispatches_active_incident() {
        let s = state("1. Crash (P1)", vec!["Police"], CycleStatus::NotSent);
        assert!(should_dispatch(&s));
    }

    #[test]
    fn test_never_dispatches_normal_flow() {
        let s = state("Normal Flow", vec![], CycleStatus::NotSent);
        assert!(!should_dispatch(&s));
        // Normal Flow as a registry entry needs no resources either
        let s = state("1. Normal Flow (P4)", vec![], CycleStatus::NotSent);
        assert!(!should_dispatch(&s));
    }

    #[test]
    fn test_skips_while_cycle_in_flight() {
        let s = state("1. Crash (P1)", vec!["Police"], CycleStatus::Sent);
        assert!(!should_dispatch(&s));
    }

    #[test]
    fn test_skips_before_initialization() {
        let s = state("Initializing...", vec![], CycleStatus::NotSent);
        assert!(!should_dispatch(&s));
    }

    #[test]
    fn test_redispatches_after_cancellation() {
        let mut s = state("1. Fire (P1)", vec!["Fire Truck"], CycleStatus::Sent);
        s.dispatch.complete_cycle(vec![crate::dispatch::DispatchRecord {
            receiver: "+15550000001".to_string(),
            resource: "Fire Truck".to_string(),
            status: crate::dispatch::RecordStatus::Sent,
            message_id: None,
        }]);
        s.dispatch.cancel_all(Utc::now());
        assert!(should_dispatch(&s));
    }
}
