//! Classification loop
//!
//! ## Responsibilities
//!
//! - Continuous per-frame pipeline: observe, classify, merge, allocate
//! - Narrative report generation (best effort)
//! - Publish the result to the shared store and frame cache
//!
//! A detector failure is "no update this tick"; the loop never blocks on
//! missing frames.

use crate::detector_client::DetectorClient;
use crate::incident::{classify_frame, FrameObservation, IncidentRegistry};
use crate::report_client::ReportClient;
use crate::resources::ResourceDirectory;
use crate::store::{ClassificationSnapshot, FrameCache, SharedStore};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::interval;

/// Classification worker
pub struct ClassificationLoop {
    detector: Arc<DetectorClient>,
    report_client: Arc<ReportClient>,
    directory: Arc<ResourceDirectory>,
    store: Arc<SharedStore>,
    frames: Arc<FrameCache>,
    registry: Arc<RwLock<IncidentRegistry>>,
    location_gps: String,
    tick: Duration,
    running: Arc<RwLock<bool>>,
}

impl ClassificationLoop {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        detector: Arc<DetectorClient>,
        report_client: Arc<ReportClient>,
        directory: Arc<ResourceDirectory>,
        store: Arc<SharedStore>,
        frames: Arc<FrameCache>,
        registry: Arc<RwLock<IncidentRegistry>>,
        location_gps: String,
        tick: Duration,
    ) -> Self {
        Self {
            detector,
            report_client,
            directory,
            store,
            frames,
            registry,
            location_gps,
            tick,
            running: Arc::new(RwLock::new(false)),
        }
    }

    /// Start the loop as a background task
    pub async fn start(self: Arc<Self>) {
        {
            let mut running = self.running.write().await;
            if *running {
                tracing::warn!("Classification loop already running");
                return;
            }
            *running = true;
        }

        tracing::info!(tick_ms = self.tick.as_millis() as u64, "Classification loop started");

        let loop_handle = Arc::clone(&self);
        tokio::spawn(async move {
            let mut ticker = interval(loop_handle.tick);
            loop {
                ticker.tick().await;

                {
                    let running = loop_handle.running.read().await;
                    if !*running {
                        break;
                    }
                }

                match loop_handle.detector.observe().await {
                    Ok((observation, frame)) => {
                        loop_handle.process_observation(observation, frame).await;
                    }
                    Err(e) => {
                        tracing::debug!(error = %e, "No detector update this tick");
                    }
                }
            }

            tracing::info!("Classification loop stopped");
        });
    }

    pub async fn stop(&self) {
        let mut running = self.running.write().await;
        *running = false;
        tracing::info!("Stopping classification loop");
    }

    /// Classify one observation and publish the result
    pub(crate) async fn process_observation(
        &self,
        observation: FrameObservation,
        frame: Option<Vec<u8>>,
    ) {
        let (active, summary, headline) = {
            let mut registry = self.registry.write().await;
            let candidates = classify_frame(&observation, &registry.active_kinds());
            if !candidates.is_empty() {
                tracing::info!(candidates = candidates.len(), "New incident candidates");
            }
            registry.merge(candidates);
            (
                registry.active().to_vec(),
                registry.summary(),
                registry.headline(),
            )
        };

        let resources_needed = self.directory.required_resources(&active);
        let report_text = self
            .report_client
            .generate(&active, &observation.objects)
            .await;

        let snapshot = ClassificationSnapshot {
            headline,
            location_gps: self.location_gps.clone(),
            timestamp: chrono::Utc::now().format("%H:%M:%S, %d %b %Y").to_string(),
            objects_detected: observation.objects,
            events: summary,
            report_text,
            resources_needed,
            active_incidents: active,
        };
        self.store.update_classification(snapshot).await;

        if let Some(jpeg) = frame {
            self.frames.store(jpeg).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::BBox;
    use crate::incident::{ActorBox, IncidentKind};

    fn test_loop() -> (ClassificationLoop, Arc<SharedStore>, Arc<FrameCache>) {
        let store = Arc::new(SharedStore::new());
        let frames = Arc::new(FrameCache::new());
        let mut directory = ResourceDirectory::default();
        directory
            .resource_receivers
            .insert("Police".to_string(), vec!["+15550000001".to_string()]);

        let worker = ClassificationLoop::new(
            Arc::new(DetectorClient::new("http://127.0.0.1:1".to_string())),
            Arc::new(ReportClient::new(None)),
            Arc::new(directory),
            Arc::clone(&store),
            Arc::clone(&frames),
            Arc::new(RwLock::new(IncidentRegistry::new())),
            "Test Junction".to_string(),
            Duration::from_millis(80),
        );
        (worker, store, frames)
    }

    #[tokio::test]
    async fn test_crash_observation_updates_store() {
        let (worker, store, frames) = test_loop();

        let observation = FrameObservation {
            objects: vec!["car".to_string(), "truck".to_string()],
            actors: vec![
                ActorBox {
                    class_label: "car".to_string(),
                    bbox: BBox::new(0.1, 0.1, 0.3, 0.3),
                },
                ActorBox {
                    class_label: "truck".to_string(),
                    bbox: BBox::new(0.25, 0.25, 0.5, 0.5),
                },
            ],
            ..Default::default()
        };
        worker
            .process_observation(observation, Some(vec![1, 2, 3]))
            .await;

        let c = store.classification().await;
        assert_eq!(c.headline, "1. Crash (P1)");
        assert_eq!(c.resources_needed, vec!["Police".to_string()]);
        assert_eq!(c.location_gps, "Test Junction");
        assert_eq!(c.active_incidents[0].kind, IncidentKind::Crash);
        assert_eq!(frames.latest().await, Some(vec![1, 2, 3]));
    }

    #[tokio::test]
    async fn test_incident_persists_across_quiet_frames() {
        let (worker, store, _) = test_loop();

        let fire = FrameObservation {
            fire_regions: vec![BBox::new(0.1, 0.1, 0.2, 0.2)],
            ..Default::default()
        };
        worker.process_observation(fire, None).await;

        // A quiet frame afterwards must not displace the active incident
        worker
            .process_observation(FrameObservation::default(), None)
            .await;

        let c = store.classification().await;
        assert_eq!(c.headline, "1. Fire (P1)");
    }

    #[tokio::test]
    async fn test_idle_start_reports_normal_flow() {
        let (worker, store, _) = test_loop();
        worker
            .process_observation(FrameObservation::default(), None)
            .await;

        let c = store.classification().await;
        assert_eq!(c.events, "1. Normal Flow (P4)");
        assert!(c.resources_needed.is_empty());
    }
}
