//! Dispatch coordination
//!
//! ## Responsibilities
//!
//! - Initiate alert cycles for the current resource set
//! - Track per-receiver records, handle confirm/decline replies
//! - Cascade-cancel redundant receivers after a confirmation
//! - Explicit whole-cycle cancellation
//!
//! State transitions happen under the shared-store lock; outbound sends
//! never do. Sends run sequentially inside the coordinator's own task, so
//! notification order within a cycle is the configured receiver order.

mod state;

pub use state::{
    CycleStatus, DispatchRecord, DispatchState, RecordStatus, ReplyIntent, ReplyOutcome,
};

use crate::messaging::{AlertMessage, MessageTransport};
use crate::report_log::{IncidentReport, ReportLogService};
use crate::resources::ResourceDirectory;
use crate::store::SharedStore;
use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

/// Acknowledgment returned to a reply sender. Exactly one per inbound reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyAck {
    Confirmed,
    Declined,
    AlreadyHandled,
    Unrecognized,
    Unprocessable,
}

impl ReplyAck {
    pub fn text(&self) -> &'static str {
        match self {
            ReplyAck::Confirmed => "Thank you. Your dispatch status has been logged.",
            ReplyAck::Declined => "You have declined the dispatch.",
            ReplyAck::AlreadyHandled => "This dispatch has already been handled.",
            ReplyAck::Unrecognized => "Your number is not recognized for any current dispatch.",
            ReplyAck::Unprocessable => "Your response cannot be processed.",
        }
    }
}

/// DispatchCoordinator instance
pub struct DispatchCoordinator<T: MessageTransport> {
    transport: Arc<T>,
    directory: Arc<ResourceDirectory>,
    store: Arc<SharedStore>,
    report_log: Arc<ReportLogService>,
}

impl<T: MessageTransport> DispatchCoordinator<T> {
    pub fn new(
        transport: Arc<T>,
        directory: Arc<ResourceDirectory>,
        store: Arc<SharedStore>,
        report_log: Arc<ReportLogService>,
    ) -> Self {
        Self {
            transport,
            directory,
            store,
            report_log,
        }
    }

    /// Fire-and-forget initiation; the caller never waits on outbound sends
    pub fn spawn_initiate(self: &Arc<Self>) {
        let coordinator = Arc::clone(self);
        tokio::spawn(async move {
            coordinator.initiate().await;
        });
    }

    /// Run one dispatch cycle for the current resource set.
    ///
    /// Returns false when there is nothing to dispatch or a cycle is
    /// already in flight. Every receiver gets a record even when both send
    /// channels fail; only the message id is absent then.
    pub async fn initiate(&self) -> bool {
        let classification = self.store.classification().await;
        if classification.resources_needed.is_empty() {
            tracing::debug!("No resources required, dispatch skipped");
            return false;
        }

        let cycle_id = Uuid::new_v4().to_string();
        let claimed = self
            .store
            .with_dispatch(|d| d.try_begin_cycle(cycle_id.clone(), Utc::now()))
            .await;
        if !claimed {
            tracing::debug!("Dispatch cycle already in flight, initiate is a no-op");
            return false;
        }

        tracing::info!(
            cycle_id = %cycle_id,
            resources = ?classification.resources_needed,
            "Dispatch cycle started"
        );

        let mut records = Vec::new();
        for resource in &classification.resources_needed {
            for receiver in self.directory.receivers_for(resource) {
                let msg = AlertMessage {
                    receiver: receiver.clone(),
                    resource: resource.clone(),
                    incident: classification.headline.clone(),
                    location: classification.location_gps.clone(),
                    timestamp: classification.timestamp.clone(),
                };
                let message_id = match self.transport.send_alert(&msg).await {
                    Ok(sid) => Some(sid),
                    Err(e) => {
                        tracing::error!(
                            receiver = %receiver,
                            resource = %resource,
                            error = %e,
                            "Alert send failed, record kept without message id"
                        );
                        None
                    }
                };
                records.push(DispatchRecord {
                    receiver: receiver.clone(),
                    resource: resource.clone(),
                    status: RecordStatus::Sent,
                    message_id,
                });
            }
        }

        let sent = records.len();
        self.store.with_dispatch(|d| d.complete_cycle(records)).await;
        tracing::info!(cycle_id = %cycle_id, receivers = sent, "Dispatch cycle sent");

        self.log_snapshot().await;
        true
    }

    /// Handle one inbound reply, returning the acknowledgment owed to the
    /// sender. Cancellation notices triggered by a confirmation are sent
    /// after the state transition; their delivery is best effort.
    pub async fn handle_reply(&self, from: &str, body: &str) -> ReplyAck {
        let intent = ReplyIntent::parse(body);
        let outcome = self
            .store
            .with_dispatch(|d| d.apply_reply(from, intent))
            .await;

        let ack = match outcome {
            ReplyOutcome::Confirmed { cancelled } => {
                tracing::info!(from = %from, suppressed = cancelled.len(), "Dispatch confirmed");
                for (receiver, resource) in cancelled {
                    self.send_notice(&receiver, &resource, "No longer needed")
                        .await;
                }
                ReplyAck::Confirmed
            }
            ReplyOutcome::Declined => {
                tracing::info!(from = %from, "Dispatch declined");
                ReplyAck::Declined
            }
            ReplyOutcome::AlreadyHandled => {
                tracing::debug!(from = %from, "Reply for an already handled record");
                ReplyAck::AlreadyHandled
            }
            ReplyOutcome::Unrecognized => {
                tracing::warn!(from = %from, "Reply from unrecognized sender");
                ReplyAck::Unrecognized
            }
            ReplyOutcome::Unprocessable => {
                tracing::warn!(from = %from, "Reply without recognizable intent");
                ReplyAck::Unprocessable
            }
        };

        self.log_snapshot().await;
        ack
    }

    /// Cancel the entire cycle: every tracked record, regardless of status.
    /// Returns false when no records exist; overall status is then
    /// unchanged.
    pub async fn cancel(&self) -> bool {
        let targets = self.store.with_dispatch(|d| d.cancel_all(Utc::now())).await;
        if targets.is_empty() {
            tracing::debug!("Cancel requested with no tracked records");
            return false;
        }

        tracing::info!(receivers = targets.len(), "Dispatch cycle cancelled");
        for (receiver, resource) in targets {
            self.send_notice(&receiver, &resource, "Incident Cancelled")
                .await;
        }

        self.log_snapshot().await;
        true
    }

    async fn send_notice(&self, receiver: &str, resource: &str, reason: &str) {
        let msg = AlertMessage {
            receiver: receiver.to_string(),
            resource: resource.to_string(),
            incident: reason.to_string(),
            location: "N/A".to_string(),
            timestamp: Utc::now().to_rfc3339(),
        };
        if let Err(e) = self.transport.send_alert(&msg).await {
            tracing::warn!(receiver = %receiver, error = %e, "Notice send failed");
        }
    }

    /// Persist a snapshot of the combined incident + dispatch state
    async fn log_snapshot(&self) {
        let state = self.store.snapshot().await;
        self.report_log.record(IncidentReport::from_state(&state)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Error, Result};
    use crate::store::ClassificationSnapshot;
    use std::sync::Mutex;

    /// Records every send; fails addresses listed in `failing`
    struct MockTransport {
        sent: Mutex<Vec<AlertMessage>>,
        failing: Vec<String>,
    }

    impl MockTransport {
        fn new() -> Self {
            Self {
                sent: Mutex::new(Vec::new()),
                failing: Vec::new(),
            }
        }

        fn failing_for(receivers: &[&str]) -> Self {
            Self {
                sent: Mutex::new(Vec::new()),
                failing: receivers.iter().map(|r| r.to_string()).collect(),
            }
        }

        fn sent(&self) -> Vec<AlertMessage> {
            self.sent.lock().unwrap().clone()
        }
    }

    impl MessageTransport for MockTransport {
        async fn send_alert(&self, msg: &AlertMessage) -> Result<String> {
            self.sent.lock().unwrap().push(msg.clone());
            if self.failing.contains(&msg.receiver) {
                Err(Error::Transport("mock failure".into()))
            } else {
                Ok(format!("SM{}", self.sent.lock().unwrap().len()))
            }
        }
    }

    fn directory() -> ResourceDirectory {
        let mut directory = ResourceDirectory::default();
        directory.resource_receivers.insert(
            "Ambulance".to_string(),
            vec!["+15550000001".to_string(), "+15550000002".to_string()],
        );
        directory
            .resource_receivers
            .insert("Police".to_string(), vec!["+15550000003".to_string()]);
        directory
    }

    async fn coordinator_with(
        transport: MockTransport,
        resources: Vec<&str>,
    ) -> (Arc<DispatchCoordinator<MockTransport>>, Arc<SharedStore>, Arc<MockTransport>) {
        let transport = Arc::new(transport);
        let store = Arc::new(SharedStore::new());
        store
            .update_classification(ClassificationSnapshot {
                headline: "1. Person Hit (P1)".to_string(),
                resources_needed: resources.into_iter().map(String::from).collect(),
                ..Default::default()
            })
            .await;
        let coordinator = Arc::new(DispatchCoordinator::new(
            Arc::clone(&transport),
            Arc::new(directory()),
            Arc::clone(&store),
            Arc::new(ReportLogService::new(100, None)),
        ));
        (coordinator, store, transport)
    }

    #[tokio::test]
    async fn test_initiate_sends_to_all_receivers() {
        let (coordinator, store, transport) =
            coordinator_with(MockTransport::new(), vec!["Ambulance"]).await;

        assert!(coordinator.initiate().await);

        let dispatch = store.dispatch().await;
        assert_eq!(dispatch.status, CycleStatus::Sent);
        assert_eq!(dispatch.records.len(), 2);
        assert!(dispatch.records.iter().all(|r| r.status == RecordStatus::Sent));
        assert!(dispatch.records.iter().all(|r| r.message_id.is_some()));

        // Configured receiver order preserved
        let sent = transport.sent();
        assert_eq!(sent[0].receiver, "+15550000001");
        assert_eq!(sent[1].receiver, "+15550000002");
    }

    #[tokio::test]
    async fn test_second_initiate_is_noop() {
        let (coordinator, store, transport) =
            coordinator_with(MockTransport::new(), vec!["Police"]).await;

        assert!(coordinator.initiate().await);
        assert!(!coordinator.initiate().await);

        assert_eq!(store.dispatch().await.records.len(), 1);
        assert_eq!(transport.sent().len(), 1);
    }

    #[tokio::test]
    async fn test_initiate_without_resources_fails() {
        let (coordinator, store, _) = coordinator_with(MockTransport::new(), vec![]).await;
        assert!(!coordinator.initiate().await);
        assert_eq!(store.dispatch().await.status, CycleStatus::NotSent);
    }

    #[tokio::test]
    async fn test_send_failure_still_creates_record() {
        let (coordinator, store, _) = coordinator_with(
            MockTransport::failing_for(&["+15550000001"]),
            vec!["Ambulance"],
        )
        .await;

        assert!(coordinator.initiate().await);

        let dispatch = store.dispatch().await;
        assert_eq!(dispatch.status, CycleStatus::Sent);
        assert_eq!(dispatch.records.len(), 2);
        assert!(dispatch.records[0].message_id.is_none());
        assert!(dispatch.records[1].message_id.is_some());
    }

    #[tokio::test]
    async fn test_confirm_reply_cascades_notice() {
        let (coordinator, store, transport) =
            coordinator_with(MockTransport::new(), vec!["Ambulance"]).await;
        coordinator.initiate().await;

        let ack = coordinator.handle_reply("+15550000001", "Confirm Dispatch").await;
        assert_eq!(ack, ReplyAck::Confirmed);

        let dispatch = store.dispatch().await;
        assert_eq!(dispatch.records[0].status, RecordStatus::Confirmed);
        assert_eq!(dispatch.records[1].status, RecordStatus::Cancelled);

        // Third send is the "No longer needed" notice to the other receiver
        let sent = transport.sent();
        assert_eq!(sent.len(), 3);
        assert_eq!(sent[2].receiver, "+15550000002");
        assert_eq!(sent[2].incident, "No longer needed");
    }

    #[tokio::test]
    async fn test_replayed_confirm_returns_already_handled() {
        let (coordinator, _, transport) =
            coordinator_with(MockTransport::new(), vec!["Ambulance"]).await;
        coordinator.initiate().await;

        coordinator.handle_reply("+15550000001", "confirm").await;
        let sends_after_first = transport.sent().len();

        let ack = coordinator.handle_reply("+15550000001", "confirm").await;
        assert_eq!(ack, ReplyAck::AlreadyHandled);
        // No additional cascade notices
        assert_eq!(transport.sent().len(), sends_after_first);
    }

    #[tokio::test]
    async fn test_unknown_sender_gets_unrecognized() {
        let (coordinator, store, _) =
            coordinator_with(MockTransport::new(), vec!["Police"]).await;
        coordinator.initiate().await;

        let ack = coordinator.handle_reply("+19998887777", "confirm").await;
        assert_eq!(ack, ReplyAck::Unrecognized);
        assert_eq!(store.dispatch().await.records[0].status, RecordStatus::Sent);
    }

    #[tokio::test]
    async fn test_decline_then_cancel_all() {
        let (coordinator, store, transport) =
            coordinator_with(MockTransport::new(), vec!["Ambulance"]).await;
        coordinator.initiate().await;

        assert_eq!(
            coordinator.handle_reply("+15550000002", "I decline").await,
            ReplyAck::Declined
        );

        assert!(coordinator.cancel().await);
        let dispatch = store.dispatch().await;
        assert_eq!(dispatch.status, CycleStatus::Cancelled);
        assert!(dispatch
            .records
            .iter()
            .all(|r| r.status == RecordStatus::Cancelled));

        // Both receivers got a cancellation notice
        let notices: Vec<_> = transport
            .sent()
            .into_iter()
            .filter(|m| m.incident == "Incident Cancelled")
            .collect();
        assert_eq!(notices.len(), 2);
    }

    #[tokio::test]
    async fn test_cancel_without_cycle_fails() {
        let (coordinator, store, _) =
            coordinator_with(MockTransport::new(), vec!["Police"]).await;
        assert!(!coordinator.cancel().await);
        assert_eq!(store.dispatch().await.status, CycleStatus::NotSent);
    }
}
