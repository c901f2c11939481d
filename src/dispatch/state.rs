//! Dispatch cycle state machine
//!
//! Pure transitions over the per-receiver records; no I/O here. The
//! coordinator applies these under the shared-store lock and performs the
//! resulting sends outside it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Per-receiver record status. `Sent` is the only non-terminal state
/// within a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordStatus {
    Sent,
    Confirmed,
    Declined,
    Cancelled,
}

/// Overall cycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CycleStatus {
    NotSent,
    Sent,
    Cancelled,
    Failed,
}

/// One receiver's slot in the current dispatch cycle.
///
/// A record exists even when both send channels failed, so the receiver
/// stays trackable; only `message_id` is absent in that case.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchRecord {
    pub receiver: String,
    pub resource: String,
    pub status: RecordStatus,
    pub message_id: Option<String>,
}

/// Parsed intent of an inbound reply body
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyIntent {
    Confirm,
    Decline,
    Other,
}

impl ReplyIntent {
    /// Case-insensitive keyword scan, confirm takes precedence
    pub fn parse(body: &str) -> Self {
        let lower = body.to_lowercase();
        if lower.contains("confirm") {
            ReplyIntent::Confirm
        } else if lower.contains("decline") {
            ReplyIntent::Decline
        } else {
            ReplyIntent::Other
        }
    }
}

/// Outcome of applying an inbound reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyOutcome {
    /// Record confirmed; listed (receiver, resource) pairs were `Sent` for
    /// the same resource and have been cancelled, notices still owed
    Confirmed { cancelled: Vec<(String, String)> },
    Declined,
    /// Matched receiver whose record already left `Sent`
    AlreadyHandled,
    /// Sender address matches no tracked receiver
    Unrecognized,
    /// Matched and still `Sent`, but no recognizable intent
    Unprocessable,
}

/// Process-wide dispatch cycle state
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DispatchState {
    pub status: CycleStatus,
    pub cycle_id: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub records: Vec<DispatchRecord>,
}

impl Default for CycleStatus {
    fn default() -> Self {
        CycleStatus::NotSent
    }
}

impl DispatchState {
    /// Claim the cycle. Fails while a prior cycle is already `Sent`, which
    /// is the guard that serializes the monitor loop against manual
    /// dispatch requests.
    pub fn try_begin_cycle(&mut self, cycle_id: String, now: DateTime<Utc>) -> bool {
        if self.status == CycleStatus::Sent {
            return false;
        }
        self.status = CycleStatus::Sent;
        self.cycle_id = Some(cycle_id);
        self.started_at = Some(now);
        self.cancelled_at = None;
        self.records.clear();
        true
    }

    /// Install the records produced by a completed send pass
    pub fn complete_cycle(&mut self, records: Vec<DispatchRecord>) {
        self.records = records;
    }

    /// Match a reply sender against tracked receivers by comparing the
    /// trailing 10 characters of both addresses.
    pub fn match_receiver(&self, from: &str) -> Option<String> {
        let from_tail = address_tail(from);
        self.records
            .iter()
            .find(|r| address_tail(&r.receiver) == from_tail)
            .map(|r| r.receiver.clone())
    }

    /// Apply one inbound reply. Replays and duplicates never mutate state.
    pub fn apply_reply(&mut self, from: &str, intent: ReplyIntent) -> ReplyOutcome {
        let from_tail = address_tail(from);
        let Some(index) = self
            .records
            .iter()
            .position(|r| address_tail(&r.receiver) == from_tail)
        else {
            return ReplyOutcome::Unrecognized;
        };
        let receiver = self.records[index].receiver.clone();

        if self.records[index].status != RecordStatus::Sent {
            return ReplyOutcome::AlreadyHandled;
        }

        match intent {
            ReplyIntent::Confirm => {
                self.records[index].status = RecordStatus::Confirmed;
                let resource = self.records[index].resource.clone();

                // One confirmation suppresses every other pending receiver
                // for the same resource
                let mut cancelled = Vec::new();
                for record in &mut self.records {
                    if record.receiver != receiver
                        && record.resource == resource
                        && record.status == RecordStatus::Sent
                    {
                        record.status = RecordStatus::Cancelled;
                        cancelled.push((record.receiver.clone(), record.resource.clone()));
                    }
                }
                ReplyOutcome::Confirmed { cancelled }
            }
            ReplyIntent::Decline => {
                self.records[index].status = RecordStatus::Declined;
                ReplyOutcome::Declined
            }
            ReplyIntent::Other => ReplyOutcome::Unprocessable,
        }
    }

    /// Cancel the whole cycle. Every tracked record transitions to
    /// `Cancelled` regardless of prior status; returns the (receiver,
    /// resource) pairs owed a cancellation notice, empty when there was
    /// nothing to cancel (overall status is then left unchanged).
    pub fn cancel_all(&mut self, now: DateTime<Utc>) -> Vec<(String, String)> {
        if self.records.is_empty() {
            return Vec::new();
        }
        let targets: Vec<(String, String)> = self
            .records
            .iter()
            .map(|r| (r.receiver.clone(), r.resource.clone()))
            .collect();
        for record in &mut self.records {
            record.status = RecordStatus::Cancelled;
        }
        self.status = CycleStatus::Cancelled;
        self.cancelled_at = Some(now);
        targets
    }
}

/// Trailing 10 characters of an address, formatting characters stripped.
/// Handles differing country-code prefixes between provider and config.
fn address_tail(address: &str) -> String {
    let cleaned: String = address
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '-')
        .collect();
    let chars: Vec<char> = cleaned.chars().collect();
    let start = chars.len().saturating_sub(10);
    chars[start..].iter().collect()
}
