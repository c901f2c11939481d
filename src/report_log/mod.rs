//! Report log - incident report persistence
//!
//! ## Responsibilities
//!
//! - Keep recent incident reports in a ring buffer
//! - Best-effort MySQL persistence (incident_reports table)
//! - Provide the query interface for the history API
//!
//! A persistence failure is logged and swallowed; it never blocks or fails
//! the operation that produced the report.

use crate::dispatch::DispatchState;
use crate::incident::VEHICLE_CLASSES;
use crate::store::StoreState;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::MySqlPool;
use std::collections::VecDeque;
use tokio::sync::RwLock;

/// One appended report document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncidentReport {
    pub report_id: u64,
    pub detected_objects: Vec<String>,
    pub objects_count: i32,
    pub person_count: i32,
    pub vehicle_count: i32,
    pub gps: String,
    pub headline: String,
    pub events: String,
    pub report_text: String,
    /// Max damage level over the active set (0..3)
    pub severity: i32,
    pub resources_needed: Vec<String>,
    pub dispatch_snapshot: DispatchState,
    pub created_at: DateTime<Utc>,
}

impl IncidentReport {
    /// Snapshot the full store state into a report document
    pub fn from_state(state: &StoreState) -> Self {
        let c = &state.classification;
        let person_count = c
            .objects_detected
            .iter()
            .filter(|o| o.as_str() == "person")
            .count() as i32;
        let vehicle_count = c
            .objects_detected
            .iter()
            .filter(|o| VEHICLE_CLASSES.contains(&o.as_str()))
            .count() as i32;
        let severity = c
            .active_incidents
            .iter()
            .map(|i| i.damage.severity())
            .max()
            .unwrap_or(0);

        Self {
            report_id: 0,
            detected_objects: c.objects_detected.clone(),
            objects_count: c.objects_detected.len() as i32,
            person_count,
            vehicle_count,
            gps: c.location_gps.clone(),
            headline: c.headline.clone(),
            events: c.events.clone(),
            report_text: c.report_text.clone(),
            severity,
            resources_needed: c.resources_needed.clone(),
            dispatch_snapshot: state.dispatch.clone(),
            created_at: Utc::now(),
        }
    }
}

struct ReportRingBuffer {
    reports: VecDeque<IncidentReport>,
    capacity: usize,
    next_id: u64,
}

impl ReportRingBuffer {
    fn new(capacity: usize) -> Self {
        Self {
            reports: VecDeque::with_capacity(capacity),
            capacity,
            next_id: 1,
        }
    }

    fn push(&mut self, mut report: IncidentReport) -> u64 {
        report.report_id = self.next_id;
        self.next_id += 1;

        if self.reports.len() >= self.capacity {
            self.reports.pop_front();
        }
        self.reports.push_back(report);
        self.next_id - 1
    }

    fn latest(&self, count: usize) -> Vec<IncidentReport> {
        self.reports.iter().rev().take(count).cloned().collect()
    }
}

/// ReportLogService instance
pub struct ReportLogService {
    buffer: RwLock<ReportRingBuffer>,
    pool: Option<MySqlPool>,
}

impl ReportLogService {
    pub fn new(capacity: usize, pool: Option<MySqlPool>) -> Self {
        Self {
            buffer: RwLock::new(ReportRingBuffer::new(capacity)),
            pool,
        }
    }

    /// Append a report. Database errors are swallowed after a diagnostic.
    pub async fn record(&self, report: IncidentReport) -> u64 {
        let id = {
            let mut buffer = self.buffer.write().await;
            buffer.push(report.clone())
        };
        tracing::debug!(report_id = id, headline = %report.headline, "Report recorded");

        if let Some(pool) = &self.pool {
            if let Err(e) = Self::persist(pool, &report).await {
                tracing::warn!(report_id = id, error = %e, "Report persistence failed");
            }
        }
        id
    }

    async fn persist(pool: &MySqlPool, report: &IncidentReport) -> sqlx::Result<()> {
        let detected = serde_json::to_string(&report.detected_objects).unwrap_or_default();
        let resources = serde_json::to_string(&report.resources_needed).unwrap_or_default();
        let dispatch = serde_json::to_string(&report.dispatch_snapshot).unwrap_or_default();

        sqlx::query(
            r#"
            INSERT INTO incident_reports
                (detected_objects, objects_count, person_count, vehicle_count,
                 gps, headline, events, report_text, severity,
                 resources_needed, dispatch_snapshot, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&detected)
        .bind(report.objects_count)
        .bind(report.person_count)
        .bind(report.vehicle_count)
        .bind(&report.gps)
        .bind(&report.headline)
        .bind(&report.events)
        .bind(&report.report_text)
        .bind(report.severity)
        .bind(&resources)
        .bind(&dispatch)
        .bind(report.created_at)
        .execute(pool)
        .await?;

        Ok(())
    }

    /// Latest reports, newest first
    pub async fn latest(&self, count: usize) -> Vec<IncidentReport> {
        let buffer = self.buffer.read().await;
        buffer.latest(count)
    }

    pub async fn count(&self) -> usize {
        let buffer = self.buffer.read().await;
        buffer.reports.len()
    }
}
