//! ReportClient - narrative report generation adapter
//!
//! Sends incident context to the external text-generation service and
//! renders one report per active incident. Any failure falls back to a
//! fixed placeholder; report text is advisory, never load-bearing.

use crate::error::{Error, Result};
use crate::incident::Incident;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const REPORT_FALLBACK: &str = "Report generation failed.";

#[derive(Debug, Serialize)]
struct ReportRequest<'a> {
    incident_type: String,
    objects_detected: &'a [String],
    multi_incident_string: String,
}

#[derive(Debug, Deserialize)]
struct ReportResponse {
    report: String,
}

/// Text-generation service HTTP client
pub struct ReportClient {
    http: reqwest::Client,
    base_url: Option<String>,
}

impl ReportClient {
    /// `base_url = None` disables generation; every call yields the fallback
    pub fn new(base_url: Option<String>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .connect_timeout(Duration::from_secs(3))
            .build()
            .expect("Failed to build HTTP client");
        Self { http, base_url }
    }

    /// One report per active incident, joined with blank lines
    pub async fn generate(&self, active: &[Incident], objects: &[String]) -> String {
        let mut reports = Vec::new();
        for incident in active {
            match self.generate_one(incident, objects).await {
                Ok(text) => reports.push(text),
                Err(e) => {
                    tracing::warn!(
                        kind = %incident.kind,
                        error = %e,
                        "Report generation failed for incident"
                    );
                }
            }
        }

        if reports.is_empty() {
            REPORT_FALLBACK.to_string()
        } else {
            reports.join("\n\n")
        }
    }

    async fn generate_one(&self, incident: &Incident, objects: &[String]) -> Result<String> {
        let base = self
            .base_url
            .as_deref()
            .ok_or_else(|| Error::Config("report service not configured".into()))?;

        let request = ReportRequest {
            incident_type: incident.kind.to_string(),
            objects_detected: objects,
            multi_incident_string: format!("{} (P{})", incident.kind, incident.priority),
        };

        let response = self
            .http
            .post(format!("{}/generate", base))
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Error::Api(format!(
                "report service returned {}",
                response.status()
            )));
        }

        let payload: ReportResponse = response.json().await?;
        Ok(payload.report)
    }
}
