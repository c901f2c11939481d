//! Application state
//!
//! Holds all shared components and state

use crate::dispatch::DispatchCoordinator;
use crate::incident::IncidentRegistry;
use crate::messaging::{TwilioSettings, TwilioTransport};
use crate::report_log::ReportLogService;
use crate::resources::ResourceDirectory;
use crate::store::{FrameCache, SharedStore};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// MySQL URL for report persistence; unset runs in-memory only
    pub database_url: Option<String>,
    /// External detector service URL
    pub detector_url: String,
    /// External report-generation service URL; unset disables narratives
    pub report_api_url: Option<String>,
    /// JSON resource directory path; unset uses the built-in mapping
    pub resource_config: Option<PathBuf>,
    /// Fixed camera location reported with every incident
    pub location_gps: String,
    /// Classification loop cadence in milliseconds
    pub classification_tick_ms: u64,
    /// Messaging provider settings
    pub twilio: TwilioSettings,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: std::env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(5000),
            database_url: std::env::var("DATABASE_URL").ok(),
            detector_url: std::env::var("DETECTOR_URL")
                .unwrap_or_else(|_| "http://localhost:9000".to_string()),
            report_api_url: std::env::var("REPORT_API_URL").ok(),
            resource_config: std::env::var("RESOURCE_CONFIG").map(PathBuf::from).ok(),
            location_gps: std::env::var("CAMERA_LOCATION")
                .unwrap_or_else(|_| "Unknown location".to_string()),
            classification_tick_ms: std::env::var("CLASSIFICATION_TICK_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(80),
            twilio: TwilioSettings {
                api_base: std::env::var("TWILIO_API_BASE")
                    .unwrap_or_else(|_| "https://api.twilio.com".to_string()),
                account_sid: std::env::var("TWILIO_ACCOUNT_SID").unwrap_or_default(),
                auth_token: std::env::var("TWILIO_AUTH_TOKEN").unwrap_or_default(),
                from_sms: std::env::var("TWILIO_FROM_NUMBER").unwrap_or_default(),
                from_whatsapp: std::env::var("TWILIO_FROM_WHATSAPP").unwrap_or_default(),
            },
        }
    }
}

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Application config
    pub config: AppConfig,
    /// Shared classification + dispatch store
    pub store: Arc<SharedStore>,
    /// Latest rendered frame
    pub frames: Arc<FrameCache>,
    /// Active-incident registry (shared with the classification loop)
    pub registry: Arc<RwLock<IncidentRegistry>>,
    /// Dispatch coordinator
    pub coordinator: Arc<DispatchCoordinator<TwilioTransport>>,
    /// Report log
    pub report_log: Arc<ReportLogService>,
    /// Resource directory
    pub directory: Arc<ResourceDirectory>,
    /// Whether report persistence has a live database behind it
    pub db_connected: bool,
}
