//! RESQ Server Library
//!
//! Incident classification and emergency dispatch coordination.
//!
//! ## Architecture
//!
//! 1. DetectorClient - per-frame detections from the external detector
//! 2. Geometry - box overlap tests and proximity clustering
//! 3. Incident classifier + registry - rule evaluation, active set
//! 4. ResourceDirectory - incident kind to resource/receiver mapping
//! 5. DispatchCoordinator - alert cycles, confirm/decline tracking
//! 6. SharedStore - classification + dispatch snapshot under one lock
//! 7. ClassificationLoop - continuous per-frame worker
//! 8. DispatchMonitor - 1s auto-dispatch check
//! 9. ReportLog - ring buffer + best-effort MySQL persistence
//! 10. WebAPI - query surface, dispatch control, reply webhook
//!
//! ## Design Principles
//!
//! - One incident per kind in the active set, ever
//! - Every state mutation runs under the shared-store lock
//! - A failed send never aborts the rest of a dispatch batch

pub mod classification_loop;
pub mod detector_client;
pub mod dispatch;
pub mod dispatch_monitor;
pub mod error;
pub mod geometry;
pub mod incident;
pub mod messaging;
pub mod models;
pub mod report_client;
pub mod report_log;
pub mod resources;
pub mod state;
pub mod store;
pub mod web_api;

pub use error::{Error, Result};
pub use state::AppState;
