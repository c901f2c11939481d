//! WebAPI - REST API endpoints
//!
//! ## Responsibilities
//!
//! - Query surface: classification + dispatch snapshot, reports, frame
//! - Dispatch control: manual initiate, cancel, registry reset
//! - Inbound reply webhook (provider form POST, TwiML response)

mod routes;

pub use routes::create_router;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;

use crate::models::HealthResponse;
use crate::state::AppState;

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let response = HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        db_connected: state.db_connected,
    };
    Json(response)
}
