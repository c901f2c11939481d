//! API Routes

use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Form, Json, Router,
};
use serde::Deserialize;

use crate::models::{ApiError, ApiResponse, DispatchAck};
use crate::report_log::IncidentReport;
use crate::state::AppState;
use crate::store::StoreState;

/// Create API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health
        .route("/healthz", get(super::health_check))
        // Query surface
        .route("/api/current", get(current_data))
        .route("/api/reports", get(list_reports))
        .route("/api/frame", get(latest_frame))
        // Dispatch control
        .route("/api/dispatch", post(send_dispatch))
        .route("/api/dispatch/cancel", post(cancel_dispatch))
        .route("/api/registry/reset", post(reset_registry))
        // Provider webhook for inbound replies
        .route("/webhook/reply", post(inbound_reply))
        .with_state(state)
}

/// Current classification + dispatch snapshot
async fn current_data(State(state): State<AppState>) -> Json<ApiResponse<StoreState>> {
    let snapshot = state.store.snapshot().await;
    Json(ApiResponse::success(snapshot))
}

#[derive(Debug, Deserialize)]
struct ReportsQuery {
    limit: Option<usize>,
}

/// Latest incident reports, newest first
async fn list_reports(
    State(state): State<AppState>,
    Query(query): Query<ReportsQuery>,
) -> Json<ApiResponse<Vec<IncidentReport>>> {
    let limit = query.limit.unwrap_or(50).min(200);
    let reports = state.report_log.latest(limit).await;
    Json(ApiResponse::success(reports))
}

/// Latest rendered frame as JPEG
async fn latest_frame(State(state): State<AppState>) -> impl IntoResponse {
    match state.frames.latest().await {
        Some(jpeg) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "image/jpeg")],
            jpeg,
        )
            .into_response(),
        None => (StatusCode::NOT_FOUND, "no frame yet").into_response(),
    }
}

/// Manual dispatch initiation. Fire-and-forget: the response acknowledges
/// that a cycle was requested, never per-receiver outcomes.
async fn send_dispatch(State(state): State<AppState>) -> Json<ApiResponse<DispatchAck>> {
    state.coordinator.spawn_initiate();
    Json(ApiResponse::success(DispatchAck {
        status: "dispatched".to_string(),
    }))
}

/// Cancel the entire current dispatch cycle
async fn cancel_dispatch(State(state): State<AppState>) -> Json<ApiResponse<DispatchAck>> {
    if state.coordinator.cancel().await {
        Json(ApiResponse::success(DispatchAck {
            status: "cancelled".to_string(),
        }))
    } else {
        Json(ApiResponse::error(ApiError {
            code: "NO_CYCLE".to_string(),
            message: "no dispatch cycle to cancel".to_string(),
        }))
    }
}

/// Operator reset of the active-incident registry
async fn reset_registry(State(state): State<AppState>) -> Json<ApiResponse<DispatchAck>> {
    {
        let mut registry = state.registry.write().await;
        registry.reset();
    }
    tracing::info!("Incident registry reset by operator");
    Json(ApiResponse::success(DispatchAck {
        status: "reset".to_string(),
    }))
}

/// Provider webhook form payload (Twilio field names)
#[derive(Debug, Deserialize)]
struct InboundReply {
    #[serde(rename = "From", default)]
    from: String,
    #[serde(rename = "Body", default)]
    body: String,
}

/// Inbound reply webhook. Always answers with exactly one TwiML message.
async fn inbound_reply(
    State(state): State<AppState>,
    Form(reply): Form<InboundReply>,
) -> impl IntoResponse {
    let ack = state.coordinator.handle_reply(&reply.from, &reply.body).await;
    (
        [(header::CONTENT_TYPE, "application/xml")],
        twiml(ack.text()),
    )
}

fn twiml(message: &str) -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?><Response><Message>{}</Message></Response>",
        message
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_twiml_wraps_message() {
        let xml = twiml("Thank you.");
        assert!(xml.starts_with("<?xml"));
        assert!(xml.contains("<Message>Thank you.</Message>"));
    }
}
