//! Stripe webhook endpoint.
//!
//! The raw body is verified against the `Stripe-Signature` header before
//! anything is parsed. Responses:
//!
//! - 400 `{error: "No signature"}` when the header is missing
//! - 400 `{error: "Webhook signature verification failed"}` for any other
//!   verification failure
//! - 500 `{error: "Failed to process order", details}` when reconciliation
//!   fails, so Stripe retries the delivery
//! - 200 `{received: true}` otherwise, including ignored event types and
//!   redeliveries of an already recorded payment

use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use serde_json::json;
use tracing::{error, info, instrument, warn};

use crate::services::ReconcileOutcome;
use crate::state::AppState;
use crate::stripe::{WebhookError, webhook::SIGNATURE_HEADER};

/// Receive a Stripe event.
#[instrument(skip(state, headers, body), fields(bytes = body.len()))]
pub async fn stripe(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> Response {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok());

    let event = match state.verifier().verify(&body, signature) {
        Ok(event) => event,
        Err(WebhookError::MissingSignature) => {
            warn!("Webhook without signature rejected");
            return (StatusCode::BAD_REQUEST, Json(json!({"error": "No signature"})))
                .into_response();
        }
        Err(e) => {
            warn!(error = %e, "Webhook signature verification failed");
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({"error": "Webhook signature verification failed"})),
            )
                .into_response();
        }
    };

    match state.reconciler().handle(event).await {
        Ok(outcome) => {
            match &outcome {
                ReconcileOutcome::Completed(order) => {
                    info!(order_id = %order.order.id, status = %order.order.status, "Order recorded");
                }
                ReconcileOutcome::AlreadyProcessed { order_id } => {
                    info!(%order_id, "Duplicate delivery acknowledged");
                }
                ReconcileOutcome::Ignored { .. } => {}
            }
            (StatusCode::OK, Json(json!({"received": true}))).into_response()
        }
        Err(e) => {
            let event_id = sentry::capture_error(&e);
            error!(error = %e, sentry_event_id = %event_id, "Webhook processing failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "error": "Failed to process order",
                    "details": e.to_string(),
                })),
            )
                .into_response()
        }
    }
}
