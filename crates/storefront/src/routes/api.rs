//! JSON checkout endpoint.
//!
//! `POST /api/create-checkout-session` with
//! `{ items: [{artwork, quantity}], customerInfo: {name, email, phone?, address} }`
//! answers `{ url }`, or `{ error }` with 400 for validation failures and 500
//! when the payment processor or database fails.

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tracing::{error, instrument, warn};

use crate::services::CheckoutRequest;
use crate::state::AppState;

/// Success body.
#[derive(Debug, Serialize)]
pub struct CheckoutSessionResponse {
    pub url: String,
}

/// Error body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn error_response(status: StatusCode, error: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: error.into(),
        }),
    )
        .into_response()
}

/// Create a hosted payment session.
#[instrument(skip(state, payload))]
pub async fn create_checkout_session(
    State(state): State<AppState>,
    payload: Result<Json<CheckoutRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match payload {
        Ok(request) => request,
        Err(rejection) => {
            warn!(error = %rejection.body_text(), "Malformed checkout request");
            return error_response(StatusCode::BAD_REQUEST, "Neplatná požiadavka");
        }
    };

    match state.checkout().create_session(&request).await {
        Ok(session) => Json(CheckoutSessionResponse { url: session.url }).into_response(),
        Err(e) if e.is_validation() => {
            warn!(error = %e, "Checkout rejected");
            error_response(StatusCode::BAD_REQUEST, e.to_string())
        }
        Err(e) => {
            let event_id = sentry::capture_error(&e);
            error!(error = %e, sentry_event_id = %event_id, "Checkout session creation failed");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Nepodarilo sa vytvoriť platobnú reláciu",
            )
        }
    }
}
