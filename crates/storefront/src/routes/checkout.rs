//! Checkout form and success page.
//!
//! The form posts the buyer's details; the cart comes from the session. On
//! success the buyer is sent to Stripe's hosted payment page, which returns
//! them to `/uspech` (paid) or `/kosik` (cancelled).

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tracing::{error, instrument, warn};

use super::cart::{CartStore, CartView};
use crate::error::Result;
use crate::filters;
use crate::services::{CheckoutRequest, CustomerInfo};
use crate::state::AppState;

/// Buyer details as submitted by the form.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CheckoutForm {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
}

impl From<CheckoutForm> for CustomerInfo {
    fn from(form: CheckoutForm) -> Self {
        Self {
            name: form.name,
            email: form.email,
            phone: Some(form.phone).filter(|phone| !phone.trim().is_empty()),
            address: form.address,
        }
    }
}

/// Checkout form template.
#[derive(Template, WebTemplate)]
#[template(path = "checkout/form.html")]
pub struct CheckoutTemplate {
    pub cart: CartView,
    pub form: CheckoutForm,
    pub error: Option<String>,
    pub cart_count: u32,
}

/// Payment success template.
#[derive(Template, WebTemplate)]
#[template(path = "checkout/success.html")]
pub struct SuccessTemplate {
    pub session_id: Option<String>,
    pub cart_count: u32,
}

/// Success page query string.
#[derive(Debug, Deserialize)]
pub struct SuccessQuery {
    pub session_id: Option<String>,
}

/// Display the buyer details form. An empty cart goes back to the cart page.
#[instrument(skip(cart))]
pub async fn form(cart: CartStore) -> Response {
    if cart.cart().is_empty() {
        return Redirect::to("/kosik").into_response();
    }

    CheckoutTemplate {
        cart: CartView::from(cart.cart()),
        form: CheckoutForm::default(),
        error: None,
        cart_count: cart.cart().item_count(),
    }
    .into_response()
}

/// Create a payment session for the session cart and redirect to it.
///
/// Failures re-render the form with a plain message and keep the input.
#[instrument(skip(state, cart, form))]
pub async fn submit(
    State(state): State<AppState>,
    cart: CartStore,
    Form(form): Form<CheckoutForm>,
) -> Response {
    let request = CheckoutRequest {
        items: cart.cart().items().to_vec(),
        customer_info: form.clone().into(),
    };

    match state.checkout().create_session(&request).await {
        Ok(session) => Redirect::to(&session.url).into_response(),
        Err(e) => {
            let (status, message) = if e.is_validation() {
                warn!(error = %e, "Checkout rejected");
                (StatusCode::BAD_REQUEST, e.to_string())
            } else {
                let event_id = sentry::capture_error(&e);
                error!(error = %e, sentry_event_id = %event_id, "Checkout failed");
                (
                    StatusCode::BAD_GATEWAY,
                    "Platbu sa nepodarilo spustiť, skúste to prosím znova".to_string(),
                )
            };

            (
                status,
                CheckoutTemplate {
                    cart: CartView::from(cart.cart()),
                    form,
                    error: Some(message),
                    cart_count: cart.cart().item_count(),
                },
            )
                .into_response()
        }
    }
}

/// Thank the buyer and empty their cart.
///
/// Reaching this page does not prove payment; the order is recorded only
/// from the signed webhook.
#[instrument(skip(cart))]
pub async fn success(
    mut cart: CartStore,
    Query(query): Query<SuccessQuery>,
) -> Result<SuccessTemplate> {
    cart.clear().await?;

    Ok(SuccessTemplate {
        session_id: query.session_id,
        cart_count: 0,
    })
}
