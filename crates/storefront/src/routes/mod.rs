//! HTTP route handlers for the storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                             - Home page (newest available artworks)
//! GET  /health                       - Liveness check
//! GET  /health/ready                 - Readiness check (database ping)
//!
//! # Catalog
//! GET  /galeria                      - All artworks, newest first
//! GET  /obraz/{id}                   - Artwork detail
//!
//! # Cart (session-backed)
//! GET  /kosik                        - Cart page
//! POST /kosik/pridat                 - Add artwork (redirects to /kosik)
//! POST /kosik/odstranit              - Remove artwork (redirects to /kosik)
//! GET  /kosik/pocet                  - Cart count (plain text)
//!
//! # Checkout
//! GET  /objednavka                   - Buyer details form
//! POST /objednavka                   - Create payment session, 303 to Stripe
//! GET  /uspech?session_id=...        - Payment success page, clears the cart
//!
//! # API
//! POST /api/create-checkout-session  - JSON checkout session creation
//! POST /api/webhook/stripe           - Stripe webhook (signed)
//! ```

pub mod api;
pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod health;
pub mod webhooks;

use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .route("/pridat", post(cart::add))
        .route("/odstranit", post(cart::remove))
        .route("/pocet", get(cart::count))
}

/// Create the JSON API routes router.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/create-checkout-session",
            post(api::create_checkout_session),
        )
        .route("/webhook/stripe", post(webhooks::stripe))
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        // Catalog
        .route("/", get(catalog::home))
        .route("/galeria", get(catalog::index))
        .route("/obraz/{id}", get(catalog::show))
        // Cart
        .nest("/kosik", cart_routes())
        // Checkout
        .route(
            "/objednavka",
            get(checkout::form).post(checkout::submit),
        )
        .route("/uspech", get(checkout::success))
        // API
        .nest("/api", api_routes())
        // Health
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
}
