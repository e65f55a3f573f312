//! HTTP route handlers for admin.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                  - Liveness check (no auth)
//! GET  /health/ready            - Database check (no auth)
//!
//! # Artworks
//! GET  /                        - Artwork list, newest first
//! GET  /obrazy/novy             - New artwork form
//! POST /obrazy                  - Create artwork (multipart, image required)
//! GET  /obrazy/{id}/upravit     - Edit form
//! POST /obrazy/{id}             - Update artwork (multipart, image optional)
//! POST /obrazy/{id}/vymazat     - Delete artwork and its uploaded image
//!
//! # Orders
//! GET  /objednavky              - Reconciled orders, flagged ones highlighted
//!
//! # Uploads
//! GET  /uploads/*               - Uploaded images
//! ```
//!
//! Everything except the health checks requires HTTP Basic credentials.

pub mod artworks;
pub mod health;
pub mod orders;

use axum::{
    Router,
    middleware::from_fn_with_state,
    routing::{get, post},
};
use tower_http::services::ServeDir;

use crate::middleware::require_basic_auth;
use crate::state::AppState;

/// Build the admin router.
pub fn routes(state: &AppState, upload_dir: &std::path::Path) -> Router<AppState> {
    let protected = Router::new()
        .route("/", get(artworks::index))
        .route("/obrazy/novy", get(artworks::new_form))
        .route("/obrazy", post(artworks::create))
        .route("/obrazy/{id}/upravit", get(artworks::edit_form))
        .route("/obrazy/{id}", post(artworks::update))
        .route("/obrazy/{id}/vymazat", post(artworks::delete))
        .route("/objednavky", get(orders::index))
        .nest_service("/uploads", ServeDir::new(upload_dir))
        .route_layer(from_fn_with_state(state.clone(), require_basic_auth));

    Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
        .merge(protected)
}
