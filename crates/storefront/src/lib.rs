//! Galéria Umenia storefront library.
//!
//! The public gallery site: catalog pages, a session cart, checkout through
//! Stripe's hosted payment page, and the signed webhook that turns a
//! captured payment into an order.
//!
//! The router is built here so it can be driven in-process by tests; the
//! binary only adds configuration, tracing, Sentry and the listener.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod filters;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
pub mod stripe;
pub mod telemetry;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;

use std::path::Path;

use axum::{Router, middleware::from_fn};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Directory of stylesheets and images, relative to the workspace root.
pub const STATIC_DIR: &str = "crates/storefront/static";

/// Build the storefront router with its middleware stack.
///
/// `upload_dir` is the admin panel's image directory, served under `/uploads`.
pub fn app(state: AppState, upload_dir: &Path) -> Router {
    let session_layer = middleware::create_session_layer(state.secure_cookies());

    Router::new()
        .merge(routes::routes())
        .nest_service("/static", ServeDir::new(STATIC_DIR))
        .nest_service("/uploads", ServeDir::new(upload_dir))
        .layer(session_layer)
        .layer(from_fn(middleware::security_headers_middleware))
        .layer(from_fn(middleware::request_id_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
