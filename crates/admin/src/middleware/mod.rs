//! HTTP middleware stack for admin.
//!
//! # Middleware Order (bottom to top in Router)
//!
//! 1. Sentry layer (capture errors, added in `main`)
//! 2. `TraceLayer` (request tracing)
//! 3. Security headers
//! 4. Basic auth (every route except health checks)

pub mod auth;
pub mod security_headers;

pub use auth::require_basic_auth;
pub use security_headers::security_headers;
