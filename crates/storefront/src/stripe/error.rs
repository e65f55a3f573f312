//! Stripe API error types.

use thiserror::Error;

/// Errors from the Stripe REST API.
#[derive(Debug, Error)]
pub enum StripeError {
    /// HTTP request failed before a response arrived.
    #[error("Stripe request failed: {0}")]
    Request(String),

    /// Failed to parse a response body.
    #[error("Stripe response error: {0}")]
    Response(String),

    /// Stripe returned an error object.
    #[error("Stripe API error ({status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Stripe's error message.
        message: String,
    },
}
