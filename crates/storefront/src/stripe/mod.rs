//! Stripe integration.
//!
//! - [`StripeClient`] - REST client for Checkout Sessions and their line items
//! - [`WebhookVerifier`] - `Stripe-Signature` verification for inbound events
//! - [`types`] - Wire types for sessions, line items and events

mod client;
mod error;
pub mod types;
pub mod webhook;

pub use client::StripeClient;
pub use error::StripeError;
pub use types::{
    CheckoutSession, CreatedSession, NewCheckoutSession, PurchasedItem, SessionLineItem,
};
pub use webhook::{WebhookError, WebhookEvent, WebhookVerifier};
