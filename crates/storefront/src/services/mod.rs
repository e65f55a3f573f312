//! Business logic services for the storefront.
//!
//! # Services
//!
//! - [`checkout`] - Turns a cart and buyer details into a hosted payment session
//! - [`reconcile`] - Turns a verified "session completed" event into a persisted order
//! - [`notifier`] - Best-effort order emails to the buyer and the gallery
//! - [`email`] - SMTP transport and email templates
//!
//! # Seams
//!
//! The services talk to the outside world through three traits so they can
//! run against in-memory fakes in tests:
//!
//! - [`PaymentGateway`] - the payment processor (Stripe in production)
//! - [`GalleryStore`] - catalog reads and the atomic order write (`PostgreSQL`)
//! - [`Mailer`] - outgoing mail (SMTP)

pub mod checkout;
pub mod email;
pub mod notifier;
pub mod reconcile;

use async_trait::async_trait;

use galeria_core::{Artwork, ArtworkId, Email, Order};

use crate::db::RepositoryError;
use crate::models::{NewLineItem, NewOrder, RecordOutcome};
use crate::stripe::{CreatedSession, NewCheckoutSession, PurchasedItem, StripeClient, StripeError};

pub use checkout::{CheckoutError, CheckoutRequest, CheckoutService, CustomerInfo};
pub use email::{EmailError, EmailService};
pub use notifier::{NotificationReport, Notifier};
pub use reconcile::{OrderReconciler, ReconcileError, ReconcileOutcome, Stage};

/// The payment processor.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Create a hosted payment session.
    async fn create_checkout_session(
        &self,
        session: &NewCheckoutSession,
    ) -> Result<CreatedSession, StripeError>;

    /// The processor's authoritative record of what a session paid for.
    async fn list_line_items(&self, session_id: &str) -> Result<Vec<PurchasedItem>, StripeError>;
}

#[async_trait]
impl PaymentGateway for StripeClient {
    async fn create_checkout_session(
        &self,
        session: &NewCheckoutSession,
    ) -> Result<CreatedSession, StripeError> {
        Self::create_checkout_session(self, session).await
    }

    async fn list_line_items(&self, session_id: &str) -> Result<Vec<PurchasedItem>, StripeError> {
        let items = Self::list_line_items(self, session_id).await?;
        Ok(items.into_iter().map(PurchasedItem::from).collect())
    }
}

/// Catalog reads and order persistence.
#[async_trait]
pub trait GalleryStore: Send + Sync {
    /// All artworks, newest first.
    async fn list_artworks(&self) -> Result<Vec<Artwork>, RepositoryError>;

    /// Newest artworks still for sale.
    async fn latest_available(&self, limit: i64) -> Result<Vec<Artwork>, RepositoryError>;

    async fn artwork(&self, id: ArtworkId) -> Result<Option<Artwork>, RepositoryError>;

    /// Exact-title lookup, used when a purchased product carries no artwork id.
    async fn artwork_by_title(&self, title: &str) -> Result<Option<Artwork>, RepositoryError>;

    async fn order_by_payment_reference(
        &self,
        reference: &str,
    ) -> Result<Option<Order>, RepositoryError>;

    /// Write an order, its line items and the availability flips as one unit.
    async fn record_paid_order(
        &self,
        order: NewOrder,
        items: Vec<NewLineItem>,
    ) -> Result<RecordOutcome, RepositoryError>;

    /// Connectivity check for readiness probes.
    async fn ping(&self) -> Result<(), RepositoryError>;
}

/// A rendered email ready to send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingEmail {
    pub to: Email,
    pub subject: String,
    pub text: String,
    pub html: String,
}

/// Outgoing mail transport.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), EmailError>;
}
