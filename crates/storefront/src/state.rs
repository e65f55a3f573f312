//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use galeria_core::Email;

use crate::config::StorefrontConfig;
use crate::db::PgGalleryStore;
use crate::services::{
    CheckoutService, EmailError, EmailService, GalleryStore, Mailer, Notifier, OrderReconciler,
    PaymentGateway,
};
use crate::stripe::{StripeClient, WebhookVerifier};

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to the
/// gallery store and the checkout and reconciliation services.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    store: Arc<dyn GalleryStore>,
    checkout: CheckoutService,
    reconciler: OrderReconciler,
    verifier: WebhookVerifier,
    secure_cookies: bool,
}

/// The collaborators a state is assembled from.
pub struct StateParts {
    pub gateway: Arc<dyn PaymentGateway>,
    pub store: Arc<dyn GalleryStore>,
    pub mailer: Arc<dyn Mailer>,
    pub admin_address: Option<Email>,
    pub verifier: WebhookVerifier,
    /// Public base URL without trailing slash.
    pub base_url: String,
    pub currency: String,
}

impl AppState {
    /// Create the production state: Stripe, `PostgreSQL` and SMTP.
    ///
    /// # Errors
    ///
    /// Returns an error if the SMTP transport cannot be configured.
    pub fn new(config: &StorefrontConfig, pool: PgPool) -> Result<Self, EmailError> {
        let mailer = EmailService::new(&config.email)?;

        Ok(Self::from_parts(StateParts {
            gateway: Arc::new(StripeClient::new(&config.stripe)),
            store: Arc::new(PgGalleryStore::new(pool)),
            mailer: Arc::new(mailer),
            admin_address: config.email.admin_address.clone(),
            verifier: WebhookVerifier::new(
                config.stripe.webhook_secret.clone(),
                config.stripe.webhook_tolerance_secs,
            ),
            base_url: config.base_url.clone(),
            currency: config.stripe.currency.clone(),
        }))
    }

    /// Assemble a state from explicit collaborators.
    #[must_use]
    pub fn from_parts(parts: StateParts) -> Self {
        let secure_cookies = parts.base_url.starts_with("https://");
        let checkout = CheckoutService::new(
            parts.gateway.clone(),
            parts.store.clone(),
            parts.base_url,
            parts.currency,
        );
        let notifier = Notifier::new(parts.mailer, parts.admin_address);
        let reconciler = OrderReconciler::new(parts.gateway, parts.store.clone(), notifier);

        Self {
            inner: Arc::new(AppStateInner {
                store: parts.store,
                checkout,
                reconciler,
                verifier: parts.verifier,
                secure_cookies,
            }),
        }
    }

    /// Catalog reads and order persistence.
    #[must_use]
    pub fn store(&self) -> &dyn GalleryStore {
        self.inner.store.as_ref()
    }

    #[must_use]
    pub fn checkout(&self) -> &CheckoutService {
        &self.inner.checkout
    }

    #[must_use]
    pub fn reconciler(&self) -> &OrderReconciler {
        &self.inner.reconciler
    }

    #[must_use]
    pub fn verifier(&self) -> &WebhookVerifier {
        &self.inner.verifier
    }

    /// Whether the session cookie should be marked `Secure`.
    #[must_use]
    pub fn secure_cookies(&self) -> bool {
        self.inner.secure_cookies
    }
}
