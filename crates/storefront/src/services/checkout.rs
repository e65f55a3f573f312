//! Checkout session initiation.
//!
//! Validates the buyer's cart and contact details, re-reads every artwork
//! from the catalog, and asks the payment processor for a hosted payment
//! session. Nothing is persisted locally: an abandoned payment leaves no
//! trace in the gallery database.

use std::sync::Arc;

use serde::Deserialize;
use thiserror::Error;
use tracing::{info, instrument, warn};
use url::Url;

use galeria_core::artwork::details_line;
use galeria_core::{Cart, CartItem, Email, EmailError as AddressError, PriceError};

use super::{GalleryStore, PaymentGateway};
use crate::db::RepositoryError;
use crate::stripe::types::{
    CUSTOMER_ADDRESS_METADATA_KEY, CUSTOMER_NAME_METADATA_KEY, CUSTOMER_PHONE_METADATA_KEY,
};
use crate::stripe::{CreatedSession, NewCheckoutSession, SessionLineItem, StripeError};

/// Placeholder Stripe substitutes with the real session id on redirect.
const SESSION_ID_PLACEHOLDER: &str = "{CHECKOUT_SESSION_ID}";

/// Errors from checkout session creation.
///
/// Display strings of validation variants are shown to buyers.
#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("Košík je prázdny")]
    EmptyCart,

    #[error("Chýba povinný údaj: {0}")]
    MissingField(&'static str),

    #[error("Neplatná emailová adresa: {0}")]
    InvalidEmail(#[from] AddressError),

    #[error("Dielo „{0}“ je jedinečné a možno ho kúpiť iba raz")]
    InvalidQuantity(String),

    #[error("Dielo „{0}“ už nie je v ponuke")]
    UnknownArtwork(String),

    #[error("Dielo „{0}“ je už predané")]
    Unavailable(String),

    #[error("Neplatná cena diela „{title}“: {source}")]
    Amount { title: String, source: PriceError },

    #[error("payment processor error: {0}")]
    Gateway(#[from] StripeError),

    #[error("database error: {0}")]
    Store(#[from] RepositoryError),
}

impl CheckoutError {
    /// Whether the buyer can fix this by changing their input.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        !matches!(self, Self::Gateway(_) | Self::Store(_) | Self::Amount { .. })
    }
}

/// Buyer contact details.
///
/// Every field defaults to empty so a missing field surfaces as a
/// [`CheckoutError::MissingField`] rather than a deserialization failure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CustomerInfo {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub address: String,
}

/// `{ items: [{artwork, quantity}], customerInfo: {name, email, phone?, address} }`
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CheckoutRequest {
    pub items: Vec<CartItem>,
    pub customer_info: CustomerInfo,
}

/// Validated buyer details.
#[derive(Debug, Clone)]
struct Buyer {
    name: String,
    email: Email,
    phone: Option<String>,
    address: String,
}

impl CustomerInfo {
    fn validate(&self) -> Result<Buyer, CheckoutError> {
        let name = required(&self.name, "meno")?;
        let email = Email::parse(&self.email).map_err(|e| match e {
            AddressError::Empty => CheckoutError::MissingField("email"),
            other => CheckoutError::InvalidEmail(other),
        })?;
        let address = required(&self.address, "adresa")?;
        let phone = self
            .phone
            .as_deref()
            .map(str::trim)
            .filter(|phone| !phone.is_empty())
            .map(String::from);

        Ok(Buyer {
            name,
            email,
            phone,
            address,
        })
    }
}

fn required(value: &str, field: &'static str) -> Result<String, CheckoutError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(CheckoutError::MissingField(field));
    }
    Ok(value.to_string())
}

/// Absolute form of an artwork image URL.
///
/// Uploaded images are stored as site-relative paths (`/uploads/..`); the
/// hosted payment page needs them resolved against the public base URL.
fn public_image_url(base_url: &str, image_url: &str) -> Option<String> {
    if image_url.trim().is_empty() {
        return None;
    }
    match Url::parse(image_url) {
        Ok(url) => Some(url.into()),
        Err(url::ParseError::RelativeUrlWithoutBase) => Url::parse(base_url)
            .and_then(|base| base.join(image_url))
            .map(String::from)
            .ok(),
        Err(_) => None,
    }
}

/// Creates hosted payment sessions.
#[derive(Clone)]
pub struct CheckoutService {
    gateway: Arc<dyn PaymentGateway>,
    store: Arc<dyn GalleryStore>,
    base_url: String,
    currency: String,
}

impl CheckoutService {
    #[must_use]
    pub fn new(
        gateway: Arc<dyn PaymentGateway>,
        store: Arc<dyn GalleryStore>,
        base_url: impl Into<String>,
        currency: impl Into<String>,
    ) -> Self {
        Self {
            gateway,
            store,
            base_url: base_url.into(),
            currency: currency.into(),
        }
    }

    /// Validate the request and create a payment session.
    ///
    /// An empty cart fails before any other check and without contacting the
    /// processor. Line items use the catalog's current title and price; each
    /// carries the artwork id in product metadata, and the session carries the
    /// buyer's name, address and phone in its metadata.
    ///
    /// # Errors
    ///
    /// Returns a validation variant of [`CheckoutError`] for bad input or
    /// unavailable artworks, and `Gateway`/`Store` for upstream failures.
    #[instrument(skip(self, request), fields(items = request.items.len()))]
    pub async fn create_session(
        &self,
        request: &CheckoutRequest,
    ) -> Result<CreatedSession, CheckoutError> {
        if request.items.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }

        let buyer = request.customer_info.validate()?;

        let mut seen = Cart::new();
        for item in &request.items {
            if item.quantity != 1 || !seen.add(item.artwork.clone()) {
                return Err(CheckoutError::InvalidQuantity(item.artwork.title.clone()));
            }
        }

        let mut line_items = Vec::with_capacity(request.items.len());
        for item in &request.items {
            let artwork = self
                .store
                .artwork(item.artwork.id)
                .await?
                .ok_or_else(|| CheckoutError::UnknownArtwork(item.artwork.title.clone()))?;
            if !artwork.available {
                warn!(artwork_id = %artwork.id, "Checkout attempted for sold artwork");
                return Err(CheckoutError::Unavailable(artwork.title));
            }

            let unit_amount = artwork
                .price
                .to_minor_units()
                .map_err(|source| CheckoutError::Amount {
                    title: artwork.title.clone(),
                    source,
                })?;
            let description =
                details_line(artwork.dimensions.as_deref(), artwork.technique.as_deref());

            line_items.push(SessionLineItem {
                artwork_id: artwork.id,
                name: artwork.title,
                description: Some(description).filter(|d| !d.is_empty()),
                image_url: public_image_url(&self.base_url, &artwork.image_url),
                unit_amount,
                quantity: 1,
            });
        }

        let mut metadata = vec![
            (CUSTOMER_NAME_METADATA_KEY.to_string(), buyer.name),
            (CUSTOMER_ADDRESS_METADATA_KEY.to_string(), buyer.address),
        ];
        if let Some(phone) = buyer.phone {
            metadata.push((CUSTOMER_PHONE_METADATA_KEY.to_string(), phone));
        }

        let params = NewCheckoutSession {
            line_items,
            customer_email: buyer.email.into_inner(),
            metadata,
            success_url: format!(
                "{}/uspech?session_id={SESSION_ID_PLACEHOLDER}",
                self.base_url
            ),
            cancel_url: format!("{}/kosik", self.base_url),
            currency: self.currency.clone(),
        };

        let session = self.gateway.create_checkout_session(&params).await?;
        info!(session_id = %session.id, "Checkout session created");
        Ok(session)
    }
}
