//! Stripe wire types.
//!
//! Only the fields the storefront reads are modelled; everything else in
//! Stripe's payloads is ignored.

use std::collections::HashMap;

use serde::Deserialize;

use galeria_core::{ArtworkId, Price};

/// Product metadata key carrying the artwork's primary key.
pub const ARTWORK_ID_METADATA_KEY: &str = "artwork_id";
/// Session metadata keys for buyer details.
pub const CUSTOMER_NAME_METADATA_KEY: &str = "customerName";
pub const CUSTOMER_ADDRESS_METADATA_KEY: &str = "customerAddress";
pub const CUSTOMER_PHONE_METADATA_KEY: &str = "customerPhone";

// =============================================================================
// Responses
// =============================================================================

/// A field that is either an id or, when expanded, the full object.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Expandable<T> {
    Id(String),
    Object(Box<T>),
}

impl<T: HasId> Expandable<T> {
    /// The referenced object's id.
    #[must_use]
    pub fn id(&self) -> &str {
        match self {
            Self::Id(id) => id,
            Self::Object(object) => object.id(),
        }
    }
}

impl<T> Expandable<T> {
    /// The expanded object, if present.
    #[must_use]
    pub fn object(&self) -> Option<&T> {
        match self {
            Self::Id(_) => None,
            Self::Object(object) => Some(object),
        }
    }
}

/// Objects identified by a Stripe id.
pub trait HasId {
    fn id(&self) -> &str;
}

/// A Checkout Session, as delivered in `checkout.session.completed`.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    #[serde(default)]
    pub customer_email: Option<String>,
    #[serde(default)]
    pub customer_details: Option<CustomerDetails>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    /// Total in minor units.
    #[serde(default)]
    pub amount_total: Option<i64>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub payment_intent: Option<Expandable<PaymentIntent>>,
    #[serde(default)]
    pub payment_status: Option<String>,
    /// Hosted payment page URL (only present while the session is open).
    #[serde(default)]
    pub url: Option<String>,
}

impl CheckoutSession {
    /// Buyer email: session-level first, then the one collected at payment.
    #[must_use]
    pub fn buyer_email(&self) -> Option<&str> {
        self.customer_email
            .as_deref()
            .or_else(|| {
                self.customer_details
                    .as_ref()
                    .and_then(|details| details.email.as_deref())
            })
            .map(str::trim)
            .filter(|email| !email.is_empty())
    }

    /// The idempotency key for this payment: the payment-intent id, or the
    /// session id when Stripe reports none.
    #[must_use]
    pub fn payment_reference(&self) -> &str {
        self.payment_intent
            .as_ref()
            .map_or(self.id.as_str(), Expandable::id)
    }

    /// A metadata value, trimmed; empty strings count as absent.
    #[must_use]
    pub fn metadata_value(&self, key: &str) -> Option<&str> {
        self.metadata
            .get(key)
            .map(|value| value.trim())
            .filter(|value| !value.is_empty())
    }

    /// Processor-reported total.
    #[must_use]
    pub fn total(&self) -> Option<Price> {
        self.amount_total.map(Price::from_minor_units)
    }
}

/// Buyer details collected on the hosted payment page.
#[derive(Debug, Clone, Deserialize)]
pub struct CustomerDetails {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

/// The payment intent behind a session.
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentIntent {
    pub id: String,
}

impl HasId for PaymentIntent {
    fn id(&self) -> &str {
        &self.id
    }
}

/// A page of a Stripe list endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct List<T> {
    pub data: Vec<T>,
    #[serde(default)]
    pub has_more: bool,
}

/// A purchased line item of a session.
#[derive(Debug, Clone, Deserialize)]
pub struct LineItem {
    pub id: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Line total in minor units.
    #[serde(default)]
    pub amount_total: i64,
    #[serde(default)]
    pub quantity: Option<u32>,
    #[serde(default)]
    pub price: Option<LineItemPrice>,
}

/// The price a line item was bought at.
#[derive(Debug, Clone, Deserialize)]
pub struct LineItemPrice {
    pub id: String,
    #[serde(default)]
    pub unit_amount: Option<i64>,
    pub product: Expandable<Product>,
}

/// A Stripe product (created inline per session from `product_data`).
#[derive(Debug, Clone, Deserialize)]
pub struct Product {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl HasId for Product {
    fn id(&self) -> &str {
        &self.id
    }
}

/// A freshly created session: its id and hosted payment page URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedSession {
    pub id: String,
    pub url: String,
}

// =============================================================================
// Processor-neutral views
// =============================================================================

/// What the processor says was actually paid for, one entry per line item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PurchasedItem {
    /// Product name as shown on the payment page.
    pub name: String,
    /// Artwork id carried through product metadata, if any.
    pub artwork_id: Option<ArtworkId>,
    pub unit_price: Price,
    pub quantity: u32,
}

impl From<LineItem> for PurchasedItem {
    fn from(item: LineItem) -> Self {
        let quantity = item.quantity.unwrap_or(1).max(1);
        let product = item.price.as_ref().and_then(|price| price.product.object());

        let name = product
            .map(|product| product.name.trim())
            .filter(|name| !name.is_empty())
            .or(item.description.as_deref().map(str::trim))
            .unwrap_or_default()
            .to_string();

        let artwork_id = product
            .and_then(|product| product.metadata.get(ARTWORK_ID_METADATA_KEY))
            .and_then(|raw| raw.parse::<ArtworkId>().ok());

        let unit_minor = item
            .price
            .as_ref()
            .and_then(|price| price.unit_amount)
            .unwrap_or(item.amount_total / i64::from(quantity));

        Self {
            name,
            artwork_id,
            unit_price: Price::from_minor_units(unit_minor),
            quantity,
        }
    }
}

// =============================================================================
// Requests
// =============================================================================

/// Parameters for creating a hosted Checkout Session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCheckoutSession {
    pub line_items: Vec<SessionLineItem>,
    pub customer_email: String,
    /// Opaque metadata that round-trips to the webhook.
    pub metadata: Vec<(String, String)>,
    pub success_url: String,
    pub cancel_url: String,
    pub currency: String,
}

/// One price-bearing line of a new session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionLineItem {
    pub artwork_id: ArtworkId,
    pub name: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    /// Unit amount in minor units.
    pub unit_amount: i64,
    pub quantity: u32,
}

impl NewCheckoutSession {
    /// Encode as Stripe's bracketed form parameters.
    #[must_use]
    pub fn to_form(&self) -> Vec<(String, String)> {
        let mut params = vec![
            ("mode".to_string(), "payment".to_string()),
            ("payment_method_types[0]".to_string(), "card".to_string()),
            ("customer_email".to_string(), self.customer_email.clone()),
            ("success_url".to_string(), self.success_url.clone()),
            ("cancel_url".to_string(), self.cancel_url.clone()),
        ];

        for (i, item) in self.line_items.iter().enumerate() {
            let price = format!("line_items[{i}][price_data]");
            let product = format!("{price}[product_data]");

            params.push((format!("{price}[currency]"), self.currency.clone()));
            params.push((format!("{price}[unit_amount]"), item.unit_amount.to_string()));
            params.push((format!("{product}[name]"), item.name.clone()));
            if let Some(description) = item.description.as_deref().filter(|d| !d.is_empty()) {
                params.push((format!("{product}[description]"), description.to_string()));
            }
            if let Some(image_url) = item.image_url.as_deref().filter(|u| !u.is_empty()) {
                params.push((format!("{product}[images][0]"), image_url.to_string()));
            }
            params.push((
                format!("{product}[metadata][{ARTWORK_ID_METADATA_KEY}]"),
                item.artwork_id.to_string(),
            ));
            params.push((
                format!("line_items[{i}][quantity]"),
                item.quantity.to_string(),
            ));
        }

        for (key, value) in &self.metadata {
            params.push((format!("metadata[{key}]"), value.clone()));
        }

        params
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn param<'a>(params: &'a [(String, String)], key: &str) -> Option<&'a str> {
        params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    #[test]
    fn test_session_form_encoding() {
        let artwork_id: ArtworkId = "6f1c2a52-2d5e-4a0e-9c43-2f1f0a8c9b11".parse().unwrap();
        let session = NewCheckoutSession {
            line_items: vec![SessionLineItem {
                artwork_id,
                name: "Artwork A".to_string(),
                description: Some("50x70 cm - olej".to_string()),
                image_url: None,
                unit_amount: 12_000,
                quantity: 1,
            }],
            customer_email: "jan@x.sk".to_string(),
            metadata: vec![("customerName".to_string(), "Ján Novák".to_string())],
            success_url: "https://galeria.sk/uspech?session_id={CHECKOUT_SESSION_ID}".to_string(),
            cancel_url: "https://galeria.sk/kosik".to_string(),
            currency: "eur".to_string(),
        };

        let params = session.to_form();
        assert_eq!(param(&params, "mode"), Some("payment"));
        assert_eq!(param(&params, "customer_email"), Some("jan@x.sk"));
        assert_eq!(
            param(&params, "line_items[0][price_data][unit_amount]"),
            Some("12000")
        );
        assert_eq!(
            param(&params, "line_items[0][price_data][currency]"),
            Some("eur")
        );
        assert_eq!(
            param(
                &params,
                "line_items[0][price_data][product_data][metadata][artwork_id]"
            ),
            Some("6f1c2a52-2d5e-4a0e-9c43-2f1f0a8c9b11")
        );
        assert_eq!(param(&params, "metadata[customerName]"), Some("Ján Novák"));
        assert!(param(&params, "line_items[0][price_data][product_data][images][0]").is_none());
    }

    #[test]
    fn test_checkout_session_fallbacks() {
        let session: CheckoutSession = serde_json::from_str(
            r#"{
                "id": "cs_test_1",
                "customer_email": null,
                "customer_details": {"email": "jan@x.sk"},
                "amount_total": 12000,
                "payment_intent": null,
                "metadata": {"customerName": " Ján Novák ", "customerPhone": ""}
            }"#,
        )
        .unwrap();

        assert_eq!(session.buyer_email(), Some("jan@x.sk"));
        assert_eq!(session.payment_reference(), "cs_test_1");
        assert_eq!(session.metadata_value("customerName"), Some("Ján Novák"));
        assert_eq!(session.metadata_value("customerPhone"), None);
        assert_eq!(session.total().unwrap().to_string(), "120.00");
    }

    #[test]
    fn test_payment_reference_prefers_payment_intent() {
        let session: CheckoutSession =
            serde_json::from_str(r#"{"id": "cs_test_1", "payment_intent": "pi_123"}"#).unwrap();
        assert_eq!(session.payment_reference(), "pi_123");

        let session: CheckoutSession = serde_json::from_str(
            r#"{"id": "cs_test_1", "payment_intent": {"id": "pi_456", "status": "succeeded"}}"#,
        )
        .unwrap();
        assert_eq!(session.payment_reference(), "pi_456");
    }

    #[test]
    fn test_purchased_item_from_expanded_line_item() {
        let item: LineItem = serde_json::from_str(
            r#"{
                "id": "li_1",
                "description": "Artwork A",
                "amount_total": 12000,
                "quantity": 1,
                "price": {
                    "id": "price_1",
                    "unit_amount": 12000,
                    "product": {
                        "id": "prod_1",
                        "name": "Artwork A",
                        "metadata": {"artwork_id": "6f1c2a52-2d5e-4a0e-9c43-2f1f0a8c9b11"}
                    }
                }
            }"#,
        )
        .unwrap();

        let purchased = PurchasedItem::from(item);
        assert_eq!(purchased.name, "Artwork A");
        assert_eq!(
            purchased.artwork_id.unwrap().to_string(),
            "6f1c2a52-2d5e-4a0e-9c43-2f1f0a8c9b11"
        );
        assert_eq!(purchased.unit_price.to_minor_units().unwrap(), 12_000);
        assert_eq!(purchased.quantity, 1);
    }

    #[test]
    fn test_purchased_item_without_expansion() {
        let item: LineItem = serde_json::from_str(
            r#"{
                "id": "li_2",
                "description": "Starý obraz",
                "amount_total": 9000,
                "quantity": 2,
                "price": {"id": "price_2", "product": "prod_2"}
            }"#,
        )
        .unwrap();

        let purchased = PurchasedItem::from(item);
        assert_eq!(purchased.name, "Starý obraz");
        assert!(purchased.artwork_id.is_none());
        assert_eq!(purchased.unit_price.to_string(), "45.00");
        assert_eq!(purchased.quantity, 2);
    }
}
