//! In-memory fakes of the storefront's outside world.
//!
//! Compiled for unit tests and, behind the `test-support` feature, for the
//! integration-test crate.

use std::collections::{HashMap, HashSet};
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;

use galeria_core::{
    Artwork, ArtworkId, LineItemId, Order, OrderId, OrderLineItem, OrderStatus, Price,
};

use crate::db::RepositoryError;
use crate::models::{NewLineItem, NewOrder, RecordOutcome, RecordedOrder};
use crate::services::{EmailError, GalleryStore, Mailer, OutgoingEmail, PaymentGateway};
use crate::stripe::{CheckoutSession, CreatedSession, NewCheckoutSession, PurchasedItem, StripeError};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// =============================================================================
// Builders
// =============================================================================

/// An available artwork with a fresh id. Panics on a malformed price.
#[must_use]
pub fn artwork(title: &str, price: &str) -> Artwork {
    Artwork {
        id: ArtworkId::generate(),
        title: title.to_string(),
        description: None,
        price: Price::new(Decimal::from_str(price).unwrap_or_else(|e| panic!("bad price {price}: {e}"))),
        image_url: format!("https://img.galeria.test/{}.jpg", title.replace(' ', "-")),
        dimensions: Some("50x70 cm".to_string()),
        technique: Some("olej na plátne".to_string()),
        year: Some(2024),
        available: true,
        created_at: Utc::now(),
    }
}

/// A purchased item as the processor reports it.
#[must_use]
pub fn purchased(
    name: &str,
    artwork_id: Option<ArtworkId>,
    unit_minor: i64,
    quantity: u32,
) -> PurchasedItem {
    PurchasedItem {
        name: name.to_string(),
        artwork_id,
        unit_price: Price::from_minor_units(unit_minor),
        quantity,
    }
}

/// The JSON object of a completed session bought by Ján Novák.
#[must_use]
pub fn completed_session_json(
    session_id: &str,
    payment_intent: &str,
    amount_total: i64,
) -> serde_json::Value {
    serde_json::json!({
        "id": session_id,
        "object": "checkout.session",
        "customer_email": "jan@x.sk",
        "customer_details": {"email": "jan@x.sk", "name": "Ján Novák", "phone": null},
        "metadata": {
            "customerName": "Ján Novák",
            "customerAddress": "Hlavná 1, Bratislava, 81101"
        },
        "amount_total": amount_total,
        "currency": "eur",
        "payment_intent": payment_intent,
        "payment_status": "paid"
    })
}

/// A completed session bought by Ján Novák.
#[must_use]
pub fn completed_session(session_id: &str, payment_intent: &str, amount_total: i64) -> CheckoutSession {
    serde_json::from_value(completed_session_json(session_id, payment_intent, amount_total))
        .unwrap_or_else(|e| panic!("session fixture does not parse: {e}"))
}

/// A `checkout.session.completed` event body.
#[must_use]
pub fn completed_event(
    event_id: &str,
    session_id: &str,
    payment_intent: &str,
    amount_total: i64,
) -> String {
    serde_json::json!({
        "id": event_id,
        "object": "event",
        "type": "checkout.session.completed",
        "data": {"object": completed_session_json(session_id, payment_intent, amount_total)}
    })
    .to_string()
}

// =============================================================================
// Payment gateway
// =============================================================================

/// Records created sessions and serves canned line items.
#[derive(Default)]
pub struct FakeGateway {
    sessions: Mutex<Vec<NewCheckoutSession>>,
    line_items: Mutex<HashMap<String, Vec<PurchasedItem>>>,
    line_item_calls: AtomicUsize,
    fail_session: AtomicBool,
    fail_line_items: AtomicBool,
}

impl FakeGateway {
    /// Sessions created so far.
    pub fn created_sessions(&self) -> Vec<NewCheckoutSession> {
        lock(&self.sessions).clone()
    }

    /// Make the next session creation fail.
    pub fn fail_next_session(&self) {
        self.fail_session.store(true, Ordering::SeqCst);
    }

    /// Make every line-item lookup fail.
    pub fn fail_line_items(&self) {
        self.fail_line_items.store(true, Ordering::SeqCst);
    }

    /// What the processor reports as paid for `session_id`.
    pub fn set_line_items(&self, session_id: &str, items: Vec<PurchasedItem>) {
        lock(&self.line_items).insert(session_id.to_string(), items);
    }

    /// Number of line-item lookups.
    pub fn line_item_calls(&self) -> usize {
        self.line_item_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PaymentGateway for FakeGateway {
    async fn create_checkout_session(
        &self,
        session: &NewCheckoutSession,
    ) -> Result<CreatedSession, StripeError> {
        if self.fail_session.swap(false, Ordering::SeqCst) {
            return Err(StripeError::Api {
                status: 500,
                message: "processor unavailable".to_string(),
            });
        }
        let mut sessions = lock(&self.sessions);
        sessions.push(session.clone());
        let id = format!("cs_test_{}", sessions.len());
        Ok(CreatedSession {
            url: format!("https://checkout.stripe.test/pay/{id}"),
            id,
        })
    }

    async fn list_line_items(&self, session_id: &str) -> Result<Vec<PurchasedItem>, StripeError> {
        self.line_item_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_line_items.load(Ordering::SeqCst) {
            return Err(StripeError::Request("connection reset".to_string()));
        }
        Ok(lock(&self.line_items)
            .get(session_id)
            .cloned()
            .unwrap_or_default())
    }
}

// =============================================================================
// Gallery store
// =============================================================================

#[derive(Default)]
struct StoreState {
    artworks: Vec<Artwork>,
    orders: Vec<Order>,
    line_items: Vec<OrderLineItem>,
}

/// Catalog and orders in memory, with the same write semantics as
/// `PgGalleryStore`: unique payment reference, conditional availability
/// flips, all-or-nothing order writes.
#[derive(Default)]
pub struct InMemoryGalleryStore {
    state: Mutex<StoreState>,
    fail_write: AtomicBool,
}

impl InMemoryGalleryStore {
    /// Add an artwork to the catalog and return it.
    pub fn insert(&self, artwork: Artwork) -> Artwork {
        lock(&self.state).artworks.push(artwork.clone());
        artwork
    }

    /// Current state of a catalog artwork.
    pub fn stored_artwork(&self, id: ArtworkId) -> Option<Artwork> {
        lock(&self.state)
            .artworks
            .iter()
            .find(|artwork| artwork.id == id)
            .cloned()
    }

    pub fn orders(&self) -> Vec<Order> {
        lock(&self.state).orders.clone()
    }

    pub fn line_items(&self) -> Vec<OrderLineItem> {
        lock(&self.state).line_items.clone()
    }

    /// Make the next order write fail before anything is stored.
    pub fn fail_next_write(&self) {
        self.fail_write.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl GalleryStore for InMemoryGalleryStore {
    async fn list_artworks(&self) -> Result<Vec<Artwork>, RepositoryError> {
        let mut artworks = lock(&self.state).artworks.clone();
        artworks.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(artworks)
    }

    async fn latest_available(&self, limit: i64) -> Result<Vec<Artwork>, RepositoryError> {
        let limit = usize::try_from(limit).unwrap_or(0);
        let artworks = self.list_artworks().await?;
        Ok(artworks
            .into_iter()
            .filter(|artwork| artwork.available)
            .take(limit)
            .collect())
    }

    async fn artwork(&self, id: ArtworkId) -> Result<Option<Artwork>, RepositoryError> {
        Ok(self.stored_artwork(id))
    }

    async fn artwork_by_title(&self, title: &str) -> Result<Option<Artwork>, RepositoryError> {
        let matching: Vec<Artwork> = self
            .list_artworks()
            .await?
            .into_iter()
            .filter(|artwork| artwork.title == title)
            .collect();
        Ok(matching
            .iter()
            .find(|artwork| artwork.available)
            .or_else(|| matching.first())
            .cloned())
    }

    async fn order_by_payment_reference(
        &self,
        reference: &str,
    ) -> Result<Option<Order>, RepositoryError> {
        Ok(lock(&self.state)
            .orders
            .iter()
            .find(|order| order.payment_reference == reference)
            .cloned())
    }

    async fn record_paid_order(
        &self,
        new_order: NewOrder,
        items: Vec<NewLineItem>,
    ) -> Result<RecordOutcome, RepositoryError> {
        if self.fail_write.swap(false, Ordering::SeqCst) {
            return Err(RepositoryError::Conflict("simulated write failure".to_string()));
        }

        let mut state = lock(&self.state);
        if let Some(existing) = state
            .orders
            .iter()
            .find(|order| order.payment_reference == new_order.payment_reference)
        {
            return Ok(RecordOutcome::AlreadyRecorded(existing.id));
        }

        let now = Utc::now();
        let mut order = Order {
            id: OrderId::generate(),
            email: new_order.email,
            customer_name: new_order.customer_name,
            shipping_address: new_order.shipping_address,
            phone: new_order.phone,
            total: new_order.total,
            status: new_order.status,
            payment_reference: new_order.payment_reference,
            checkout_session_id: new_order.checkout_session_id,
            created_at: now,
        };

        let line_items: Vec<OrderLineItem> = items
            .into_iter()
            .map(|item| OrderLineItem {
                id: LineItemId::generate(),
                order_id: order.id,
                artwork_id: item.artwork_id,
                title: item.title,
                unit_price: item.unit_price,
                created_at: now,
            })
            .collect();

        let mut flipped = HashSet::new();
        let mut double_sold = Vec::new();
        for artwork_id in line_items.iter().filter_map(|item| item.artwork_id) {
            if !flipped.insert(artwork_id) {
                continue;
            }
            match state.artworks.iter_mut().find(|a| a.id == artwork_id) {
                Some(artwork) if artwork.available => artwork.available = false,
                _ => double_sold.push(artwork_id),
            }
        }
        if !double_sold.is_empty() {
            order.status = OrderStatus::NeedsReview;
        }

        state.orders.push(order.clone());
        state.line_items.extend(line_items.iter().cloned());

        Ok(RecordOutcome::Recorded(RecordedOrder {
            order,
            line_items,
            double_sold,
        }))
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        Ok(())
    }
}

// =============================================================================
// Mailer
// =============================================================================

/// Records every send attempt; fails for chosen recipients.
#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<OutgoingEmail>>,
    attempts: AtomicUsize,
    failing: HashSet<String>,
    fail_all: bool,
}

impl RecordingMailer {
    /// Fails every send to `address`.
    #[must_use]
    pub fn failing_for(address: &str) -> Self {
        Self {
            failing: HashSet::from([address.to_string()]),
            ..Self::default()
        }
    }

    /// Fails every send.
    #[must_use]
    pub fn failing_all() -> Self {
        Self {
            fail_all: true,
            ..Self::default()
        }
    }

    /// Successfully sent emails.
    pub fn sent(&self) -> Vec<OutgoingEmail> {
        lock(&self.sent).clone()
    }

    /// Send attempts, including failed ones.
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), EmailError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.fail_all || self.failing.contains(email.to.as_str()) {
            return Err(EmailError::InvalidAddress(format!("{} rejected by relay", email.to)));
        }
        lock(&self.sent).push(email.clone());
        Ok(())
    }
}
