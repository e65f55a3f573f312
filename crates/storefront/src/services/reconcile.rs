//! Order reconciliation.
//!
//! Turns a verified `checkout.session.completed` event into a persisted
//! order. The processor's line items are authoritative; the client cart is
//! never consulted. Stages:
//!
//! ```text
//! event received -> verified -> line items fetched -> order persisted
//!   -> line items persisted -> inventory updated -> notified -> done
//! ```
//!
//! Order, line items and availability flips are written in one transaction
//! keyed by the payment reference, so redelivery of the same event records
//! nothing new. Problems that do not justify losing a captured payment
//! (unmatched product, double sale, total mismatch) mark the order
//! `needs_review` instead of failing.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, error, info, instrument, warn};

use galeria_core::{
    Artwork, ArtworkId, Email, EmailError as AddressError, Order, OrderId, OrderLineItem,
    OrderStatus, Price, order::line_items_total,
};

use super::email::{OrderSummary, SummaryItem};
use super::notifier::{NotificationReport, Notifier};
use super::{GalleryStore, PaymentGateway};
use crate::db::RepositoryError;
use crate::models::{NewLineItem, NewOrder, RecordOutcome};
use crate::stripe::types::{
    CUSTOMER_ADDRESS_METADATA_KEY, CUSTOMER_NAME_METADATA_KEY, CUSTOMER_PHONE_METADATA_KEY,
};
use crate::stripe::{CheckoutSession, PurchasedItem, StripeError, WebhookEvent};

/// Reconciliation progress, logged on every transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    EventReceived,
    Verified,
    LineItemsFetched,
    OrderPersisted,
    LineItemsPersisted,
    InventoryUpdated,
    Notified,
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::EventReceived => "event_received",
            Self::Verified => "verified",
            Self::LineItemsFetched => "line_items_fetched",
            Self::OrderPersisted => "order_persisted",
            Self::LineItemsPersisted => "line_items_persisted",
            Self::InventoryUpdated => "inventory_updated",
            Self::Notified => "notified",
            Self::Done => "done",
        };
        f.write_str(name)
    }
}

/// Reconciliation failures. The payment stays captured; Stripe retries
/// delivery after a non-2xx response.
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("session {session_id} has no usable customer email")]
    CustomerEmail {
        session_id: String,
        #[source]
        source: Option<AddressError>,
    },

    #[error("payment processor failed after stage {stage}: {source}")]
    Gateway {
        stage: Stage,
        #[source]
        source: StripeError,
    },

    #[error("database failed after stage {stage}: {source}")]
    Store {
        stage: Stage,
        #[source]
        source: RepositoryError,
    },
}

/// A freshly reconciled order.
#[derive(Debug, Clone)]
pub struct ReconciledOrder {
    pub order: Order,
    pub line_items: Vec<OrderLineItem>,
    /// Purchased products that matched no artwork.
    pub unmatched: Vec<String>,
    /// Artworks that were already sold to someone else.
    pub double_sold: Vec<ArtworkId>,
    pub notifications: NotificationReport,
}

/// What handling one event amounted to.
#[derive(Debug, Clone)]
pub enum ReconcileOutcome {
    /// Not a completed checkout; acknowledged without action.
    Ignored { kind: String },
    /// This payment was already recorded.
    AlreadyProcessed { order_id: OrderId },
    Completed(Box<ReconciledOrder>),
}

/// A processor line item resolved against the catalog.
struct MatchedItem {
    purchased: PurchasedItem,
    artwork: Option<Artwork>,
}

/// Reconciles completed checkout sessions into orders.
#[derive(Clone)]
pub struct OrderReconciler {
    gateway: Arc<dyn PaymentGateway>,
    store: Arc<dyn GalleryStore>,
    notifier: Notifier,
}

impl OrderReconciler {
    #[must_use]
    pub fn new(
        gateway: Arc<dyn PaymentGateway>,
        store: Arc<dyn GalleryStore>,
        notifier: Notifier,
    ) -> Self {
        Self {
            gateway,
            store,
            notifier,
        }
    }

    /// Handle a verified webhook event.
    ///
    /// # Errors
    ///
    /// See [`OrderReconciler::reconcile`].
    #[instrument(skip(self, event), fields(event_id = %event.id()))]
    pub async fn handle(&self, event: WebhookEvent) -> Result<ReconcileOutcome, ReconcileError> {
        debug!(stage = %Stage::EventReceived, "Webhook event received");
        match event {
            WebhookEvent::CheckoutSessionCompleted { session, .. } => {
                self.reconcile(&session).await
            }
            WebhookEvent::Other { kind, .. } => {
                debug!(%kind, "Ignoring webhook event");
                Ok(ReconcileOutcome::Ignored { kind })
            }
        }
    }

    /// Reconcile one completed checkout session.
    ///
    /// # Errors
    ///
    /// Returns `CustomerEmail` if the session carries no valid buyer email,
    /// and `Gateway`/`Store` if an upstream call fails. Nothing is persisted
    /// in any error case.
    #[instrument(
        skip(self, session),
        fields(session_id = %session.id, payment_reference = %session.payment_reference())
    )]
    pub async fn reconcile(
        &self,
        session: &CheckoutSession,
    ) -> Result<ReconcileOutcome, ReconcileError> {
        let mut stage = Stage::Verified;
        info!(%stage, "Reconciling checkout session");

        let email = buyer_email(session)?;
        let payment_reference = session.payment_reference().to_string();

        let existing = self
            .store
            .order_by_payment_reference(&payment_reference)
            .await
            .map_err(|source| ReconcileError::Store { stage, source })?;
        if let Some(order) = existing {
            info!(order_id = %order.id, "Payment already reconciled, skipping");
            return Ok(ReconcileOutcome::AlreadyProcessed { order_id: order.id });
        }

        let purchased = self
            .gateway
            .list_line_items(&session.id)
            .await
            .map_err(|source| ReconcileError::Gateway { stage, source })?;
        stage = Stage::LineItemsFetched;
        info!(%stage, count = purchased.len(), "Fetched purchased items");

        let matched = self
            .match_items(purchased)
            .await
            .map_err(|source| ReconcileError::Store { stage, source })?;

        let mut needs_review = false;
        let mut unmatched = Vec::new();
        let mut new_items = Vec::new();
        for item in &matched {
            if item.artwork.is_none() {
                unmatched.push(item.purchased.name.clone());
                needs_review = true;
            }
            if item.purchased.quantity > 1 {
                warn!(
                    product = %item.purchased.name,
                    quantity = item.purchased.quantity,
                    "One-of-a-kind artwork bought more than once"
                );
                needs_review = true;
            }
            for _ in 0..item.purchased.quantity {
                new_items.push(NewLineItem {
                    artwork_id: item.artwork.as_ref().map(|artwork| artwork.id),
                    title: item
                        .artwork
                        .as_ref()
                        .map_or_else(|| item.purchased.name.clone(), |a| a.title.clone()),
                    unit_price: item.purchased.unit_price,
                });
            }
        }

        let items_total: Price = new_items.iter().map(|item| item.unit_price).sum();
        let total = session.total().unwrap_or_else(|| {
            warn!("Processor reported no total, using line-item sum");
            items_total
        });
        if total != items_total {
            warn!(%total, %items_total, "Processor total differs from line items");
            needs_review = true;
        }

        let new_order = NewOrder {
            email,
            customer_name: metadata_or(session, CUSTOMER_NAME_METADATA_KEY, || {
                session
                    .customer_details
                    .as_ref()
                    .and_then(|details| details.name.clone())
            }),
            shipping_address: metadata_or(session, CUSTOMER_ADDRESS_METADATA_KEY, || None),
            phone: session
                .metadata_value(CUSTOMER_PHONE_METADATA_KEY)
                .map(String::from)
                .or_else(|| {
                    session
                        .customer_details
                        .as_ref()
                        .and_then(|details| details.phone.clone())
                }),
            total,
            status: if needs_review {
                OrderStatus::NeedsReview
            } else {
                OrderStatus::Paid
            },
            payment_reference,
            checkout_session_id: session.id.clone(),
        };

        let recorded = match self
            .store
            .record_paid_order(new_order, new_items)
            .await
            .map_err(|source| ReconcileError::Store { stage, source })?
        {
            RecordOutcome::Recorded(recorded) => recorded,
            RecordOutcome::AlreadyRecorded(order_id) => {
                info!(%order_id, "Concurrent delivery already recorded this payment");
                return Ok(ReconcileOutcome::AlreadyProcessed { order_id });
            }
        };

        stage = Stage::OrderPersisted;
        info!(%stage, order_id = %recorded.order.id, status = %recorded.order.status, "Order persisted");
        stage = Stage::LineItemsPersisted;
        info!(%stage, count = recorded.line_items.len(), "Line items persisted");
        for product in &unmatched {
            warn!(
                order_id = %recorded.order.id,
                %product,
                "Purchased product matched no artwork, recorded without reference"
            );
        }
        for artwork_id in &recorded.double_sold {
            error!(
                order_id = %recorded.order.id,
                %artwork_id,
                "Artwork was already sold, order needs manual review"
            );
        }
        stage = Stage::InventoryUpdated;
        info!(%stage, "Inventory updated");

        let summary = summarize(&recorded.order, &recorded.line_items, &matched);
        let notifications = self.notifier.order_placed(&summary).await;
        stage = Stage::Notified;
        info!(%stage, customer = ?notifications.customer, admin = ?notifications.admin, "Notifications dispatched");

        stage = Stage::Done;
        info!(%stage, order_id = %recorded.order.id, "Reconciliation complete");

        Ok(ReconcileOutcome::Completed(Box::new(ReconciledOrder {
            order: recorded.order,
            line_items: recorded.line_items,
            unmatched,
            double_sold: recorded.double_sold,
            notifications,
        })))
    }

    /// Resolve each purchased item: artwork id from metadata first, then exact title.
    async fn match_items(
        &self,
        purchased: Vec<PurchasedItem>,
    ) -> Result<Vec<MatchedItem>, RepositoryError> {
        let mut matched = Vec::with_capacity(purchased.len());
        for item in purchased {
            let mut artwork = match item.artwork_id {
                Some(id) => self.store.artwork(id).await?,
                None => None,
            };
            if artwork.is_none() && !item.name.is_empty() {
                artwork = self.store.artwork_by_title(&item.name).await?;
            }
            matched.push(MatchedItem {
                purchased: item,
                artwork,
            });
        }
        Ok(matched)
    }
}

fn buyer_email(session: &CheckoutSession) -> Result<Email, ReconcileError> {
    let raw = session
        .buyer_email()
        .ok_or_else(|| ReconcileError::CustomerEmail {
            session_id: session.id.clone(),
            source: None,
        })?;
    Email::parse(raw).map_err(|e| ReconcileError::CustomerEmail {
        session_id: session.id.clone(),
        source: Some(e),
    })
}

fn metadata_or(
    session: &CheckoutSession,
    key: &str,
    fallback: impl FnOnce() -> Option<String>,
) -> String {
    session
        .metadata_value(key)
        .map(String::from)
        .or_else(fallback)
        .unwrap_or_default()
}

/// Build the email payload from what was persisted.
fn summarize(order: &Order, line_items: &[OrderLineItem], matched: &[MatchedItem]) -> OrderSummary {
    let artworks: HashMap<ArtworkId, &Artwork> = matched
        .iter()
        .filter_map(|item| item.artwork.as_ref())
        .map(|artwork| (artwork.id, artwork))
        .collect();

    let items = line_items
        .iter()
        .map(|item| {
            let artwork = item.artwork_id.and_then(|id| artworks.get(&id));
            SummaryItem {
                title: item.title.clone(),
                price: item.unit_price.display(),
                dimensions: artwork.and_then(|a| a.dimensions.clone()),
                technique: artwork.and_then(|a| a.technique.clone()),
            }
        })
        .collect();

    debug!(items_total = %line_items_total(line_items), "Summarizing order");

    OrderSummary {
        order_id: order.id.to_string(),
        customer_name: order.customer_name.clone(),
        email: order.email.clone(),
        shipping_address: order.shipping_address.clone(),
        phone: order.phone.clone(),
        items,
        total: order.total.display(),
        order_date: order.created_at.format("%d. %m. %Y %H:%M").to_string(),
        payment_reference: order.payment_reference.clone(),
        needs_review: order.status.needs_review(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::testing::{
        FakeGateway, InMemoryGalleryStore, RecordingMailer, artwork, completed_session,
        purchased,
    };

    struct Harness {
        gateway: Arc<FakeGateway>,
        store: Arc<InMemoryGalleryStore>,
        mailer: Arc<RecordingMailer>,
        reconciler: OrderReconciler,
    }

    fn harness() -> Harness {
        let gateway = Arc::new(FakeGateway::default());
        let store = Arc::new(InMemoryGalleryStore::default());
        let mailer = Arc::new(RecordingMailer::default());
        let notifier = Notifier::new(
            mailer.clone(),
            Some(Email::parse("admin@galeria.sk").unwrap()),
        );
        let reconciler = OrderReconciler::new(gateway.clone(), store.clone(), notifier);
        Harness {
            gateway,
            store,
            mailer,
            reconciler,
        }
    }

    fn completed(outcome: ReconcileOutcome) -> ReconciledOrder {
        match outcome {
            ReconcileOutcome::Completed(order) => *order,
            other => panic!("expected completed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_happy_path() {
        let h = harness();
        let a = h.store.insert(artwork("Artwork A", "120.00"));
        h.gateway
            .set_line_items("cs_1", vec![purchased(&a.title, Some(a.id), 12_000, 1)]);

        let outcome = h
            .reconciler
            .reconcile(&completed_session("cs_1", "pi_1", 12_000))
            .await
            .unwrap();
        let result = completed(outcome);

        assert_eq!(result.order.status, OrderStatus::Paid);
        assert_eq!(result.order.total.to_string(), "120.00");
        assert_eq!(result.order.customer_name, "Ján Novák");
        assert_eq!(result.order.shipping_address, "Hlavná 1, Bratislava, 81101");
        assert_eq!(result.order.payment_reference, "pi_1");
        assert_eq!(result.line_items.len(), 1);
        assert_eq!(result.line_items[0].artwork_id, Some(a.id));
        assert_eq!(line_items_total(&result.line_items), result.order.total);
        assert!(!h.store.stored_artwork(a.id).unwrap().available);
        assert_eq!(h.mailer.attempts(), 2);
    }

    #[tokio::test]
    async fn test_redelivery_is_idempotent() {
        let h = harness();
        let a = h.store.insert(artwork("Artwork A", "120.00"));
        h.gateway
            .set_line_items("cs_1", vec![purchased(&a.title, Some(a.id), 12_000, 1)]);
        let session = completed_session("cs_1", "pi_1", 12_000);

        let first = completed(h.reconciler.reconcile(&session).await.unwrap());
        let second = h.reconciler.reconcile(&session).await.unwrap();

        assert!(matches!(
            second,
            ReconcileOutcome::AlreadyProcessed { order_id } if order_id == first.order.id
        ));
        assert_eq!(h.store.orders().len(), 1);
        assert_eq!(h.store.line_items().len(), 1);
        assert_eq!(h.mailer.attempts(), 2);
        assert_eq!(h.gateway.line_item_calls(), 1);
    }

    #[tokio::test]
    async fn test_matches_by_title_when_metadata_is_missing() {
        let h = harness();
        let a = h.store.insert(artwork("Artwork A", "120.00"));
        h.gateway
            .set_line_items("cs_1", vec![purchased("Artwork A", None, 12_000, 1)]);

        let result = completed(
            h.reconciler
                .reconcile(&completed_session("cs_1", "pi_1", 12_000))
                .await
                .unwrap(),
        );

        assert_eq!(result.line_items[0].artwork_id, Some(a.id));
        assert_eq!(result.order.status, OrderStatus::Paid);
    }

    #[tokio::test]
    async fn test_unmatched_item_is_recorded_degraded() {
        let h = harness();
        h.gateway
            .set_line_items("cs_1", vec![purchased("Neznáme dielo", None, 5_000, 1)]);

        let result = completed(
            h.reconciler
                .reconcile(&completed_session("cs_1", "pi_1", 5_000))
                .await
                .unwrap(),
        );

        assert_eq!(result.order.status, OrderStatus::NeedsReview);
        assert_eq!(result.line_items.len(), 1);
        assert_eq!(result.line_items[0].artwork_id, None);
        assert_eq!(result.line_items[0].title, "Neznáme dielo");
        assert_eq!(result.line_items[0].unit_price.to_string(), "50.00");
        assert_eq!(result.unmatched, vec!["Neznáme dielo".to_string()]);
        assert_eq!(h.store.orders().len(), 1);
    }

    #[tokio::test]
    async fn test_title_match_prefers_available_artwork() {
        let h = harness();
        let mut original = artwork("Západ slnka", "120.00");
        original.created_at = chrono::Utc::now() - chrono::Duration::days(30);
        let original = h.store.insert(original);
        let mut sold_copy = artwork("Západ slnka", "120.00");
        sold_copy.available = false;
        h.store.insert(sold_copy);
        h.gateway
            .set_line_items("cs_t", vec![purchased("Západ slnka", None, 12_000, 1)]);

        let result = completed(
            h.reconciler
                .reconcile(&completed_session("cs_t", "pi_t", 12_000))
                .await
                .unwrap(),
        );

        assert_eq!(result.order.status, OrderStatus::Paid);
        assert_eq!(result.line_items[0].artwork_id, Some(original.id));
        assert!(result.double_sold.is_empty());
        assert!(!h.store.stored_artwork(original.id).unwrap().available);
    }

    #[tokio::test]
    async fn test_double_sale_flags_review() {
        let h = harness();
        let mut sold = artwork("Artwork A", "120.00");
        sold.available = false;
        let sold = h.store.insert(sold);
        h.gateway
            .set_line_items("cs_2", vec![purchased(&sold.title, Some(sold.id), 12_000, 1)]);

        let result = completed(
            h.reconciler
                .reconcile(&completed_session("cs_2", "pi_2", 12_000))
                .await
                .unwrap(),
        );

        assert_eq!(result.order.status, OrderStatus::NeedsReview);
        assert_eq!(result.double_sold, vec![sold.id]);
        assert_eq!(h.mailer.attempts(), 2);
    }

    #[tokio::test]
    async fn test_total_mismatch_flags_review() {
        let h = harness();
        let a = h.store.insert(artwork("Artwork A", "120.00"));
        h.gateway
            .set_line_items("cs_1", vec![purchased(&a.title, Some(a.id), 12_000, 1)]);

        let result = completed(
            h.reconciler
                .reconcile(&completed_session("cs_1", "pi_1", 11_000))
                .await
                .unwrap(),
        );

        assert_eq!(result.order.status, OrderStatus::NeedsReview);
        assert_eq!(result.order.total.to_string(), "110.00");
    }

    #[tokio::test]
    async fn test_quantity_expands_line_items() {
        let h = harness();
        h.gateway
            .set_line_items("cs_1", vec![purchased("Grafika", None, 3_000, 3)]);

        let result = completed(
            h.reconciler
                .reconcile(&completed_session("cs_1", "pi_1", 9_000))
                .await
                .unwrap(),
        );

        assert_eq!(result.line_items.len(), 3);
        assert_eq!(line_items_total(&result.line_items), result.order.total);
        assert_eq!(result.order.status, OrderStatus::NeedsReview);
    }

    #[tokio::test]
    async fn test_missing_email_fails_without_writes() {
        let h = harness();
        let mut session = completed_session("cs_1", "pi_1", 12_000);
        session.customer_email = None;
        session.customer_details = None;

        let err = h.reconciler.reconcile(&session).await.unwrap_err();

        assert!(matches!(err, ReconcileError::CustomerEmail { .. }));
        assert!(h.store.orders().is_empty());
        assert_eq!(h.gateway.line_item_calls(), 0);
        assert_eq!(h.mailer.attempts(), 0);
    }

    #[tokio::test]
    async fn test_gateway_failure_reports_stage() {
        let h = harness();
        h.gateway.fail_line_items();

        let err = h
            .reconciler
            .reconcile(&completed_session("cs_1", "pi_1", 12_000))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ReconcileError::Gateway {
                stage: Stage::Verified,
                ..
            }
        ));
        assert!(h.store.orders().is_empty());
    }

    #[tokio::test]
    async fn test_store_failure_leaves_nothing_behind() {
        let h = harness();
        let a = h.store.insert(artwork("Artwork A", "120.00"));
        h.gateway
            .set_line_items("cs_1", vec![purchased(&a.title, Some(a.id), 12_000, 1)]);
        h.store.fail_next_write();

        let err = h
            .reconciler
            .reconcile(&completed_session("cs_1", "pi_1", 12_000))
            .await
            .unwrap_err();

        assert!(matches!(err, ReconcileError::Store { .. }));
        assert!(h.store.orders().is_empty());
        assert!(h.store.stored_artwork(a.id).unwrap().available);
        assert_eq!(h.mailer.attempts(), 0);
    }

    #[tokio::test]
    async fn test_notification_failure_does_not_fail_reconciliation() {
        let gateway = Arc::new(FakeGateway::default());
        let store = Arc::new(InMemoryGalleryStore::default());
        let mailer = Arc::new(RecordingMailer::failing_all());
        let reconciler = OrderReconciler::new(
            gateway.clone(),
            store.clone(),
            Notifier::new(mailer.clone(), Some(Email::parse("admin@galeria.sk").unwrap())),
        );
        let a = store.insert(artwork("Artwork A", "120.00"));
        gateway.set_line_items("cs_1", vec![purchased(&a.title, Some(a.id), 12_000, 1)]);

        let result = completed(
            reconciler
                .reconcile(&completed_session("cs_1", "pi_1", 12_000))
                .await
                .unwrap(),
        );

        assert_eq!(result.order.status, OrderStatus::Paid);
        assert_eq!(mailer.attempts(), 2);
        assert_eq!(store.orders().len(), 1);
    }

    #[tokio::test]
    async fn test_other_events_are_ignored() {
        let h = harness();
        let outcome = h
            .reconciler
            .handle(WebhookEvent::Other {
                event_id: "evt_1".to_string(),
                kind: "payment_intent.created".to_string(),
            })
            .await
            .unwrap();
        assert!(matches!(outcome, ReconcileOutcome::Ignored { .. }));
        assert_eq!(h.gateway.line_item_calls(), 0);
    }
}
