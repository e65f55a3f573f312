//! Best-effort order notifications.
//!
//! The buyer's confirmation and the gallery's notification are sent
//! concurrently and independently. Every failure is logged and swallowed:
//! the order already exists by the time the notifier runs.

use std::sync::Arc;

use tracing::{error, info, instrument, warn};

use galeria_core::Email;

use super::Mailer;
use super::email::{OrderSummary, admin_notification, customer_confirmation};

/// What happened to each email.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Sent,
    Failed,
    /// No recipient configured.
    Skipped,
}

/// Outcome of one notification round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NotificationReport {
    pub customer: Delivery,
    pub admin: Delivery,
}

/// Sends order emails through a [`Mailer`].
#[derive(Clone)]
pub struct Notifier {
    mailer: Arc<dyn Mailer>,
    admin_address: Option<Email>,
}

impl Notifier {
    #[must_use]
    pub fn new(mailer: Arc<dyn Mailer>, admin_address: Option<Email>) -> Self {
        Self {
            mailer,
            admin_address,
        }
    }

    /// Send both order emails. Never fails.
    #[instrument(skip(self, order), fields(order_id = %order.order_id))]
    pub async fn order_placed(&self, order: &OrderSummary) -> NotificationReport {
        let (customer, admin) = tokio::join!(self.notify_customer(order), self.notify_admin(order));
        NotificationReport { customer, admin }
    }

    async fn notify_customer(&self, order: &OrderSummary) -> Delivery {
        let email = match customer_confirmation(order) {
            Ok(email) => email,
            Err(e) => {
                error!(error = %e, "Failed to render customer confirmation");
                return Delivery::Failed;
            }
        };

        match self.mailer.send(&email).await {
            Ok(()) => {
                info!(to = %email.to, "Customer confirmation sent");
                Delivery::Sent
            }
            Err(e) => {
                error!(error = %e, to = %email.to, "Failed to send customer confirmation");
                Delivery::Failed
            }
        }
    }

    async fn notify_admin(&self, order: &OrderSummary) -> Delivery {
        let Some(admin_address) = &self.admin_address else {
            warn!("ADMIN_NOTIFICATION_EMAIL not set, skipping admin notification");
            return Delivery::Skipped;
        };

        let email = match admin_notification(order, admin_address) {
            Ok(email) => email,
            Err(e) => {
                error!(error = %e, "Failed to render admin notification");
                return Delivery::Failed;
            }
        };

        match self.mailer.send(&email).await {
            Ok(()) => {
                info!(to = %email.to, "Admin notification sent");
                Delivery::Sent
            }
            Err(e) => {
                error!(error = %e, to = %email.to, "Failed to send admin notification");
                Delivery::Failed
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::services::email::SummaryItem;
    use crate::testing::RecordingMailer;

    fn summary() -> OrderSummary {
        OrderSummary {
            order_id: "order-1".to_string(),
            customer_name: "Ján Novák".to_string(),
            email: Email::parse("jan@x.sk").unwrap(),
            shipping_address: "Hlavná 1, Bratislava, 81101".to_string(),
            phone: None,
            items: vec![SummaryItem {
                title: "Artwork A".to_string(),
                price: "120.00 €".to_string(),
                dimensions: None,
                technique: None,
            }],
            total: "120.00 €".to_string(),
            order_date: "16. 10. 2026 14:05".to_string(),
            payment_reference: "pi_1".to_string(),
            needs_review: false,
        }
    }

    #[tokio::test]
    async fn test_sends_both_emails() {
        let mailer = Arc::new(RecordingMailer::default());
        let notifier = Notifier::new(mailer.clone(), Some(Email::parse("admin@galeria.sk").unwrap()));

        let report = notifier.order_placed(&summary()).await;

        assert_eq!(report.customer, Delivery::Sent);
        assert_eq!(report.admin, Delivery::Sent);
        let sent = mailer.sent();
        assert_eq!(sent.len(), 2);
        assert!(sent.iter().any(|e| e.to.as_str() == "jan@x.sk"));
        assert!(sent.iter().any(|e| e.to.as_str() == "admin@galeria.sk"));
    }

    #[tokio::test]
    async fn test_skips_admin_without_address() {
        let mailer = Arc::new(RecordingMailer::default());
        let notifier = Notifier::new(mailer.clone(), None);

        let report = notifier.order_placed(&summary()).await;

        assert_eq!(report.customer, Delivery::Sent);
        assert_eq!(report.admin, Delivery::Skipped);
        assert_eq!(mailer.sent().len(), 1);
    }

    #[tokio::test]
    async fn test_one_failure_does_not_block_the_other() {
        let mailer = Arc::new(RecordingMailer::failing_for("jan@x.sk"));
        let notifier = Notifier::new(mailer.clone(), Some(Email::parse("admin@galeria.sk").unwrap()));

        let report = notifier.order_placed(&summary()).await;

        assert_eq!(report.customer, Delivery::Failed);
        assert_eq!(report.admin, Delivery::Sent);
        assert_eq!(mailer.attempts(), 2);
    }
}
