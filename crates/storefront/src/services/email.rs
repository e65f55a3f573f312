//! Order emails.
//!
//! Uses SMTP via lettre for delivery with Askama HTML and plain-text
//! templates. Rendering is separate from sending so the notifier can be
//! tested without a mail server.

use askama::Template;
use async_trait::async_trait;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{Mailbox, MultiPart, SinglePart, header::ContentType},
    transport::smtp::{Error as SmtpError, authentication::Credentials},
};
use secrecy::ExposeSecret;
use thiserror::Error;

use galeria_core::Email;

use super::{Mailer, OutgoingEmail};
use crate::config::EmailConfig;

/// Display name on outgoing mail.
pub const SENDER_NAME: &str = "Galéria Umenia";

const CUSTOMER_SUBJECT: &str = "✅ Potvrdenie objednávky - Galéria Umenia";
const ADMIN_SUBJECT: &str = "🎨 Nová objednávka na Galéria Umenia!";

/// Errors that can occur when rendering or sending email.
#[derive(Debug, Error)]
pub enum EmailError {
    /// SMTP transport error.
    #[error("SMTP error: {0}")]
    Smtp(#[from] SmtpError),

    /// Failed to build email message.
    #[error("Failed to build message: {0}")]
    MessageBuild(#[from] lettre::error::Error),

    /// Invalid email address.
    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    /// Template rendering error.
    #[error("Template error: {0}")]
    Template(#[from] askama::Error),
}

// =============================================================================
// Payload
// =============================================================================

/// Everything the order emails show, pre-formatted for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderSummary {
    pub order_id: String,
    pub customer_name: String,
    pub email: Email,
    pub shipping_address: String,
    pub phone: Option<String>,
    pub items: Vec<SummaryItem>,
    /// e.g. `"120.00 €"`
    pub total: String,
    /// e.g. `"16. 10. 2026 14:05"`
    pub order_date: String,
    pub payment_reference: String,
    pub needs_review: bool,
}

/// One purchased piece as shown in an email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryItem {
    pub title: String,
    pub price: String,
    pub dimensions: Option<String>,
    pub technique: Option<String>,
}

// =============================================================================
// Templates
// =============================================================================

#[derive(Template)]
#[template(path = "email/order_customer.html")]
struct CustomerEmailHtml<'a> {
    order: &'a OrderSummary,
}

#[derive(Template)]
#[template(path = "email/order_customer.txt")]
struct CustomerEmailText<'a> {
    order: &'a OrderSummary,
}

#[derive(Template)]
#[template(path = "email/order_admin.html")]
struct AdminEmailHtml<'a> {
    order: &'a OrderSummary,
}

#[derive(Template)]
#[template(path = "email/order_admin.txt")]
struct AdminEmailText<'a> {
    order: &'a OrderSummary,
}

/// Render the buyer's order confirmation.
///
/// # Errors
///
/// Returns error if a template fails to render.
pub fn customer_confirmation(order: &OrderSummary) -> Result<OutgoingEmail, EmailError> {
    Ok(OutgoingEmail {
        to: order.email.clone(),
        subject: CUSTOMER_SUBJECT.to_string(),
        text: CustomerEmailText { order }.render()?,
        html: CustomerEmailHtml { order }.render()?,
    })
}

/// Render the gallery's new-order notification.
///
/// # Errors
///
/// Returns error if a template fails to render.
pub fn admin_notification(order: &OrderSummary, to: &Email) -> Result<OutgoingEmail, EmailError> {
    Ok(OutgoingEmail {
        to: to.clone(),
        subject: ADMIN_SUBJECT.to_string(),
        text: AdminEmailText { order }.render()?,
        html: AdminEmailHtml { order }.render()?,
    })
}

// =============================================================================
// SMTP transport
// =============================================================================

/// Email service sending through an SMTP relay.
#[derive(Clone)]
pub struct EmailService {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl EmailService {
    /// Create a new email service from configuration.
    ///
    /// # Errors
    ///
    /// Returns error if the relay cannot be configured or the sender address
    /// is not a valid mailbox.
    pub fn new(config: &EmailConfig) -> Result<Self, EmailError> {
        let credentials = Credentials::new(
            config.smtp_username.clone(),
            config.smtp_password.expose_secret().to_string(),
        );

        let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)?
            .port(config.smtp_port)
            .credentials(credentials)
            .build();

        Ok(Self {
            mailer,
            from: mailbox(Some(SENDER_NAME), &config.from_address)?,
        })
    }
}

#[async_trait]
impl Mailer for EmailService {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), EmailError> {
        let message = Message::builder()
            .from(self.from.clone())
            .to(mailbox(None, &email.to)?)
            .subject(&email.subject)
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(email.text.clone()),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(email.html.clone()),
                    ),
            )?;

        self.mailer.send(message).await?;

        tracing::info!(to = %email.to, subject = %email.subject, "Email sent successfully");
        Ok(())
    }
}

fn mailbox(name: Option<&str>, address: &Email) -> Result<Mailbox, EmailError> {
    let address = address
        .as_str()
        .parse()
        .map_err(|_| EmailError::InvalidAddress(address.to_string()))?;
    Ok(Mailbox::new(name.map(String::from), address))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn summary() -> OrderSummary {
        OrderSummary {
            order_id: "6f1c2a52-2d5e-4a0e-9c43-2f1f0a8c9b11".to_string(),
            customer_name: "Ján Novák".to_string(),
            email: Email::parse("jan@x.sk").unwrap(),
            shipping_address: "Hlavná 1, Bratislava, 81101".to_string(),
            phone: Some("+421 900 123 456".to_string()),
            items: vec![SummaryItem {
                title: "Artwork A".to_string(),
                price: "120.00 €".to_string(),
                dimensions: Some("50x70 cm".to_string()),
                technique: Some("olej na plátne".to_string()),
            }],
            total: "120.00 €".to_string(),
            order_date: "16. 10. 2026 14:05".to_string(),
            payment_reference: "pi_123".to_string(),
            needs_review: false,
        }
    }

    #[test]
    fn test_customer_confirmation_content() {
        let email = customer_confirmation(&summary()).unwrap();
        assert_eq!(email.to.as_str(), "jan@x.sk");
        assert_eq!(email.subject, CUSTOMER_SUBJECT);
        assert!(email.text.contains("Dobrý deň Ján Novák"));
        assert!(email.text.contains("Artwork A"));
        assert!(email.text.contains("120.00 €"));
        assert!(email.text.contains("16. 10. 2026 14:05"));
        assert!(email.html.contains("Artwork A"));
        // Buyer never sees the payment reference
        assert!(!email.text.contains("pi_123"));
    }

    #[test]
    fn test_admin_notification_content() {
        let admin = Email::parse("admin@galeria.sk").unwrap();
        let email = admin_notification(&summary(), &admin).unwrap();
        assert_eq!(email.to, admin);
        assert_eq!(email.subject, ADMIN_SUBJECT);
        assert!(email.text.contains("jan@x.sk"));
        assert!(email.text.contains("Hlavná 1, Bratislava, 81101"));
        assert!(email.text.contains("+421 900 123 456"));
        assert!(email.text.contains("pi_123"));
        assert!(!email.text.contains("vyžaduje kontrolu"));
    }

    #[test]
    fn test_admin_notification_flags_review() {
        let admin = Email::parse("admin@galeria.sk").unwrap();
        let mut order = summary();
        order.needs_review = true;
        let email = admin_notification(&order, &admin).unwrap();
        assert!(email.text.contains("vyžaduje kontrolu"));
        assert!(email.html.contains("vyžaduje kontrolu"));
    }

    #[test]
    fn test_html_escapes_buyer_input() {
        let mut order = summary();
        order.customer_name = "<script>alert(1)</script>".to_string();
        let email = customer_confirmation(&order).unwrap();
        assert!(!email.html.contains("<script>"));
    }
}
