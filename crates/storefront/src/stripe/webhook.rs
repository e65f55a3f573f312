//! Webhook signature verification.
//!
//! Stripe signs every delivery with the endpoint secret. The
//! `Stripe-Signature` header looks like `t=1700000000,v1=<hex>,v1=<hex>`; each
//! `v1` is `HMAC-SHA256(secret, "{t}.{raw body}")`. Any matching `v1` within
//! the timestamp tolerance authenticates the body.

use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use sha2::Sha256;
use thiserror::Error;
use tracing::{debug, instrument};

use super::types::CheckoutSession;

/// Header carrying the signature.
pub const SIGNATURE_HEADER: &str = "stripe-signature";

/// Event type that triggers order reconciliation.
pub const CHECKOUT_SESSION_COMPLETED: &str = "checkout.session.completed";

/// Reasons an inbound webhook is rejected.
#[derive(Debug, Error)]
pub enum WebhookError {
    #[error("missing signature header")]
    MissingSignature,

    #[error("invalid signature: {0}")]
    InvalidSignature(&'static str),

    #[error("signature timestamp outside tolerance")]
    Expired,

    #[error("malformed event payload: {0}")]
    MalformedPayload(#[from] serde_json::Error),
}

/// A verified event.
#[derive(Debug, Clone)]
pub enum WebhookEvent {
    /// Payment for a checkout session was captured.
    CheckoutSessionCompleted {
        event_id: String,
        session: Box<CheckoutSession>,
    },
    /// Any other event type; acknowledged and ignored.
    Other { event_id: String, kind: String },
}

impl WebhookEvent {
    /// Stripe's event id.
    #[must_use]
    pub fn id(&self) -> &str {
        match self {
            Self::CheckoutSessionCompleted { event_id, .. } | Self::Other { event_id, .. } => {
                event_id
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawEvent {
    id: String,
    #[serde(rename = "type")]
    kind: String,
    data: RawEventData,
}

#[derive(Debug, Deserialize)]
struct RawEventData {
    object: serde_json::Value,
}

/// Verifies `Stripe-Signature` headers against the endpoint secret.
#[derive(Clone)]
pub struct WebhookVerifier {
    secret: SecretString,
    tolerance_secs: i64,
}

impl std::fmt::Debug for WebhookVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookVerifier")
            .field("secret", &"[REDACTED]")
            .field("tolerance_secs", &self.tolerance_secs)
            .finish()
    }
}

impl WebhookVerifier {
    #[must_use]
    pub const fn new(secret: SecretString, tolerance_secs: i64) -> Self {
        Self {
            secret,
            tolerance_secs,
        }
    }

    /// Verify a delivery against the current time and decode the event.
    ///
    /// # Errors
    ///
    /// Returns error if the header is missing, no signature matches, the
    /// timestamp is outside tolerance, or the body is not a Stripe event.
    pub fn verify(
        &self,
        payload: &[u8],
        signature: Option<&str>,
    ) -> Result<WebhookEvent, WebhookError> {
        self.verify_at(payload, signature, chrono::Utc::now().timestamp())
    }

    /// Verify a delivery as of `now` (unix seconds).
    ///
    /// # Errors
    ///
    /// See [`WebhookVerifier::verify`].
    #[instrument(skip(self, payload, signature))]
    pub fn verify_at(
        &self,
        payload: &[u8],
        signature: Option<&str>,
        now: i64,
    ) -> Result<WebhookEvent, WebhookError> {
        let header = signature
            .map(str::trim)
            .filter(|h| !h.is_empty())
            .ok_or(WebhookError::MissingSignature)?;

        let (timestamp, candidates) = parse_header(header)?;

        let expected = self.compute_signature(timestamp, payload)?;
        if !candidates
            .iter()
            .any(|candidate| constant_time_compare(&expected, candidate))
        {
            return Err(WebhookError::InvalidSignature("no matching v1 signature"));
        }

        if self.tolerance_secs > 0 && (now - timestamp).abs() > self.tolerance_secs {
            return Err(WebhookError::Expired);
        }

        let raw: RawEvent = serde_json::from_slice(payload)?;
        debug!(event_id = %raw.id, kind = %raw.kind, "Stripe signature verified");

        if raw.kind == CHECKOUT_SESSION_COMPLETED {
            let session: CheckoutSession = serde_json::from_value(raw.data.object)?;
            Ok(WebhookEvent::CheckoutSessionCompleted {
                event_id: raw.id,
                session: Box::new(session),
            })
        } else {
            Ok(WebhookEvent::Other {
                event_id: raw.id,
                kind: raw.kind,
            })
        }
    }

    /// Build a valid `Stripe-Signature` header for `payload` at `timestamp`.
    ///
    /// Used by tests and local tooling to simulate deliveries.
    ///
    /// # Errors
    ///
    /// Returns error if the secret cannot key the MAC.
    pub fn sign(&self, payload: &[u8], timestamp: i64) -> Result<String, WebhookError> {
        Ok(format!(
            "t={timestamp},v1={}",
            self.compute_signature(timestamp, payload)?
        ))
    }

    fn compute_signature(&self, timestamp: i64, payload: &[u8]) -> Result<String, WebhookError> {
        let mut mac = Hmac::<Sha256>::new_from_slice(self.secret.expose_secret().as_bytes())
            .map_err(|_| WebhookError::InvalidSignature("unusable signing secret"))?;
        mac.update(timestamp.to_string().as_bytes());
        mac.update(b".");
        mac.update(payload);
        Ok(hex::encode(mac.finalize().into_bytes()))
    }
}

/// Split the header into its timestamp and `v1` signatures.
fn parse_header(header: &str) -> Result<(i64, Vec<&str>), WebhookError> {
    let mut timestamp = None;
    let mut signatures = Vec::new();

    for part in header.split(',') {
        let Some((key, value)) = part.trim().split_once('=') else {
            continue;
        };
        match key {
            "t" => {
                timestamp = Some(
                    value
                        .parse::<i64>()
                        .map_err(|_| WebhookError::InvalidSignature("bad timestamp"))?,
                );
            }
            "v1" => signatures.push(value),
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or(WebhookError::InvalidSignature("no timestamp"))?;
    if signatures.is_empty() {
        return Err(WebhookError::InvalidSignature("no v1 signature"));
    }
    Ok((timestamp, signatures))
}

/// Constant-time string comparison to prevent timing attacks.
fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result: u8 = 0;
    for (x, y) in a.bytes().zip(b.bytes()) {
        result |= x ^ y;
    }

    result == 0
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const NOW: i64 = 1_760_000_000;

    fn verifier() -> WebhookVerifier {
        WebhookVerifier::new(SecretString::from("whsec_test_9aF3kLm2Qp"), 300)
    }

    fn completed_payload() -> Vec<u8> {
        serde_json::json!({
            "id": "evt_1",
            "type": "checkout.session.completed",
            "data": {"object": {
                "id": "cs_test_1",
                "customer_email": "jan@x.sk",
                "amount_total": 12000,
                "payment_intent": "pi_1",
                "metadata": {"customerName": "Ján Novák"}
            }}
        })
        .to_string()
        .into_bytes()
    }

    #[test]
    fn test_valid_signature_yields_completed_event() {
        let v = verifier();
        let payload = completed_payload();
        let header = v.sign(&payload, NOW).unwrap();

        let event = v.verify_at(&payload, Some(&header), NOW + 10).unwrap();
        match event {
            WebhookEvent::CheckoutSessionCompleted { event_id, session } => {
                assert_eq!(event_id, "evt_1");
                assert_eq!(session.id, "cs_test_1");
                assert_eq!(session.payment_reference(), "pi_1");
            }
            WebhookEvent::Other { .. } => panic!("expected completed event"),
        }
    }

    #[test]
    fn test_missing_header() {
        let v = verifier();
        assert!(matches!(
            v.verify_at(&completed_payload(), None, NOW),
            Err(WebhookError::MissingSignature)
        ));
        assert!(matches!(
            v.verify_at(&completed_payload(), Some("  "), NOW),
            Err(WebhookError::MissingSignature)
        ));
    }

    #[test]
    fn test_tampered_body_is_rejected() {
        let v = verifier();
        let payload = completed_payload();
        let header = v.sign(&payload, NOW).unwrap();
        let tampered = String::from_utf8(payload)
            .unwrap()
            .replace("12000", "1")
            .into_bytes();

        assert!(matches!(
            v.verify_at(&tampered, Some(&header), NOW),
            Err(WebhookError::InvalidSignature(_))
        ));
    }

    #[test]
    fn test_wrong_secret_is_rejected() {
        let payload = completed_payload();
        let forged = WebhookVerifier::new(SecretString::from("whsec_other"), 300)
            .sign(&payload, NOW)
            .unwrap();
        assert!(matches!(
            verifier().verify_at(&payload, Some(&forged), NOW),
            Err(WebhookError::InvalidSignature(_))
        ));
    }

    #[test]
    fn test_expired_timestamp() {
        let v = verifier();
        let payload = completed_payload();
        let header = v.sign(&payload, NOW).unwrap();
        assert!(matches!(
            v.verify_at(&payload, Some(&header), NOW + 301),
            Err(WebhookError::Expired)
        ));
    }

    #[test]
    fn test_any_matching_v1_is_accepted() {
        let v = verifier();
        let payload = completed_payload();
        let good = v.sign(&payload, NOW).unwrap();
        let (_, good_sig) = good.split_once(",v1=").unwrap();
        let header = format!("t={NOW},v1=deadbeef,v0=ignored,v1={good_sig}");
        assert!(v.verify_at(&payload, Some(&header), NOW).is_ok());
    }

    #[test]
    fn test_garbage_header() {
        let v = verifier();
        for header in ["garbage", "t=abc,v1=00", "v1=00", "t=1"] {
            assert!(matches!(
                v.verify_at(&completed_payload(), Some(header), NOW),
                Err(WebhookError::InvalidSignature(_))
            ));
        }
    }

    #[test]
    fn test_other_event_types_are_passed_through() {
        let v = verifier();
        let payload = br#"{"id":"evt_2","type":"payment_intent.created","data":{"object":{}}}"#;
        let header = v.sign(payload, NOW).unwrap();
        let event = v.verify_at(payload, Some(&header), NOW).unwrap();
        assert!(matches!(event, WebhookEvent::Other { ref kind, .. } if kind == "payment_intent.created"));
        assert_eq!(event.id(), "evt_2");
    }

    #[test]
    fn test_constant_time_compare() {
        assert!(constant_time_compare("abc", "abc"));
        assert!(!constant_time_compare("abc", "abd"));
        assert!(!constant_time_compare("abc", "abcd"));
    }
}
