//! Integration tests for Galéria Umenia.
//!
//! The storefront router is driven in-process with `tower::ServiceExt::oneshot`
//! against in-memory fakes of Stripe, the database and the mail relay, so the
//! whole buy-and-reconcile flow runs without any external service.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p galeria-integration-tests
//!
//! # Include the PostgreSQL tests (needs DATABASE_URL)
//! cargo test -p galeria-integration-tests -- --ignored
//! ```

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use secrecy::SecretString;
use tower::ServiceExt;

use galeria_core::Email;
use galeria_storefront::state::{AppState, StateParts};
use galeria_storefront::stripe::WebhookVerifier;
use galeria_storefront::stripe::webhook::SIGNATURE_HEADER;
use galeria_storefront::testing::{FakeGateway, InMemoryGalleryStore, RecordingMailer};

/// Webhook signing secret shared by the fake deliveries and the verifier.
pub const WEBHOOK_SECRET: &str = "whsec_integration_8kQ2mZp4Lx";

/// Where new-order notifications go.
pub const ADMIN_EMAIL: &str = "galeria@galeria.sk";

/// The buyer in every scenario.
pub const BUYER_EMAIL: &str = "jan@x.sk";

/// Accepted webhook signature age.
const TOLERANCE_SECS: i64 = 300;

/// A storefront wired to fakes.
pub struct TestContext {
    pub gateway: Arc<FakeGateway>,
    pub store: Arc<InMemoryGalleryStore>,
    pub mailer: Arc<RecordingMailer>,
    pub verifier: WebhookVerifier,
    router: Router,
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}

impl TestContext {
    /// A storefront whose mail relay accepts everything.
    #[must_use]
    pub fn new() -> Self {
        Self::with_mailer(RecordingMailer::default())
    }

    /// A storefront with a specific mailer.
    ///
    /// # Panics
    ///
    /// Panics if the admin address constant is not a valid email.
    #[must_use]
    pub fn with_mailer(mailer: RecordingMailer) -> Self {
        let gateway = Arc::new(FakeGateway::default());
        let store = Arc::new(InMemoryGalleryStore::default());
        let mailer = Arc::new(mailer);
        let verifier = verifier();

        let state = AppState::from_parts(StateParts {
            gateway: gateway.clone(),
            store: store.clone(),
            mailer: mailer.clone(),
            admin_address: Some(Email::parse(ADMIN_EMAIL).expect("valid admin address")),
            verifier: verifier.clone(),
            base_url: "https://galeria.test".to_string(),
            currency: "eur".to_string(),
        });
        let uploads = std::env::temp_dir().join("galeria-integration-uploads");

        Self {
            gateway,
            store,
            mailer,
            verifier,
            router: galeria_storefront::app(state, &uploads),
        }
    }

    /// The router itself, for multi-request flows that carry cookies.
    #[must_use]
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Send a request and return status and body text.
    ///
    /// # Panics
    ///
    /// Panics if the router fails or the body is not UTF-8.
    pub async fn send(&self, request: Request<Body>) -> (StatusCode, String) {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router failed");
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body read failed");
        let text = String::from_utf8(bytes.to_vec()).expect("UTF-8 body");
        (status, text)
    }

    /// POST a JSON body and parse the JSON answer.
    ///
    /// # Panics
    ///
    /// Panics if the answer is not JSON.
    pub async fn post_json(&self, uri: &str, body: &serde_json::Value) -> (StatusCode, serde_json::Value) {
        let request = Request::post(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .expect("valid request");
        let (status, text) = self.send(request).await;
        (status, parse_json(&text))
    }

    /// Deliver a webhook payload signed now with the shared secret.
    ///
    /// # Panics
    ///
    /// Panics if signing fails.
    pub async fn deliver(&self, payload: &str) -> (StatusCode, serde_json::Value) {
        let signature = self
            .verifier
            .sign(payload.as_bytes(), chrono::Utc::now().timestamp())
            .expect("signing failed");
        self.deliver_with_signature(payload, Some(&signature)).await
    }

    /// Deliver a webhook payload with an arbitrary signature header.
    ///
    /// # Panics
    ///
    /// Panics if the answer is not JSON.
    pub async fn deliver_with_signature(
        &self,
        payload: &str,
        signature: Option<&str>,
    ) -> (StatusCode, serde_json::Value) {
        let mut request = Request::post("/api/webhook/stripe")
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(signature) = signature {
            request = request.header(SIGNATURE_HEADER, signature);
        }
        let request = request
            .body(Body::from(payload.to_string()))
            .expect("valid request");
        let (status, text) = self.send(request).await;
        (status, parse_json(&text))
    }
}

/// A verifier keyed with [`WEBHOOK_SECRET`].
#[must_use]
pub fn verifier() -> WebhookVerifier {
    WebhookVerifier::new(SecretString::from(WEBHOOK_SECRET), TOLERANCE_SECS)
}

fn parse_json(text: &str) -> serde_json::Value {
    serde_json::from_str(text).unwrap_or_else(|e| panic!("not JSON ({e}): {text}"))
}
