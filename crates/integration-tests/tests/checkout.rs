//! Buying an artwork: cart, checkout session, and the hosted payment redirect.

use axum::{
    body::Body,
    http::{Request, StatusCode, header},
};
use serde_json::{Value, json};

use galeria_core::Artwork;
use galeria_integration_tests::{BUYER_EMAIL, TestContext};
use galeria_storefront::testing::artwork;

fn checkout_body(items: &[&Artwork]) -> Value {
    let items: Vec<Value> = items
        .iter()
        .map(|a| {
            json!({
                "artwork": {
                    "id": a.id.to_string(),
                    "title": a.title,
                    "price": 1.0,
                    "imageUrl": a.image_url
                },
                "quantity": 1
            })
        })
        .collect();

    json!({
        "items": items,
        "customerInfo": {
            "name": "Ján Novák",
            "email": BUYER_EMAIL,
            "phone": "+421 900 123 456",
            "address": "Hlavná 1, Bratislava, 81101"
        }
    })
}

// ============================================================================
// JSON checkout endpoint
// ============================================================================

#[tokio::test]
async fn test_checkout_session_uses_catalog_prices() {
    let ctx = TestContext::new();
    let sunset = ctx.store.insert(artwork("Západ slnka", "120.00"));

    // The browser claims 1 €; the catalog says 120 €
    let (status, body) = ctx
        .post_json("/api/create-checkout-session", &checkout_body(&[&sunset]))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["url"], "https://checkout.stripe.test/pay/cs_test_1");

    let sessions = ctx.gateway.created_sessions();
    assert_eq!(sessions.len(), 1);
    let session = &sessions[0];
    assert_eq!(session.customer_email, BUYER_EMAIL);
    assert_eq!(session.currency, "eur");
    assert_eq!(session.line_items.len(), 1);
    assert_eq!(session.line_items[0].unit_amount, 12_000);
    assert_eq!(session.line_items[0].artwork_id, sunset.id);
    assert_eq!(
        session.success_url,
        "https://galeria.test/uspech?session_id={CHECKOUT_SESSION_ID}"
    );
    assert_eq!(session.cancel_url, "https://galeria.test/kosik");
}

#[tokio::test]
async fn test_empty_cart_is_rejected() {
    let ctx = TestContext::new();

    let (status, body) = ctx
        .post_json("/api/create-checkout-session", &checkout_body(&[]))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Košík je prázdny");
    assert!(ctx.gateway.created_sessions().is_empty());
}

#[tokio::test]
async fn test_sold_artwork_is_rejected() {
    let ctx = TestContext::new();
    let mut sold = artwork("Predaný obraz", "80.00");
    sold.available = false;
    let sold = ctx.store.insert(sold);

    let (status, body) = ctx
        .post_json("/api/create-checkout-session", &checkout_body(&[&sold]))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap_or_default().contains("predané"));
    assert!(ctx.gateway.created_sessions().is_empty());
}

#[tokio::test]
async fn test_processor_failure_is_a_generic_500() {
    let ctx = TestContext::new();
    let sunset = ctx.store.insert(artwork("Západ slnka", "120.00"));
    ctx.gateway.fail_next_session();

    let (status, body) = ctx
        .post_json("/api/create-checkout-session", &checkout_body(&[&sunset]))
        .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Nepodarilo sa vytvoriť platobnú reláciu");
}

#[tokio::test]
async fn test_malformed_body_is_rejected() {
    let ctx = TestContext::new();

    let request = Request::post("/api/create-checkout-session")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .expect("request");
    let (status, _) = ctx.send(request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// ============================================================================
// HTML cart and checkout form
// ============================================================================

/// The session cookie from a response, as a `Cookie` request header value.
fn session_cookie(response: &axum::response::Response) -> String {
    response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(';').next())
        .map(str::to_string)
        .expect("session cookie set")
}

#[tokio::test]
async fn test_cart_to_hosted_payment_redirect() {
    use tower::ServiceExt;

    let ctx = TestContext::new();
    let sunset = ctx.store.insert(artwork("Západ slnka", "120.00"));
    let router = ctx.router();

    // Add to cart
    let response = router
        .clone()
        .oneshot(
            Request::post("/kosik/pridat")
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from(format!("artwork_id={}", sunset.id)))
                .expect("request"),
        )
        .await
        .expect("request");
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let cookie = session_cookie(&response);

    // Badge count
    let (status, count) = ctx
        .send(
            Request::get("/kosik/pocet")
                .header(header::COOKIE, &cookie)
                .body(Body::empty())
                .expect("request"),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(count, "1");

    // Submit the checkout form
    let response = router
        .oneshot(
            Request::post("/objednavka")
                .header(header::COOKIE, &cookie)
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from(
                    "name=J%C3%A1n+Nov%C3%A1k&email=jan%40x.sk&phone=&address=Hlavn%C3%A1+1%2C+Bratislava",
                ))
                .expect("request"),
        )
        .await
        .expect("request");

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        response.headers().get(header::LOCATION).map(|v| v.as_bytes()),
        Some("https://checkout.stripe.test/pay/cs_test_1".as_bytes())
    );
    let sessions = ctx.gateway.created_sessions();
    assert_eq!(sessions[0].line_items[0].unit_amount, 12_000);
}

#[tokio::test]
async fn test_sold_artwork_cannot_be_added_to_cart() {
    let ctx = TestContext::new();
    let mut sold = artwork("Predaný obraz", "80.00");
    sold.available = false;
    let sold = ctx.store.insert(sold);

    let (status, body) = ctx
        .send(
            Request::post("/kosik/pridat")
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from(format!("artwork_id={}", sold.id)))
                .expect("request"),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("predané"));
}
