//! Order persistence against a real database.
//!
//! Run with `DATABASE_URL=postgres://... cargo test -- --ignored`.

#![allow(clippy::unwrap_used)]

use sqlx::PgPool;
use uuid::Uuid;

use galeria_core::{ArtworkId, Email, OrderStatus, Price};
use galeria_storefront::db::PgGalleryStore;
use galeria_storefront::models::{NewLineItem, NewOrder, RecordOutcome};
use galeria_storefront::services::GalleryStore;

async fn store() -> PgGalleryStore {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let pool = PgPool::connect(&url).await.unwrap();
    sqlx::migrate!("../storefront/migrations")
        .run(&pool)
        .await
        .unwrap();
    PgGalleryStore::new(pool)
}

async fn insert_artwork(store: &PgGalleryStore, title: &str) -> ArtworkId {
    let id: Uuid = sqlx::query_scalar(
        "INSERT INTO artworks (title, price, image_url) VALUES ($1, 120.00, $2) RETURNING id",
    )
    .bind(title)
    .bind("/uploads/test.jpg")
    .fetch_one(store.pool())
    .await
    .unwrap();
    ArtworkId::new(id)
}

fn new_order(reference: &str) -> NewOrder {
    NewOrder {
        email: Email::parse("jan@x.sk").unwrap(),
        customer_name: "Ján Novák".to_string(),
        shipping_address: "Hlavná 1, Bratislava, 81101".to_string(),
        phone: None,
        total: Price::from_minor_units(12_000),
        status: OrderStatus::Paid,
        payment_reference: reference.to_string(),
        checkout_session_id: format!("cs_{reference}"),
    }
}

#[tokio::test]
#[ignore = "Requires DATABASE_URL"]
async fn test_record_paid_order_is_idempotent() {
    let store = store().await;
    let title = format!("Západ slnka {}", Uuid::new_v4());
    let artwork_id = insert_artwork(&store, &title).await;
    let reference = format!("pi_{}", Uuid::new_v4().simple());
    let items = vec![NewLineItem {
        artwork_id: Some(artwork_id),
        title: title.clone(),
        unit_price: Price::from_minor_units(12_000),
    }];

    let first = store
        .record_paid_order(new_order(&reference), items.clone())
        .await
        .unwrap();
    let RecordOutcome::Recorded(recorded) = first else {
        panic!("first write should record the order");
    };
    assert_eq!(recorded.line_items.len(), 1);
    assert!(recorded.double_sold.is_empty());

    let second = store
        .record_paid_order(new_order(&reference), items)
        .await
        .unwrap();
    assert!(matches!(
        second,
        RecordOutcome::AlreadyRecorded(id) if id == recorded.order.id
    ));

    let artwork = store.artwork(artwork_id).await.unwrap().unwrap();
    assert!(!artwork.available);
    let found = store
        .order_by_payment_reference(&reference)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(found.id, recorded.order.id);
}

#[tokio::test]
#[ignore = "Requires DATABASE_URL"]
async fn test_second_sale_reports_double_sold() {
    let store = store().await;
    let title = format!("Jesenný les {}", Uuid::new_v4());
    let artwork_id = insert_artwork(&store, &title).await;
    let item = NewLineItem {
        artwork_id: Some(artwork_id),
        title,
        unit_price: Price::from_minor_units(12_000),
    };

    let first = format!("pi_{}", Uuid::new_v4().simple());
    let second = format!("pi_{}", Uuid::new_v4().simple());
    store
        .record_paid_order(new_order(&first), vec![item.clone()])
        .await
        .unwrap();
    let outcome = store
        .record_paid_order(new_order(&second), vec![item])
        .await
        .unwrap();

    let RecordOutcome::Recorded(recorded) = outcome else {
        panic!("a different payment reference is a new order");
    };
    assert_eq!(recorded.double_sold, vec![artwork_id]);
}

#[tokio::test]
#[ignore = "Requires DATABASE_URL"]
async fn test_title_lookup_prefers_available_artwork() {
    let store = store().await;
    let title = format!("Ticho {}", Uuid::new_v4());
    let available = insert_artwork(&store, &title).await;
    let sold = insert_artwork(&store, &title).await;
    sqlx::query("UPDATE artworks SET available = FALSE, created_at = NOW() + INTERVAL '1 minute' WHERE id = $1")
        .bind(sold.as_uuid())
        .execute(store.pool())
        .await
        .unwrap();

    let found = store.artwork_by_title(&title).await.unwrap().unwrap();

    assert_eq!(found.id, available);
    assert!(found.available);
}
