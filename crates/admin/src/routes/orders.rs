//! Order review.

use askama::Template;
use askama_web::WebTemplate;
use axum::extract::State;

use galeria_core::order::line_items_total;

use crate::db::{OrderRepository, OrderWithItems};
use crate::error::Result;
use crate::state::AppState;

/// How many orders the list shows.
const ORDER_LIST_LIMIT: i64 = 200;

/// One purchased piece.
#[derive(Debug, Clone)]
pub struct LineItemRow {
    pub title: String,
    pub price: String,
    /// Whether the piece was matched to a catalog artwork.
    pub matched: bool,
}

/// Order row in the admin list.
#[derive(Debug, Clone)]
pub struct OrderRow {
    pub created_at: String,
    pub customer_name: String,
    pub email: String,
    pub phone: String,
    pub shipping_address: String,
    pub total: String,
    /// Set when the line items do not add up to the charged total.
    pub items_total: Option<String>,
    pub status: &'static str,
    pub needs_review: bool,
    pub payment_reference: String,
    pub items: Vec<LineItemRow>,
}

impl From<&OrderWithItems> for OrderRow {
    fn from(entry: &OrderWithItems) -> Self {
        let order = &entry.order;
        let items_total = line_items_total(&entry.items);

        Self {
            created_at: order.created_at.format("%d. %m. %Y %H:%M").to_string(),
            customer_name: order.customer_name.clone(),
            email: order.email.to_string(),
            phone: order.phone.clone().unwrap_or_default(),
            shipping_address: order.shipping_address.clone(),
            total: order.total.display(),
            items_total: (items_total != order.total).then(|| items_total.display()),
            status: order.status.label(),
            needs_review: order.status.needs_review(),
            payment_reference: order.payment_reference.clone(),
            items: entry
                .items
                .iter()
                .map(|item| LineItemRow {
                    title: item.title.clone(),
                    price: item.unit_price.display(),
                    matched: item.artwork_id.is_some(),
                })
                .collect(),
        }
    }
}

/// Order list template.
#[derive(Template, WebTemplate)]
#[template(path = "orders/index.html")]
pub struct OrdersTemplate {
    pub orders: Vec<OrderRow>,
    pub review_count: usize,
}

/// Newest orders, flagged ones highlighted.
pub async fn index(State(state): State<AppState>) -> Result<OrdersTemplate> {
    let orders = OrderRepository::new(state.pool())
        .list_recent(ORDER_LIST_LIMIT)
        .await?;

    let rows: Vec<OrderRow> = orders.iter().map(OrderRow::from).collect();
    let review_count = rows.iter().filter(|row| row.needs_review).count();

    Ok(OrdersTemplate {
        orders: rows,
        review_count,
    })
}
