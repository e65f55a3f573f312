//! Order status.

use serde::{Deserialize, Serialize};

/// Lifecycle status of a reconciled order.
///
/// Every order is created from a captured payment, so there is no pending
/// state: an order is either cleanly paid or paid but flagged for a human
/// to look at (double sale, unmatched product, or total mismatch).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "order_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Payment captured and every line item reconciled.
    #[default]
    Paid,
    /// Payment captured, but reconciliation needs manual follow-up.
    NeedsReview,
}

impl OrderStatus {
    /// Human-readable label shown to staff.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Paid => "Zaplatené",
            Self::NeedsReview => "Zaplatené – vyžaduje kontrolu",
        }
    }

    /// Whether the order needs manual reconciliation.
    #[must_use]
    pub const fn needs_review(&self) -> bool {
        matches!(self, Self::NeedsReview)
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Paid => write!(f, "paid"),
            Self::NeedsReview => write!(f, "needs_review"),
        }
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "paid" => Ok(Self::Paid),
            "needs_review" => Ok(Self::NeedsReview),
            _ => Err(format!("invalid order status: {s}")),
        }
    }
}
