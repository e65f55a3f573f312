//! Storefront-only models.
//!
//! Catalog and order read types live in `galeria_core`; this module holds the
//! write-side shapes the reconciler hands to the store, plus session keys.

pub mod order;
pub mod session;

pub use order::{NewLineItem, NewOrder, RecordOutcome, RecordedOrder};
