//! Galéria Core - Shared types library.
//!
//! This crate provides common types used across all gallery components:
//! - `storefront` - Public catalog, cart, checkout and payment webhook
//! - `admin` - Artwork management panel
//! - `cli` - Command-line tools for migrations and seeding
//!
//! # Architecture
//!
//! The core crate contains only types and pure logic - no I/O, no database
//! access, no HTTP clients. This keeps it lightweight and allows it to be
//! used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for ids, prices, emails and order statuses
//! - [`artwork`] - Catalog artworks
//! - [`order`] - Reconciled orders and their line items
//! - [`cart`] - The buyer's cart value with one-of-a-kind semantics

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod artwork;
pub mod cart;
pub mod order;
pub mod types;

pub use artwork::Artwork;
pub use cart::{ArtworkSnapshot, Cart, CartItem};
pub use order::{Order, OrderLineItem};
pub use types::*;
