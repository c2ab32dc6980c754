//! Integration tests for Trolley.
//!
//! # Running Tests
//!
//! ```bash
//! # In-memory tests
//! cargo test -p trolley-integration-tests
//!
//! # PostgreSQL round-trips (needs DATABASE_URL pointing at a scratch server)
//! cargo test -p trolley-integration-tests -- --ignored
//! ```
//!
//! # Test Categories
//!
//! - `cart_items` - Cart service behavior against in-memory collections
//! - `postgres` - Repository and service behavior against `PostgreSQL`

use rust_decimal::Decimal;
use trolley_core::{CurrencyCode, Price};
use trolley_store::models::{Cart, NewCart, NewProduct, Product};
use trolley_store::state::AppState;

/// Create an anonymous cart.
///
/// # Panics
///
/// Panics if the store rejects the insert.
#[allow(clippy::expect_used)]
pub async fn seed_cart(state: &AppState) -> Cart {
    state
        .carts()
        .create(&NewCart::new(None))
        .await
        .expect("Failed to create cart")
}

/// Create a product priced in USD.
///
/// # Panics
///
/// Panics if the store rejects the insert.
#[allow(clippy::expect_used)]
pub async fn seed_product(state: &AppState, name: &str, cents: i64) -> Product {
    state
        .products()
        .create(&NewProduct {
            name: name.to_owned(),
            price: Price::new(Decimal::new(cents, 2), CurrencyCode::USD),
        })
        .await
        .expect("Failed to create product")
}
