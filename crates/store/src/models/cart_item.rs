//! Cart item records.
//!
//! A cart item is one line of a cart: a product and how many of it. There is
//! at most one item per `(cart_id, product_id)`; the collection enforces this
//! with a compound unique key.

use serde::{Deserialize, Serialize};

use trolley_core::{CartId, CartItemId, Filter, ProductId};

use crate::db::{Record, Repository};

/// Document field holding the cart ID.
pub const CART_ID: &str = "cart_id";
/// Document field holding the product ID.
pub const PRODUCT_ID: &str = "product_id";
/// Document field holding the quantity.
pub const QUANTITY: &str = "quantity";

/// A product line in a cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    /// Unique cart item ID.
    pub id: CartItemId,
    /// Cart this line belongs to.
    pub cart_id: CartId,
    /// Product on this line.
    pub product_id: ProductId,
    /// Number of units.
    pub quantity: u64,
}

impl CartItem {
    /// Filter matching the line for `product_id` in `cart_id`.
    #[must_use]
    pub fn filter_for(cart_id: CartId, product_id: ProductId) -> Filter {
        Filter::new()
            .eq(CART_ID, cart_id)
            .eq(PRODUCT_ID, product_id)
    }

    /// Filter matching every line in `cart_id`.
    #[must_use]
    pub fn filter_for_cart(cart_id: CartId) -> Filter {
        Filter::new().eq(CART_ID, cart_id)
    }
}

/// Fields for a new cart item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewCartItem {
    /// Cart this line belongs to.
    pub cart_id: CartId,
    /// Product on this line.
    pub product_id: ProductId,
    /// Number of units.
    pub quantity: u64,
}

impl Record for CartItem {
    const COLLECTION: &'static str = "cart_items";
    const UNIQUE_KEYS: &'static [&'static [&'static str]] = &[&[CART_ID, PRODUCT_ID]];
    type Draft = NewCartItem;
}

/// Repository for cart items.
pub type CartItemRepository = Repository<CartItem>;
