//! Business logic services.
//!
//! # Services
//!
//! - `cart_items` - Adding, listing and removing products in carts

pub mod cart_items;

pub use cart_items::CartItemService;
