//! Record types.
//!
//! Each record implements [`Record`](crate::db::Record) and has a matching
//! repository alias. Field names are the document field names, so the
//! constants below can be used directly in filters and updates.

pub mod cart;
pub mod cart_item;
pub mod product;
pub mod user;

pub use cart::{Cart, CartRepository, NewCart};
pub use cart_item::{CartItem, CartItemRepository, NewCartItem};
pub use product::{NewProduct, Product, ProductRepository};
pub use user::{NewUser, User, UserRepository};
