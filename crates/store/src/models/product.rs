//! Product records.

use serde::{Deserialize, Serialize};

use trolley_core::{Price, ProductId};

use crate::db::{Record, Repository};

/// A product that can be added to carts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    /// Unique product ID.
    pub id: ProductId,
    /// Display name.
    pub name: String,
    /// Unit price.
    pub price: Price,
}

/// Fields for a new product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewProduct {
    /// Display name.
    pub name: String,
    /// Unit price.
    pub price: Price,
}

impl Record for Product {
    const COLLECTION: &'static str = "products";
    type Draft = NewProduct;
}

/// Repository for products.
pub type ProductRepository = Repository<Product>;
