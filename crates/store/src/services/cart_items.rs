//! Cart item service.
//!
//! Adds products to carts. The cart and product must both exist; the cart
//! line is then created or its quantity increased in a single atomic upsert,
//! so concurrent adds of the same product never produce duplicate lines.

use tracing::{debug, info, instrument, warn};

use trolley_core::{CartId, Filter, ProductId, Update};

use crate::error::{self, ServiceError};
use crate::models::cart_item::QUANTITY;
use crate::models::{CartItem, CartItemRepository, CartRepository, ProductRepository};

/// Service for cart line operations.
#[derive(Debug, Clone)]
pub struct CartItemService {
    carts: CartRepository,
    products: ProductRepository,
    cart_items: CartItemRepository,
}

impl CartItemService {
    /// Create a new cart item service.
    #[must_use]
    pub const fn new(
        carts: CartRepository,
        products: ProductRepository,
        cart_items: CartItemRepository,
    ) -> Self {
        Self {
            carts,
            products,
            cart_items,
        }
    }

    /// Add `quantity` units of a product to a cart.
    ///
    /// Creates the cart line if it does not exist yet, otherwise increases
    /// its quantity. Returns the line as stored after the change.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` ("cart not found" / "product not found")
    /// if either record is missing, checked in that order.
    /// Returns `ServiceError::Internal` for any store failure.
    #[instrument(skip(self))]
    pub async fn add_product_to_cart(
        &self,
        cart_id: CartId,
        product_id: ProductId,
        quantity: u32,
    ) -> error::Result<CartItem> {
        self.ensure_cart(cart_id).await?;
        self.ensure_product(product_id).await?;

        let item = self
            .cart_items
            .upsert(
                &CartItem::filter_for(cart_id, product_id),
                &Update::new().inc(QUANTITY, i64::from(quantity)),
            )
            .await?;

        info!(
            cart_item_id = %item.id,
            quantity = item.quantity,
            "Product added to cart"
        );
        Ok(item)
    }

    /// List the lines of a cart in the order they were added.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` if the cart does not exist.
    /// Returns `ServiceError::Internal` for any store failure.
    #[instrument(skip(self))]
    pub async fn cart_items(&self, cart_id: CartId) -> error::Result<Vec<CartItem>> {
        self.ensure_cart(cart_id).await?;
        let items = self
            .cart_items
            .find(&CartItem::filter_for_cart(cart_id))
            .await?;
        debug!(count = items.len(), "Loaded cart items");
        Ok(items)
    }

    /// Remove a product's line from a cart.
    ///
    /// Returns the removed line, or `None` if the product was not in the cart.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` if the cart does not exist.
    /// Returns `ServiceError::Internal` for any store failure.
    #[instrument(skip(self))]
    pub async fn remove_product_from_cart(
        &self,
        cart_id: CartId,
        product_id: ProductId,
    ) -> error::Result<Option<CartItem>> {
        self.ensure_cart(cart_id).await?;
        let removed = self
            .cart_items
            .find_one_and_delete(&CartItem::filter_for(cart_id, product_id))
            .await?;
        if let Some(item) = &removed {
            info!(cart_item_id = %item.id, "Product removed from cart");
        }
        Ok(removed)
    }

    async fn ensure_cart(&self, cart_id: CartId) -> error::Result<()> {
        if self.carts.find_one(&Filter::by_id(cart_id)).await?.is_none() {
            warn!(%cart_id, "Cart not found");
            return Err(ServiceError::not_found("cart not found"));
        }
        Ok(())
    }

    async fn ensure_product(&self, product_id: ProductId) -> error::Result<()> {
        if self
            .products
            .find_one(&Filter::by_id(product_id))
            .await?
            .is_none()
        {
            warn!(%product_id, "Product not found");
            return Err(ServiceError::not_found("product not found"));
        }
        Ok(())
    }
}
