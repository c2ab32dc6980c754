//! Cart commands.
//!
//! # Usage
//!
//! ```bash
//! trolley cart create -u <USER_ID>
//! trolley cart add <CART_ID> <PRODUCT_ID> -q 2
//! trolley cart show <CART_ID>
//! trolley cart remove <CART_ID> <PRODUCT_ID>
//! ```

use thiserror::Error;
use trolley_core::{CartId, ProductId, UserId};
use trolley_store::db::RepositoryError;
use trolley_store::error::ServiceError;
use trolley_store::models::NewCart;
use trolley_store::state::AppState;

use super::print_json;

/// Errors that can occur during cart operations.
#[derive(Debug, Error)]
pub enum CartCommandError {
    /// Cart service rejected the operation.
    #[error(transparent)]
    Service(#[from] ServiceError),

    /// Repository operation failed.
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    /// Output could not be rendered.
    #[error("failed to render output: {0}")]
    Output(#[from] serde_json::Error),
}

/// Create an empty cart.
///
/// # Errors
///
/// Returns `CartCommandError::Repository` if the insert fails.
pub async fn create(state: &AppState, user: Option<UserId>) -> Result<(), CartCommandError> {
    let cart = state.carts().create(&NewCart::new(user)).await?;
    tracing::info!(cart_id = %cart.id, "Created cart");
    print_json(&cart)?;
    Ok(())
}

/// Add a product to a cart.
///
/// # Errors
///
/// Returns `CartCommandError::Service` if the cart or product is missing or
/// the store fails.
pub async fn add(
    state: &AppState,
    cart: CartId,
    product: ProductId,
    quantity: u32,
) -> Result<(), CartCommandError> {
    let item = state
        .cart_item_service()
        .add_product_to_cart(cart, product, quantity)
        .await?;
    print_json(&item)?;
    Ok(())
}

/// Show the items in a cart.
///
/// # Errors
///
/// Returns `CartCommandError::Service` if the cart is missing.
pub async fn show(state: &AppState, cart: CartId) -> Result<(), CartCommandError> {
    let items = state.cart_item_service().cart_items(cart).await?;
    print_json(&items)?;
    Ok(())
}

/// Remove a product from a cart.
///
/// # Errors
///
/// Returns `CartCommandError::Service` if the cart is missing.
pub async fn remove(
    state: &AppState,
    cart: CartId,
    product: ProductId,
) -> Result<(), CartCommandError> {
    match state
        .cart_item_service()
        .remove_product_from_cart(cart, product)
        .await?
    {
        Some(item) => print_json(&item)?,
        None => tracing::info!(cart_id = %cart, product_id = %product, "Product was not in cart"),
    }
    Ok(())
}
