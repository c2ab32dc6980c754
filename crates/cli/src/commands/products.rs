//! Product commands.
//!
//! # Usage
//!
//! ```bash
//! trolley product create -n "Dried pineapple" -p 8.99 -c USD
//! trolley product list
//! ```

use rust_decimal::Decimal;
use thiserror::Error;
use trolley_core::{CurrencyCode, Filter, Price};
use trolley_store::db::RepositoryError;
use trolley_store::models::NewProduct;
use trolley_store::state::AppState;

use super::print_json;

/// Errors that can occur during product operations.
#[derive(Debug, Error)]
pub enum ProductCommandError {
    /// The price amount is negative.
    #[error("price must not be negative: {0}")]
    NegativePrice(Decimal),

    /// Repository operation failed.
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    /// Output could not be rendered.
    #[error("failed to render output: {0}")]
    Output(#[from] serde_json::Error),
}

/// Create a product.
///
/// # Errors
///
/// Returns `ProductCommandError::NegativePrice` for a negative amount, or
/// another `ProductCommandError` if the insert fails.
pub async fn create(
    state: &AppState,
    name: String,
    amount: Decimal,
    currency: CurrencyCode,
) -> Result<(), ProductCommandError> {
    if amount.is_sign_negative() {
        return Err(ProductCommandError::NegativePrice(amount));
    }

    let product = state
        .products()
        .create(&NewProduct {
            name,
            price: Price::new(amount, currency),
        })
        .await?;
    tracing::info!(product_id = %product.id, price = %product.price, "Created product");
    print_json(&product)?;
    Ok(())
}

/// List all products.
///
/// # Errors
///
/// Returns `ProductCommandError` if the query fails.
pub async fn list(state: &AppState) -> Result<(), ProductCommandError> {
    let products = state.products().find(&Filter::new()).await?;
    print_json(&products)?;
    Ok(())
}
