//! Application state shared across commands and handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::models::{CartItemRepository, CartRepository, ProductRepository, UserRepository};
use crate::services::CartItemService;

/// Repositories and services bound to one store.
///
/// This struct is cheaply cloneable via `Arc`; every repository shares the
/// same underlying pool or in-memory collections.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    users: UserRepository,
    carts: CartRepository,
    products: ProductRepository,
    cart_items: CartItemRepository,
    cart_item_service: CartItemService,
}

impl AppState {
    /// Bind every repository to its `PostgreSQL` table.
    #[must_use]
    pub fn postgres(pool: &PgPool) -> Self {
        Self::from_repositories(
            UserRepository::postgres(pool.clone()),
            CartRepository::postgres(pool.clone()),
            ProductRepository::postgres(pool.clone()),
            CartItemRepository::postgres(pool.clone()),
        )
    }

    /// Bind every repository to a fresh in-memory collection.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::from_repositories(
            UserRepository::in_memory(),
            CartRepository::in_memory(),
            ProductRepository::in_memory(),
            CartItemRepository::in_memory(),
        )
    }

    /// Assemble state from already-bound repositories.
    #[must_use]
    pub fn from_repositories(
        users: UserRepository,
        carts: CartRepository,
        products: ProductRepository,
        cart_items: CartItemRepository,
    ) -> Self {
        let cart_item_service =
            CartItemService::new(carts.clone(), products.clone(), cart_items.clone());

        Self {
            inner: Arc::new(AppStateInner {
                users,
                carts,
                products,
                cart_items,
                cart_item_service,
            }),
        }
    }

    /// Get the user repository.
    #[must_use]
    pub fn users(&self) -> &UserRepository {
        &self.inner.users
    }

    /// Get the cart repository.
    #[must_use]
    pub fn carts(&self) -> &CartRepository {
        &self.inner.carts
    }

    /// Get the product repository.
    #[must_use]
    pub fn products(&self) -> &ProductRepository {
        &self.inner.products
    }

    /// Get the cart item repository.
    #[must_use]
    pub fn cart_items(&self) -> &CartItemRepository {
        &self.inner.cart_items
    }

    /// Get the cart item service.
    #[must_use]
    pub fn cart_item_service(&self) -> &CartItemService {
        &self.inner.cart_item_service
    }
}
