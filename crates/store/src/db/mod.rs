//! Document collections and repositories.
//!
//! # Database: `trolley`
//!
//! Every record type lives in its own collection. In `PostgreSQL` a collection
//! is a table in the `store` schema holding one JSONB document per row:
//!
//! ## Tables
//!
//! - `store.users` - Users with arbitrary caller-defined fields
//! - `store.carts` - Shopping carts
//! - `store.products` - Products (name, price)
//! - `store.cart_items` - Cart lines, unique per `(cart_id, product_id)`
//!
//! # Migrations
//!
//! Migrations are stored in `crates/store/migrations/` and run via:
//! ```bash
//! cargo run -p trolley-cli -- migrate
//! ```
//!
//! # Backends
//!
//! - [`PgCollection`] - `PostgreSQL` JSONB tables
//! - [`MemoryCollection`] - In-process collections for tests and local tooling

pub mod collection;
pub mod memory;
pub mod postgres;
pub mod repository;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;
use trolley_core::UpdateError;

pub use collection::{DocumentCollection, UpdateOptions};
pub use memory::MemoryCollection;
pub use postgres::PgCollection;
pub use repository::{Record, Repository};

use crate::config::StoreConfig;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the store is corrupted or could not be (de)serialized.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Update expression could not be applied.
    #[error("invalid update: {0}")]
    InvalidUpdate(#[from] UpdateError),

    /// Constraint violation (e.g., duplicate cart line).
    #[error("constraint violation: {0}")]
    Conflict(String),

    /// The backing store could not serve the request.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// A record that was required to exist was not found.
    #[error("document was not found in {collection} with filter {filter}")]
    NotFound {
        /// Collection that was queried.
        collection: String,
        /// Filter that matched nothing, rendered as JSON.
        filter: String,
    },
}

impl RepositoryError {
    /// Whether this is a unique-constraint violation.
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        match self {
            Self::Conflict(_) => true,
            Self::Database(sqlx::Error::Database(db_err)) => db_err.is_unique_violation(),
            _ => false,
        }
    }
}

/// Create a `PostgreSQL` connection pool from configuration.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(config: &StoreConfig) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.max_connections.min(2))
        .acquire_timeout(config.acquire_timeout)
        .connect(config.database_url.expose_secret())
        .await
}
