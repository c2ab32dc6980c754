//! Database migration command.
//!
//! # Usage
//!
//! ```bash
//! trolley migrate
//! ```
//!
//! # Environment Variables
//!
//! - `TROLLEY_DATABASE_URL` - `PostgreSQL` connection string
//!
//! # Migration Files
//!
//! Migrations are embedded from `crates/store/migrations/` at compile time.

use sqlx::PgPool;

/// Run the store migrations.
///
/// # Errors
///
/// Returns `sqlx::migrate::MigrateError` if a migration fails to apply.
pub async fn run(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    tracing::info!("Running store migrations...");
    sqlx::migrate!("../store/migrations").run(pool).await?;
    tracing::info!("Store migrations complete!");
    Ok(())
}
