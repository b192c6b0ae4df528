//! Database pool for the storefront `PostgreSQL`.
//!
//! # Tables
//!
//! - `activity`, `category`, `activity_type`, `product` - the catalog
//! - `cart_item` - per-owner cart rows, unique on `(user_id, product_id)`
//! - `favorite` - per-owner favorite rows, unique on `(user_id, product_id)`
//!
//! # Migrations
//!
//! Migrations are stored in `crates/storefront/migrations/` and run via:
//! ```bash
//! cargo run -p keyiflibox-cli -- migrate
//! ```

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
