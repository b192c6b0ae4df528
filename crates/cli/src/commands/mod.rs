//! CLI command implementations.

pub mod import;
pub mod migrate;
pub mod template;

use secrecy::SecretString;

/// Connection string for the storefront database, with the generic
/// `DATABASE_URL` as fallback.
fn database_url() -> Result<SecretString, &'static str> {
    std::env::var("STOREFRONT_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map(SecretString::from)
        .map_err(|_| "STOREFRONT_DATABASE_URL not set")
}
