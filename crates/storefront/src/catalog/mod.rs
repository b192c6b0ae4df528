//! Remote Catalog Store.
//!
//! The managed backend holding the product taxonomy plus the per-owner cart
//! and favorite rows. Everything is equality-filter queries and writes keyed
//! by `(owner, product)`; conflict resolution lives in the state containers,
//! not here, so the "local wins" merge policy stays an explicit, testable
//! branch instead of an implicit upsert feature.
//!
//! Two implementations:
//! - [`PgCatalog`] - `PostgreSQL` via sqlx, with a moka product cache
//! - [`MemoryCatalog`] - in-memory store for tests, with failure injection

mod memory;
mod postgres;

pub use memory::MemoryCatalog;
pub use postgres::PgCatalog;

use async_trait::async_trait;
use thiserror::Error;

use keyiflibox_core::{ActivityId, ActivityTypeId, CategoryId, OwnerId, ProductId};

use crate::models::{Activity, ActivityType, CartLine, Category, FavoriteEntry, Product,
    ProductDraft};

/// Errors that can occur when talking to the catalog store.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Database operation failed.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A uniqueness constraint was violated (duplicate `(owner, product)`
    /// row, most likely from a concurrent tab).
    #[error("conflict: {0}")]
    Conflict(String),

    /// Referenced row does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// A stored row could not be interpreted.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// The store is unreachable (transient).
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Equality filter for product listings.
#[derive(Debug, Clone, Default)]
pub struct ProductFilter {
    pub category_id: Option<CategoryId>,
    pub activity_type_id: Option<ActivityTypeId>,
    pub city: Option<String>,
    /// When set (the storefront default), only active products are returned.
    pub only_active: bool,
}

/// The remote catalog store contract consumed by the storefront.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    // =========================================================================
    // Catalog reads
    // =========================================================================

    /// Look up a single product by id.
    async fn product(&self, id: &ProductId) -> Result<Option<Product>, CatalogError>;

    /// List products matching an equality filter, highest priority first.
    async fn products(&self, filter: &ProductFilter) -> Result<Vec<Product>, CatalogError>;

    async fn activities(&self) -> Result<Vec<Activity>, CatalogError>;

    async fn categories(&self) -> Result<Vec<Category>, CatalogError>;

    async fn activity_types(&self) -> Result<Vec<ActivityType>, CatalogError>;

    // =========================================================================
    // Catalog writes (bulk importer)
    // =========================================================================

    async fn insert_activity(&self, activity_name: &str) -> Result<Activity, CatalogError>;

    async fn insert_category(
        &self,
        activity_id: &ActivityId,
        category_name: &str,
    ) -> Result<Category, CatalogError>;

    async fn insert_activity_type(
        &self,
        activity_id: &ActivityId,
        category_id: &CategoryId,
        activity_type_name: &str,
    ) -> Result<ActivityType, CatalogError>;

    async fn insert_product(&self, draft: &ProductDraft) -> Result<Product, CatalogError>;

    /// Update an existing product.
    ///
    /// Returns [`CatalogError::NotFound`] if no row matches `id`.
    async fn update_product(&self, id: &ProductId, draft: &ProductDraft)
    -> Result<(), CatalogError>;

    // =========================================================================
    // Cart rows, keyed by (owner, product)
    // =========================================================================

    /// All cart rows owned by `owner`, joined with their products.
    async fn cart_lines(&self, owner: &OwnerId) -> Result<Vec<CartLine>, CatalogError>;

    /// The cart row for `(owner, product)`, if any.
    async fn cart_line(
        &self,
        owner: &OwnerId,
        product_id: &ProductId,
    ) -> Result<Option<CartLine>, CatalogError>;

    /// Insert a new cart row.
    ///
    /// Returns [`CatalogError::Conflict`] if a row for `(owner, product)`
    /// already exists.
    async fn insert_cart_line(
        &self,
        owner: &OwnerId,
        product_id: &ProductId,
        quantity: u32,
    ) -> Result<(), CatalogError>;

    /// Overwrite the quantity of an existing cart row.
    ///
    /// Returns `false` (not an error) when no row matches: updates never
    /// create.
    async fn update_cart_quantity(
        &self,
        owner: &OwnerId,
        product_id: &ProductId,
        quantity: u32,
    ) -> Result<bool, CatalogError>;

    /// Delete the cart row for `(owner, product)`; no-op if absent.
    async fn delete_cart_line(
        &self,
        owner: &OwnerId,
        product_id: &ProductId,
    ) -> Result<(), CatalogError>;

    /// Delete every cart row owned by `owner`.
    async fn clear_cart(&self, owner: &OwnerId) -> Result<(), CatalogError>;

    // =========================================================================
    // Favorite rows
    // =========================================================================

    /// All favorite rows owned by `owner`, joined with their products.
    async fn favorites(&self, owner: &OwnerId) -> Result<Vec<FavoriteEntry>, CatalogError>;

    /// Insert a favorite row.
    ///
    /// Returns [`CatalogError::Conflict`] if the `(owner, product)` entry
    /// already exists.
    async fn insert_favorite(
        &self,
        owner: &OwnerId,
        product_id: &ProductId,
    ) -> Result<(), CatalogError>;

    /// Delete the favorite row for `(owner, product)`; no-op if absent.
    async fn delete_favorite(
        &self,
        owner: &OwnerId,
        product_id: &ProductId,
    ) -> Result<(), CatalogError>;
}
