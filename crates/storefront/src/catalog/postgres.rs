//! `PostgreSQL` implementation of the catalog store.
//!
//! Queries use the sqlx runtime API against the migrations in
//! `crates/storefront/migrations/`. Products are read-heavy and immutable
//! from the storefront's perspective, so product-by-id lookups go through a
//! moka cache (5-minute TTL) that the importer writes invalidate. Cart and
//! favorite rows are mutable state and are never cached.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use moka::future::Cache;
use sqlx::{PgPool, QueryBuilder};
use tracing::{debug, instrument};

use keyiflibox_core::{ActivityId, CategoryId, LineId, OwnerId, ProductId};

use crate::catalog::{CatalogError, CatalogStore, ProductFilter};
use crate::models::{Activity, ActivityType, CartLine, Category, FavoriteEntry, Product,
    ProductDraft};

const PRODUCT_COLUMNS: &str = "id, activity_type_id, category_id, title, sub_title, description, \
     price, image_url, external_url, city, district, ticket_rule, date, rating, is_active, \
     priority, full_address, created_at";

/// Catalog store backed by `PostgreSQL`.
#[derive(Clone)]
pub struct PgCatalog {
    inner: Arc<PgCatalogInner>,
}

struct PgCatalogInner {
    pool: PgPool,
    product_cache: Cache<ProductId, Product>,
}

/// Raw cart row; the product join is assembled in a second query.
#[derive(sqlx::FromRow)]
struct CartRow {
    id: LineId,
    user_id: OwnerId,
    product_id: ProductId,
    quantity: i32,
    created_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct FavoriteRow {
    id: LineId,
    user_id: OwnerId,
    product_id: ProductId,
    created_at: DateTime<Utc>,
}

impl PgCatalog {
    /// Create a new catalog store over a connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        let product_cache = Cache::builder()
            .max_capacity(1000)
            .time_to_live(Duration::from_secs(300)) // 5 minutes
            .build();

        Self {
            inner: Arc::new(PgCatalogInner {
                pool,
                product_cache,
            }),
        }
    }

    fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// Fetch the products referenced by `ids`, keyed by id.
    async fn products_by_ids(
        &self,
        ids: &[String],
    ) -> Result<HashMap<ProductId, Product>, CatalogError> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let query = format!("SELECT {PRODUCT_COLUMNS} FROM product WHERE id = ANY($1)");
        let products: Vec<Product> = sqlx::query_as(&query)
            .bind(ids)
            .fetch_all(self.pool())
            .await?;

        Ok(products.into_iter().map(|p| (p.id.clone(), p)).collect())
    }
}

/// Map an insert failure, converting unique violations into `Conflict`.
fn map_insert_err(e: sqlx::Error, what: &str) -> CatalogError {
    if let sqlx::Error::Database(ref db_err) = e
        && db_err.is_unique_violation()
    {
        return CatalogError::Conflict(format!("{what} already exists"));
    }
    CatalogError::Database(e)
}

fn quantity_to_db(quantity: u32) -> i32 {
    i32::try_from(quantity).unwrap_or(i32::MAX)
}

fn quantity_from_db(quantity: i32) -> u32 {
    u32::try_from(quantity).unwrap_or(1)
}

#[async_trait]
impl CatalogStore for PgCatalog {
    #[instrument(skip(self), fields(product_id = %id))]
    async fn product(&self, id: &ProductId) -> Result<Option<Product>, CatalogError> {
        if let Some(product) = self.inner.product_cache.get(id).await {
            debug!("Cache hit for product");
            return Ok(Some(product));
        }

        let query = format!("SELECT {PRODUCT_COLUMNS} FROM product WHERE id = $1");
        let product: Option<Product> = sqlx::query_as(&query)
            .bind(id)
            .fetch_optional(self.pool())
            .await?;

        if let Some(ref product) = product {
            self.inner
                .product_cache
                .insert(id.clone(), product.clone())
                .await;
        }

        Ok(product)
    }

    #[instrument(skip(self))]
    async fn products(&self, filter: &ProductFilter) -> Result<Vec<Product>, CatalogError> {
        let mut qb = QueryBuilder::new(format!(
            "SELECT {PRODUCT_COLUMNS} FROM product WHERE TRUE"
        ));

        if let Some(category_id) = &filter.category_id {
            qb.push(" AND category_id = ").push_bind(category_id.as_str());
        }
        if let Some(activity_type_id) = &filter.activity_type_id {
            qb.push(" AND activity_type_id = ")
                .push_bind(activity_type_id.as_str());
        }
        if let Some(city) = &filter.city {
            qb.push(" AND city = ").push_bind(city.as_str());
        }
        if filter.only_active {
            qb.push(" AND is_active = TRUE");
        }
        qb.push(" ORDER BY priority DESC NULLS LAST, created_at DESC");

        let products = qb
            .build_query_as::<Product>()
            .fetch_all(self.pool())
            .await?;
        Ok(products)
    }

    #[instrument(skip(self))]
    async fn activities(&self) -> Result<Vec<Activity>, CatalogError> {
        let activities = sqlx::query_as(
            "SELECT id, activity_name, created_at FROM activity ORDER BY activity_name",
        )
        .fetch_all(self.pool())
        .await?;
        Ok(activities)
    }

    #[instrument(skip(self))]
    async fn categories(&self) -> Result<Vec<Category>, CatalogError> {
        let categories = sqlx::query_as(
            "SELECT id, activity_id, category_name, created_at FROM category \
             ORDER BY category_name",
        )
        .fetch_all(self.pool())
        .await?;
        Ok(categories)
    }

    #[instrument(skip(self))]
    async fn activity_types(&self) -> Result<Vec<ActivityType>, CatalogError> {
        let activity_types = sqlx::query_as(
            "SELECT id, activity_id, category_id, activity_type_name, created_at \
             FROM activity_type ORDER BY activity_type_name",
        )
        .fetch_all(self.pool())
        .await?;
        Ok(activity_types)
    }

    #[instrument(skip(self))]
    async fn insert_activity(&self, activity_name: &str) -> Result<Activity, CatalogError> {
        let id = uuid::Uuid::new_v4().to_string();
        let activity = sqlx::query_as(
            "INSERT INTO activity (id, activity_name) VALUES ($1, $2) \
             RETURNING id, activity_name, created_at",
        )
        .bind(&id)
        .bind(activity_name)
        .fetch_one(self.pool())
        .await
        .map_err(|e| map_insert_err(e, "activity"))?;
        Ok(activity)
    }

    #[instrument(skip(self))]
    async fn insert_category(
        &self,
        activity_id: &ActivityId,
        category_name: &str,
    ) -> Result<Category, CatalogError> {
        let id = uuid::Uuid::new_v4().to_string();
        let category = sqlx::query_as(
            "INSERT INTO category (id, activity_id, category_name) VALUES ($1, $2, $3) \
             RETURNING id, activity_id, category_name, created_at",
        )
        .bind(&id)
        .bind(activity_id)
        .bind(category_name)
        .fetch_one(self.pool())
        .await
        .map_err(|e| map_insert_err(e, "category"))?;
        Ok(category)
    }

    #[instrument(skip(self))]
    async fn insert_activity_type(
        &self,
        activity_id: &ActivityId,
        category_id: &CategoryId,
        activity_type_name: &str,
    ) -> Result<ActivityType, CatalogError> {
        let id = uuid::Uuid::new_v4().to_string();
        let activity_type = sqlx::query_as(
            "INSERT INTO activity_type (id, activity_id, category_id, activity_type_name) \
             VALUES ($1, $2, $3, $4) \
             RETURNING id, activity_id, category_id, activity_type_name, created_at",
        )
        .bind(&id)
        .bind(activity_id)
        .bind(category_id)
        .bind(activity_type_name)
        .fetch_one(self.pool())
        .await
        .map_err(|e| map_insert_err(e, "activity type"))?;
        Ok(activity_type)
    }

    #[instrument(skip(self, draft), fields(title = %draft.title))]
    async fn insert_product(&self, draft: &ProductDraft) -> Result<Product, CatalogError> {
        let id = uuid::Uuid::new_v4().to_string();
        let query = format!(
            "INSERT INTO product (id, activity_type_id, category_id, title, sub_title, \
             description, price, image_url, external_url, city, district, ticket_rule, date, \
             rating, is_active, priority, full_address) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17) \
             RETURNING {PRODUCT_COLUMNS}"
        );
        let product: Product = sqlx::query_as(&query)
            .bind(&id)
            .bind(&draft.activity_type_id)
            .bind(&draft.category_id)
            .bind(&draft.title)
            .bind(&draft.sub_title)
            .bind(&draft.description)
            .bind(draft.price)
            .bind(&draft.image_url)
            .bind(&draft.external_url)
            .bind(&draft.city)
            .bind(&draft.district)
            .bind(&draft.ticket_rule)
            .bind(&draft.date)
            .bind(draft.rating)
            .bind(draft.is_active)
            .bind(draft.priority)
            .bind(&draft.full_address)
            .fetch_one(self.pool())
            .await
            .map_err(|e| map_insert_err(e, "product"))?;
        Ok(product)
    }

    #[instrument(skip(self, draft), fields(product_id = %id))]
    async fn update_product(
        &self,
        id: &ProductId,
        draft: &ProductDraft,
    ) -> Result<(), CatalogError> {
        let result = sqlx::query(
            "UPDATE product SET activity_type_id = $1, category_id = $2, title = $3, \
             sub_title = $4, description = $5, price = $6, image_url = $7, external_url = $8, \
             city = $9, district = $10, ticket_rule = $11, date = $12, rating = $13, \
             is_active = $14, priority = $15, full_address = $16 \
             WHERE id = $17",
        )
        .bind(&draft.activity_type_id)
        .bind(&draft.category_id)
        .bind(&draft.title)
        .bind(&draft.sub_title)
        .bind(&draft.description)
        .bind(draft.price)
        .bind(&draft.image_url)
        .bind(&draft.external_url)
        .bind(&draft.city)
        .bind(&draft.district)
        .bind(&draft.ticket_rule)
        .bind(&draft.date)
        .bind(draft.rating)
        .bind(draft.is_active)
        .bind(draft.priority)
        .bind(&draft.full_address)
        .bind(id)
        .execute(self.pool())
        .await?;

        if result.rows_affected() == 0 {
            return Err(CatalogError::NotFound(format!("product {id}")));
        }

        self.inner.product_cache.invalidate(id).await;
        Ok(())
    }

    #[instrument(skip(self), fields(owner = %owner))]
    async fn cart_lines(&self, owner: &OwnerId) -> Result<Vec<CartLine>, CatalogError> {
        let rows: Vec<CartRow> = sqlx::query_as(
            "SELECT id, user_id, product_id, quantity, created_at FROM cart_item \
             WHERE user_id = $1",
        )
        .bind(owner)
        .fetch_all(self.pool())
        .await?;

        let ids: Vec<String> = rows
            .iter()
            .map(|r| r.product_id.as_str().to_owned())
            .collect();
        let mut products = self.products_by_ids(&ids).await?;

        Ok(rows
            .into_iter()
            .map(|r| CartLine {
                product: products.remove(&r.product_id),
                id: r.id,
                owner: r.user_id,
                product_id: r.product_id,
                quantity: quantity_from_db(r.quantity),
                created_at: r.created_at,
            })
            .collect())
    }

    #[instrument(skip(self), fields(owner = %owner, product_id = %product_id))]
    async fn cart_line(
        &self,
        owner: &OwnerId,
        product_id: &ProductId,
    ) -> Result<Option<CartLine>, CatalogError> {
        let row: Option<CartRow> = sqlx::query_as(
            "SELECT id, user_id, product_id, quantity, created_at FROM cart_item \
             WHERE user_id = $1 AND product_id = $2",
        )
        .bind(owner)
        .bind(product_id)
        .fetch_optional(self.pool())
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let product = self.product(&row.product_id).await?;
        Ok(Some(CartLine {
            id: row.id,
            owner: row.user_id,
            product_id: row.product_id,
            quantity: quantity_from_db(row.quantity),
            created_at: row.created_at,
            product,
        }))
    }

    #[instrument(skip(self), fields(owner = %owner, product_id = %product_id))]
    async fn insert_cart_line(
        &self,
        owner: &OwnerId,
        product_id: &ProductId,
        quantity: u32,
    ) -> Result<(), CatalogError> {
        let id = uuid::Uuid::new_v4().to_string();
        sqlx::query(
            "INSERT INTO cart_item (id, user_id, product_id, quantity) VALUES ($1, $2, $3, $4)",
        )
        .bind(&id)
        .bind(owner)
        .bind(product_id)
        .bind(quantity_to_db(quantity))
        .execute(self.pool())
        .await
        .map_err(|e| map_insert_err(e, "cart line"))?;
        Ok(())
    }

    #[instrument(skip(self), fields(owner = %owner, product_id = %product_id))]
    async fn update_cart_quantity(
        &self,
        owner: &OwnerId,
        product_id: &ProductId,
        quantity: u32,
    ) -> Result<bool, CatalogError> {
        let result = sqlx::query(
            "UPDATE cart_item SET quantity = $1 WHERE user_id = $2 AND product_id = $3",
        )
        .bind(quantity_to_db(quantity))
        .bind(owner)
        .bind(product_id)
        .execute(self.pool())
        .await?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self), fields(owner = %owner, product_id = %product_id))]
    async fn delete_cart_line(
        &self,
        owner: &OwnerId,
        product_id: &ProductId,
    ) -> Result<(), CatalogError> {
        sqlx::query("DELETE FROM cart_item WHERE user_id = $1 AND product_id = $2")
            .bind(owner)
            .bind(product_id)
            .execute(self.pool())
            .await?;
        Ok(())
    }

    #[instrument(skip(self), fields(owner = %owner))]
    async fn clear_cart(&self, owner: &OwnerId) -> Result<(), CatalogError> {
        sqlx::query("DELETE FROM cart_item WHERE user_id = $1")
            .bind(owner)
            .execute(self.pool())
            .await?;
        Ok(())
    }

    #[instrument(skip(self), fields(owner = %owner))]
    async fn favorites(&self, owner: &OwnerId) -> Result<Vec<FavoriteEntry>, CatalogError> {
        let rows: Vec<FavoriteRow> = sqlx::query_as(
            "SELECT id, user_id, product_id, created_at FROM favorite WHERE user_id = $1",
        )
        .bind(owner)
        .fetch_all(self.pool())
        .await?;

        let ids: Vec<String> = rows
            .iter()
            .map(|r| r.product_id.as_str().to_owned())
            .collect();
        let mut products = self.products_by_ids(&ids).await?;

        Ok(rows
            .into_iter()
            .map(|r| FavoriteEntry {
                product: products.remove(&r.product_id),
                id: r.id,
                owner: r.user_id,
                product_id: r.product_id,
                created_at: r.created_at,
            })
            .collect())
    }

    #[instrument(skip(self), fields(owner = %owner, product_id = %product_id))]
    async fn insert_favorite(
        &self,
        owner: &OwnerId,
        product_id: &ProductId,
    ) -> Result<(), CatalogError> {
        let id = uuid::Uuid::new_v4().to_string();
        sqlx::query("INSERT INTO favorite (id, user_id, product_id) VALUES ($1, $2, $3)")
            .bind(&id)
            .bind(owner)
            .bind(product_id)
            .execute(self.pool())
            .await
            .map_err(|e| map_insert_err(e, "favorite"))?;
        Ok(())
    }

    #[instrument(skip(self), fields(owner = %owner, product_id = %product_id))]
    async fn delete_favorite(
        &self,
        owner: &OwnerId,
        product_id: &ProductId,
    ) -> Result<(), CatalogError> {
        sqlx::query("DELETE FROM favorite WHERE user_id = $1 AND product_id = $2")
            .bind(owner)
            .bind(product_id)
            .execute(self.pool())
            .await?;
        Ok(())
    }
}
