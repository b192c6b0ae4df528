//! In-memory catalog store.
//!
//! Backs the test suites and local development without a database. Rows
//! live in hash maps keyed by `(owner, product)`, which gives the same
//! uniqueness semantics as the Postgres constraints. `set_offline(true)`
//! makes every operation fail with a transient error, for exercising the
//! fail-soft paths.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use keyiflibox_core::{ActivityId, CategoryId, LineId, OwnerId, ProductId};

use crate::catalog::{CatalogError, CatalogStore, ProductFilter};
use crate::models::{Activity, ActivityType, CartLine, Category, FavoriteEntry, Product,
    ProductDraft};

#[derive(Clone)]
struct StoredLine {
    id: LineId,
    quantity: u32,
    created_at: DateTime<Utc>,
}

#[derive(Clone)]
struct StoredFavorite {
    id: LineId,
    created_at: DateTime<Utc>,
}

#[derive(Default)]
struct Inner {
    activities: Vec<Activity>,
    categories: Vec<Category>,
    activity_types: Vec<ActivityType>,
    products: HashMap<ProductId, Product>,
    cart: HashMap<(OwnerId, ProductId), StoredLine>,
    favorites: HashMap<(OwnerId, ProductId), StoredFavorite>,
}

/// Catalog store held entirely in memory.
#[derive(Default)]
pub struct MemoryCatalog {
    inner: Mutex<Inner>,
    offline: AtomicBool,
    failing_writes: std::sync::Mutex<HashSet<ProductId>>,
}

impl MemoryCatalog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate the backend being unreachable.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Make cart and favorite writes touching one product fail with a
    /// transient error, for exercising the best-effort merge paths.
    pub fn fail_product_writes(&self, product_id: &ProductId) {
        self.failing_writes
            .lock()
            .expect("failing writes lock poisoned")
            .insert(product_id.clone());
    }

    /// Let writes touching previously failed products succeed again.
    pub fn clear_product_failures(&self) {
        self.failing_writes
            .lock()
            .expect("failing writes lock poisoned")
            .clear();
    }

    fn check_online(&self) -> Result<(), CatalogError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(CatalogError::Unavailable("store offline".to_string()));
        }
        Ok(())
    }

    fn check_writable(&self, product_id: &ProductId) -> Result<(), CatalogError> {
        if self
            .failing_writes
            .lock()
            .expect("failing writes lock poisoned")
            .contains(product_id)
        {
            return Err(CatalogError::Unavailable(format!(
                "write rejected for {product_id}"
            )));
        }
        Ok(())
    }

    fn new_id() -> LineId {
        LineId::new(uuid::Uuid::new_v4().to_string())
    }
}

#[async_trait]
impl CatalogStore for MemoryCatalog {
    async fn product(&self, id: &ProductId) -> Result<Option<Product>, CatalogError> {
        self.check_online()?;
        Ok(self.inner.lock().await.products.get(id).cloned())
    }

    async fn products(&self, filter: &ProductFilter) -> Result<Vec<Product>, CatalogError> {
        self.check_online()?;
        let inner = self.inner.lock().await;
        let mut products: Vec<Product> = inner
            .products
            .values()
            .filter(|p| {
                filter
                    .category_id
                    .as_ref()
                    .is_none_or(|c| p.category_id == *c)
                    && filter
                        .activity_type_id
                        .as_ref()
                        .is_none_or(|t| p.activity_type_id.as_ref() == Some(t))
                    && filter.city.as_ref().is_none_or(|c| p.city.as_deref() == Some(c.as_str()))
                    && (!filter.only_active || p.is_active)
            })
            .cloned()
            .collect();

        products.sort_by(|a, b| {
            b.priority
                .unwrap_or(i32::MIN)
                .cmp(&a.priority.unwrap_or(i32::MIN))
                .then(b.created_at.cmp(&a.created_at))
        });
        Ok(products)
    }

    async fn activities(&self) -> Result<Vec<Activity>, CatalogError> {
        self.check_online()?;
        Ok(self.inner.lock().await.activities.clone())
    }

    async fn categories(&self) -> Result<Vec<Category>, CatalogError> {
        self.check_online()?;
        Ok(self.inner.lock().await.categories.clone())
    }

    async fn activity_types(&self) -> Result<Vec<ActivityType>, CatalogError> {
        self.check_online()?;
        Ok(self.inner.lock().await.activity_types.clone())
    }

    async fn insert_activity(&self, activity_name: &str) -> Result<Activity, CatalogError> {
        self.check_online()?;
        let activity = Activity {
            id: ActivityId::new(uuid::Uuid::new_v4().to_string()),
            activity_name: activity_name.to_owned(),
            created_at: Utc::now(),
        };
        self.inner.lock().await.activities.push(activity.clone());
        Ok(activity)
    }

    async fn insert_category(
        &self,
        activity_id: &ActivityId,
        category_name: &str,
    ) -> Result<Category, CatalogError> {
        self.check_online()?;
        let category = Category {
            id: CategoryId::new(uuid::Uuid::new_v4().to_string()),
            activity_id: activity_id.clone(),
            category_name: category_name.to_owned(),
            created_at: Utc::now(),
        };
        self.inner.lock().await.categories.push(category.clone());
        Ok(category)
    }

    async fn insert_activity_type(
        &self,
        activity_id: &ActivityId,
        category_id: &CategoryId,
        activity_type_name: &str,
    ) -> Result<ActivityType, CatalogError> {
        self.check_online()?;
        let activity_type = ActivityType {
            id: keyiflibox_core::ActivityTypeId::new(uuid::Uuid::new_v4().to_string()),
            activity_id: activity_id.clone(),
            category_id: category_id.clone(),
            activity_type_name: activity_type_name.to_owned(),
            created_at: Utc::now(),
        };
        self.inner
            .lock()
            .await
            .activity_types
            .push(activity_type.clone());
        Ok(activity_type)
    }

    async fn insert_product(&self, draft: &ProductDraft) -> Result<Product, CatalogError> {
        self.check_online()?;
        let product = Product {
            id: ProductId::new(uuid::Uuid::new_v4().to_string()),
            activity_type_id: draft.activity_type_id.clone(),
            category_id: draft.category_id.clone(),
            title: draft.title.clone(),
            sub_title: draft.sub_title.clone(),
            description: draft.description.clone(),
            price: draft.price,
            image_url: draft.image_url.clone(),
            external_url: draft.external_url.clone(),
            city: draft.city.clone(),
            district: draft.district.clone(),
            ticket_rule: draft.ticket_rule.clone(),
            date: draft.date.clone(),
            rating: draft.rating,
            is_active: draft.is_active,
            priority: draft.priority,
            full_address: draft.full_address.clone(),
            created_at: Utc::now(),
        };
        self.inner
            .lock()
            .await
            .products
            .insert(product.id.clone(), product.clone());
        Ok(product)
    }

    async fn update_product(
        &self,
        id: &ProductId,
        draft: &ProductDraft,
    ) -> Result<(), CatalogError> {
        self.check_online()?;
        let mut inner = self.inner.lock().await;
        let Some(existing) = inner.products.get_mut(id) else {
            return Err(CatalogError::NotFound(format!("product {id}")));
        };

        existing.activity_type_id = draft.activity_type_id.clone();
        existing.category_id = draft.category_id.clone();
        existing.title = draft.title.clone();
        existing.sub_title = draft.sub_title.clone();
        existing.description = draft.description.clone();
        existing.price = draft.price;
        existing.image_url = draft.image_url.clone();
        existing.external_url = draft.external_url.clone();
        existing.city = draft.city.clone();
        existing.district = draft.district.clone();
        existing.ticket_rule = draft.ticket_rule.clone();
        existing.date = draft.date.clone();
        existing.rating = draft.rating;
        existing.is_active = draft.is_active;
        existing.priority = draft.priority;
        existing.full_address = draft.full_address.clone();
        Ok(())
    }

    async fn cart_lines(&self, owner: &OwnerId) -> Result<Vec<CartLine>, CatalogError> {
        self.check_online()?;
        let inner = self.inner.lock().await;
        Ok(inner
            .cart
            .iter()
            .filter(|((row_owner, _), _)| row_owner == owner)
            .map(|((row_owner, product_id), stored)| CartLine {
                id: stored.id.clone(),
                owner: row_owner.clone(),
                product_id: product_id.clone(),
                quantity: stored.quantity,
                created_at: stored.created_at,
                product: inner.products.get(product_id).cloned(),
            })
            .collect())
    }

    async fn cart_line(
        &self,
        owner: &OwnerId,
        product_id: &ProductId,
    ) -> Result<Option<CartLine>, CatalogError> {
        self.check_online()?;
        let inner = self.inner.lock().await;
        Ok(inner
            .cart
            .get(&(owner.clone(), product_id.clone()))
            .map(|stored| CartLine {
                id: stored.id.clone(),
                owner: owner.clone(),
                product_id: product_id.clone(),
                quantity: stored.quantity,
                created_at: stored.created_at,
                product: inner.products.get(product_id).cloned(),
            }))
    }

    async fn insert_cart_line(
        &self,
        owner: &OwnerId,
        product_id: &ProductId,
        quantity: u32,
    ) -> Result<(), CatalogError> {
        self.check_online()?;
        self.check_writable(product_id)?;
        let mut inner = self.inner.lock().await;
        let key = (owner.clone(), product_id.clone());
        if inner.cart.contains_key(&key) {
            return Err(CatalogError::Conflict("cart line already exists".to_string()));
        }
        inner.cart.insert(
            key,
            StoredLine {
                id: Self::new_id(),
                quantity,
                created_at: Utc::now(),
            },
        );
        Ok(())
    }

    async fn update_cart_quantity(
        &self,
        owner: &OwnerId,
        product_id: &ProductId,
        quantity: u32,
    ) -> Result<bool, CatalogError> {
        self.check_online()?;
        self.check_writable(product_id)?;
        let mut inner = self.inner.lock().await;
        match inner.cart.get_mut(&(owner.clone(), product_id.clone())) {
            Some(stored) => {
                stored.quantity = quantity;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_cart_line(
        &self,
        owner: &OwnerId,
        product_id: &ProductId,
    ) -> Result<(), CatalogError> {
        self.check_online()?;
        self.inner
            .lock()
            .await
            .cart
            .remove(&(owner.clone(), product_id.clone()));
        Ok(())
    }

    async fn clear_cart(&self, owner: &OwnerId) -> Result<(), CatalogError> {
        self.check_online()?;
        self.inner
            .lock()
            .await
            .cart
            .retain(|(row_owner, _), _| row_owner != owner);
        Ok(())
    }

    async fn favorites(&self, owner: &OwnerId) -> Result<Vec<FavoriteEntry>, CatalogError> {
        self.check_online()?;
        let inner = self.inner.lock().await;
        Ok(inner
            .favorites
            .iter()
            .filter(|((row_owner, _), _)| row_owner == owner)
            .map(|((row_owner, product_id), stored)| FavoriteEntry {
                id: stored.id.clone(),
                owner: row_owner.clone(),
                product_id: product_id.clone(),
                created_at: stored.created_at,
                product: inner.products.get(product_id).cloned(),
            })
            .collect())
    }

    async fn insert_favorite(
        &self,
        owner: &OwnerId,
        product_id: &ProductId,
    ) -> Result<(), CatalogError> {
        self.check_online()?;
        self.check_writable(product_id)?;
        let mut inner = self.inner.lock().await;
        let key = (owner.clone(), product_id.clone());
        if inner.favorites.contains_key(&key) {
            return Err(CatalogError::Conflict("favorite already exists".to_string()));
        }
        inner.favorites.insert(
            key,
            StoredFavorite {
                id: Self::new_id(),
                created_at: Utc::now(),
            },
        );
        Ok(())
    }

    async fn delete_favorite(
        &self,
        owner: &OwnerId,
        product_id: &ProductId,
    ) -> Result<(), CatalogError> {
        self.check_online()?;
        self.inner
            .lock()
            .await
            .favorites
            .remove(&(owner.clone(), product_id.clone()));
        Ok(())
    }
}
