//! Favorites State Container.
//!
//! Same shape as the cart container over a pure set relation: no quantity,
//! no totals. Anonymous favoriting is allowed and persisted locally; no
//! sign-in prompt. Presence is idempotent, so the authenticated add treats
//! a uniqueness conflict as the expected steady state rather than an error.

use std::sync::Arc;
use std::sync::RwLock;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use chrono::Utc;
use tracing::{debug, instrument, warn};

use keyiflibox_core::{LineId, OwnerId, ProductId};

use crate::catalog::{CatalogError, CatalogStore};
use crate::error::AppError;
use crate::local::schema::PersistedFavorite;
use crate::local::{LocalStore, keys, schema};
use crate::models::{CurrentUser, FavoriteEntry};
use crate::notify::Notifier;
use crate::services::KeyedLocks;
use crate::session::SessionProvider;

type Result<T> = std::result::Result<T, AppError>;

/// The reconciling favorites container.
pub struct FavoritesService {
    catalog: Arc<dyn CatalogStore>,
    local: Arc<dyn LocalStore>,
    session: SessionProvider,
    notifier: Notifier,
    entries: RwLock<Vec<FavoriteEntry>>,
    loading: AtomicBool,
    locks: KeyedLocks,
    local_seq: AtomicU64,
}

impl FavoritesService {
    #[must_use]
    pub fn new(
        catalog: Arc<dyn CatalogStore>,
        local: Arc<dyn LocalStore>,
        session: SessionProvider,
        notifier: Notifier,
    ) -> Self {
        Self {
            catalog,
            local,
            session,
            notifier,
            entries: RwLock::new(Vec::new()),
            loading: AtomicBool::new(false),
            locks: KeyedLocks::new(),
            local_seq: AtomicU64::new(0),
        }
    }

    /// Snapshot of the current favorites (unordered).
    #[must_use]
    pub fn entries(&self) -> Vec<FavoriteEntry> {
        self.entries
            .read()
            .expect("favorites lock poisoned")
            .clone()
    }

    /// Whether a load is in flight.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::SeqCst)
    }

    /// Pure in-memory lookup; called on every product-card render.
    #[must_use]
    pub fn is_favorite(&self, product_id: &ProductId) -> bool {
        self.entries
            .read()
            .expect("favorites lock poisoned")
            .iter()
            .any(|entry| entry.product_id == *product_id)
    }

    /// Repopulate the in-memory list from the store that currently owns the
    /// favorites. Fail-soft like the cart: the previous list survives a
    /// store failure.
    #[instrument(skip(self))]
    pub async fn load(&self) {
        self.loading.store(true, Ordering::SeqCst);
        let owner = self.session.owner();
        let result = if owner.is_anonymous() {
            self.load_local().await
        } else {
            self.load_remote(&owner).await
        };
        self.loading.store(false, Ordering::SeqCst);

        if let Err(e) = result {
            warn!(error = %e, "failed to load favorites");
            self.notifier.error("Failed to load favorites");
        }
    }

    /// Mark a product as favorite.
    ///
    /// Anonymous duplicates get a distinct "already in favorites" notice
    /// (accidental re-favoriting is common); authenticated duplicates are
    /// silently satisfied since toggling is idempotent.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn add_to_favorites(&self, product_id: &ProductId) {
        if product_id.is_empty() {
            self.notifier.error("Failed to add to favorites");
            return;
        }

        let owner = self.session.owner();
        let _guard = self.locks.acquire(&owner, product_id).await;

        let result = if owner.is_anonymous() {
            match self.add_local(product_id).await {
                Ok(true) => Ok(()),
                Ok(false) => {
                    self.notifier.info("Already in favorites");
                    return;
                }
                Err(e) => Err(e),
            }
        } else {
            self.add_remote(&owner, product_id).await
        };

        match result {
            Ok(()) => {
                self.load().await;
                self.notifier.success("Added to favorites");
            }
            Err(e) => {
                warn!(error = %e, "failed to add to favorites");
                self.notifier.error("Failed to add to favorites");
            }
        }
    }

    /// Remove a product from favorites; no-op if absent.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn remove_from_favorites(&self, product_id: &ProductId) {
        let owner = self.session.owner();
        let _guard = self.locks.acquire(&owner, product_id).await;

        let result = if owner.is_anonymous() {
            self.remove_local(product_id).await
        } else {
            self.catalog
                .delete_favorite(&owner, product_id)
                .await
                .map_err(AppError::from)
        };

        match result {
            Ok(()) => {
                self.load().await;
                self.notifier.success("Removed from favorites");
            }
            Err(e) => {
                warn!(error = %e, "failed to remove from favorites");
                self.notifier.error("Failed to remove from favorites");
            }
        }
    }

    /// React to a session identity change, mirroring the cart container:
    /// reconcile on the anonymous-to-authenticated edge, then reload.
    #[instrument(skip_all)]
    pub async fn on_session_change(
        &self,
        previous: Option<&CurrentUser>,
        next: Option<&CurrentUser>,
    ) {
        if previous.is_none()
            && let Some(user) = next
        {
            self.sync_local_to_remote(&user.owner).await;
        }
        self.load().await;
    }

    // =========================================================================
    // Reconciliation
    // =========================================================================

    /// Merge anonymous local favorites into the remote store.
    ///
    /// With no quantity to conflict on, the upsert collapses to
    /// insert-if-absent: a conflict just means the entry is already there.
    /// Failed entries are re-persisted (only the failed subset) for a retry
    /// on the next sign-in.
    #[instrument(skip(self), fields(owner = %owner))]
    async fn sync_local_to_remote(&self, owner: &OwnerId) {
        let raw = match self.local.get(keys::FAVORITES).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!(error = %e, "failed to read local favorites for sync");
                return;
            }
        };

        let local_entries = schema::decode_favorites(raw.as_deref());
        if local_entries.is_empty() {
            return;
        }

        let mut failed = Vec::new();
        for entry in local_entries {
            match self.catalog.insert_favorite(owner, &entry.product_id).await {
                Ok(()) | Err(CatalogError::Conflict(_)) => {}
                Err(e) => {
                    warn!(product_id = %entry.product_id, error = %e, "favorite merge failed");
                    failed.push(entry);
                }
            }
        }

        if failed.is_empty() {
            if let Err(e) = self.local.remove(keys::FAVORITES).await {
                warn!(error = %e, "failed to clear local favorites after sync");
                return;
            }
            self.notifier.success("Favorites synced successfully");
        } else {
            if let Err(e) = self
                .local
                .set(keys::FAVORITES, &schema::encode_favorites(&failed))
                .await
            {
                warn!(error = %e, "failed to persist unmerged favorites");
            }
            self.notifier.error("Some favorites could not be synced");
        }
    }

    // =========================================================================
    // Store paths
    // =========================================================================

    async fn load_local(&self) -> Result<()> {
        let raw = self.local.get(keys::FAVORITES).await?;
        let persisted = schema::decode_favorites(raw.as_deref());

        let mut entries = Vec::with_capacity(persisted.len());
        for entry in persisted {
            let product = self.catalog.product(&entry.product_id).await?;
            entries.push(FavoriteEntry {
                id: entry.id,
                owner: OwnerId::anonymous(),
                product_id: entry.product_id,
                created_at: entry.created_at,
                product,
            });
        }

        self.replace_entries(entries);
        Ok(())
    }

    async fn load_remote(&self, owner: &OwnerId) -> Result<()> {
        let entries = self.catalog.favorites(owner).await?;
        self.replace_entries(entries);
        Ok(())
    }

    /// Returns `Ok(false)` when the product was already a favorite.
    async fn add_local(&self, product_id: &ProductId) -> Result<bool> {
        let raw = self.local.get(keys::FAVORITES).await?;
        let mut entries = schema::decode_favorites(raw.as_deref());

        if entries.iter().any(|e| e.product_id == *product_id) {
            return Ok(false);
        }

        entries.push(PersistedFavorite {
            id: self.next_local_id(),
            product_id: product_id.clone(),
            created_at: Utc::now(),
        });

        self.local
            .set(keys::FAVORITES, &schema::encode_favorites(&entries))
            .await?;
        Ok(true)
    }

    async fn add_remote(&self, owner: &OwnerId, product_id: &ProductId) -> Result<()> {
        match self.catalog.insert_favorite(owner, product_id).await {
            Ok(()) => Ok(()),
            // The entry already exists: the steady state we wanted.
            Err(CatalogError::Conflict(_)) => {
                debug!("favorite already present");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn remove_local(&self, product_id: &ProductId) -> Result<()> {
        let raw = self.local.get(keys::FAVORITES).await?;
        let mut entries = schema::decode_favorites(raw.as_deref());
        entries.retain(|entry| entry.product_id != *product_id);

        self.local
            .set(keys::FAVORITES, &schema::encode_favorites(&entries))
            .await?;
        Ok(())
    }

    fn replace_entries(&self, entries: Vec<FavoriteEntry>) {
        *self.entries.write().expect("favorites lock poisoned") = entries;
    }

    fn next_local_id(&self) -> LineId {
        let seq = self.local_seq.fetch_add(1, Ordering::Relaxed);
        LineId::new(format!("local_{}_{}", Utc::now().timestamp_millis(), seq))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    use crate::catalog::MemoryCatalog;
    use crate::local::MemoryStore;
    use crate::models::ProductDraft;
    use crate::notify::{Notice, NoticeLevel};
    use keyiflibox_core::{CategoryId, Email, Price};

    struct Fixture {
        catalog: Arc<MemoryCatalog>,
        session: SessionProvider,
        notifier: Notifier,
        favorites: FavoritesService,
    }

    fn fixture() -> Fixture {
        let catalog = Arc::new(MemoryCatalog::new());
        let local = Arc::new(MemoryStore::new());
        let session = SessionProvider::new();
        let notifier = Notifier::new();
        let favorites = FavoritesService::new(
            Arc::clone(&catalog) as Arc<dyn CatalogStore>,
            local as Arc<dyn LocalStore>,
            session.clone(),
            notifier.clone(),
        );
        Fixture {
            catalog,
            session,
            notifier,
            favorites,
        }
    }

    fn draft(title: &str) -> ProductDraft {
        ProductDraft {
            activity_type_id: None,
            category_id: CategoryId::new("1"),
            title: title.to_owned(),
            sub_title: None,
            description: None,
            price: Price::new(dec!(100)),
            image_url: None,
            external_url: None,
            city: None,
            district: None,
            ticket_rule: None,
            date: None,
            rating: None,
            is_active: true,
            priority: None,
            full_address: None,
        }
    }

    fn drain(rx: &mut tokio::sync::broadcast::Receiver<Notice>) -> Vec<Notice> {
        let mut notices = Vec::new();
        while let Ok(notice) = rx.try_recv() {
            notices.push(notice);
        }
        notices
    }

    #[tokio::test]
    async fn test_toggle_visibility_anonymous() {
        let f = fixture();
        let product = f.catalog.insert_product(&draft("Hamam")).await.unwrap();

        assert!(!f.favorites.is_favorite(&product.id));

        f.favorites.add_to_favorites(&product.id).await;
        assert!(f.favorites.is_favorite(&product.id));

        f.favorites.remove_from_favorites(&product.id).await;
        assert!(!f.favorites.is_favorite(&product.id));
    }

    #[tokio::test]
    async fn test_toggle_visibility_authenticated() {
        let f = fixture();
        let product = f.catalog.insert_product(&draft("Masaj")).await.unwrap();
        let email = Email::parse("ayse@example.com").unwrap();
        f.session.sign_in(CurrentUser::from_email(email));

        f.favorites.add_to_favorites(&product.id).await;
        assert!(f.favorites.is_favorite(&product.id));

        f.favorites.remove_from_favorites(&product.id).await;
        assert!(!f.favorites.is_favorite(&product.id));
    }

    #[tokio::test]
    async fn test_anonymous_duplicate_gets_distinct_notice() {
        let f = fixture();
        let product = f.catalog.insert_product(&draft("Rafting")).await.unwrap();

        f.favorites.add_to_favorites(&product.id).await;

        let mut rx = f.notifier.subscribe();
        f.favorites.add_to_favorites(&product.id).await;

        let notices = drain(&mut rx);
        assert!(
            notices
                .iter()
                .any(|n| n.level == NoticeLevel::Info && n.message == "Already in favorites")
        );
        assert_eq!(f.favorites.entries().len(), 1);
    }

    #[tokio::test]
    async fn test_authenticated_duplicate_is_idempotent() {
        let f = fixture();
        let product = f.catalog.insert_product(&draft("Atölye")).await.unwrap();
        let email = Email::parse("ayse@example.com").unwrap();
        f.session.sign_in(CurrentUser::from_email(email));

        f.favorites.add_to_favorites(&product.id).await;
        f.favorites.add_to_favorites(&product.id).await;

        assert_eq!(f.favorites.entries().len(), 1);
        assert!(f.favorites.is_favorite(&product.id));
    }

    #[tokio::test]
    async fn test_remove_absent_is_noop() {
        let f = fixture();
        f.favorites
            .remove_from_favorites(&ProductId::new("ghost"))
            .await;
        assert!(f.favorites.entries().is_empty());
    }
}
