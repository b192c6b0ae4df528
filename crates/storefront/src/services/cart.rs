//! Cart State Container.
//!
//! Owns the authoritative in-memory view of the current cart. Every
//! operation decides between the Local Persistent Store (anonymous) and the
//! Remote Catalog Store (authenticated), and the two are brought in sync
//! exactly once at the anonymous-to-authenticated transition.
//!
//! Store failures never escape these operations: they are caught here,
//! logged, and surfaced as user notices, leaving the in-memory list at its
//! last-known-good value. Every mutation ends by re-fetching the
//! authoritative list instead of patching in-memory state.

use std::sync::RwLock;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, instrument, warn};

use keyiflibox_core::{LineId, OwnerId, Price, ProductId};

use crate::catalog::{CatalogError, CatalogStore};
use crate::error::AppError;
use crate::local::{LocalStore, keys, schema};
use crate::local::schema::PersistedCartLine;
use crate::models::{CartLine, CurrentUser};
use crate::notify::Notifier;
use crate::services::KeyedLocks;
use crate::session::SessionProvider;

type Result<T> = std::result::Result<T, AppError>;

/// The reconciling cart container.
pub struct CartService {
    catalog: Arc<dyn CatalogStore>,
    local: Arc<dyn LocalStore>,
    session: SessionProvider,
    notifier: Notifier,
    lines: RwLock<Vec<CartLine>>,
    loading: AtomicBool,
    locks: KeyedLocks,
    local_seq: AtomicU64,
}

impl CartService {
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
            lines: RwLock::new(Vec::new()),
            loading: AtomicBool::new(false),
            locks: KeyedLocks::new(),
            local_seq: AtomicU64::new(0),
        }
    }

    /// Snapshot of the current cart lines (unordered).
    #[must_use]
    pub fn lines(&self) -> Vec<CartLine> {
        self.lines.read().expect("cart lines lock poisoned").clone()
    }

    /// Whether a load is in flight.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::SeqCst)
    }

    /// Total items across all lines (the cart badge number), not the number
    /// of distinct products.
    #[must_use]
    pub fn cart_count(&self) -> u32 {
        self.lines
            .read()
            .expect("cart lines lock poisoned")
            .iter()
            .map(|line| line.quantity)
            .sum()
    }

    /// Sum of line totals. Lines whose product no longer resolves
    /// contribute zero; rendering a total never fails.
    #[must_use]
    pub fn cart_total(&self) -> Price {
        self.lines
            .read()
            .expect("cart lines lock poisoned")
            .iter()
            .map(CartLine::line_total)
            .sum()
    }

    /// Repopulate the in-memory list from the store that currently owns the
    /// cart.
    ///
    /// Fail-soft: on a store failure the previous list is left untouched -
    /// an empty cart is a worse user-visible outcome than a stale one.
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
            warn!(error = %e, "failed to load cart");
            self.notifier.error("Failed to load cart");
        }
    }

    /// Add `quantity` of a product, incrementing any existing line.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn add_to_cart(&self, product_id: &ProductId, quantity: u32) {
        if product_id.is_empty() {
            self.notifier.error("Failed to add to cart");
            return;
        }
        if quantity == 0 {
            self.notifier.error("Failed to add to cart");
            return;
        }

        let owner = self.session.owner();
        let _guard = self.locks.acquire(&owner, product_id).await;

        let result = if owner.is_anonymous() {
            self.add_local(product_id, quantity).await
        } else {
            self.add_remote(&owner, product_id, quantity).await
        };

        match result {
            Ok(()) => {
                self.load().await;
                self.notifier.success("Added to cart");
            }
            Err(e) => {
                warn!(error = %e, "failed to add to cart");
                self.notifier.error("Failed to add to cart");
            }
        }
    }

    /// Overwrite the quantity of an existing line. A quantity of zero
    /// removes the line; a missing line is a no-op (updates never create).
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn update_quantity(&self, product_id: &ProductId, quantity: u32) {
        if quantity == 0 {
            self.remove_from_cart(product_id).await;
            return;
        }

        let owner = self.session.owner();
        let _guard = self.locks.acquire(&owner, product_id).await;

        let result = if owner.is_anonymous() {
            self.update_local(product_id, quantity).await
        } else {
            self.catalog
                .update_cart_quantity(&owner, product_id, quantity)
                .await
                .map_err(AppError::from)
        };

        match result {
            Ok(true) => {
                self.load().await;
                self.notifier.success("Cart updated");
            }
            Ok(false) => debug!("update for absent cart line ignored"),
            Err(e) => {
                warn!(error = %e, "failed to update cart");
                self.notifier.error("Failed to update cart");
            }
        }
    }

    /// Remove the line for a product; no-op if absent.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn remove_from_cart(&self, product_id: &ProductId) {
        let owner = self.session.owner();
        let _guard = self.locks.acquire(&owner, product_id).await;

        let result = if owner.is_anonymous() {
            self.remove_local(product_id).await
        } else {
            self.catalog
                .delete_cart_line(&owner, product_id)
                .await
                .map_err(AppError::from)
        };

        match result {
            Ok(()) => {
                self.load().await;
                self.notifier.success("Removed from cart");
            }
            Err(e) => {
                warn!(error = %e, "failed to remove from cart");
                self.notifier.error("Failed to remove from cart");
            }
        }
    }

    /// Delete every line for the current owner.
    #[instrument(skip(self))]
    pub async fn clear_cart(&self) {
        let owner = self.session.owner();
        let result = if owner.is_anonymous() {
            self.local.remove(keys::CART).await.map_err(AppError::from)
        } else {
            self.catalog.clear_cart(&owner).await.map_err(AppError::from)
        };

        match result {
            Ok(()) => {
                self.replace_lines(Vec::new());
                self.notifier.success("Cart cleared");
            }
            Err(e) => {
                warn!(error = %e, "failed to clear cart");
                self.notifier.error("Failed to clear cart");
            }
        }
    }

    /// React to a session identity change: reconcile on the
    /// anonymous-to-authenticated edge (never on sign-out), then reload
    /// from whichever store now owns the cart.
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

    /// Merge the anonymous local cart into the remote store.
    ///
    /// Best-effort: a failing line does not abort the rest. Lines that fail
    /// to merge are re-persisted locally (only the failed subset), so the
    /// next sign-in retries exactly what was lost. A fully merged cart
    /// removes the local array, which makes a second run a no-op and keeps
    /// the merge idempotent.
    #[instrument(skip(self), fields(owner = %owner))]
    async fn sync_local_to_remote(&self, owner: &OwnerId) {
        let raw = match self.local.get(keys::CART).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!(error = %e, "failed to read local cart for sync");
                return;
            }
        };

        let local_lines = schema::decode_cart(raw.as_deref());
        if local_lines.is_empty() {
            return;
        }

        let mut failed = Vec::new();
        for line in local_lines {
            if let Err(e) = self.merge_line(owner, &line).await {
                warn!(product_id = %line.product_id, error = %e, "cart line merge failed");
                failed.push(line);
            }
        }

        if failed.is_empty() {
            if let Err(e) = self.local.remove(keys::CART).await {
                warn!(error = %e, "failed to clear local cart after sync");
                return;
            }
            self.notifier.success("Cart synced successfully");
        } else {
            if let Err(e) = self
                .local
                .set(keys::CART, &schema::encode_cart(&failed))
                .await
            {
                warn!(error = %e, "failed to persist unmerged cart lines");
            }
            self.notifier.error("Some cart items could not be synced");
        }
    }

    /// Merge one local line into the remote store: explicit
    /// read-compare-write keyed on `(owner, product)`. The local quantity
    /// replaces any remote one - the pending local value is the user's most
    /// recent unsynced intent, so it wins the conflict outright (no
    /// additive cross-device merge).
    async fn merge_line(&self, owner: &OwnerId, line: &PersistedCartLine) -> Result<()> {
        match self.catalog.cart_line(owner, &line.product_id).await? {
            Some(remote) => {
                if remote.quantity != line.quantity {
                    self.catalog
                        .update_cart_quantity(owner, &line.product_id, line.quantity)
                        .await?;
                }
            }
            None => match self
                .catalog
                .insert_cart_line(owner, &line.product_id, line.quantity)
                .await
            {
                Ok(()) => {}
                // Row appeared between the read and the insert; the local
                // value still wins.
                Err(CatalogError::Conflict(_)) => {
                    self.catalog
                        .update_cart_quantity(owner, &line.product_id, line.quantity)
                        .await?;
                }
                Err(e) => return Err(e.into()),
            },
        }
        Ok(())
    }

    // =========================================================================
    // Store paths
    // =========================================================================

    async fn load_local(&self) -> Result<()> {
        let raw = self.local.get(keys::CART).await?;
        let persisted = schema::decode_cart(raw.as_deref());

        let mut lines = Vec::with_capacity(persisted.len());
        for line in persisted {
            // A line whose product no longer resolves is kept with
            // `product: None`; identifiers are never silently dropped.
            let product = self.catalog.product(&line.product_id).await?;
            lines.push(CartLine {
                id: line.id,
                owner: OwnerId::anonymous(),
                product_id: line.product_id,
                quantity: line.quantity,
                created_at: line.created_at,
                product,
            });
        }

        self.replace_lines(lines);
        Ok(())
    }

    async fn load_remote(&self, owner: &OwnerId) -> Result<()> {
        let lines = self.catalog.cart_lines(owner).await?;
        self.replace_lines(lines);
        Ok(())
    }

    async fn add_local(&self, product_id: &ProductId, quantity: u32) -> Result<()> {
        let raw = self.local.get(keys::CART).await?;
        let mut lines = schema::decode_cart(raw.as_deref());

        if let Some(line) = lines.iter_mut().find(|l| l.product_id == *product_id) {
            line.quantity = line.quantity.saturating_add(quantity);
        } else {
            lines.push(PersistedCartLine {
                id: self.next_local_id(),
                product_id: product_id.clone(),
                quantity,
                created_at: Utc::now(),
            });
        }

        self.local
            .set(keys::CART, &schema::encode_cart(&lines))
            .await?;
        Ok(())
    }

    async fn add_remote(
        &self,
        owner: &OwnerId,
        product_id: &ProductId,
        quantity: u32,
    ) -> Result<()> {
        match self.catalog.cart_line(owner, product_id).await? {
            Some(existing) => {
                let merged = existing.quantity.saturating_add(quantity);
                self.catalog
                    .update_cart_quantity(owner, product_id, merged)
                    .await?;
            }
            None => match self
                .catalog
                .insert_cart_line(owner, product_id, quantity)
                .await
            {
                Ok(()) => {}
                // Duplicate key from a concurrent tab: retry as an
                // increment on top of whatever is there now.
                Err(CatalogError::Conflict(_)) => {
                    let current = self
                        .catalog
                        .cart_line(owner, product_id)
                        .await?
                        .map_or(0, |line| line.quantity);
                    self.catalog
                        .update_cart_quantity(owner, product_id, current.saturating_add(quantity))
                        .await?;
                }
                Err(e) => return Err(e.into()),
            },
        }
        Ok(())
    }

    async fn update_local(&self, product_id: &ProductId, quantity: u32) -> Result<bool> {
        let raw = self.local.get(keys::CART).await?;
        let mut lines = schema::decode_cart(raw.as_deref());

        let Some(line) = lines.iter_mut().find(|l| l.product_id == *product_id) else {
            return Ok(false);
        };
        line.quantity = quantity;

        self.local
            .set(keys::CART, &schema::encode_cart(&lines))
            .await?;
        Ok(true)
    }

    async fn remove_local(&self, product_id: &ProductId) -> Result<()> {
        let raw = self.local.get(keys::CART).await?;
        let mut lines = schema::decode_cart(raw.as_deref());
        lines.retain(|line| line.product_id != *product_id);

        self.local
            .set(keys::CART, &schema::encode_cart(&lines))
            .await?;
        Ok(())
    }

    fn replace_lines(&self, lines: Vec<CartLine>) {
        *self.lines.write().expect("cart lines lock poisoned") = lines;
    }

    /// Synthesize a local line id: time-based, unique within the session.
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

    use keyiflibox_core::{CategoryId, Email};
    use crate::catalog::MemoryCatalog;
    use crate::local::MemoryStore;
    use crate::models::ProductDraft;
    use crate::notify::{Notice, NoticeLevel};

    struct Fixture {
        catalog: Arc<MemoryCatalog>,
        local: Arc<MemoryStore>,
        session: SessionProvider,
        notifier: Notifier,
        cart: CartService,
    }

    fn fixture() -> Fixture {
        let catalog = Arc::new(MemoryCatalog::new());
        let local = Arc::new(MemoryStore::new());
        let session = SessionProvider::new();
        let notifier = Notifier::new();
        let cart = CartService::new(
            Arc::clone(&catalog) as Arc<dyn CatalogStore>,
            Arc::clone(&local) as Arc<dyn LocalStore>,
            session.clone(),
            notifier.clone(),
        );
        Fixture {
            catalog,
            local,
            session,
            notifier,
            cart,
        }
    }

    fn draft(title: &str, price: Price) -> ProductDraft {
        ProductDraft {
            activity_type_id: None,
            category_id: CategoryId::new("1"),
            title: title.to_owned(),
            sub_title: None,
            description: None,
            price,
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
    async fn test_repeated_adds_accumulate_quantity() {
        let f = fixture();
        let product = f
            .catalog
            .insert_product(&draft("Macera Parkı", Price::new(dec!(100))))
            .await
            .unwrap();

        f.cart.add_to_cart(&product.id, 2).await;
        f.cart.add_to_cart(&product.id, 3).await;

        let lines = f.cart.lines();
        assert_eq!(lines.len(), 1, "duplicate adds must not create a second line");
        assert_eq!(f.cart.cart_count(), 5);
        assert_eq!(f.cart.cart_total().amount(), dec!(500));
    }

    #[tokio::test]
    async fn test_authenticated_adds_accumulate_in_remote_store() {
        let f = fixture();
        let product = f
            .catalog
            .insert_product(&draft("Spa Günü", Price::new(dec!(250))))
            .await
            .unwrap();
        let email = Email::parse("ayse@example.com").unwrap();
        f.session.sign_in(CurrentUser::from_email(email));

        f.cart.add_to_cart(&product.id, 1).await;
        f.cart.add_to_cart(&product.id, 4).await;

        let owner = f.session.owner();
        let remote = f.catalog.cart_line(&owner, &product.id).await.unwrap();
        assert_eq!(remote.unwrap().quantity, 5);
        assert_eq!(f.cart.cart_count(), 5);
    }

    #[tokio::test]
    async fn test_update_to_zero_removes_line() {
        let f = fixture();
        let product = f
            .catalog
            .insert_product(&draft("Rafting", Price::new(dec!(300))))
            .await
            .unwrap();

        f.cart.add_to_cart(&product.id, 2).await;
        f.cart.update_quantity(&product.id, 0).await;

        assert_eq!(f.cart.cart_count(), 0);
        assert!(f.cart.lines().is_empty());

        let raw = f.local.get(keys::CART).await.unwrap();
        assert!(schema::decode_cart(raw.as_deref()).is_empty());
    }

    #[tokio::test]
    async fn test_update_never_creates() {
        let f = fixture();
        let product = f
            .catalog
            .insert_product(&draft("Tandem Atlayış", Price::new(dec!(4500))))
            .await
            .unwrap();

        f.cart.update_quantity(&product.id, 5).await;

        assert!(f.cart.lines().is_empty());
        let raw = f.local.get(keys::CART).await.unwrap();
        assert!(schema::decode_cart(raw.as_deref()).is_empty());
    }

    #[tokio::test]
    async fn test_clear_cart_zeroes_count_and_total() {
        let f = fixture();
        let a = f
            .catalog
            .insert_product(&draft("Hamam", Price::new(dec!(150))))
            .await
            .unwrap();
        let b = f
            .catalog
            .insert_product(&draft("Masaj", Price::new(dec!(200))))
            .await
            .unwrap();

        f.cart.add_to_cart(&a.id, 2).await;
        f.cart.add_to_cart(&b.id, 1).await;
        f.cart.clear_cart().await;

        assert_eq!(f.cart.cart_count(), 0);
        assert_eq!(f.cart.cart_total(), Price::ZERO);
    }

    #[tokio::test]
    async fn test_unresolvable_product_contributes_zero() {
        let f = fixture();
        let ghost = ProductId::new("no-such-product");

        f.cart.add_to_cart(&ghost, 3).await;

        let lines = f.cart.lines();
        assert_eq!(lines.len(), 1, "the identifier must not be dropped");
        assert!(lines.first().unwrap().product.is_none());
        assert_eq!(f.cart.cart_count(), 3);
        assert_eq!(f.cart.cart_total(), Price::ZERO);
    }

    #[tokio::test]
    async fn test_load_failure_keeps_previous_list() {
        let f = fixture();
        let product = f
            .catalog
            .insert_product(&draft("Tekne Turu", Price::new(dec!(800))))
            .await
            .unwrap();
        let email = Email::parse("ayse@example.com").unwrap();
        f.session.sign_in(CurrentUser::from_email(email));
        f.cart.add_to_cart(&product.id, 2).await;
        assert_eq!(f.cart.cart_count(), 2);

        let mut rx = f.notifier.subscribe();
        f.catalog.set_offline(true);
        f.cart.load().await;

        // Fail-soft: stale beats empty.
        assert_eq!(f.cart.cart_count(), 2);
        let notices = drain(&mut rx);
        assert!(
            notices
                .iter()
                .any(|n| n.level == NoticeLevel::Error && n.message == "Failed to load cart")
        );
    }

    #[tokio::test]
    async fn test_invalid_add_preconditions_are_rejected() {
        let f = fixture();
        let product = f
            .catalog
            .insert_product(&draft("Okçuluk", Price::new(dec!(120))))
            .await
            .unwrap();

        f.cart.add_to_cart(&ProductId::new(""), 1).await;
        f.cart.add_to_cart(&product.id, 0).await;

        assert!(f.cart.lines().is_empty());
    }
}
