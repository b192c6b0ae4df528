//! Application state shared across handlers.
//!
//! Built once at process start and passed by reference everywhere; there
//! are no module-level singletons. Owns the two reconciling containers and
//! the session listener that drives them.

use std::sync::Arc;

use sqlx::PgPool;
use tokio::task::JoinHandle;

use crate::catalog::CatalogStore;
use crate::config::StorefrontConfig;
use crate::local::LocalStore;
use crate::notify::Notifier;
use crate::services::{CartService, FavoritesService};
use crate::session::SessionProvider;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like the catalog store and the state containers.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    pool: PgPool,
    catalog: Arc<dyn CatalogStore>,
    session: SessionProvider,
    notifier: Notifier,
    cart: Arc<CartService>,
    favorites: Arc<FavoritesService>,
}

impl AppState {
    /// Create a new application state, wiring both containers to the given
    /// stores.
    #[must_use]
    pub fn new(
        config: StorefrontConfig,
        pool: PgPool,
        catalog: Arc<dyn CatalogStore>,
        local: Arc<dyn LocalStore>,
    ) -> Self {
        let session = SessionProvider::new();
        let notifier = Notifier::new();

        let cart = Arc::new(CartService::new(
            Arc::clone(&catalog),
            Arc::clone(&local),
            session.clone(),
            notifier.clone(),
        ));
        let favorites = Arc::new(FavoritesService::new(
            Arc::clone(&catalog),
            local,
            session.clone(),
            notifier.clone(),
        ));

        Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                catalog,
                session,
                notifier,
                cart,
                favorites,
            }),
        }
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// Get a reference to the catalog store.
    #[must_use]
    pub fn catalog(&self) -> &Arc<dyn CatalogStore> {
        &self.inner.catalog
    }

    /// Get a reference to the session provider.
    #[must_use]
    pub fn session(&self) -> &SessionProvider {
        &self.inner.session
    }

    /// Get a reference to the notice publisher.
    #[must_use]
    pub fn notifier(&self) -> &Notifier {
        &self.inner.notifier
    }

    /// Get a reference to the cart container.
    #[must_use]
    pub fn cart(&self) -> &CartService {
        &self.inner.cart
    }

    /// Get a reference to the favorites container.
    #[must_use]
    pub fn favorites(&self) -> &FavoritesService {
        &self.inner.favorites
    }

    /// Spawn the task that reacts to identity changes.
    ///
    /// Every change reloads both containers; the anonymous-to-authenticated
    /// edge additionally runs their one-shot reconciliation (handled inside
    /// `on_session_change`).
    pub fn spawn_session_listener(&self) -> JoinHandle<()> {
        let cart = Arc::clone(&self.inner.cart);
        let favorites = Arc::clone(&self.inner.favorites);
        let mut rx = self.inner.session.subscribe();

        tokio::spawn(async move {
            let mut previous = rx.borrow_and_update().clone();
            while rx.changed().await.is_ok() {
                let next = rx.borrow_and_update().clone();
                cart.on_session_change(previous.as_ref(), next.as_ref())
                    .await;
                favorites
                    .on_session_change(previous.as_ref(), next.as_ref())
                    .await;
                previous = next;
            }
        })
    }
}
