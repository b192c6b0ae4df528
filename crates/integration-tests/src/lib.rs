//! Cross-container scenario tests for KeyifliBox.
//!
//! The scenarios in `tests/` wire both state containers to the in-memory
//! backends and drive them through the flows a browser session would:
//! anonymous browsing, sign-in reconciliation, sign-out, and concurrent
//! tabs sharing one local store.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p keyiflibox-integration-tests
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::sync::Arc;

use rust_decimal::Decimal;

use keyiflibox_core::{CategoryId, Email, OwnerId, Price};
use keyiflibox_storefront::catalog::{CatalogStore, MemoryCatalog};
use keyiflibox_storefront::local::{LocalStore, MemoryStore};
use keyiflibox_storefront::models::{CurrentUser, Product, ProductDraft};
use keyiflibox_storefront::notify::Notifier;
use keyiflibox_storefront::services::{CartService, FavoritesService};
use keyiflibox_storefront::session::SessionProvider;

/// One simulated browser session: both containers over shared in-memory
/// backends.
pub struct TestContext {
    pub catalog: Arc<MemoryCatalog>,
    pub local: Arc<MemoryStore>,
    pub session: SessionProvider,
    pub notifier: Notifier,
    pub cart: CartService,
    pub favorites: FavoritesService,
}

impl TestContext {
    #[must_use]
    pub fn new() -> Self {
        let catalog = Arc::new(MemoryCatalog::new());
        let local = Arc::new(MemoryStore::new());
        Self::with_backends(catalog, local)
    }

    /// Build a context over existing backends. Two contexts sharing the
    /// same backends model two tabs of the same browser profile.
    #[must_use]
    pub fn with_backends(catalog: Arc<MemoryCatalog>, local: Arc<MemoryStore>) -> Self {
        let session = SessionProvider::new();
        let notifier = Notifier::new();

        let cart = CartService::new(
            Arc::clone(&catalog) as Arc<dyn CatalogStore>,
            Arc::clone(&local) as Arc<dyn LocalStore>,
            session.clone(),
            notifier.clone(),
        );
        let favorites = FavoritesService::new(
            Arc::clone(&catalog) as Arc<dyn CatalogStore>,
            Arc::clone(&local) as Arc<dyn LocalStore>,
            session.clone(),
            notifier.clone(),
        );

        Self {
            catalog,
            local,
            session,
            notifier,
            cart,
            favorites,
        }
    }

    /// Insert a product with the given title and price.
    ///
    /// # Panics
    ///
    /// Panics if the in-memory catalog rejects the insert (it only does so
    /// when failure injection is armed).
    pub async fn seed_product(&self, title: &str, price: Decimal) -> Product {
        self.catalog
            .insert_product(&ProductDraft {
                activity_type_id: None,
                category_id: CategoryId::new("1"),
                title: title.to_owned(),
                sub_title: None,
                description: None,
                price: Price::new(price),
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
            })
            .await
            .expect("seeding product")
    }

    /// Sign in and run the identity-change hooks the session listener
    /// would: reconciliation on the anonymous-to-authenticated edge, then a
    /// reload of both containers.
    ///
    /// # Panics
    ///
    /// Panics if `email` is not a valid address.
    pub async fn sign_in(&self, email: &str) -> CurrentUser {
        let previous = self.session.current();
        let user = CurrentUser::from_email(Email::parse(email).expect("valid test email"));
        self.session.sign_in(user.clone());

        self.cart
            .on_session_change(previous.as_ref(), Some(&user))
            .await;
        self.favorites
            .on_session_change(previous.as_ref(), Some(&user))
            .await;
        user
    }

    /// Sign out and run the identity-change hooks.
    pub async fn sign_out(&self) {
        let previous = self.session.current();
        self.session.sign_out();

        self.cart.on_session_change(previous.as_ref(), None).await;
        self.favorites
            .on_session_change(previous.as_ref(), None)
            .await;
    }

    /// The owner identity for the current session state.
    #[must_use]
    pub fn owner(&self) -> OwnerId {
        self.session.owner()
    }
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}
