//! Scenario tests for the favorites sign-in reconciliation.
//!
//! Favorites are a set, so the merge collapses to insert-if-absent: a
//! product present on both sides stays a single entry.

use keyiflibox_integration_tests::TestContext;
use keyiflibox_storefront::catalog::CatalogStore;
use keyiflibox_storefront::local::{LocalStore, MemoryStore, keys, schema};
use rust_decimal_macros::dec;
use std::sync::Arc;

#[tokio::test]
async fn test_merge_without_duplicates() {
    let ctx = TestContext::new();
    let hamam = ctx.seed_product("Hamam", dec!(150)).await;
    let masaj = ctx.seed_product("Masaj", dec!(200)).await;

    // The identity already favorited one of the two remotely.
    let ctx2 = TestContext::with_backends(
        Arc::clone(&ctx.catalog),
        Arc::new(MemoryStore::new()),
    );
    let user = ctx2.sign_in("ayse@example.com").await;
    ctx2.favorites.add_to_favorites(&masaj.id).await;

    // The anonymous session favorites both, then signs in.
    ctx.favorites.add_to_favorites(&hamam.id).await;
    ctx.favorites.add_to_favorites(&masaj.id).await;
    ctx.sign_in("ayse@example.com").await;

    let remote = ctx.catalog.favorites(&user.owner).await.expect("remote");
    assert_eq!(remote.len(), 2, "the overlap must not duplicate");
    assert!(ctx.favorites.is_favorite(&hamam.id));
    assert!(ctx.favorites.is_favorite(&masaj.id));

    let raw = ctx.local.get(keys::FAVORITES).await.expect("local read");
    assert!(raw.is_none(), "local favorites removed after a full merge");
}

#[tokio::test]
async fn test_merge_is_idempotent() {
    let ctx = TestContext::new();
    let hamam = ctx.seed_product("Hamam", dec!(150)).await;

    ctx.favorites.add_to_favorites(&hamam.id).await;
    let user = ctx.sign_in("ayse@example.com").await;

    ctx.favorites.on_session_change(None, Some(&user)).await;

    let remote = ctx.catalog.favorites(&user.owner).await.expect("remote");
    assert_eq!(remote.len(), 1);
}

#[tokio::test]
async fn test_partial_failure_keeps_only_failed_subset() {
    let ctx = TestContext::new();
    let hamam = ctx.seed_product("Hamam", dec!(150)).await;
    let masaj = ctx.seed_product("Masaj", dec!(200)).await;

    ctx.favorites.add_to_favorites(&hamam.id).await;
    ctx.favorites.add_to_favorites(&masaj.id).await;

    ctx.catalog.fail_product_writes(&masaj.id);
    let user = ctx.sign_in("ayse@example.com").await;

    let remote = ctx.catalog.favorites(&user.owner).await.expect("remote");
    assert_eq!(remote.len(), 1);

    let raw = ctx.local.get(keys::FAVORITES).await.expect("local read");
    let kept = schema::decode_favorites(raw.as_deref());
    assert_eq!(kept.len(), 1);
    assert_eq!(kept.first().expect("kept entry").product_id, masaj.id);
}

#[tokio::test]
async fn test_toggle_survives_the_transition() {
    let ctx = TestContext::new();
    let hamam = ctx.seed_product("Hamam", dec!(150)).await;

    ctx.favorites.add_to_favorites(&hamam.id).await;
    assert!(ctx.favorites.is_favorite(&hamam.id));

    ctx.sign_in("ayse@example.com").await;
    assert!(ctx.favorites.is_favorite(&hamam.id));

    ctx.favorites.remove_from_favorites(&hamam.id).await;
    assert!(!ctx.favorites.is_favorite(&hamam.id));
}
