//! Scenario tests for the cart's sign-in reconciliation.
//!
//! The merge contract: anonymous local lines move into the remote store
//! exactly once, the local value wins a same-product conflict, failures
//! leave only the failed subset behind for retry, and a second run is a
//! no-op.

use keyiflibox_integration_tests::TestContext;
use keyiflibox_storefront::catalog::CatalogStore;
use keyiflibox_storefront::local::{LocalStore, keys, schema};
use rust_decimal_macros::dec;

// =============================================================================
// Happy path
// =============================================================================

#[tokio::test]
async fn test_sign_in_merges_local_cart_into_remote() {
    let ctx = TestContext::new();
    let spa = ctx.seed_product("Spa Günü", dec!(250)).await;
    let rafting = ctx.seed_product("Rafting", dec!(300)).await;

    ctx.cart.add_to_cart(&spa.id, 2).await;
    ctx.cart.add_to_cart(&rafting.id, 1).await;

    ctx.sign_in("ayse@example.com").await;

    let owner = ctx.owner();
    let remote = ctx.catalog.cart_lines(&owner).await.expect("remote cart");
    assert_eq!(remote.len(), 2);

    // The merged truth is what the container now shows.
    assert_eq!(ctx.cart.cart_count(), 3);
    assert_eq!(ctx.cart.cart_total().amount(), dec!(800));

    // The local array must not survive a full merge.
    let raw = ctx.local.get(keys::CART).await.expect("local read");
    assert!(raw.is_none(), "local cart must be removed after a full merge");
}

#[tokio::test]
async fn test_empty_local_cart_leaves_remote_untouched() {
    let ctx = TestContext::new();
    ctx.seed_product("Hamam", dec!(150)).await;

    ctx.sign_in("ayse@example.com").await;

    let owner = ctx.owner();
    let remote = ctx.catalog.cart_lines(&owner).await.expect("remote cart");
    assert!(remote.is_empty());
    assert_eq!(ctx.cart.cart_count(), 0);
}

// =============================================================================
// Conflict resolution
// =============================================================================

#[tokio::test]
async fn test_local_quantity_wins_over_remote() {
    let ctx = TestContext::new();
    let park = ctx.seed_product("Macera Parkı", dec!(100)).await;

    // The identity already has this product remotely with quantity 1.
    let ctx2 = TestContext::with_backends(
        std::sync::Arc::clone(&ctx.catalog),
        std::sync::Arc::new(keyiflibox_storefront::local::MemoryStore::new()),
    );
    let user = ctx2.sign_in("ayse@example.com").await;
    ctx2.cart.add_to_cart(&park.id, 1).await;

    // Meanwhile this anonymous session wants 2 of it.
    ctx.cart.add_to_cart(&park.id, 2).await;
    ctx.sign_in("ayse@example.com").await;

    let remote = ctx
        .catalog
        .cart_line(&user.owner, &park.id)
        .await
        .expect("remote cart")
        .expect("merged line");
    assert_eq!(
        remote.quantity, 2,
        "the pending local value replaces the remote one"
    );
}

#[tokio::test]
async fn test_merge_is_idempotent() {
    let ctx = TestContext::new();
    let spa = ctx.seed_product("Spa Günü", dec!(250)).await;

    ctx.cart.add_to_cart(&spa.id, 2).await;
    ctx.sign_in("ayse@example.com").await;

    // Simulate the edge firing again against the now-empty local array.
    let user = ctx.session.current().expect("signed in");
    ctx.cart.on_session_change(None, Some(&user)).await;

    let remote = ctx.catalog.cart_lines(&user.owner).await.expect("remote");
    assert_eq!(remote.len(), 1, "a second run must not duplicate rows");
    assert_eq!(remote.first().expect("line").quantity, 2);
}

// =============================================================================
// Partial failure
// =============================================================================

#[tokio::test]
async fn test_partial_failure_keeps_only_failed_subset() {
    let ctx = TestContext::new();
    let spa = ctx.seed_product("Spa Günü", dec!(250)).await;
    let rafting = ctx.seed_product("Rafting", dec!(300)).await;

    ctx.cart.add_to_cart(&spa.id, 1).await;
    ctx.cart.add_to_cart(&rafting.id, 2).await;

    ctx.catalog.fail_product_writes(&rafting.id);
    let user = ctx.sign_in("ayse@example.com").await;

    // The healthy line merged; the failing one did not.
    let remote = ctx.catalog.cart_lines(&user.owner).await.expect("remote");
    assert_eq!(remote.len(), 1);
    assert_eq!(remote.first().expect("line").product_id, spa.id);

    // Only the failed subset stays behind for the next sign-in.
    let raw = ctx.local.get(keys::CART).await.expect("local read");
    let kept = schema::decode_cart(raw.as_deref());
    assert_eq!(kept.len(), 1);
    assert_eq!(kept.first().expect("kept line").product_id, rafting.id);
    assert_eq!(kept.first().expect("kept line").quantity, 2);

    // Once the store recovers, the retry drains the remainder.
    ctx.catalog.clear_product_failures();
    ctx.cart.on_session_change(None, Some(&user)).await;

    let remote = ctx.catalog.cart_lines(&user.owner).await.expect("remote");
    assert_eq!(remote.len(), 2);
    let raw = ctx.local.get(keys::CART).await.expect("local read");
    assert!(raw.is_none(), "local cart drains after the retry succeeds");
}

// =============================================================================
// Sign-out
// =============================================================================

#[tokio::test]
async fn test_sign_out_switches_back_to_anonymous_view() {
    let ctx = TestContext::new();
    let spa = ctx.seed_product("Spa Günü", dec!(250)).await;

    ctx.cart.add_to_cart(&spa.id, 2).await;
    let user = ctx.sign_in("ayse@example.com").await;
    assert_eq!(ctx.cart.cart_count(), 2);

    ctx.sign_out().await;

    // Nothing migrates back: the anonymous view is a fresh empty array,
    // and the authenticated rows stay put remotely.
    assert_eq!(ctx.cart.cart_count(), 0);
    let remote = ctx.catalog.cart_lines(&user.owner).await.expect("remote");
    assert_eq!(remote.len(), 1);
}
