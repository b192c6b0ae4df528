//! Cart route handlers.
//!
//! Thin wrappers over the cart container. Mutations delegate to the
//! container (which reloads from the source of truth) and respond with the
//! refreshed view; outcomes surface through the notice channel, not
//! through HTTP errors.

use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use keyiflibox_core::ProductId;

use crate::models::{CartLine, fallback_image};
use crate::services::CartService;
use crate::state::AppState;

/// Cart line display data.
#[derive(Debug, Clone, Serialize)]
pub struct CartLineView {
    pub id: String,
    pub product_id: String,
    /// `None` when the product reference no longer resolves.
    pub title: Option<String>,
    pub quantity: u32,
    pub unit_price: String,
    pub line_total: String,
    pub image: String,
}

/// Cart display data.
#[derive(Debug, Clone, Serialize)]
pub struct CartView {
    pub items: Vec<CartLineView>,
    pub total: String,
    pub count: u32,
    pub is_loading: bool,
}

impl CartView {
    fn from_service(cart: &CartService) -> Self {
        Self {
            items: cart.lines().iter().map(CartLineView::from).collect(),
            total: cart.cart_total().display_try(),
            count: cart.cart_count(),
            is_loading: cart.is_loading(),
        }
    }
}

impl From<&CartLine> for CartLineView {
    fn from(line: &CartLine) -> Self {
        Self {
            id: line.id.to_string(),
            product_id: line.product_id.to_string(),
            title: line.product.as_ref().map(|p| p.title.clone()),
            quantity: line.quantity,
            unit_price: line
                .product
                .as_ref()
                .map_or_else(|| keyiflibox_core::Price::ZERO.display_try(), |p| {
                    p.price.display_try()
                }),
            line_total: line.line_total().display_try(),
            image: line
                .product
                .as_ref()
                .map_or_else(|| fallback_image(None).to_owned(), |p| p.display_image()),
        }
    }
}

/// Cart count badge data.
#[derive(Debug, Clone, Serialize)]
pub struct CartCountView {
    pub count: u32,
}

/// Add to cart request body.
#[derive(Debug, Deserialize)]
pub struct AddToCartRequest {
    pub product_id: String,
    pub quantity: Option<u32>,
}

/// Update quantity request body.
#[derive(Debug, Deserialize)]
pub struct UpdateCartRequest {
    pub product_id: String,
    pub quantity: u32,
}

/// Remove from cart request body.
#[derive(Debug, Deserialize)]
pub struct RemoveFromCartRequest {
    pub product_id: String,
}

/// Current cart view.
#[instrument(skip(state))]
pub async fn show(State(state): State<AppState>) -> Json<CartView> {
    state.cart().load().await;
    Json(CartView::from_service(state.cart()))
}

/// Add a product to the cart.
#[instrument(skip(state))]
pub async fn add(
    State(state): State<AppState>,
    Json(form): Json<AddToCartRequest>,
) -> Json<CartView> {
    let product_id = ProductId::new(form.product_id);
    state
        .cart()
        .add_to_cart(&product_id, form.quantity.unwrap_or(1))
        .await;
    Json(CartView::from_service(state.cart()))
}

/// Overwrite a line's quantity (zero removes the line).
#[instrument(skip(state))]
pub async fn update(
    State(state): State<AppState>,
    Json(form): Json<UpdateCartRequest>,
) -> Json<CartView> {
    let product_id = ProductId::new(form.product_id);
    state.cart().update_quantity(&product_id, form.quantity).await;
    Json(CartView::from_service(state.cart()))
}

/// Remove a line.
#[instrument(skip(state))]
pub async fn remove(
    State(state): State<AppState>,
    Json(form): Json<RemoveFromCartRequest>,
) -> Json<CartView> {
    let product_id = ProductId::new(form.product_id);
    state.cart().remove_from_cart(&product_id).await;
    Json(CartView::from_service(state.cart()))
}

/// Remove every line for the current owner.
#[instrument(skip(state))]
pub async fn clear(State(state): State<AppState>) -> Json<CartView> {
    state.cart().clear_cart().await;
    Json(CartView::from_service(state.cart()))
}

/// Cart badge count: total items, not distinct products.
#[instrument(skip(state))]
pub async fn count(State(state): State<AppState>) -> Json<CartCountView> {
    Json(CartCountView {
        count: state.cart().cart_count(),
    })
}
