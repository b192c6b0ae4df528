//! Favorites route handlers.

use axum::{
    Json,
    extract::{Path, State},
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use keyiflibox_core::ProductId;

use crate::models::{FavoriteEntry, fallback_image};
use crate::services::FavoritesService;
use crate::state::AppState;

/// Favorite entry display data.
#[derive(Debug, Clone, Serialize)]
pub struct FavoriteView {
    pub id: String,
    pub product_id: String,
    /// `None` when the product reference no longer resolves.
    pub title: Option<String>,
    pub price: Option<String>,
    pub image: String,
}

/// Favorites display data.
#[derive(Debug, Clone, Serialize)]
pub struct FavoritesView {
    pub items: Vec<FavoriteView>,
    pub is_loading: bool,
}

impl FavoritesView {
    fn from_service(favorites: &FavoritesService) -> Self {
        Self {
            items: favorites.entries().iter().map(FavoriteView::from).collect(),
            is_loading: favorites.is_loading(),
        }
    }
}

impl From<&FavoriteEntry> for FavoriteView {
    fn from(entry: &FavoriteEntry) -> Self {
        Self {
            id: entry.id.to_string(),
            product_id: entry.product_id.to_string(),
            title: entry.product.as_ref().map(|p| p.title.clone()),
            price: entry.product.as_ref().map(|p| p.price.display_try()),
            image: entry
                .product
                .as_ref()
                .map_or_else(|| fallback_image(None).to_owned(), |p| p.display_image()),
        }
    }
}

/// Favorite toggle request body.
#[derive(Debug, Deserialize)]
pub struct FavoriteRequest {
    pub product_id: String,
}

/// Favorite status data for a single product.
#[derive(Debug, Clone, Serialize)]
pub struct FavoriteStatusView {
    pub product_id: String,
    pub is_favorite: bool,
}

/// Current favorites view.
#[instrument(skip(state))]
pub async fn index(State(state): State<AppState>) -> Json<FavoritesView> {
    state.favorites().load().await;
    Json(FavoritesView::from_service(state.favorites()))
}

/// Mark a product as favorite.
#[instrument(skip(state))]
pub async fn add(
    State(state): State<AppState>,
    Json(form): Json<FavoriteRequest>,
) -> Json<FavoritesView> {
    let product_id = ProductId::new(form.product_id);
    state.favorites().add_to_favorites(&product_id).await;
    Json(FavoritesView::from_service(state.favorites()))
}

/// Unmark a product.
#[instrument(skip(state))]
pub async fn remove(
    State(state): State<AppState>,
    Json(form): Json<FavoriteRequest>,
) -> Json<FavoritesView> {
    let product_id = ProductId::new(form.product_id);
    state.favorites().remove_from_favorites(&product_id).await;
    Json(FavoritesView::from_service(state.favorites()))
}

/// Whether a product is currently a favorite (in-memory lookup).
#[instrument(skip(state))]
pub async fn status(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Json<FavoriteStatusView> {
    let product_id = ProductId::new(id);
    Json(FavoriteStatusView {
        is_favorite: state.favorites().is_favorite(&product_id),
        product_id: product_id.to_string(),
    })
}
