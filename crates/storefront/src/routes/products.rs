//! Product route handlers.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use keyiflibox_core::{ActivityTypeId, CategoryId, ProductId};

use crate::catalog::ProductFilter;
use crate::error::{AppError, Result};
use crate::models::Product;
use crate::state::AppState;

/// Product display data.
#[derive(Debug, Clone, Serialize)]
pub struct ProductView {
    pub id: String,
    pub title: String,
    pub sub_title: Option<String>,
    pub description: Option<String>,
    pub price: String,
    pub image: String,
    pub external_url: Option<String>,
    pub city: Option<String>,
    pub district: Option<String>,
    pub ticket_rule: Option<String>,
    pub date: Option<String>,
    pub rating: Option<f64>,
    pub full_address: Option<String>,
    pub is_active: bool,
}

impl From<&Product> for ProductView {
    fn from(product: &Product) -> Self {
        Self {
            id: product.id.to_string(),
            title: product.title.clone(),
            sub_title: product.sub_title.clone(),
            description: product.description.clone(),
            price: product.price.display_try(),
            image: product.display_image(),
            external_url: product.external_url.clone(),
            city: product.city.clone(),
            district: product.district.clone(),
            ticket_rule: product.ticket_rule.clone(),
            date: product.date.clone(),
            rating: product.rating,
            full_address: product.full_address.clone(),
            is_active: product.is_active,
        }
    }
}

/// Listing filter query parameters.
#[derive(Debug, Deserialize)]
pub struct ProductListQuery {
    pub category: Option<String>,
    pub activity_type: Option<String>,
    pub city: Option<String>,
    /// Include inactive products (admin previews); the storefront default
    /// is active-only.
    pub include_inactive: Option<bool>,
}

/// Product listing with equality filters, highest priority first.
#[instrument(skip(state))]
pub async fn index(
    State(state): State<AppState>,
    Query(query): Query<ProductListQuery>,
) -> Result<Json<Vec<ProductView>>> {
    let filter = ProductFilter {
        category_id: query.category.map(CategoryId::new),
        activity_type_id: query.activity_type.map(ActivityTypeId::new),
        city: query.city,
        only_active: !query.include_inactive.unwrap_or(false),
    };

    let products = state.catalog().products(&filter).await?;
    Ok(Json(products.iter().map(ProductView::from).collect()))
}

/// Product detail.
#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ProductView>> {
    let product_id = ProductId::new(id);
    let product = state
        .catalog()
        .product(&product_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("product {product_id}")))?;

    Ok(Json(ProductView::from(&product)))
}
