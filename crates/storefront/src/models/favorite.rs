//! Favorites domain types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use keyiflibox_core::{LineId, OwnerId, ProductId};

use crate::models::product::Product;

/// One product marked as favorite.
///
/// The relation is a set: at most one entry per `(owner, product)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FavoriteEntry {
    pub id: LineId,
    pub owner: OwnerId,
    pub product_id: ProductId,
    pub created_at: DateTime<Utc>,
    /// Resolved product, `None` when the reference no longer resolves.
    pub product: Option<Product>,
}
