//! Cart domain types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use keyiflibox_core::{LineId, OwnerId, Price, ProductId};

use crate::models::product::Product;

/// One product's presence in a shopping cart.
///
/// At most one line exists per `(owner, product)` pair; adding the same
/// product again increments the quantity instead of creating a second line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartLine {
    /// Opaque line identifier: store-assigned for remote rows, locally
    /// synthesized (`local_...`) for anonymous rows.
    pub id: LineId,
    /// The owning identity (anonymous sentinel while signed out).
    pub owner: OwnerId,
    /// The referenced product.
    pub product_id: ProductId,
    /// Always >= 1; driving it to zero removes the line.
    pub quantity: u32,
    pub created_at: DateTime<Utc>,
    /// The resolved product, if the reference still resolves. Lines whose
    /// product is gone are kept (the identifier is never silently dropped)
    /// and degrade to a zero price and a fallback image when displayed.
    pub product: Option<Product>,
}

impl CartLine {
    /// The price this line contributes to the cart total.
    ///
    /// An unresolvable product contributes zero; a total must never fail to
    /// compute.
    #[must_use]
    pub fn line_total(&self) -> Price {
        self.product
            .as_ref()
            .map_or(Price::ZERO, |p| p.price.times(self.quantity))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use keyiflibox_core::CategoryId;
    use rust_decimal_macros::dec;

    fn line(quantity: u32, product: Option<Product>) -> CartLine {
        CartLine {
            id: LineId::new("line-1"),
            owner: OwnerId::anonymous(),
            product_id: ProductId::new("p-1"),
            quantity,
            created_at: Utc::now(),
            product,
        }
    }

    fn priced_product(price: Price) -> Product {
        Product {
            id: ProductId::new("p-1"),
            activity_type_id: None,
            category_id: CategoryId::new("1"),
            title: "Macera Parkı Bileti".to_string(),
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
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_line_total_multiplies_quantity() {
        let line = line(3, Some(priced_product(Price::new(dec!(150)))));
        assert_eq!(line.line_total().amount(), dec!(450));
    }

    #[test]
    fn test_missing_product_contributes_zero() {
        let line = line(5, None);
        assert_eq!(line.line_total(), Price::ZERO);
    }
}
