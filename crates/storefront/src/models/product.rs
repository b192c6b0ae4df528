//! Catalog taxonomy and product types.
//!
//! The catalog is a four-level taxonomy: activities own categories,
//! categories own activity types, and products hang off a category (and
//! optionally an activity type). Products are read-only from the cart and
//! favorites containers' perspective.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use keyiflibox_core::{ActivityId, ActivityTypeId, CategoryId, Price, ProductId};

/// A top-level activity group ("Keşfet & Eğlen", "Spor & Macera", ...).
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Activity {
    pub id: ActivityId,
    pub activity_name: String,
    pub created_at: DateTime<Utc>,
}

/// A category within an activity ("Tema ve Macera Parkları", ...).
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Category {
    pub id: CategoryId,
    pub activity_id: ActivityId,
    pub category_name: String,
    pub created_at: DateTime<Utc>,
}

/// An activity type within a category ("Tema Park", ...).
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ActivityType {
    pub id: ActivityTypeId,
    pub activity_id: ActivityId,
    pub category_id: CategoryId,
    pub activity_type_name: String,
    pub created_at: DateTime<Utc>,
}

/// An experience product.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Product {
    pub id: ProductId,
    pub activity_type_id: Option<ActivityTypeId>,
    pub category_id: CategoryId,
    pub title: String,
    pub sub_title: Option<String>,
    pub description: Option<String>,
    pub price: Price,
    pub image_url: Option<String>,
    pub external_url: Option<String>,
    pub city: Option<String>,
    pub district: Option<String>,
    pub ticket_rule: Option<String>,
    pub date: Option<String>,
    pub rating: Option<f64>,
    pub is_active: bool,
    pub priority: Option<i32>,
    pub full_address: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Product {
    /// The image to display for this product, falling back to the
    /// category image when the product has none.
    #[must_use]
    pub fn display_image(&self) -> String {
        match &self.image_url {
            Some(url) if !url.is_empty() => url.clone(),
            _ => fallback_image(Some(&self.category_id)).to_owned(),
        }
    }
}

/// Fields for creating or updating a product (no id, no timestamps).
#[derive(Debug, Clone)]
pub struct ProductDraft {
    pub activity_type_id: Option<ActivityTypeId>,
    pub category_id: CategoryId,
    pub title: String,
    pub sub_title: Option<String>,
    pub description: Option<String>,
    pub price: Price,
    pub image_url: Option<String>,
    pub external_url: Option<String>,
    pub city: Option<String>,
    pub district: Option<String>,
    pub ticket_rule: Option<String>,
    pub date: Option<String>,
    pub rating: Option<f64>,
    pub is_active: bool,
    pub priority: Option<i32>,
    pub full_address: Option<String>,
}

/// Category-based fallback images for when a product image is missing (or
/// the product itself cannot be resolved).
#[must_use]
pub fn fallback_image(category_id: Option<&CategoryId>) -> &'static str {
    let Some(category_id) = category_id else {
        return "/images/Adults.jpg";
    };

    match category_id.as_str() {
        "1" => "https://images.unsplash.com/photo-1511512578047-dfb367046420?q=80&w=1200&auto=format&fit=crop", // Tema & Macera Parkları
        "2" => "https://images.unsplash.com/photo-1508609349937-5ec4ae374ebf?q=80&w=1200&auto=format&fit=crop", // Oyun & Etkileşimli
        "3" => "/images/WaterAdventure.jpg",                                                                     // Su Maceraları
        "4" => "https://images.unsplash.com/photo-1469474968028-56623f02e42e?q=80&w=1200&auto=format&fit=crop", // Doğa ve Arazi
        "5" => "https://images.unsplash.com/photo-1519682577862-22b62b24e493?q=80&w=1200&auto=format&fit=crop", // Gökyüzü
        "6" => "/images/Focused.jpg",                                                                            // Hedef Odaklı
        "7" => "https://images.unsplash.com/photo-1544161515-4ab6ce6db874?q=80&w=1200&auto=format&fit=crop", // Masaj
        "8" => "https://images.unsplash.com/photo-1544986581-efac024faf62?q=80&w=1200&auto=format&fit=crop", // Spa & Termal
        "9" => "/images/Hamam.jpg",                                                                              // Hamam
        "10" => "https://images.unsplash.com/photo-1512496015851-a90fb38ba796?q=80&w=1200&auto=format&fit=crop", // Güzellik & Bakım
        "11" => "/images/Sensory.jpg",                                                                           // Duyusal
        "12" => "/images/Cooking.jpg",                                                                           // Yemek Atölyeleri
        "13" => "https://images.unsplash.com/photo-1500530855697-b586d89ba3ee?q=80&w=1200&auto=format&fit=crop", // Sanat
        "14" => "/images/PersonalCare.jpg",                                                                      // Kişisel Bakım
        "16" => "https://images.unsplash.com/photo-1519681393784-d120267933ba?q=80&w=1200&auto=format&fit=crop", // Çocuklar
        "17" => "https://images.unsplash.com/photo-1500530855697-b586d89ba3ee?q=80&w=1200&auto=format&fit=crop", // Tüm Yaşlar
        // "15" (Yetişkinler) and anything unknown
        _ => "/images/Adults.jpg",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product_without_image() -> Product {
        Product {
            id: ProductId::new("p-1"),
            activity_type_id: None,
            category_id: CategoryId::new("9"),
            title: "Tarihi Hamam Deneyimi".to_string(),
            sub_title: None,
            description: None,
            price: Price::ZERO,
            image_url: None,
            external_url: None,
            city: Some("İstanbul".to_string()),
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
    fn test_display_image_prefers_product_image() {
        let mut product = product_without_image();
        product.image_url = Some("https://cdn.example.com/hamam.jpg".to_string());
        assert_eq!(product.display_image(), "https://cdn.example.com/hamam.jpg");
    }

    #[test]
    fn test_display_image_falls_back_by_category() {
        let product = product_without_image();
        assert_eq!(product.display_image(), "/images/Hamam.jpg");
    }

    #[test]
    fn test_empty_image_url_counts_as_missing() {
        let mut product = product_without_image();
        product.image_url = Some(String::new());
        assert_eq!(product.display_image(), "/images/Hamam.jpg");
    }

    #[test]
    fn test_fallback_image_without_category() {
        assert_eq!(fallback_image(None), "/images/Adults.jpg");
    }

    #[test]
    fn test_fallback_image_unknown_category() {
        let unknown = CategoryId::new("999");
        assert_eq!(fallback_image(Some(&unknown)), "/images/Adults.jpg");
    }
}
