//! Domain models for the storefront.
//!
//! These types represent validated domain objects separate from raw
//! database rows or locally persisted payloads.

pub mod cart;
pub mod favorite;
pub mod product;
pub mod session;

pub use cart::CartLine;
pub use favorite::FavoriteEntry;
pub use product::{Activity, ActivityType, Category, Product, ProductDraft, fallback_image};
pub use session::CurrentUser;
