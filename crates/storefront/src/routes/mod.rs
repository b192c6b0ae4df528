//! HTTP route handlers for the storefront.
//!
//! The JSON surface consumed by the presentation layer. Cart and favorites
//! handlers never fail: the containers convert store failures into user
//! notices and the handlers respond with the current (last-known-good)
//! view. Catalog browsing handlers return proper error responses.
//!
//! # Route Structure
//!
//! ```text
//! # Products
//! GET  /products               - Product listing (equality filters)
//! GET  /products/{id}          - Product detail
//!
//! # Cart
//! GET  /cart                   - Current cart view
//! POST /cart/add               - Add a product (increments existing lines)
//! POST /cart/update            - Overwrite a line quantity (0 removes)
//! POST /cart/remove            - Remove a line
//! POST /cart/clear             - Remove every line
//! GET  /cart/count             - Cart badge count
//!
//! # Favorites
//! GET  /favorites              - Current favorites view
//! POST /favorites/add          - Mark a product as favorite
//! POST /favorites/remove       - Unmark a product
//! GET  /favorites/{id}/status  - Whether a product is a favorite
//!
//! # Auth (identity only; protocol internals are the backend's)
//! POST /auth/login             - Establish the session identity
//! POST /auth/logout            - Return to anonymous
//! GET  /auth/me                - Current identity
//! ```

pub mod auth;
pub mod cart;
pub mod favorites;
pub mod products;

use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

/// Create the storefront router.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/products", get(products::index))
        .route("/products/{id}", get(products::show))
        .route("/cart", get(cart::show))
        .route("/cart/add", post(cart::add))
        .route("/cart/update", post(cart::update))
        .route("/cart/remove", post(cart::remove))
        .route("/cart/clear", post(cart::clear))
        .route("/cart/count", get(cart::count))
        .route("/favorites", get(favorites::index))
        .route("/favorites/add", post(favorites::add))
        .route("/favorites/remove", post(favorites::remove))
        .route("/favorites/{id}/status", get(favorites::status))
        .route("/auth/login", post(auth::login))
        .route("/auth/logout", post(auth::logout))
        .route("/auth/me", get(auth::me))
}
