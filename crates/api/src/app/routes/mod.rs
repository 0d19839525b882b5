use axum::{Router, routing::get};

pub mod collections;
pub mod products;
pub mod system;

/// Router for all catalog endpoints.
pub fn router() -> Router {
    Router::new()
        .nest("/products", products::router())
        .route("/collections", get(collections::list_collections))
        .route("/categories", get(collections::list_categories))
        .route("/price-bounds", get(collections::price_bounds))
}
