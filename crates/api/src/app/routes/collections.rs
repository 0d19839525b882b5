use std::sync::Arc;

use axum::{
    Json,
    extract::{Extension, Query},
    response::IntoResponse,
};

use crate::app::services::Storefront;
use crate::app::{dto, errors};

pub async fn list_collections(Extension(services): Extension<Arc<Storefront>>) -> impl IntoResponse {
    let collections = services.collections().await;
    Json(collections.iter().map(dto::collection_to_json).collect::<Vec<_>>())
}

pub async fn list_categories(Extension(services): Extension<Arc<Storefront>>) -> impl IntoResponse {
    Json(services.categories().await)
}

pub async fn price_bounds(
    Extension(services): Extension<Arc<Storefront>>,
    Query(params): Query<dto::PriceBoundsParams>,
) -> axum::response::Response {
    let ids = match params.collections.as_deref().map(dto::parse_collection_ids).transpose() {
        Ok(ids) => ids.filter(|ids| !ids.is_empty()),
        Err(e) => return errors::domain_error_to_response(e),
    };

    let bounds = services.price_bounds(ids.as_deref()).await;
    Json(dto::price_bounds_to_json(bounds)).into_response()
}
