use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};

use harvest_catalog::sort_products;
use harvest_core::ProductId;

use crate::app::services::Storefront;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/search", get(search_products))
        .route("/:id", get(get_product))
}

pub async fn search_products(
    Extension(services): Extension<Arc<Storefront>>,
    Query(params): Query<dto::SearchParams>,
) -> axum::response::Response {
    let req = match dto::SearchRequest::try_from(params) {
        Ok(r) => r,
        Err(e) => return errors::domain_error_to_response(e),
    };
    let pagination = services.pagination(req.limit, req.offset);

    let page = services.search(&req.query, &req.filters, pagination).await;
    let items = sort_products(&page.products, req.sort)
        .iter()
        .map(dto::product_to_json)
        .collect::<Vec<_>>();

    Json(serde_json::json!({
        "items": items,
        "total": page.total,
        "limit": pagination.limit,
        "offset": pagination.offset,
    }))
    .into_response()
}

pub async fn get_product(
    Extension(services): Extension<Arc<Storefront>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: ProductId = match id.parse() {
        Ok(v) => v,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services.product(id).await {
        Some(p) => (StatusCode::OK, Json(dto::product_to_json(&p))).into_response(),
        None => errors::json_error(StatusCode::NOT_FOUND, "not_found", "product not found"),
    }
}
