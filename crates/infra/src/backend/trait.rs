use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use harvest_catalog::{CollectionSummary, PriceBounds, Product, ProductQuery};
use harvest_core::{CollectionId, ProductId};

/// One page of products as returned by the backend.
///
/// `total` is the exact number of rows matching the server-side part of the
/// query across all pages.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductPage {
    pub products: Vec<Product>,
    pub total: u64,
}

/// Catalog backend operation error.
///
/// These are **infrastructure errors** (transport, query, decoding) as opposed to
/// domain errors (validation, invariants). Records that fail validation are
/// dropped by adapters and never surface here.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// The backend could not be reached (connection refused, pool closed, timeout).
    #[error("backend unavailable: {0}")]
    Unavailable(String),

    /// The backend rejected or failed to execute the query.
    #[error("query failed: {0}")]
    Query(String),

    /// The backend answered with data that could not be decoded at all.
    #[error("failed to decode backend response: {0}")]
    Decode(String),
}

/// Read-only access to the hosted catalog.
///
/// This is the seam between search logic and the external record store. It is
/// injected into the search service so tests can substitute doubles.
#[async_trait::async_trait]
pub trait CatalogBackend: Send + Sync {
    /// Run a product query (see [`ProductQuery`] for server-side semantics).
    async fn fetch_products(&self, query: &ProductQuery) -> Result<ProductPage, BackendError>;

    /// Active collections ordered by title.
    async fn fetch_collections(&self) -> Result<Vec<CollectionSummary>, BackendError>;

    /// Distinct categories of active collections, sorted.
    async fn fetch_categories(&self) -> Result<Vec<String>, BackendError>;

    /// Min/max active variant price, optionally restricted to products of the
    /// given collections. Zero/zero when nothing is priced.
    async fn fetch_price_bounds(
        &self,
        collections: Option<&[CollectionId]>,
    ) -> Result<PriceBounds, BackendError>;

    /// A single product by id, whatever its active flag.
    async fn fetch_product_by_id(&self, id: ProductId) -> Result<Option<Product>, BackendError>;
}

#[async_trait::async_trait]
impl<B> CatalogBackend for Arc<B>
where
    B: CatalogBackend + ?Sized,
{
    async fn fetch_products(&self, query: &ProductQuery) -> Result<ProductPage, BackendError> {
        (**self).fetch_products(query).await
    }

    async fn fetch_collections(&self) -> Result<Vec<CollectionSummary>, BackendError> {
        (**self).fetch_collections().await
    }

    async fn fetch_categories(&self) -> Result<Vec<String>, BackendError> {
        (**self).fetch_categories().await
    }

    async fn fetch_price_bounds(
        &self,
        collections: Option<&[CollectionId]>,
    ) -> Result<PriceBounds, BackendError> {
        (**self).fetch_price_bounds(collections).await
    }

    async fn fetch_product_by_id(&self, id: ProductId) -> Result<Option<Product>, BackendError> {
        (**self).fetch_product_by_id(id).await
    }
}
