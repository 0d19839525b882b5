use std::sync::Arc;

use anyhow::Context;
use tracing::{error, info, warn};

use harvest_catalog::{CollectionSummary, Pagination, PriceBounds, Product, SearchFilters};
use harvest_core::{CollectionId, ProductId};
use harvest_infra::{
    CatalogBackend, InMemoryCatalogBackend, PostgresCatalogBackend, ProductSearch, SearchPage,
    StorefrontConfig,
};

/// Type-erased backend shared by all handlers.
pub type SharedBackend = Arc<dyn CatalogBackend>;

/// Pick the catalog backend: Postgres when `DATABASE_URL` is set, otherwise an
/// in-memory catalog (optionally seeded from a fixture file).
pub async fn build_backend(config: &StorefrontConfig) -> anyhow::Result<SharedBackend> {
    if let Some(db) = &config.database {
        let backend =
            PostgresCatalogBackend::connect(&db.url, db.max_connections, db.acquire_timeout)
                .await
                .context("failed to connect to catalog database")?;
        info!(max_connections = db.max_connections, "using postgres catalog backend");
        return Ok(Arc::new(backend));
    }

    warn!("DATABASE_URL not set; using in-memory catalog backend");
    let backend = match &config.catalog_fixture {
        Some(path) => InMemoryCatalogBackend::from_path(path)
            .await
            .with_context(|| format!("failed to load catalog fixture {}", path.display()))?,
        None => InMemoryCatalogBackend::new(),
    };
    Ok(Arc::new(backend))
}

/// Storefront-facing catalog operations.
///
/// Backend failures never reach the shopper: they are logged and collapsed to
/// empty results (empty lists, zero totals, zero bounds, no product).
pub struct Storefront {
    search: ProductSearch<SharedBackend>,
    default_limit: u32,
    max_limit: u32,
}

impl Storefront {
    pub fn new(backend: SharedBackend, default_limit: u32, max_limit: u32) -> Self {
        Self {
            search: ProductSearch::new(backend),
            default_limit,
            max_limit,
        }
    }

    pub fn from_config(backend: SharedBackend, config: &StorefrontConfig) -> Self {
        Self::new(backend, config.default_limit, config.max_limit)
    }

    /// Page for caller-supplied limit/offset, with the configured default and cap.
    pub fn pagination(&self, limit: Option<u32>, offset: Option<u32>) -> Pagination {
        Pagination::new(Some(limit.unwrap_or(self.default_limit)), offset).capped(self.max_limit)
    }

    pub async fn search(
        &self,
        query: &str,
        filters: &SearchFilters,
        pagination: Pagination,
    ) -> SearchPage {
        match self.search.search(query, filters, pagination).await {
            Ok(page) => page,
            Err(e) => {
                error!(error = %e, query, "product search failed");
                SearchPage::default()
            }
        }
    }

    pub async fn collections(&self) -> Vec<CollectionSummary> {
        self.search.collections().await.unwrap_or_else(|e| {
            error!(error = %e, "fetching collections failed");
            Vec::new()
        })
    }

    pub async fn categories(&self) -> Vec<String> {
        self.search.categories().await.unwrap_or_else(|e| {
            error!(error = %e, "fetching categories failed");
            Vec::new()
        })
    }

    pub async fn price_bounds(&self, collections: Option<&[CollectionId]>) -> PriceBounds {
        self.search.price_bounds(collections).await.unwrap_or_else(|e| {
            error!(error = %e, "fetching price bounds failed");
            PriceBounds::default()
        })
    }

    pub async fn product(&self, id: ProductId) -> Option<Product> {
        self.search.product(id).await.unwrap_or_else(|e| {
            error!(error = %e, product_id = %id, "fetching product failed");
            None
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn storefront(backend: Arc<InMemoryCatalogBackend>) -> Storefront {
        Storefront::new(backend, 20, 50)
    }

    #[test]
    fn pagination_applies_default_and_cap() {
        let s = storefront(Arc::new(InMemoryCatalogBackend::new()));
        assert_eq!(s.pagination(None, None), Pagination { limit: 20, offset: 0 });
        assert_eq!(s.pagination(Some(500), Some(40)), Pagination { limit: 50, offset: 40 });
        assert_eq!(s.pagination(Some(0), None).limit, 1);
    }

    #[tokio::test]
    async fn offline_backend_collapses_to_defaults() {
        let backend = Arc::new(InMemoryCatalogBackend::new());
        backend.set_offline(true);
        let s = storefront(backend);

        let page = s.search("apple", &SearchFilters::default(), Pagination::default()).await;
        assert_eq!(page, SearchPage::default());
        assert!(s.collections().await.is_empty());
        assert!(s.categories().await.is_empty());
        assert_eq!(s.price_bounds(None).await, PriceBounds::default());
        assert_eq!(s.product(ProductId::new()).await, None);
    }

    #[tokio::test]
    async fn in_memory_backend_is_used_without_database() {
        let backend = build_backend(&StorefrontConfig::default()).await.unwrap();
        assert!(backend.fetch_categories().await.unwrap().is_empty());
    }
}
