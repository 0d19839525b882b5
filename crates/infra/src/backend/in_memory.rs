use std::collections::HashMap;
use std::path::Path;
use std::sync::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::Deserialize;
use tracing::warn;

use harvest_catalog::{
    CollectionRecord, CollectionSummary, PriceBounds, Product, ProductQuery, ProductRecord,
};
use harvest_core::{CollectionId, ProductId};

use super::r#trait::{BackendError, CatalogBackend, ProductPage};

/// JSON layout accepted by [`InMemoryCatalogBackend::from_json`].
///
/// Products may embed their collection; standalone collections are listed too
/// so empty ones still show up when browsing.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CatalogFixture {
    collections: Vec<CollectionRecord>,
    products: Vec<ProductRecord>,
}

#[derive(Debug, Default)]
struct Snapshot {
    collections: HashMap<CollectionId, CollectionSummary>,
    /// Insertion order; queries order by `created_at` descending on top of it.
    products: Vec<Product>,
}

impl Snapshot {
    fn collection_of<'a>(&'a self, product: &'a Product) -> Option<&'a CollectionSummary> {
        product
            .collection_id
            .and_then(|id| self.collections.get(&id))
            .or(product.collection.as_ref())
    }

    /// Product with its collection summary refreshed from the collection table.
    fn joined(&self, product: &Product) -> Product {
        let mut p = product.clone();
        if let Some(c) = self.collection_of(product) {
            p.collection = Some(self.with_count(c));
        }
        p
    }

    fn with_count(&self, collection: &CollectionSummary) -> CollectionSummary {
        let count = self
            .products
            .iter()
            .filter(|p| p.is_active && p.collection_id == Some(collection.id))
            .count();
        CollectionSummary {
            product_count: u32::try_from(count).unwrap_or(u32::MAX),
            ..collection.clone()
        }
    }

    /// Server-side part of a product query (see `ProductQuery`).
    fn matches(&self, query: &ProductQuery, product: &Product) -> bool {
        if !product.is_active {
            return false;
        }
        let Some(collection) = self.collection_of(product).filter(|c| c.is_active) else {
            return false;
        };
        if let Some(category) = query.category.as_deref() {
            if collection.category != category {
                return false;
            }
        }
        if let Some(ids) = query.collections.as_deref().filter(|ids| !ids.is_empty()) {
            if !ids.contains(&collection.id) {
                return false;
            }
        }
        if query.terms.is_empty() {
            return true;
        }

        let name = product.name.to_lowercase();
        let description = product.description.as_deref().unwrap_or_default().to_lowercase();
        query.terms.iter().any(|term| {
            let term = term.to_lowercase();
            name.contains(&term) || description.contains(&term)
        })
    }
}

/// In-memory catalog backend.
///
/// Intended for tests/dev. Mirrors the hosted store's query semantics over a
/// snapshot held behind a lock; not optimized for performance.
#[derive(Debug, Default)]
pub struct InMemoryCatalogBackend {
    inner: RwLock<Snapshot>,
    offline: AtomicBool,
}

impl InMemoryCatalogBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a backend from a JSON catalog document.
    ///
    /// Records failing validation are skipped with a warning; only a document
    /// that is not valid JSON at all is an error.
    pub fn from_json(json: &str) -> Result<Self, BackendError> {
        let fixture: CatalogFixture =
            serde_json::from_str(json).map_err(|e| BackendError::Decode(e.to_string()))?;

        let backend = Self::new();
        for record in fixture.collections {
            match CollectionSummary::try_from(record) {
                Ok(c) => backend.upsert_collection(c)?,
                Err(e) => warn!(error = %e, "skipping invalid collection record"),
            }
        }
        for record in fixture.products {
            match Product::try_from(record) {
                Ok(p) => backend.upsert_product(p)?,
                Err(e) => warn!(error = %e, "skipping invalid product record"),
            }
        }
        Ok(backend)
    }

    /// Read and parse a JSON catalog document from disk.
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self, BackendError> {
        let path = path.as_ref();
        let json = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| BackendError::Unavailable(format!("{}: {e}", path.display())))?;
        Self::from_json(&json)
    }

    pub fn upsert_collection(&self, collection: CollectionSummary) -> Result<(), BackendError> {
        let mut snap = self.write()?;
        snap.collections.insert(collection.id, collection);
        Ok(())
    }

    /// Insert or replace a product.
    ///
    /// An embedded collection is registered only when its id is unknown; the
    /// stored collection stays authoritative and is changed through
    /// [`InMemoryCatalogBackend::upsert_collection`].
    pub fn upsert_product(&self, product: Product) -> Result<(), BackendError> {
        let mut snap = self.write()?;
        if let Some(c) = &product.collection {
            snap.collections.entry(c.id).or_insert_with(|| c.clone());
        }
        match snap.products.iter_mut().find(|p| p.id == product.id) {
            Some(existing) => *existing = product,
            None => snap.products.push(product),
        }
        Ok(())
    }

    /// Simulate an outage: every call fails with `BackendError::Unavailable`.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, Snapshot>, BackendError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(BackendError::Unavailable("in-memory backend is offline".to_string()));
        }
        self.inner
            .read()
            .map_err(|_| BackendError::Unavailable("lock poisoned".to_string()))
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, Snapshot>, BackendError> {
        self.inner
            .write()
            .map_err(|_| BackendError::Unavailable("lock poisoned".to_string()))
    }
}

#[async_trait::async_trait]
impl CatalogBackend for InMemoryCatalogBackend {
    async fn fetch_products(&self, query: &ProductQuery) -> Result<ProductPage, BackendError> {
        let snap = self.read()?;

        let mut matched: Vec<&Product> =
            snap.products.iter().filter(|p| snap.matches(query, p)).collect();
        matched.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let total = matched.len() as u64;
        let products = matched
            .into_iter()
            .skip(query.pagination.offset as usize)
            .take(query.pagination.limit as usize)
            .map(|p| snap.joined(p))
            .collect();

        Ok(ProductPage { products, total })
    }

    async fn fetch_collections(&self) -> Result<Vec<CollectionSummary>, BackendError> {
        let snap = self.read()?;
        let mut collections: Vec<CollectionSummary> = snap
            .collections
            .values()
            .filter(|c| c.is_active)
            .map(|c| snap.with_count(c))
            .collect();
        collections.sort_by(|a, b| a.title.cmp(&b.title));
        Ok(collections)
    }

    async fn fetch_categories(&self) -> Result<Vec<String>, BackendError> {
        let snap = self.read()?;
        let mut categories: Vec<String> = snap
            .collections
            .values()
            .filter(|c| c.is_active && !c.category.trim().is_empty())
            .map(|c| c.category.clone())
            .collect();
        categories.sort();
        categories.dedup();
        Ok(categories)
    }

    async fn fetch_price_bounds(
        &self,
        collections: Option<&[CollectionId]>,
    ) -> Result<PriceBounds, BackendError> {
        let snap = self.read()?;
        let scope = collections.filter(|ids| !ids.is_empty());

        let prices = snap
            .products
            .iter()
            .filter(|p| match scope {
                Some(ids) => p.collection_id.is_some_and(|id| ids.contains(&id)),
                None => true,
            })
            .flat_map(|p| p.active_variants())
            .map(|v| v.price);

        Ok(PriceBounds::from_prices(prices))
    }

    async fn fetch_product_by_id(&self, id: ProductId) -> Result<Option<Product>, BackendError> {
        let snap = self.read()?;
        Ok(snap.products.iter().find(|p| p.id == id).map(|p| snap.joined(p)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{collection, product_in, variant};
    use harvest_catalog::{Pagination, SearchFilters};
    use harvest_core::Price;

    fn seeded() -> (InMemoryCatalogBackend, CollectionSummary, CollectionSummary) {
        let backend = InMemoryCatalogBackend::new();
        let fruit = collection("Fruit", "produce");
        let drinks = collection("Drinks", "drinks");

        backend.upsert_product(product_in(&fruit, "Green Apple", 1, &[("GA-1", 120, 0)])).unwrap();
        backend.upsert_product(product_in(&drinks, "Apple Juice", 2, &[("AJ-1", 450, 5)])).unwrap();
        backend.upsert_product(product_in(&fruit, "Pear", 3, &[("PR-1", 300, 2)])).unwrap();
        (backend, fruit, drinks)
    }

    #[tokio::test]
    async fn text_query_matches_name_or_description_any_term() {
        let (backend, _, _) = seeded();
        let mut carrots = product_in(&collection("Veg", "produce"), "Carrots", 4, &[]);
        carrots.description = Some("Pairs well with APPLE".to_string());
        backend.upsert_product(carrots).unwrap();

        let q = ProductQuery::text(vec!["apple".into(), "nothing".into()], &SearchFilters::default(), Pagination::default());
        let page = backend.fetch_products(&q).await.unwrap();

        let names: Vec<_> = page.products.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Carrots", "Apple Juice", "Green Apple"]);
        assert_eq!(page.total, 3);
    }

    #[tokio::test]
    async fn inactive_products_and_collections_are_hidden() {
        let (backend, fruit, _) = seeded();
        let mut hidden = product_in(&fruit, "Apple Crate", 5, &[("AC-1", 999, 1)]);
        hidden.is_active = false;
        backend.upsert_product(hidden).unwrap();

        let mut closed = collection("Closed", "produce");
        closed.is_active = false;
        backend.upsert_product(product_in(&closed, "Apple Seeds", 6, &[])).unwrap();

        let mut orphan = product_in(&fruit, "Apple Orphan", 7, &[]);
        orphan.collection_id = None;
        orphan.collection = None;
        backend.upsert_product(orphan).unwrap();

        let q = ProductQuery::text(vec!["apple".into()], &SearchFilters::default(), Pagination::default());
        let page = backend.fetch_products(&q).await.unwrap();
        assert_eq!(page.total, 2);
    }

    #[tokio::test]
    async fn category_and_collection_filters_apply_server_side() {
        let (backend, fruit, drinks) = seeded();

        let by_category = ProductQuery::browse(
            &SearchFilters::default().with_category("drinks"),
            Pagination::default(),
        );
        let page = backend.fetch_products(&by_category).await.unwrap();
        assert_eq!(page.products.len(), 1);
        assert_eq!(page.products[0].collection_id, Some(drinks.id));

        let by_collection = ProductQuery::browse(
            &SearchFilters::default().with_collections([fruit.id]),
            Pagination::default(),
        );
        assert_eq!(backend.fetch_products(&by_collection).await.unwrap().total, 2);
    }

    #[tokio::test]
    async fn pagination_reports_exact_total() {
        let (backend, _, _) = seeded();
        let q = ProductQuery::browse(&SearchFilters::default(), Pagination::new(Some(2), Some(1)));
        let page = backend.fetch_products(&q).await.unwrap();

        assert_eq!(page.total, 3);
        let names: Vec<_> = page.products.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Apple Juice", "Green Apple"]);
    }

    #[tokio::test]
    async fn collections_are_sorted_with_product_counts() {
        let (backend, _, _) = seeded();
        let collections = backend.fetch_collections().await.unwrap();

        let summary: Vec<_> = collections.iter().map(|c| (c.title.as_str(), c.product_count)).collect();
        assert_eq!(summary, vec![("Drinks", 1), ("Fruit", 2)]);
        assert_eq!(backend.fetch_categories().await.unwrap(), vec!["drinks", "produce"]);
    }

    #[tokio::test]
    async fn price_bounds_scan_active_variants() {
        let (backend, fruit, _) = seeded();
        let mut p = product_in(&fruit, "Plums", 8, &[("PL-1", 50, 1)]);
        p.variants.push(harvest_catalog::Variant {
            is_active: false,
            ..variant(&p, "PL-2", 1, 1)
        });
        backend.upsert_product(p).unwrap();

        let all = backend.fetch_price_bounds(None).await.unwrap();
        assert_eq!((all.min, all.max), (Price::from_cents(50), Price::from_cents(450)));

        let fruit_only = backend.fetch_price_bounds(Some(&[fruit.id][..])).await.unwrap();
        assert_eq!(fruit_only.max, Price::from_cents(300));

        let none = backend.fetch_price_bounds(Some(&[CollectionId::new()][..])).await.unwrap();
        assert_eq!(none, PriceBounds::default());
    }

    #[tokio::test]
    async fn product_by_id_and_offline_mode() {
        let (backend, _, _) = seeded();
        let any = backend.fetch_products(&ProductQuery::default()).await.unwrap().products[0].clone();

        assert_eq!(backend.fetch_product_by_id(any.id).await.unwrap(), Some(any));
        assert_eq!(backend.fetch_product_by_id(ProductId::new()).await.unwrap(), None);

        backend.set_offline(true);
        assert!(matches!(
            backend.fetch_categories().await,
            Err(BackendError::Unavailable(_))
        ));
    }

    #[test]
    fn from_json_skips_invalid_records() {
        let json = r#"{
            "collections": [
                {"id": "0190a3d4-0000-7000-8000-0000000000c1", "title": "Fruit", "category": "produce", "is_active": true},
                {"title": "No id"}
            ],
            "products": [
                {"id": "0190a3d4-0000-7000-8000-000000000001", "collection_id": "0190a3d4-0000-7000-8000-0000000000c1",
                 "name": "Pear", "is_active": true, "created_at": "2024-03-01T09:00:00Z", "variants": []},
                {"id": "0190a3d4-0000-7000-8000-000000000002", "name": "No timestamp"}
            ]
        }"#;

        let backend = InMemoryCatalogBackend::from_json(json).unwrap();
        let snap = backend.inner.read().unwrap();
        assert_eq!(snap.collections.len(), 1);
        assert_eq!(snap.products.len(), 1);
        assert_eq!(snap.products[0].name, "Pear");
        drop(snap);

        assert!(matches!(
            InMemoryCatalogBackend::from_json("not json"),
            Err(BackendError::Decode(_))
        ));
    }

    #[tokio::test]
    async fn from_path_reads_fixture_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.json");
        std::fs::write(
            &path,
            r#"{"collections": [{"id": "0190a3d4-0000-7000-8000-0000000000c1", "title": "Fruit", "category": "produce", "is_active": true}]}"#,
        )
        .unwrap();

        let backend = InMemoryCatalogBackend::from_path(&path).await.unwrap();
        assert_eq!(backend.fetch_categories().await.unwrap(), vec!["produce"]);

        let missing = InMemoryCatalogBackend::from_path(dir.path().join("missing.json")).await;
        assert!(matches!(missing, Err(BackendError::Unavailable(_))));
    }

    #[tokio::test]
    async fn embedded_collection_resolves_products_without_collection_id() {
        let backend = InMemoryCatalogBackend::new();
        let fruit = collection("Fruit", "produce");
        let mut loose = product_in(&fruit, "Quince", 1, &[("QN-1", 220, 3)]);
        loose.collection_id = None;
        backend.upsert_product(loose).unwrap();

        let page = backend.fetch_products(&ProductQuery::default()).await.unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.products[0].collection.as_ref().map(|c| c.id), Some(fruit.id));
    }

    #[test]
    fn writes_fail_on_poisoned_lock() {
        let backend = std::sync::Arc::new(InMemoryCatalogBackend::new());
        let poisoner = std::sync::Arc::clone(&backend);
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.inner.write().unwrap();
            panic!("poison the snapshot lock");
        })
        .join();

        let fruit = collection("Fruit", "produce");
        assert!(matches!(
            backend.upsert_collection(fruit.clone()),
            Err(BackendError::Unavailable(_))
        ));
        assert!(matches!(
            backend.upsert_product(product_in(&fruit, "Pear", 1, &[])),
            Err(BackendError::Unavailable(_))
        ));
    }

    #[tokio::test]
    async fn stored_collection_wins_over_embedded_copy() {
        let (backend, fruit, _) = seeded();

        let mut stale = fruit.clone();
        stale.is_active = false;
        let mut pear = product_in(&stale, "Pear", 3, &[("PR-1", 300, 2)]);
        pear.id = backend.fetch_products(&ProductQuery::default()).await.unwrap().products[0].id;
        backend.upsert_product(pear).unwrap();
        assert_eq!(backend.fetch_products(&ProductQuery::default()).await.unwrap().total, 3);

        backend.upsert_collection(stale).unwrap();
        assert_eq!(backend.fetch_products(&ProductQuery::default()).await.unwrap().total, 1);
    }
}
