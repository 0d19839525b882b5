//! Postgres-backed catalog backend.
//!
//! Reads the hosted store's tables directly:
//!
//! - `collections(id, title, name, category, is_active, description, image_url)`
//! - `products(id, collection_id, name, description, image_url, is_active, created_at, updated_at)`
//! - `variants(id, product_id, title, kind, value, unit, price, stock, sku, is_active, created_at, updated_at)`
//!
//! Products are fetched as one JSON document per row (variants and collection
//! embedded) and decoded through the same record validation as every other
//! source. Rows that fail validation are skipped and logged.
//!
//! ## Error Mapping
//!
//! | SQLx Error | BackendError |
//! |------------|--------------|
//! | PoolTimedOut / PoolClosed / Io / Tls | `Unavailable` |
//! | Database | `Query` |
//! | ColumnDecode / Decode / ColumnNotFound | `Decode` |
//! | Other | `Query` |

use std::sync::Arc;
use std::time::Duration;

use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{FromRow, PgPool, Row};
use tracing::{Span, instrument, warn};
use uuid::Uuid;

use harvest_catalog::{
    CollectionRecord, CollectionSummary, PriceBounds, Product, ProductQuery, ProductRecord,
};
use harvest_core::{CollectionId, Price, ProductId};

use super::r#trait::{BackendError, CatalogBackend, ProductPage};

/// Product document: the product row with its variants and collection embedded.
const PRODUCT_DOCUMENT: &str = r#"
    json_build_object(
        'id', p.id,
        'collection_id', p.collection_id,
        'name', p.name,
        'description', p.description,
        'image_url', p.image_url,
        'is_active', p.is_active,
        'created_at', p.created_at,
        'updated_at', p.updated_at,
        'variants', COALESCE(
            (SELECT json_agg(v ORDER BY v.created_at, v.id) FROM variants v WHERE v.product_id = p.id),
            '[]'::json
        ),
        'collection', (
            SELECT json_build_object(
                'id', pc.id,
                'title', pc.title,
                'name', pc.name,
                'category', pc.category,
                'is_active', pc.is_active,
                'description', pc.description,
                'image_url', pc.image_url,
                'product_count', (
                    SELECT COUNT(*) FROM products cp WHERE cp.collection_id = pc.id AND cp.is_active
                )
            )
            FROM collections pc
            WHERE pc.id = p.collection_id
        )
    ) AS doc
"#;

/// Server-side product filter. Binds: $1 category, $2 collection ids, $3 ILIKE patterns.
const PRODUCT_FILTER: &str = r#"
    FROM products p
    JOIN collections c ON c.id = p.collection_id
    WHERE p.is_active
        AND c.is_active
        AND ($1::text IS NULL OR c.category = $1)
        AND ($2::uuid[] IS NULL OR p.collection_id = ANY($2))
        AND ($3::text[] IS NULL OR EXISTS (
            SELECT 1 FROM unnest($3::text[]) AS pattern
            WHERE p.name ILIKE pattern OR p.description ILIKE pattern
        ))
"#;

/// Postgres-backed, read-only catalog backend.
///
/// `Send + Sync` and cheap to clone; all access goes through the SQLx pool.
#[derive(Debug, Clone)]
pub struct PostgresCatalogBackend {
    pool: Arc<PgPool>,
}

impl PostgresCatalogBackend {
    /// Create a new backend over an existing connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    /// Connect a pool with the given size and acquire timeout.
    pub async fn connect(
        database_url: &str,
        max_connections: u32,
        acquire_timeout: Duration,
    ) -> Result<Self, BackendError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(acquire_timeout)
            .connect(database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        Ok(Self::new(pool))
    }

    fn decode_products(rows: Vec<PgRow>) -> Result<Vec<Product>, BackendError> {
        let mut products = Vec::with_capacity(rows.len());
        for row in rows {
            let doc: serde_json::Value = row
                .try_get("doc")
                .map_err(|e| map_sqlx_error("decode_product", e))?;
            if let Some(product) = decode_product(doc) {
                products.push(product);
            }
        }
        Ok(products)
    }
}

/// Decode one product document, logging and dropping it when invalid.
fn decode_product(doc: serde_json::Value) -> Option<Product> {
    let record: ProductRecord = match serde_json::from_value(doc) {
        Ok(r) => r,
        Err(e) => {
            warn!(error = %e, "skipping malformed product document");
            return None;
        }
    };
    let id = record.id;
    match Product::try_from(record) {
        Ok(p) => Some(p),
        Err(e) => {
            warn!(product_id = ?id, error = %e, "skipping invalid product record");
            None
        }
    }
}

/// `%term%` with LIKE wildcards in the term escaped.
fn ilike_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for ch in term.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(ch);
    }
    pattern.push('%');
    pattern
}

struct FilterBinds {
    category: Option<String>,
    collections: Option<Vec<Uuid>>,
    patterns: Option<Vec<String>>,
}

impl FilterBinds {
    fn from_query(query: &ProductQuery) -> Self {
        Self {
            category: query.category.clone(),
            collections: query
                .collections
                .as_deref()
                .filter(|ids| !ids.is_empty())
                .map(|ids| ids.iter().map(|id| *id.as_uuid()).collect()),
            patterns: (!query.terms.is_empty())
                .then(|| query.terms.iter().map(|t| ilike_pattern(t)).collect()),
        }
    }
}

#[derive(Debug)]
struct CollectionRow {
    id: Uuid,
    title: Option<String>,
    name: Option<String>,
    category: Option<String>,
    is_active: Option<bool>,
    product_count: i64,
    description: Option<String>,
    image_url: Option<String>,
}

impl<'r> FromRow<'r, PgRow> for CollectionRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(CollectionRow {
            id: row.try_get("id")?,
            title: row.try_get("title")?,
            name: row.try_get("name")?,
            category: row.try_get("category")?,
            is_active: row.try_get("is_active")?,
            product_count: row.try_get("product_count")?,
            description: row.try_get("description")?,
            image_url: row.try_get("image_url")?,
        })
    }
}

impl From<CollectionRow> for CollectionRecord {
    fn from(row: CollectionRow) -> Self {
        CollectionRecord {
            id: Some(row.id),
            title: row.title,
            name: row.name,
            category: row.category,
            is_active: row.is_active,
            product_count: Some(row.product_count),
            description: row.description,
            image_url: row.image_url,
        }
    }
}

#[async_trait::async_trait]
impl CatalogBackend for PostgresCatalogBackend {
    #[instrument(
        skip(self, query),
        fields(
            terms = query.terms.len(),
            limit = query.pagination.limit,
            offset = query.pagination.offset,
            fetched = tracing::field::Empty
        ),
        err
    )]
    async fn fetch_products(&self, query: &ProductQuery) -> Result<ProductPage, BackendError> {
        let binds = FilterBinds::from_query(query);

        let count_sql = format!("SELECT COUNT(*) AS total {PRODUCT_FILTER}");
        let count_row = sqlx::query(&count_sql)
            .bind(binds.category.as_deref())
            .bind(binds.collections.as_deref())
            .bind(binds.patterns.as_deref())
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("count_products", e))?;
        let total: i64 = count_row
            .try_get("total")
            .map_err(|e| map_sqlx_error("count_products", e))?;

        let page_sql = format!(
            "SELECT {PRODUCT_DOCUMENT} {PRODUCT_FILTER} ORDER BY p.created_at DESC, p.id LIMIT $4 OFFSET $5"
        );
        let rows = sqlx::query(&page_sql)
            .bind(binds.category.as_deref())
            .bind(binds.collections.as_deref())
            .bind(binds.patterns.as_deref())
            .bind(i64::from(query.pagination.limit))
            .bind(i64::from(query.pagination.offset))
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("fetch_products", e))?;

        let products = Self::decode_products(rows)?;
        Span::current().record("fetched", products.len());

        Ok(ProductPage {
            products,
            total: u64::try_from(total).unwrap_or(0),
        })
    }

    #[instrument(skip(self), err)]
    async fn fetch_collections(&self) -> Result<Vec<CollectionSummary>, BackendError> {
        let rows = sqlx::query(
            r#"
            SELECT
                c.id,
                c.title,
                c.name,
                c.category,
                c.is_active,
                c.description,
                c.image_url,
                (SELECT COUNT(*) FROM products p WHERE p.collection_id = c.id AND p.is_active) AS product_count
            FROM collections c
            WHERE c.is_active
            ORDER BY c.title ASC
            "#,
        )
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("fetch_collections", e))?;

        let mut collections = Vec::with_capacity(rows.len());
        for row in rows {
            let row = CollectionRow::from_row(&row).map_err(|e| map_sqlx_error("decode_collection", e))?;
            let id = row.id;
            match CollectionSummary::try_from(CollectionRecord::from(row)) {
                Ok(c) => collections.push(c),
                Err(e) => warn!(collection_id = %id, error = %e, "skipping invalid collection record"),
            }
        }
        Ok(collections)
    }

    #[instrument(skip(self), err)]
    async fn fetch_categories(&self) -> Result<Vec<String>, BackendError> {
        let rows = sqlx::query(
            r#"
            SELECT DISTINCT category
            FROM collections
            WHERE is_active AND category IS NOT NULL AND btrim(category) <> ''
            ORDER BY category ASC
            "#,
        )
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("fetch_categories", e))?;

        rows.iter()
            .map(|r| r.try_get::<String, _>("category"))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| map_sqlx_error("fetch_categories", e))
    }

    #[instrument(skip(self, collections), err)]
    async fn fetch_price_bounds(
        &self,
        collections: Option<&[CollectionId]>,
    ) -> Result<PriceBounds, BackendError> {
        let ids: Option<Vec<Uuid>> = collections
            .filter(|ids| !ids.is_empty())
            .map(|ids| ids.iter().map(|id| *id.as_uuid()).collect());

        let row = sqlx::query(
            r#"
            SELECT MIN(v.price)::float8 AS min_price, MAX(v.price)::float8 AS max_price
            FROM variants v
            JOIN products p ON p.id = v.product_id
            WHERE v.is_active
                AND ($1::uuid[] IS NULL OR p.collection_id = ANY($1))
            "#,
        )
        .bind(ids.as_deref())
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("fetch_price_bounds", e))?;

        let min: Option<f64> = row.try_get("min_price").map_err(|e| map_sqlx_error("fetch_price_bounds", e))?;
        let max: Option<f64> = row.try_get("max_price").map_err(|e| map_sqlx_error("fetch_price_bounds", e))?;

        match (min, max) {
            (Some(min), Some(max)) => Ok(PriceBounds {
                min: Price::from_major(min).map_err(|e| BackendError::Decode(e.to_string()))?,
                max: Price::from_major(max).map_err(|e| BackendError::Decode(e.to_string()))?,
            }),
            _ => Ok(PriceBounds::default()),
        }
    }

    #[instrument(skip(self), fields(product_id = %id), err)]
    async fn fetch_product_by_id(&self, id: ProductId) -> Result<Option<Product>, BackendError> {
        let sql = format!("SELECT {PRODUCT_DOCUMENT} FROM products p WHERE p.id = $1");
        let row = sqlx::query(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("fetch_product_by_id", e))?;

        match row {
            Some(row) => Ok(Self::decode_products(vec![row])?.into_iter().next()),
            None => Ok(None),
        }
    }
}

/// Map SQLx errors to `BackendError` with context about the operation.
fn map_sqlx_error(operation: &str, err: sqlx::Error) -> BackendError {
    match err {
        sqlx::Error::PoolTimedOut => {
            BackendError::Unavailable(format!("timed out acquiring a connection in {operation}"))
        }
        sqlx::Error::PoolClosed => {
            BackendError::Unavailable(format!("connection pool closed in {operation}"))
        }
        sqlx::Error::Io(e) => BackendError::Unavailable(format!("io error in {operation}: {e}")),
        sqlx::Error::Tls(e) => BackendError::Unavailable(format!("tls error in {operation}: {e}")),
        sqlx::Error::Database(db_err) => {
            BackendError::Query(format!("database error in {operation}: {}", db_err.message()))
        }
        sqlx::Error::ColumnNotFound(col) => {
            BackendError::Decode(format!("column '{col}' not found in {operation}"))
        }
        sqlx::Error::ColumnDecode { index, source } => {
            BackendError::Decode(format!("column {index} in {operation}: {source}"))
        }
        sqlx::Error::Decode(e) => BackendError::Decode(format!("{operation}: {e}")),
        other => BackendError::Query(format!("sqlx error in {operation}: {other}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use harvest_catalog::{Pagination, SearchFilters};

    #[test]
    fn ilike_pattern_escapes_wildcards() {
        assert_eq!(ilike_pattern("apple"), "%apple%");
        assert_eq!(ilike_pattern("100%"), "%100\\%%");
        assert_eq!(ilike_pattern("a_b\\c"), "%a\\_b\\\\c%");
    }

    #[test]
    fn binds_are_null_when_filters_are_absent() {
        let binds = FilterBinds::from_query(&ProductQuery::browse(&SearchFilters::default(), Pagination::default()));
        assert!(binds.category.is_none());
        assert!(binds.collections.is_none());
        assert!(binds.patterns.is_none());
    }

    #[test]
    fn binds_carry_terms_and_collections() {
        let c = CollectionId::new();
        let q = ProductQuery::text(
            vec!["green".into(), "apple".into()],
            &SearchFilters::default().with_category("fruit").with_collections([c]),
            Pagination::default(),
        );
        let binds = FilterBinds::from_query(&q);

        assert_eq!(binds.category.as_deref(), Some("fruit"));
        assert_eq!(binds.collections, Some(vec![*c.as_uuid()]));
        assert_eq!(binds.patterns, Some(vec!["%green%".to_string(), "%apple%".to_string()]));
    }

    #[test]
    fn invalid_documents_are_dropped() {
        assert!(decode_product(serde_json::json!({"name": 42})).is_none());
        assert!(decode_product(serde_json::json!({"name": "No id"})).is_none());
    }

    #[test]
    fn pool_errors_map_to_unavailable() {
        assert!(matches!(
            map_sqlx_error("fetch_products", sqlx::Error::PoolTimedOut),
            BackendError::Unavailable(_)
        ));
        assert!(matches!(
            map_sqlx_error("fetch_products", sqlx::Error::RowNotFound),
            BackendError::Query(_)
        ));
    }
}
