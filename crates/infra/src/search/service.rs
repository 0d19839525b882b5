//! Search orchestration.
//!
//! ```text
//! raw query + filters + pagination
//!   ↓
//! 1. normalise into terms (none → plain browse, returned as is)
//!   ↓
//! 2. backend query: active products in active collections, term OR-match on
//!    name/description, category, collection membership, page, exact count
//!   ↓
//! 3. drop products with no active variant satisfying the variant predicate
//!   ↓
//! 4. score against the terms, stable sort descending, strip scores
//! ```
//!
//! `total` is the backend's count for the server-side part of the query. The
//! variant predicate runs after paging, so a page may hold fewer products than
//! `total` suggests.

use serde::Serialize;
use tracing::{Span, debug, instrument};

use harvest_catalog::{
    CollectionSummary, Pagination, PriceBounds, Product, ProductQuery, SearchFilters,
    normalize_terms, rank,
};
use harvest_core::{CollectionId, ProductId};

use crate::backend::{BackendError, CatalogBackend, ProductPage};

use super::sequencer::{RequestSequencer, Ticket};

/// Products of one search, in presentation order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SearchPage {
    pub products: Vec<Product>,
    pub total: u64,
}

impl From<ProductPage> for SearchPage {
    fn from(page: ProductPage) -> Self {
        Self {
            products: page.products,
            total: page.total,
        }
    }
}

/// Catalog search over an injected backend.
#[derive(Debug, Clone)]
pub struct ProductSearch<B> {
    backend: B,
}

impl<B: CatalogBackend> ProductSearch<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    /// Free-text search. A query without terms is a plain browse.
    #[instrument(
        skip(self, filters),
        fields(
            limit = pagination.limit,
            offset = pagination.offset,
            terms = tracing::field::Empty,
            fetched = tracing::field::Empty,
            retained = tracing::field::Empty,
            total = tracing::field::Empty
        ),
        err
    )]
    pub async fn search(
        &self,
        query: &str,
        filters: &SearchFilters,
        pagination: Pagination,
    ) -> Result<SearchPage, BackendError> {
        let terms = normalize_terms(query);
        if terms.is_empty() {
            return self.fetch_all(filters, pagination).await;
        }
        Span::current().record("terms", terms.len());

        let page = self
            .backend
            .fetch_products(&ProductQuery::text(terms.clone(), filters, pagination))
            .await?;
        let fetched = page.products.len();

        let retained = filters.retain_matching(page.products);
        let span = Span::current();
        span.record("fetched", fetched);
        span.record("retained", retained.len());
        span.record("total", page.total);

        let products = rank(retained, &terms)
            .into_iter()
            .map(|scored| scored.product)
            .collect();

        Ok(SearchPage {
            products,
            total: page.total,
        })
    }

    /// Browse with category and collection filters only; no scoring and no
    /// variant predicate.
    #[instrument(skip(self, filters), fields(limit = pagination.limit, offset = pagination.offset), err)]
    pub async fn fetch_all(
        &self,
        filters: &SearchFilters,
        pagination: Pagination,
    ) -> Result<SearchPage, BackendError> {
        let page = self
            .backend
            .fetch_products(&ProductQuery::browse(filters, pagination))
            .await?;
        debug!(fetched = page.products.len(), total = page.total, "browse page fetched");
        Ok(page.into())
    }

    pub async fn collections(&self) -> Result<Vec<CollectionSummary>, BackendError> {
        self.backend.fetch_collections().await
    }

    pub async fn categories(&self) -> Result<Vec<String>, BackendError> {
        self.backend.fetch_categories().await
    }

    pub async fn price_bounds(
        &self,
        collections: Option<&[CollectionId]>,
    ) -> Result<PriceBounds, BackendError> {
        self.backend.fetch_price_bounds(collections).await
    }

    pub async fn product(&self, id: ProductId) -> Result<Option<Product>, BackendError> {
        self.backend.fetch_product_by_id(id).await
    }
}

/// Result of a sequenced search.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchOutcome {
    /// This search is the most recently issued one.
    Current(SearchPage),
    /// A newer search was issued while this one was in flight; its result
    /// must not be presented.
    Superseded,
}

impl SearchOutcome {
    pub fn into_page(self) -> Option<SearchPage> {
        match self {
            SearchOutcome::Current(page) => Some(page),
            SearchOutcome::Superseded => None,
        }
    }
}

/// A stream of searches from one caller (e.g. a search box) where only the
/// last issued request may present its results.
#[derive(Debug)]
pub struct SearchSession<B> {
    search: ProductSearch<B>,
    sequencer: RequestSequencer,
}

impl<B: CatalogBackend> SearchSession<B> {
    pub fn new(search: ProductSearch<B>) -> Self {
        Self {
            search,
            sequencer: RequestSequencer::new(),
        }
    }

    /// Run a search; stale completions (errors included) come back as
    /// [`SearchOutcome::Superseded`].
    pub async fn search(
        &self,
        query: &str,
        filters: &SearchFilters,
        pagination: Pagination,
    ) -> Result<SearchOutcome, BackendError> {
        let ticket = self.sequencer.issue();
        let result = self.search.search(query, filters, pagination).await;
        self.settle(ticket, result)
    }

    fn settle(
        &self,
        ticket: Ticket,
        result: Result<SearchPage, BackendError>,
    ) -> Result<SearchOutcome, BackendError> {
        if !self.sequencer.is_current(ticket) {
            debug!(ticket = ticket.value(), "discarding superseded search result");
            return Ok(SearchOutcome::Superseded);
        }
        result.map(SearchOutcome::Current)
    }
}
