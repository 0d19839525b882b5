//! Free-text normalisation and the description of a remote product query.

use serde::{Deserialize, Serialize};

use harvest_core::CollectionId;

use crate::filter::{Pagination, SearchFilters};

/// Trim, lowercase and split a raw query into non-empty search terms.
pub fn normalize_terms(query: &str) -> Vec<String> {
    query
        .trim()
        .to_lowercase()
        .split_whitespace()
        .map(str::to_owned)
        .collect()
}

/// What the backend is asked to evaluate server-side.
///
/// Backends restrict results to active products that belong to an active
/// collection. With `terms` present, a product is a candidate when ANY term is
/// a case-insensitive substring of its name OR its description. `category`
/// compares against the owning collection's category; `collections` restricts
/// to membership in the listed collections.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductQuery {
    pub terms: Vec<String>,
    pub category: Option<String>,
    pub collections: Option<Vec<CollectionId>>,
    pub pagination: Pagination,
}

impl ProductQuery {
    /// Browse query: structured filters only.
    pub fn browse(filters: &SearchFilters, pagination: Pagination) -> Self {
        Self {
            terms: Vec::new(),
            category: filters.category().map(str::to_owned),
            collections: filters.collection_ids().map(<[CollectionId]>::to_vec),
            pagination,
        }
    }

    /// Text query: structured filters plus OR-combined term matches.
    pub fn text(terms: Vec<String>, filters: &SearchFilters, pagination: Pagination) -> Self {
        Self {
            terms,
            ..Self::browse(filters, pagination)
        }
    }
}
