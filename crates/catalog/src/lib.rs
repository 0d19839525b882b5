//! Catalog search domain module.
//!
//! This crate contains the storefront's catalog read model and the rules for
//! searching it, implemented purely as deterministic logic (no IO, no HTTP, no
//! storage):
//!
//! - `product`: Product / Variant / Collection snapshots as returned by the backend
//! - `record`: loosely-typed backend rows and their validation into typed snapshots
//! - `filter`: structured filters, pagination, the per-variant retention predicate
//! - `query`: free-text normalisation and the remote query description
//! - `relevance`: text-match scoring and ranking
//! - `sort`: display re-ordering

pub mod filter;
pub mod product;
pub mod query;
pub mod record;
pub mod relevance;
pub mod sort;

pub use filter::{Pagination, PriceBounds, SearchFilters};
pub use product::{CollectionSummary, Product, Variant, VariantKind};
pub use query::{ProductQuery, normalize_terms};
pub use record::{CollectionRecord, ProductRecord, VariantRecord};
pub use relevance::{ScoredProduct, rank, relevance_score};
pub use sort::{SortOption, sort_products};

#[cfg(any(test, feature = "test-support"))]
pub mod fixtures;
