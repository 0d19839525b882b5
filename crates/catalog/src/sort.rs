//! Display re-ordering of fetched products.

use core::cmp::Ordering;
use core::str::FromStr;

use serde::{Deserialize, Serialize};
use unicode_normalization::{UnicodeNormalization, char::is_combining_mark};

use harvest_core::{DomainError, Price};

use crate::product::Product;

/// User-selectable display order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SortOption {
    /// Keep the incoming (relevance-ranked) order.
    #[default]
    Relevance,
    /// Ascending by lowest active variant price.
    PriceLow,
    /// Descending by highest active variant price.
    PriceHigh,
    /// Most recently created first.
    Newest,
    /// Alphabetical by name.
    Name,
}

impl SortOption {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOption::Relevance => "relevance",
            SortOption::PriceLow => "price-low",
            SortOption::PriceHigh => "price-high",
            SortOption::Newest => "newest",
            SortOption::Name => "name",
        }
    }
}

impl FromStr for SortOption {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "relevance" => Ok(SortOption::Relevance),
            "price-low" | "price_low" => Ok(SortOption::PriceLow),
            "price-high" | "price_high" => Ok(SortOption::PriceHigh),
            "newest" => Ok(SortOption::Newest),
            "name" => Ok(SortOption::Name),
            other => Err(DomainError::validation(format!(
                "sort must be one of: relevance, price-low, price-high, newest, name (got '{other}')"
            ))),
        }
    }
}

/// Return a re-ordered copy of `products`; the input slice is left untouched.
///
/// Every order is stable. Products without an active variant have no price and
/// sort after all priced products for both price orders.
pub fn sort_products(products: &[Product], sort: SortOption) -> Vec<Product> {
    let mut sorted = products.to_vec();

    match sort {
        SortOption::Relevance => {}
        SortOption::PriceLow => {
            sorted.sort_by(|a, b| missing_last(a.min_active_price(), b.min_active_price(), false));
        }
        SortOption::PriceHigh => {
            sorted.sort_by(|a, b| missing_last(a.max_active_price(), b.max_active_price(), true));
        }
        SortOption::Newest => sorted.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
        SortOption::Name => sorted.sort_by_cached_key(|p| (collation_key(&p.name), p.name.clone())),
    }

    sorted
}

fn missing_last(a: Option<Price>, b: Option<Price>, descending: bool) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) if descending => b.cmp(&a),
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Primary collation key: diacritics stripped, case folded.
///
/// "Épinard" sorts next to "epinard" rather than after "zucchini".
fn collation_key(name: &str) -> String {
    name.nfd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
        .collect()
}
