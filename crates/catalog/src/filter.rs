//! Structured search filters, pagination and the per-variant retention predicate.

use serde::{Deserialize, Serialize};

use harvest_core::{CollectionId, Price};

use crate::product::{Product, Variant};

/// Default page size for browse and search.
pub const DEFAULT_LIMIT: u32 = 20;

/// Structured filters applied alongside (or instead of) free text.
///
/// `category` and `collections` are evaluated by the backend. The variant
/// constraints (`in_stock`, `min_price`, `max_price`) cannot be expressed there
/// and are checked after the fetch, see [`SearchFilters::retains`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchFilters {
    pub category: Option<String>,
    pub min_price: Option<Price>,
    pub max_price: Option<Price>,
    pub in_stock: Option<bool>,
    pub collections: Option<Vec<CollectionId>>,
}

impl SearchFilters {
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_price_range(mut self, min: Option<Price>, max: Option<Price>) -> Self {
        self.min_price = min;
        self.max_price = max;
        self
    }

    pub fn in_stock_only(mut self) -> Self {
        self.in_stock = Some(true);
        self
    }

    pub fn with_collections(mut self, ids: impl IntoIterator<Item = CollectionId>) -> Self {
        self.collections = Some(ids.into_iter().collect());
        self
    }

    /// Collection restriction, if any. An empty list means "no restriction".
    pub fn collection_ids(&self) -> Option<&[CollectionId]> {
        self.collections.as_deref().filter(|ids| !ids.is_empty())
    }

    /// Category restriction, if any. Blank strings are ignored.
    pub fn category(&self) -> Option<&str> {
        self.category.as_deref().map(str::trim).filter(|c| !c.is_empty())
    }

    /// True when at least one constraint must be checked per variant.
    pub fn has_variant_constraints(&self) -> bool {
        self.in_stock == Some(true) || self.min_price.is_some() || self.max_price.is_some()
    }

    /// All active variant constraints hold for this variant.
    ///
    /// Inactive variants never match, whatever their stock or price.
    pub fn variant_matches(&self, variant: &Variant) -> bool {
        if !variant.is_active {
            return false;
        }
        if self.in_stock == Some(true) && !variant.in_stock() {
            return false;
        }
        if self.min_price.is_some_and(|min| variant.price < min) {
            return false;
        }
        if self.max_price.is_some_and(|max| variant.price > max) {
            return false;
        }
        true
    }

    /// Whether a fetched product survives the client-side predicate.
    ///
    /// Constraints are ANDed per variant: one active variant has to satisfy all of
    /// them at once. Without variant constraints every product is kept.
    pub fn retains(&self, product: &Product) -> bool {
        !self.has_variant_constraints() || product.variants.iter().any(|v| self.variant_matches(v))
    }

    /// Apply [`SearchFilters::retains`] to a fetched page, preserving order.
    pub fn retain_matching(&self, products: Vec<Product>) -> Vec<Product> {
        if !self.has_variant_constraints() {
            return products;
        }
        products.into_iter().filter(|p| self.retains(p)).collect()
    }
}

/// Offset pagination for catalog queries.
///
/// Deserialisation goes through [`Pagination::new`], so a zero limit is raised to 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawPagination")]
pub struct Pagination {
    /// Maximum number of products to return (always > 0).
    pub limit: u32,
    /// Offset for pagination (0-based).
    pub offset: u32,
}

#[derive(Deserialize)]
struct RawPagination {
    limit: Option<u32>,
    offset: Option<u32>,
}

impl From<RawPagination> for Pagination {
    fn from(raw: RawPagination) -> Self {
        Pagination::new(raw.limit, raw.offset)
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIMIT,
            offset: 0,
        }
    }
}

impl Pagination {
    pub fn new(limit: Option<u32>, offset: Option<u32>) -> Self {
        Self {
            limit: limit.unwrap_or(DEFAULT_LIMIT).max(1),
            offset: offset.unwrap_or(0),
        }
    }

    /// Cap the page size (caller-supplied limits are not trusted).
    pub fn capped(self, max_limit: u32) -> Self {
        Self {
            limit: self.limit.clamp(1, max_limit.max(1)),
            ..self
        }
    }
}

/// Lowest and highest active variant price in a scope.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceBounds {
    pub min: Price,
    pub max: Price,
}

impl PriceBounds {
    /// Bounds over a set of prices; zero/zero when empty.
    pub fn from_prices(prices: impl IntoIterator<Item = Price>) -> Self {
        let mut iter = prices.into_iter();
        let Some(first) = iter.next() else {
            return Self::default();
        };
        iter.fold(Self { min: first, max: first }, |b, p| Self {
            min: b.min.min(p),
            max: b.max.max(p),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{priced, product, variant};

    #[test]
    fn in_stock_filter_keeps_only_stocked_products() {
        let juice = priced("Apple Juice", "AJ-1", 450, 5);
        let green = priced("Green Apple", "GA-1", 120, 0);
        let filters = SearchFilters::default().in_stock_only();

        let kept = filters.retain_matching(vec![juice.clone(), green]);
        assert_eq!(kept, vec![juice]);
    }

    #[test]
    fn all_inactive_variants_are_excluded_under_any_variant_filter() {
        let mut p = product("Dormant Box");
        p.variants = vec![Variant {
            is_active: false,
            ..variant(&p, "DB-1", 1000, 50)
        }];

        for filters in [
            SearchFilters::default().in_stock_only(),
            SearchFilters::default().with_price_range(Some(Price::ZERO), None),
            SearchFilters::default().with_price_range(None, Some(Price::from_cents(1_000_000))),
        ] {
            assert!(!filters.retains(&p), "{filters:?} should drop {p:?}");
        }
    }

    #[test]
    fn constraints_must_hold_on_the_same_variant() {
        let mut p = product("Potatoes");
        p.variants = vec![
            // cheap but sold out
            variant(&p, "PT-1", 200, 0),
            // stocked but expensive
            variant(&p, "PT-5", 900, 4),
        ];

        let cheap_in_stock = SearchFilters::default()
            .in_stock_only()
            .with_price_range(None, Some(Price::from_cents(500)));
        assert!(!cheap_in_stock.retains(&p));

        let any_in_stock = SearchFilters::default().in_stock_only();
        assert!(any_in_stock.retains(&p));
    }

    #[test]
    fn price_bounds_are_inclusive() {
        let p = priced("Leeks", "LK-1", 500, 1);
        let exact = SearchFilters::default()
            .with_price_range(Some(Price::from_cents(500)), Some(Price::from_cents(500)));
        assert!(exact.retains(&p));
    }

    #[test]
    fn no_variant_constraints_keeps_everything() {
        let bare = product("Coming Soon");
        let filters = SearchFilters {
            in_stock: Some(false),
            ..SearchFilters::default().with_category("veg")
        };
        assert!(!filters.has_variant_constraints());
        assert!(filters.retains(&bare));
    }

    #[test]
    fn blank_category_and_empty_collections_are_ignored() {
        let filters = SearchFilters {
            category: Some("  ".to_string()),
            collections: Some(vec![]),
            ..SearchFilters::default()
        };
        assert_eq!(filters.category(), None);
        assert_eq!(filters.collection_ids(), None);
    }

    #[test]
    fn pagination_defaults_and_caps() {
        assert_eq!(Pagination::new(None, None), Pagination { limit: 20, offset: 0 });
        assert_eq!(Pagination::new(Some(0), Some(3)).limit, 1);
        assert_eq!(Pagination::new(Some(500), None).capped(100).limit, 100);
        assert_eq!(Pagination { limit: 0, offset: 0 }.capped(100).limit, 1);
    }

    #[test]
    fn deserialized_pagination_keeps_limit_positive() {
        let p: Pagination = serde_json::from_str(r#"{"limit":0,"offset":4}"#).unwrap();
        assert_eq!(p, Pagination { limit: 1, offset: 4 });

        let p: Pagination = serde_json::from_str("{}").unwrap();
        assert_eq!(p, Pagination::default());
    }

    #[test]
    fn price_bounds_from_prices() {
        assert_eq!(PriceBounds::from_prices(Vec::<Price>::new()), PriceBounds::default());
        let b = PriceBounds::from_prices([300, 120, 950].map(Price::from_cents));
        assert_eq!(b.min, Price::from_cents(120));
        assert_eq!(b.max, Price::from_cents(950));
    }
}
