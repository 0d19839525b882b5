use serde::Deserialize;

use harvest_catalog::{CollectionSummary, PriceBounds, Product, SearchFilters, SortOption, Variant};
use harvest_core::{CollectionId, DomainError, DomainResult, Price};

// -------------------------
// Request DTOs
// -------------------------

/// Raw `/products/search` query string. Values are parsed by hand so that bad
/// input yields a JSON error rather than the extractor's plain-text rejection.
#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
    pub q: Option<String>,
    pub category: Option<String>,
    pub min_price: Option<String>,
    pub max_price: Option<String>,
    pub in_stock: Option<String>,
    /// Comma-separated collection ids.
    pub collections: Option<String>,
    pub sort: Option<String>,
    pub limit: Option<String>,
    pub offset: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    pub query: String,
    pub filters: SearchFilters,
    pub sort: SortOption,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

impl TryFrom<SearchParams> for SearchRequest {
    type Error = DomainError;

    fn try_from(params: SearchParams) -> DomainResult<Self> {
        let mut filters = SearchFilters::default();
        if let Some(category) = params.category.filter(|c| !c.trim().is_empty()) {
            filters = filters.with_category(category.trim());
        }
        filters = filters.with_price_range(
            parse_opt(params.min_price.as_deref(), "min_price", parse_price)?,
            parse_opt(params.max_price.as_deref(), "max_price", parse_price)?,
        );
        if parse_opt(params.in_stock.as_deref(), "in_stock", parse_flag)?.unwrap_or(false) {
            filters = filters.in_stock_only();
        }
        if let Some(ids) = params.collections.as_deref() {
            let ids = parse_collection_ids(ids)?;
            if !ids.is_empty() {
                filters = filters.with_collections(ids);
            }
        }

        Ok(SearchRequest {
            query: params.q.unwrap_or_default(),
            filters,
            sort: params.sort.as_deref().unwrap_or_default().parse::<SortOption>()?,
            limit: parse_opt(params.limit.as_deref(), "limit", parse_count)?,
            offset: parse_opt(params.offset.as_deref(), "offset", parse_count)?,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct PriceBoundsParams {
    pub collections: Option<String>,
}

/// Comma-separated ids; blank segments are skipped.
pub fn parse_collection_ids(raw: &str) -> DomainResult<Vec<CollectionId>> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<CollectionId>())
        .collect()
}

fn parse_opt<T>(
    raw: Option<&str>,
    field: &str,
    parse: impl Fn(&str) -> Option<T>,
) -> DomainResult<Option<T>> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        Some(s) => parse(s)
            .map(Some)
            .ok_or_else(|| DomainError::validation(format!("{field}: invalid value {s:?}"))),
        None => Ok(None),
    }
}

fn parse_price(s: &str) -> Option<Price> {
    s.parse::<f64>().ok().and_then(|v| Price::from_major(v).ok())
}

fn parse_flag(s: &str) -> Option<bool> {
    match s.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => None,
    }
}

fn parse_count(s: &str) -> Option<u32> {
    s.parse().ok()
}

// -------------------------
// JSON mapping helpers
// -------------------------

pub fn variant_to_json(v: &Variant) -> serde_json::Value {
    serde_json::json!({
        "id": v.id.to_string(),
        "title": v.title,
        "kind": v.kind.as_str(),
        "value": v.value,
        "unit": v.unit,
        "price": v.price,
        "stock": v.stock,
        "sku": v.sku,
        "is_active": v.is_active,
    })
}

pub fn collection_to_json(c: &CollectionSummary) -> serde_json::Value {
    serde_json::json!({
        "id": c.id.to_string(),
        "title": c.title,
        "name": c.display_name(),
        "category": c.category,
        "product_count": c.product_count,
        "description": c.description,
        "image_url": c.image_url,
    })
}

pub fn product_to_json(p: &Product) -> serde_json::Value {
    serde_json::json!({
        "id": p.id.to_string(),
        "collection_id": p.collection_id.map(|id| id.to_string()),
        "name": p.name,
        "description": p.description,
        "image_url": p.image_url,
        "is_active": p.is_active,
        "created_at": p.created_at,
        "updated_at": p.updated_at,
        "price_range": p.price_range().map(|(min, max)| serde_json::json!({ "min": min, "max": max })),
        "in_stock": p.any_variant_in_stock(),
        "variants": p.variants.iter().map(variant_to_json).collect::<Vec<_>>(),
        "collection": p.collection.as_ref().map(collection_to_json),
    })
}

pub fn price_bounds_to_json(b: PriceBounds) -> serde_json::Value {
    serde_json::json!({
        "min": b.min,
        "max": b.max,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> SearchParams {
        let mut p = SearchParams::default();
        for (k, v) in pairs {
            let v = Some(v.to_string());
            match *k {
                "q" => p.q = v,
                "category" => p.category = v,
                "min_price" => p.min_price = v,
                "max_price" => p.max_price = v,
                "in_stock" => p.in_stock = v,
                "collections" => p.collections = v,
                "sort" => p.sort = v,
                "limit" => p.limit = v,
                "offset" => p.offset = v,
                other => panic!("unknown param {other}"),
            }
        }
        p
    }

    #[test]
    fn empty_params_are_a_plain_browse() {
        let req = SearchRequest::try_from(SearchParams::default()).unwrap();
        assert_eq!(req.query, "");
        assert_eq!(req.filters, SearchFilters::default());
        assert_eq!(req.sort, SortOption::Relevance);
        assert_eq!((req.limit, req.offset), (None, None));
    }

    #[test]
    fn parses_all_filters() {
        let a = CollectionId::new();
        let b = CollectionId::new();
        let ids = format!("{a}, {b},");
        let req = SearchRequest::try_from(params(&[
            ("q", "apple"),
            ("category", " fruit "),
            ("min_price", "1.5"),
            ("max_price", "10"),
            ("in_stock", "true"),
            ("collections", ids.as_str()),
            ("sort", "price-low"),
            ("limit", "5"),
            ("offset", "10"),
        ]))
        .unwrap();

        assert_eq!(req.filters.category(), Some("fruit"));
        assert_eq!(req.filters.min_price, Some(Price::from_cents(150)));
        assert_eq!(req.filters.max_price, Some(Price::from_cents(1000)));
        assert_eq!(req.filters.in_stock, Some(true));
        assert_eq!(req.filters.collection_ids(), Some(&[a, b][..]));
        assert_eq!(req.sort, SortOption::PriceLow);
        assert_eq!((req.limit, req.offset), (Some(5), Some(10)));
    }

    #[test]
    fn in_stock_false_adds_no_constraint() {
        let req = SearchRequest::try_from(params(&[("in_stock", "false")])).unwrap();
        assert!(!req.filters.has_variant_constraints());
    }

    #[test]
    fn rejects_malformed_values() {
        for (k, v) in [
            ("min_price", "cheap"),
            ("max_price", "-1"),
            ("in_stock", "maybe"),
            ("collections", "not-a-uuid"),
            ("sort", "popularity"),
            ("limit", "-3"),
        ] {
            assert!(SearchRequest::try_from(params(&[(k, v)])).is_err(), "{k}={v} should fail");
        }
    }

    #[test]
    fn product_json_uses_major_units() {
        let collection = CollectionSummary {
            id: CollectionId::new(),
            title: "Fruit Box".into(),
            name: None,
            category: "fruit".into(),
            is_active: true,
            product_count: 1,
            description: None,
            image_url: None,
        };
        let product: Product = serde_json::from_value(serde_json::json!({
            "id": harvest_core::ProductId::new(),
            "collection_id": collection.id,
            "name": "Apple Juice",
            "description": null,
            "image_url": null,
            "is_active": true,
            "created_at": "2024-03-01T09:00:00Z",
            "updated_at": "2024-03-01T09:00:00Z",
            "variants": [],
            "collection": collection,
        }))
        .unwrap();

        let json = product_to_json(&product);
        assert_eq!(json["name"], "Apple Juice");
        assert!(json["price_range"].is_null());
        assert_eq!(json["collection"]["name"], "Fruit Box");

        let bounds = price_bounds_to_json(PriceBounds {
            min: Price::from_cents(450),
            max: Price::from_cents(1299),
        });
        assert_eq!(bounds["min"], 4.5);
        assert_eq!(bounds["max"], 12.99);
    }
}
