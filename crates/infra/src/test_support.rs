//! Builders shared by the infra unit tests, on top of the catalog fixtures.

pub(crate) use harvest_catalog::fixtures::{at_day, collection, variant};

use harvest_catalog::{CollectionSummary, Product};

/// Active product in `collection`, created on March `day`, with one active
/// variant per `(sku, price_cents, stock)` row.
pub(crate) fn product_in(
    collection: &CollectionSummary,
    name: &str,
    day: u32,
    variants: &[(&str, u64, u32)],
) -> Product {
    let mut p = harvest_catalog::fixtures::product(name);
    p.collection_id = Some(collection.id);
    p.collection = Some(collection.clone());
    p.created_at = at_day(day);
    p.updated_at = at_day(day);
    p.variants = variants
        .iter()
        .map(|(sku, cents, stock)| variant(&p, sku, *cents, *stock))
        .collect();
    p
}
