//! Test builders for catalog snapshots.
//!
//! Compiled for this crate's tests and, behind the `test-support` feature, for
//! downstream crates' tests.

use chrono::{DateTime, TimeZone, Utc};

use harvest_core::{CollectionId, Price, ProductId, VariantId};

use crate::product::{CollectionSummary, Product, Variant, VariantKind};

/// 09:00 UTC on the given day of March 2024.
pub fn at_day(day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, day, 9, 0, 0)
        .single()
        .unwrap_or_default()
}

pub fn collection(title: &str, category: &str) -> CollectionSummary {
    CollectionSummary {
        id: CollectionId::new(),
        title: title.to_string(),
        name: None,
        category: category.to_string(),
        is_active: true,
        product_count: 0,
        description: None,
        image_url: None,
    }
}

pub fn product(name: &str) -> Product {
    Product {
        id: ProductId::new(),
        collection_id: None,
        name: name.to_string(),
        description: None,
        image_url: None,
        is_active: true,
        created_at: at_day(1),
        updated_at: at_day(1),
        variants: Vec::new(),
        collection: None,
    }
}

pub fn variant(product: &Product, sku: &str, price_cents: u64, stock: u32) -> Variant {
    Variant {
        id: VariantId::new(),
        product_id: product.id,
        title: "Default".to_string(),
        kind: VariantKind::Simple,
        value: None,
        unit: None,
        price: Price::from_cents(price_cents),
        stock,
        sku: sku.to_string(),
        is_active: true,
        created_at: product.created_at,
        updated_at: product.updated_at,
    }
}

/// A product with a single active variant.
pub fn priced(name: &str, sku: &str, price_cents: u64, stock: u32) -> Product {
    let mut p = product(name);
    p.variants = vec![variant(&p, sku, price_cents, stock)];
    p
}
