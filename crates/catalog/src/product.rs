use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use harvest_core::{CollectionId, Price, ProductId, VariantId};

/// How a variant is measured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VariantKind {
    Simple,
    /// Sold by volume (e.g. 500 ml of juice).
    Volume,
    /// Sold by weight (e.g. 1 kg of apples).
    Weight,
    /// A product bundled inside a box.
    SubProduct,
}

impl VariantKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            VariantKind::Simple => "simple",
            VariantKind::Volume => "volume",
            VariantKind::Weight => "weight",
            VariantKind::SubProduct => "sub_product",
        }
    }

    /// Parse the backend's kind tag. Accepts `sub-product` as well as `sub_product`.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "simple" => Some(VariantKind::Simple),
            "volume" => Some(VariantKind::Volume),
            "weight" => Some(VariantKind::Weight),
            "sub_product" | "sub-product" | "subproduct" => Some(VariantKind::SubProduct),
            _ => None,
        }
    }
}

/// A purchasable configuration of a product (size, weight option, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variant {
    pub id: VariantId,
    pub product_id: ProductId,
    pub title: String,
    pub kind: VariantKind,
    pub value: Option<f64>,
    pub unit: Option<String>,
    pub price: Price,
    /// Units on hand. Negative backend values are clamped to zero.
    pub stock: u32,
    pub sku: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Variant {
    pub fn in_stock(&self) -> bool {
        self.stock > 0
    }
}

/// Collection summary embedded in product snapshots and listed for browsing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionSummary {
    pub id: CollectionId,
    pub title: String,
    pub name: Option<String>,
    pub category: String,
    pub is_active: bool,
    pub product_count: u32,
    pub description: Option<String>,
    pub image_url: Option<String>,
}

impl CollectionSummary {
    /// Name shown to shoppers; falls back to the title when unset.
    pub fn display_name(&self) -> &str {
        match self.name.as_deref() {
            Some(name) if !name.trim().is_empty() => name,
            _ => &self.title,
        }
    }
}

/// Read-only product snapshot as returned by the catalog backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub collection_id: Option<CollectionId>,
    pub name: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub variants: Vec<Variant>,
    pub collection: Option<CollectionSummary>,
}

impl Product {
    pub fn active_variants(&self) -> impl Iterator<Item = &Variant> {
        self.variants.iter().filter(|v| v.is_active)
    }

    pub fn has_active_variant(&self) -> bool {
        self.active_variants().next().is_some()
    }

    /// Lowest price among active variants.
    pub fn min_active_price(&self) -> Option<Price> {
        self.active_variants().map(|v| v.price).min()
    }

    /// Highest price among active variants.
    pub fn max_active_price(&self) -> Option<Price> {
        self.active_variants().map(|v| v.price).max()
    }

    /// Displayed price range, derived from active variants only.
    ///
    /// `None` when the product has no active variant; callers must guard.
    pub fn price_range(&self) -> Option<(Price, Price)> {
        Some((self.min_active_price()?, self.max_active_price()?))
    }

    /// True when any variant has stock, regardless of its active flag.
    pub fn any_variant_in_stock(&self) -> bool {
        self.variants.iter().any(Variant::in_stock)
    }
}
