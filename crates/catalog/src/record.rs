//! Loosely-typed backend rows and their validation into catalog snapshots.
//!
//! The hosted backend returns JSON documents whose fields may be absent or null.
//! Every field is optional here; `TryFrom` enforces which ones a snapshot
//! requires and fails with `DomainError::Validation` instead of letting undefined
//! values flow into search and sorting.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use harvest_core::{CollectionId, DomainError, Price, ProductId, VariantId};

use crate::product::{CollectionSummary, Product, Variant, VariantKind};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VariantRecord {
    pub id: Option<Uuid>,
    pub product_id: Option<Uuid>,
    pub title: Option<String>,
    pub kind: Option<String>,
    pub value: Option<f64>,
    pub unit: Option<String>,
    pub price: Option<f64>,
    pub stock: Option<i64>,
    pub sku: Option<String>,
    pub is_active: Option<bool>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectionRecord {
    pub id: Option<Uuid>,
    pub title: Option<String>,
    pub name: Option<String>,
    pub category: Option<String>,
    pub is_active: Option<bool>,
    pub product_count: Option<i64>,
    pub description: Option<String>,
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProductRecord {
    pub id: Option<Uuid>,
    pub collection_id: Option<Uuid>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub is_active: Option<bool>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub variants: Option<Vec<VariantRecord>>,
    #[serde(alias = "collections")]
    pub collection: Option<CollectionRecord>,
}

fn required<T>(value: Option<T>, entity: &str, field: &str) -> Result<T, DomainError> {
    value.ok_or_else(|| DomainError::missing(entity, field))
}

fn required_text(value: Option<String>, entity: &str, field: &str) -> Result<String, DomainError> {
    match value {
        Some(s) if !s.trim().is_empty() => Ok(s),
        _ => Err(DomainError::missing(entity, field)),
    }
}

impl TryFrom<VariantRecord> for Variant {
    type Error = DomainError;

    fn try_from(r: VariantRecord) -> Result<Self, Self::Error> {
        let id = required(r.id, "variant", "id")?;
        let product_id = required(r.product_id, "variant", "product_id")?;
        let title = required_text(r.title, "variant", "title")?;
        let kind_raw = required(r.kind, "variant", "kind")?;
        let kind = VariantKind::parse(&kind_raw)
            .ok_or_else(|| DomainError::validation(format!("variant.kind '{kind_raw}' is unknown")))?;
        let price = Price::from_major(required(r.price, "variant", "price")?)?;
        let sku = required(r.sku, "variant", "sku")?;
        let created_at = required(r.created_at, "variant", "created_at")?;

        // Negative stock is a backend bookkeeping artefact; treat as sold out.
        let stock = r.stock.unwrap_or(0).clamp(0, i64::from(u32::MAX)) as u32;

        Ok(Variant {
            id: VariantId::from_uuid(id),
            product_id: ProductId::from_uuid(product_id),
            title,
            kind,
            value: r.value,
            unit: r.unit,
            price,
            stock,
            sku,
            is_active: r.is_active.unwrap_or(false),
            created_at,
            updated_at: r.updated_at.unwrap_or(created_at),
        })
    }
}

impl TryFrom<CollectionRecord> for CollectionSummary {
    type Error = DomainError;

    fn try_from(r: CollectionRecord) -> Result<Self, Self::Error> {
        Ok(CollectionSummary {
            id: CollectionId::from_uuid(required(r.id, "collection", "id")?),
            title: required_text(r.title, "collection", "title")?,
            name: r.name,
            category: required(r.category, "collection", "category")?,
            is_active: r.is_active.unwrap_or(false),
            product_count: r.product_count.unwrap_or(0).clamp(0, i64::from(u32::MAX)) as u32,
            description: r.description,
            image_url: r.image_url,
        })
    }
}

impl TryFrom<ProductRecord> for Product {
    type Error = DomainError;

    fn try_from(r: ProductRecord) -> Result<Self, Self::Error> {
        let id = ProductId::from_uuid(required(r.id, "product", "id")?);
        let name = required_text(r.name, "product", "name")?;
        let created_at = required(r.created_at, "product", "created_at")?;

        let variants = r
            .variants
            .unwrap_or_default()
            .into_iter()
            .map(Variant::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        if let Some(v) = variants.iter().find(|v| v.product_id != id) {
            return Err(DomainError::invariant(format!(
                "variant {} belongs to product {}, not {}",
                v.id, v.product_id, id
            )));
        }

        let collection = r.collection.map(CollectionSummary::try_from).transpose()?;
        let collection_id = r
            .collection_id
            .map(CollectionId::from_uuid)
            .or_else(|| collection.as_ref().map(|c| c.id));

        Ok(Product {
            id,
            collection_id,
            name,
            description: r.description,
            image_url: r.image_url,
            is_active: r.is_active.unwrap_or(false),
            created_at,
            updated_at: r.updated_at.unwrap_or(created_at),
            variants,
            collection,
        })
    }
}

impl From<&Variant> for VariantRecord {
    fn from(v: &Variant) -> Self {
        VariantRecord {
            id: Some(*v.id.as_uuid()),
            product_id: Some(*v.product_id.as_uuid()),
            title: Some(v.title.clone()),
            kind: Some(v.kind.as_str().to_string()),
            value: v.value,
            unit: v.unit.clone(),
            price: Some(v.price.as_major()),
            stock: Some(i64::from(v.stock)),
            sku: Some(v.sku.clone()),
            is_active: Some(v.is_active),
            created_at: Some(v.created_at),
            updated_at: Some(v.updated_at),
        }
    }
}

impl From<&CollectionSummary> for CollectionRecord {
    fn from(c: &CollectionSummary) -> Self {
        CollectionRecord {
            id: Some(*c.id.as_uuid()),
            title: Some(c.title.clone()),
            name: c.name.clone(),
            category: Some(c.category.clone()),
            is_active: Some(c.is_active),
            product_count: Some(i64::from(c.product_count)),
            description: c.description.clone(),
            image_url: c.image_url.clone(),
        }
    }
}

impl From<&Product> for ProductRecord {
    fn from(p: &Product) -> Self {
        ProductRecord {
            id: Some(*p.id.as_uuid()),
            collection_id: p.collection_id.map(Uuid::from),
            name: Some(p.name.clone()),
            description: p.description.clone(),
            image_url: p.image_url.clone(),
            is_active: Some(p.is_active),
            created_at: Some(p.created_at),
            updated_at: Some(p.updated_at),
            variants: Some(p.variants.iter().map(VariantRecord::from).collect()),
            collection: p.collection.as_ref().map(CollectionRecord::from),
        }
    }
}
