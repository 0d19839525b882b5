//! Text-match relevance scoring.
//!
//! The score is purely syntactic and deterministic. Per term:
//!
//! | Match | Points |
//! |---|---|
//! | name equals term | 10 |
//! | else name contains term | 5 |
//! | else name starts with term | 3 |
//! | description contains term | 2 |
//! | each variant SKU containing term | 8 |
//! | collection name or title contains term | 3 |
//!
//! plus a flat 1 once per product when any variant has stock. Scores are not
//! normalised by term count or field length, so longer queries and products with
//! many variants score higher.

use crate::product::Product;

pub const NAME_EXACT: u32 = 10;
pub const NAME_CONTAINS: u32 = 5;
pub const NAME_PREFIX: u32 = 3;
pub const DESCRIPTION_CONTAINS: u32 = 2;
pub const SKU_CONTAINS: u32 = 8;
pub const COLLECTION_CONTAINS: u32 = 3;
pub const IN_STOCK_BONUS: u32 = 1;

/// A product paired with its computed relevance score.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredProduct {
    pub product: Product,
    pub score: u32,
}

/// Score a product against lowercase search terms.
pub fn relevance_score<T: AsRef<str>>(product: &Product, terms: &[T]) -> u32 {
    let name = product.name.to_lowercase();
    let description = product.description.as_deref().map(str::to_lowercase);
    let skus: Vec<String> = product.variants.iter().map(|v| v.sku.to_lowercase()).collect();
    let collection = product
        .collection
        .as_ref()
        .map(|c| (c.display_name().to_lowercase(), c.title.to_lowercase()));

    let mut score: u32 = 0;

    for term in terms {
        let term = term.as_ref();

        if name == term {
            score += NAME_EXACT;
        } else if name.contains(term) {
            score += NAME_CONTAINS;
        } else if name.starts_with(term) {
            score += NAME_PREFIX;
        }

        if description.as_deref().is_some_and(|d| d.contains(term)) {
            score += DESCRIPTION_CONTAINS;
        }

        let sku_hits = skus.iter().filter(|sku| sku.contains(term)).count() as u32;
        score += SKU_CONTAINS * sku_hits;

        if let Some((display, title)) = &collection {
            if display.contains(term) || title.contains(term) {
                score += COLLECTION_CONTAINS;
            }
        }
    }

    if product.any_variant_in_stock() {
        score += IN_STOCK_BONUS;
    }

    score
}

/// Score every product and order by descending score.
///
/// The sort is stable: equal scores keep their input order.
pub fn rank<T: AsRef<str>>(products: Vec<Product>, terms: &[T]) -> Vec<ScoredProduct> {
    let mut scored: Vec<ScoredProduct> = products
        .into_iter()
        .map(|product| {
            let score = relevance_score(&product, terms);
            ScoredProduct { product, score }
        })
        .collect();

    scored.sort_by(|a, b| b.score.cmp(&a.score));
    scored
}
