//! `harvest-core`: storefront foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns).

pub mod error;
pub mod id;
pub mod value_object;

pub use error::{DomainError, DomainResult};
pub use id::{CollectionId, ProductId, VariantId};
pub use value_object::Price;
