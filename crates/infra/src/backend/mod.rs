//! Catalog backend boundary.
//!
//! This module defines the read-only interface to the hosted record store and
//! its adapters: an in-memory snapshot for tests/dev and a Postgres-backed one.

pub mod in_memory;
pub mod postgres;
pub mod r#trait;

pub use in_memory::InMemoryCatalogBackend;
pub use postgres::PostgresCatalogBackend;
pub use r#trait::{BackendError, CatalogBackend, ProductPage};
