//! Infrastructure layer: catalog backends, search orchestration, configuration.

pub mod backend;
pub mod config;
pub mod search;

#[cfg(test)]
mod test_support;

pub use backend::{BackendError, CatalogBackend, InMemoryCatalogBackend, PostgresCatalogBackend};
pub use config::{ConfigError, DatabaseConfig, StorefrontConfig};
pub use search::{ProductSearch, SearchOutcome, SearchPage, SearchSession};
