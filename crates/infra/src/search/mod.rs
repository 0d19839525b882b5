//! Catalog search: query building, post-fetch filtering and relevance ranking
//! over an injected [`CatalogBackend`](crate::backend::CatalogBackend).

pub mod sequencer;
pub mod service;

pub use sequencer::{RequestSequencer, Ticket};
pub use service::{ProductSearch, SearchOutcome, SearchPage, SearchSession};
