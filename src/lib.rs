// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod api;
pub mod collector;
pub mod config;
pub mod digest;
pub mod ingest;
pub mod lang;
pub mod metrics;
pub mod store;
pub mod translate;

pub use crate::api::router;
pub use crate::collector::{Collector, CollectorHandle, CollectorSettings, CycleReport};
pub use crate::store::NewsStore;

use crate::config::AppConfig;
use crate::store::StoreError;

/// Open the configured store, falling back to `db_fallback_path` when the primary is unusable.
pub async fn open_store(cfg: &AppConfig) -> Result<NewsStore, StoreError> {
    NewsStore::open_with_fallback(&cfg.db_path, &cfg.db_fallback_path).await
}
