pub mod aggregator;
pub mod config;
pub mod discover;
pub mod error;
pub mod events;
pub mod fetch;
pub mod mapping;
pub mod merge;
pub mod sources;
pub mod storage;
pub mod types;

// --- Library API for embedding ---

/// Convenience re-exports for embedders.
pub mod prelude {
    pub use crate::aggregator::{Aggregator, SourceOutcome, SyncReport};
    pub use crate::config::SyncConfig;
    pub use crate::events::{EventBoard, EventEntry};
    pub use crate::sources::Source;
    pub use crate::storage::{CatalogStore, JsonFileStore};
    pub use crate::types::{CatalogEntry, Kind, Link, Media, MediaType, ProjectCard};
}

use anyhow::Result;

use crate::aggregator::{Aggregator, SyncReport};
use crate::config::SyncConfig;

/// Build the configured sources and run one sync into `cfg.output`.
pub async fn sync(cfg: &SyncConfig) -> Result<SyncReport> {
    let agg = Aggregator::from_config(cfg)?;
    if agg.list_sources().is_empty() {
        tracing::warn!("no sources configured; catalog will only be normalized");
    }
    agg.run().await
}
