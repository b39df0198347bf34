use anyhow::{Context, Result};
use futures::future::join_all;
use tracing::{info, warn};

use crate::config::SyncConfig;
use crate::merge::{merge, KeyMode};
use crate::sources::{self, Source};
use crate::storage::{CatalogStore, JsonFileStore};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceOutcome {
    Refreshed { source: String, items: usize },
    Failed { source: String, error: String },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub outcomes: Vec<SourceOutcome>,
    pub fresh: usize,
    pub carried: usize,
    pub written: usize,
}

impl SyncReport {
    pub fn failed_sources(&self) -> usize {
        self.outcomes.iter().filter(|o| matches!(o, SourceOutcome::Failed { .. })).count()
    }
}

/// Aggregator owns the sources and the catalog store and runs one sync.
pub struct Aggregator {
    sources: Vec<Box<dyn Source>>,
    store: Box<dyn CatalogStore>,
    key_mode: KeyMode,
}

impl Aggregator {
    pub fn new(sources: Vec<Box<dyn Source>>, store: Box<dyn CatalogStore>, key_mode: KeyMode) -> Self {
        Self { sources, store, key_mode }
    }

    pub fn from_config(cfg: &SyncConfig) -> Result<Self> {
        let sources = sources::from_config(cfg)?;
        let store = Box::new(JsonFileStore::new(cfg.output.clone()));
        Ok(Self::new(sources, store, sources::key_mode(cfg)))
    }

    pub fn list_sources(&self) -> Vec<String> { self.sources.iter().map(|s| s.name().to_string()).collect() }

    /// Scrape all sources, merge with the persisted catalog and write it.
    /// Only a failure to write the catalog is an error.
    pub async fn run(&self) -> Result<SyncReport> {
        let results = join_all(self.sources.iter().map(|s| async move { (s, s.scrape().await) })).await;

        let mut report = SyncReport::default();
        let mut fresh = Vec::new();
        let mut refreshed = Vec::new();
        for (source, res) in results {
            match res {
                Ok(items) => {
                    info!(source = source.name(), items = items.len(), "source refreshed");
                    report.outcomes.push(SourceOutcome::Refreshed { source: source.name().to_string(), items: items.len() });
                    refreshed.push(source.provenance().to_string());
                    fresh.extend(items);
                }
                Err(e) => {
                    warn!(source = source.name(), "source skipped this run: {e:#}");
                    report.outcomes.push(SourceOutcome::Failed { source: source.name().to_string(), error: format!("{e:#}") });
                }
            }
        }

        let existing = match self.store.load().await {
            Ok(entries) => entries,
            Err(e) => {
                warn!("{e}; rebuilding catalog from this run's items");
                Vec::new()
            }
        };

        let merged = merge(fresh, existing, &refreshed, self.key_mode);
        report.fresh = merged.fresh;
        report.carried = merged.carried;
        report.written = merged.entries.len();
        self.store.save(&merged.entries).await.context("catalog could not be written")?;
        Ok(report)
    }
}
