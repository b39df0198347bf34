use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::info;

use crate::error::CatalogError;
use crate::types::CatalogEntry;

/// Where the merged catalog lives between runs.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Previously persisted entries. A missing catalog is an empty one.
    async fn load(&self) -> Result<Vec<CatalogEntry>, CatalogError>;
    /// Replace the catalog. Either fully succeeds or leaves the old one intact.
    async fn save(&self, entries: &[CatalogEntry]) -> Result<()>;
}

/// The catalog as a 2-space-indented JSON array on disk.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self { Self { path: path.into() } }
    pub fn path(&self) -> &Path { &self.path }

    fn temp_path(&self) -> PathBuf {
        let name = self.path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_else(|| "catalog.json".into());
        self.path.with_file_name(format!(".{name}.{}.tmp", std::process::id()))
    }

    async fn replace_with(&self, tmp: &Path, body: String) -> Result<()> {
        tokio::fs::write(tmp, body)
            .await
            .with_context(|| format!("failed to write temp catalog: {}", tmp.display()))?;
        tokio::fs::rename(tmp, &self.path)
            .await
            .with_context(|| format!("failed to replace catalog: {}", self.path.display()))
    }
}

#[async_trait]
impl CatalogStore for JsonFileStore {
    async fn load(&self) -> Result<Vec<CatalogEntry>, CatalogError> {
        let display = self.path.display().to_string();
        let text = match tokio::fs::read_to_string(&self.path).await {
            Ok(t) => t,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => return Err(CatalogError::Io { path: display, source }),
        };
        parse_catalog(&text).map_err(|source| CatalogError::Parse { path: display, source })
    }

    async fn save(&self, entries: &[CatalogEntry]) -> Result<()> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(dir)
                .await
                .with_context(|| format!("failed to create catalog directory: {}", dir.display()))?;
        }
        let body = to_json(entries)?;
        let tmp = self.temp_path();
        if let Err(e) = self.replace_with(&tmp, body).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e);
        }
        info!(count = entries.len(), path = %self.path.display(), "wrote catalog");
        Ok(())
    }
}

pub fn to_json(entries: &[CatalogEntry]) -> serde_json::Result<String> {
    let mut body = serde_json::to_string_pretty(entries)?;
    body.push('\n');
    Ok(body)
}

/// Decode a catalog array. Elements are kept as found; only the top level
/// has to be an array.
pub fn parse_catalog(text: &str) -> serde_json::Result<Vec<CatalogEntry>> {
    serde_json::from_str(text)
}
