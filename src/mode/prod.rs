//! Prod strategy: empty head, precompiled entry loaded once.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::OnceCell;

use crate::mode::{RenderStrategy, ServerMode};
use crate::observability::metrics;
use crate::render::{DispatchError, EntryLoader, ModuleError, RenderEntry};

/// Serves every route from one precompiled entry.
///
/// The entry is loaded lazily on the first request. Concurrent first
/// requests wait on the same in-flight load. A failed load is not cached,
/// so a later request tries again.
pub struct ProdStrategy {
    loader: Arc<dyn EntryLoader>,
    entry_path: PathBuf,
    entry: OnceCell<Arc<dyn RenderEntry>>,
}

impl ProdStrategy {
    pub fn new(loader: Arc<dyn EntryLoader>, entry_path: impl Into<PathBuf>) -> Self {
        Self {
            loader,
            entry_path: entry_path.into(),
            entry: OnceCell::new(),
        }
    }

    pub fn entry_path(&self) -> &Path {
        &self.entry_path
    }

    /// Whether the entry has been loaded yet.
    pub fn is_loaded(&self) -> bool {
        self.entry.initialized()
    }
}

#[async_trait]
impl RenderStrategy for ProdStrategy {
    fn mode(&self) -> ServerMode {
        ServerMode::Prod
    }

    async fn resolve_head(&self, _url: &str) -> Result<String, DispatchError> {
        // The static build already emits its own head.
        Ok(String::new())
    }

    async fn resolve_render_entry(&self, _url: &str) -> Result<Arc<dyn RenderEntry>, DispatchError> {
        let entry = self
            .entry
            .get_or_try_init(|| async {
                tracing::info!(path = %self.entry_path.display(), "Loading precompiled render entry");
                let entry = self.loader.load(&self.entry_path).await?;
                metrics::record_entry_load(ServerMode::Prod);
                Ok::<_, ModuleError>(entry)
            })
            .await
            .map_err(|source| DispatchError::ModuleResolution {
                module: self.entry_path.display().to_string(),
                source,
            })?;
        Ok(entry.clone())
    }
}
