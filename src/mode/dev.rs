//! Dev strategy: per-request head transform and fresh module load.

use std::sync::Arc;

use async_trait::async_trait;

use crate::bundler::DevBundler;
use crate::mode::{RenderStrategy, ServerMode};
use crate::observability::metrics;
use crate::render::{extract_head_fragment, DispatchError, RenderEntry, SKELETON_HTML};

/// Renders through the dev bundler. Nothing is cached here; the bundler
/// owns any memoisation of its module graph.
pub struct DevStrategy {
    bundler: Arc<dyn DevBundler>,
    server_entry: String,
    skeleton: String,
}

impl DevStrategy {
    /// `server_entry` is the module path the bundler loads for every
    /// render, e.g. `/src/entry-server.tsx`.
    pub fn new(bundler: Arc<dyn DevBundler>, server_entry: impl Into<String>) -> Self {
        Self {
            bundler,
            server_entry: server_entry.into(),
            skeleton: SKELETON_HTML.to_string(),
        }
    }

    /// Override the skeleton document passed to the head transform.
    pub fn with_skeleton(mut self, skeleton: impl Into<String>) -> Self {
        self.skeleton = skeleton.into();
        self
    }

    pub fn bundler(&self) -> &Arc<dyn DevBundler> {
        &self.bundler
    }
}

#[async_trait]
impl RenderStrategy for DevStrategy {
    fn mode(&self) -> ServerMode {
        ServerMode::Dev
    }

    async fn resolve_head(&self, url: &str) -> Result<String, DispatchError> {
        let html = self
            .bundler
            .transform_head(url, &self.skeleton)
            .await
            .map_err(DispatchError::Transform)?;
        Ok(extract_head_fragment(&html).to_string())
    }

    async fn resolve_render_entry(&self, _url: &str) -> Result<Arc<dyn RenderEntry>, DispatchError> {
        let entry = self
            .bundler
            .load_render_module(&self.server_entry)
            .await
            .map_err(|source| DispatchError::ModuleResolution {
                module: self.server_entry.clone(),
                source,
            })?;
        metrics::record_entry_load(ServerMode::Dev);
        Ok(entry)
    }

    async fn fix_error(&self, error: DispatchError) -> DispatchError {
        match error {
            DispatchError::Transform(e) => DispatchError::Transform(self.bundler.remap_stack(e).await),
            DispatchError::ModuleResolution { module, source } => DispatchError::ModuleResolution {
                module,
                source: self.bundler.remap_stack(source).await,
            },
            DispatchError::Render(e) => DispatchError::Render(self.bundler.remap_stack(e).await),
        }
    }
}
