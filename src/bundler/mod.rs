//! Dev bundler integration.
//!
//! # Data Flow
//! ```text
//! Dev mode request
//!     → dev_tooling_middleware: bundler.handles(path)?
//!         yes → bundler.serve(request) (HMR client, module sources)
//!         no  → next handler (SSR)
//!
//! SSR (DevStrategy):
//!     transform_head(url, skeleton) → html
//!     load_render_module(server_entry) → RenderEntry
//!     remap_stack(error) on failure
//! ```
//!
//! # Design Decisions
//! - The bundler is a black box behind [`DevBundler`]
//! - One bundler instance per process, owned by the Dev strategy and the
//!   dev-tooling middleware; never global

pub mod sidecar;

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::render::{ModuleError, RenderEntry};

pub use sidecar::{SidecarBundler, SidecarError};

/// Dev-mode transform engine.
#[async_trait]
pub trait DevBundler: Send + Sync {
    /// Run the HTML transform pipeline for `url` over `skeleton`.
    async fn transform_head(&self, url: &str, skeleton: &str) -> Result<String, ModuleError>;

    /// Load `module_path` fresh. May be called on every request.
    async fn load_render_module(&self, module_path: &str) -> Result<Arc<dyn RenderEntry>, ModuleError>;

    /// Best-effort rewrite of the stack to original source locations.
    async fn remap_stack(&self, error: ModuleError) -> ModuleError;

    /// Whether the bundler's own middleware serves `path`.
    fn handles(&self, _path: &str) -> bool {
        false
    }

    /// Serve a request claimed by [`DevBundler::handles`].
    async fn serve(&self, _request: Request<Body>) -> Response {
        StatusCode::NOT_FOUND.into_response()
    }
}

/// Mounted ahead of SSR in Dev mode; lets the bundler answer its own paths.
pub async fn dev_tooling_middleware(
    State(bundler): State<Arc<dyn DevBundler>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if bundler.handles(request.uri().path()) {
        tracing::debug!(path = %request.uri().path(), "Serving from dev bundler");
        return bundler.serve(request).await;
    }
    next.run(request).await
}
