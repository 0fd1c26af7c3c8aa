//! Render pipeline subsystem.
//!
//! # Data Flow
//! ```text
//! ApplicationRoute(url)
//!     → RenderStrategy::resolve_head (Dev: bundler transform, Prod: "")
//!     → RenderStrategy::resolve_render_entry (Dev: fresh load, Prod: cached)
//!     → RenderEntry::render(RenderContext { request, response, head })
//!     → ResponseWriter → axum Response
//!
//! On any failure:
//!     → RenderStrategy::fix_error (Dev: remap stack)
//!     → 500 + stack text
//! ```
//!
//! # Design Decisions
//! - Render entries are trait objects so Dev and Prod can hand out
//!   differently-sourced entries through one interface
//! - No retries: every failure is terminal for the current request

pub mod context;
pub mod dispatcher;
pub mod error;
pub mod head;
pub mod node;
pub mod wire;

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;

pub use context::{IncomingRequest, RenderContext, ResponseWriter};
pub use dispatcher::{DispatchOutcome, Dispatcher};
pub use error::{DispatchError, ModuleError};
pub use head::{extract_head_fragment, SKELETON_HTML};

/// A callable unit that produces the HTTP response for a route.
#[async_trait]
pub trait RenderEntry: Send + Sync {
    /// Write the response for `ctx.request` into `ctx.response`.
    ///
    /// Implementations may write part of the response before failing.
    async fn render(&self, ctx: RenderContext<'_>) -> Result<(), ModuleError>;
}

/// Loads a precompiled render entry from disk.
#[async_trait]
pub trait EntryLoader: Send + Sync {
    async fn load(&self, path: &Path) -> Result<Arc<dyn RenderEntry>, ModuleError>;
}
