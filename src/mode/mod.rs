//! Mode selection: Dev (live transform) or Prod (precompiled assets).
//!
//! # Design Decisions
//! - The mode is read once at startup and never changes
//! - Each mode is one [`RenderStrategy`] implementation; request handling
//!   never branches on the mode itself
//! - Collaborators (bundler, entry loader) are owned by the strategy and
//!   injected at construction, never reached through globals

pub mod dev;
pub mod prod;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::render::{DispatchError, RenderEntry};

pub use dev::DevStrategy;
pub use prod::ProdStrategy;

/// Operating mode, fixed for the lifetime of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerMode {
    Dev,
    Prod,
}

impl ServerMode {
    /// Map the single "is this a production deployment" flag.
    pub fn from_production_flag(production: bool) -> Self {
        if production {
            ServerMode::Prod
        } else {
            ServerMode::Dev
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ServerMode::Dev => "dev",
            ServerMode::Prod => "prod",
        }
    }
}

impl fmt::Display for ServerMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a mode supplies the head fragment and render entry for a route.
#[async_trait]
pub trait RenderStrategy: Send + Sync {
    fn mode(&self) -> ServerMode;

    /// Inner `<head>` contents for `url`.
    async fn resolve_head(&self, url: &str) -> Result<String, DispatchError>;

    /// The entry that renders `url`.
    async fn resolve_render_entry(&self, url: &str) -> Result<Arc<dyn RenderEntry>, DispatchError>;

    /// Make a failure readable before it is logged and sent. Identity by
    /// default.
    async fn fix_error(&self, error: DispatchError) -> DispatchError {
        error
    }
}
