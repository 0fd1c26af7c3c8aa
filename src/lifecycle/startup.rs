//! Startup orchestration.
//!
//! # Responsibilities
//! - Select the mode from the validated config (once)
//! - Build the mode's collaborators, or take injected ones
//! - Assemble the HTTP server
//!
//! # Design Decisions
//! - Collaborators are injectable so test harnesses can construct and tear
//!   down a server without a real bundler or Node.js
//! - A missing Prod build directory is logged, not fatal

use std::sync::Arc;

use thiserror::Error;

use crate::bundler::{DevBundler, SidecarBundler, SidecarError};
use crate::config::ServerConfig;
use crate::http::middleware::{inspect_dist_dir, StaticAssets};
use crate::http::{FrontHandler, HttpServer, ModeRuntime};
use crate::mode::{DevStrategy, ProdStrategy, ServerMode};
use crate::render::node::NodeEntryLoader;
use crate::render::EntryLoader;

/// Overrides for the default external collaborators.
#[derive(Clone, Default)]
pub struct Collaborators {
    /// Dev bundler; defaults to the HTTP sidecar from `dev.bundler_url`.
    pub bundler: Option<Arc<dyn DevBundler>>,
    /// Prod entry loader; defaults to Node.js.
    pub entry_loader: Option<Arc<dyn EntryLoader>>,
}

/// Error type for startup.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("dev bundler: {0}")]
    Bundler(#[from] SidecarError),
}

/// Build the strategy and front handler for the configured mode.
pub async fn select_mode(
    config: &ServerConfig,
    collaborators: Collaborators,
) -> Result<ModeRuntime, StartupError> {
    let mode = config.mode();
    tracing::info!(mode = %mode, "Server mode selected");

    match mode {
        ServerMode::Dev => {
            let bundler: Arc<dyn DevBundler> = match collaborators.bundler {
                Some(bundler) => bundler,
                None => {
                    tracing::info!(url = %config.dev.bundler_url, "Using dev bundler sidecar");
                    Arc::new(SidecarBundler::new(
                        &config.dev.bundler_url,
                        config.dev.reserved_prefixes.clone(),
                    )?)
                }
            };

            let strategy = DevStrategy::new(bundler.clone(), config.dev.server_entry.clone())
                .with_skeleton(config.dev.skeleton_html.clone());

            Ok(ModeRuntime {
                strategy: Arc::new(strategy),
                front: FrontHandler::DevTooling(bundler),
            })
        }
        ServerMode::Prod => {
            inspect_dist_dir(&config.resolve(&config.prod.dist_dir)).await;

            let loader = collaborators
                .entry_loader
                .unwrap_or_else(|| Arc::new(NodeEntryLoader::new(config.prod.node_path.clone())) as Arc<dyn EntryLoader>);
            let strategy = ProdStrategy::new(loader, config.resolve(&config.prod.server_entry));
            let assets = StaticAssets::new(config.resolve(&config.prod.static_dir));

            Ok(ModeRuntime {
                strategy: Arc::new(strategy),
                front: FrontHandler::StaticFiles(assets),
            })
        }
    }
}

/// Select the mode and assemble the server.
pub async fn build_server(
    config: &ServerConfig,
    collaborators: Collaborators,
) -> Result<HttpServer, StartupError> {
    let runtime = select_mode(config, collaborators).await?;
    Ok(HttpServer::new(config, runtime))
}
