//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from config files.
//! Every field has a default so an empty file (or none) is valid.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::mode::ServerMode;
use crate::render::SKELETON_HTML;

/// Root configuration for the dispatch server.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ServerConfig {
    /// Production deployment (precompiled assets) instead of dev transform.
    pub production: bool,

    /// Embedded in a test harness: no automatic startup, quiet logs.
    pub test_mode: bool,

    /// Project root; relative paths below resolve against it.
    pub root: PathBuf,

    /// Listener configuration.
    pub listener: ListenerConfig,

    /// Dev mode settings.
    pub dev: DevConfig,

    /// Prod mode settings.
    pub prod: ProdConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl ServerConfig {
    pub fn mode(&self) -> ServerMode {
        ServerMode::from_production_flag(self.production)
    }

    /// Resolve `path` against `root` unless it is absolute.
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Interface to bind.
    pub host: String,

    /// First candidate port.
    pub port_range_start: u16,

    /// Last candidate port (inclusive).
    pub port_range_end: u16,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port_range_start: 3000,
            port_range_end: 3100,
        }
    }
}

/// Dev mode: live transform through the bundler.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DevConfig {
    /// Origin of the dev bundler sidecar.
    pub bundler_url: String,

    /// Server entry module loaded for every render.
    pub server_entry: String,

    /// Document passed to the head transform.
    pub skeleton_html: String,

    /// Paths owned by the dev tooling (HMR client, module ids).
    pub reserved_prefixes: Vec<String>,
}

impl Default for DevConfig {
    fn default() -> Self {
        Self {
            bundler_url: "http://127.0.0.1:5173".to_string(),
            server_entry: "/src/entry-server.tsx".to_string(),
            skeleton_html: SKELETON_HTML.to_string(),
            reserved_prefixes: vec!["/@".to_string()],
        }
    }
}

/// Prod mode: precompiled client assets and server entry.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ProdConfig {
    /// Build output root, listed at startup.
    pub dist_dir: PathBuf,

    /// Directory served as static files.
    pub static_dir: PathBuf,

    /// Precompiled server entry module.
    pub server_entry: PathBuf,

    /// Node.js executable used to run the entry.
    pub node_path: String,

    /// Compress responses.
    pub compression: bool,
}

impl Default for ProdConfig {
    fn default() -> Self {
        Self {
            dist_dir: PathBuf::from("dist"),
            static_dir: PathBuf::from("dist/client"),
            server_entry: PathBuf::from("dist/server/entry-server.js"),
            node_path: "node".to_string(),
            compression: true,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
