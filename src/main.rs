//! SSR dispatch server.
//!
//! Serves a server-rendered application in one of two modes, fixed at
//! startup from `NODE_ENV`:
//!
//! ```text
//!                 ┌──────────────────────────────────────────────────────┐
//!   Request ─────▶│ front handler ──▶ classifier ──▶ render dispatcher    │
//!                 │  Dev:  bundler     extension /     Dev:  transform    │
//!                 │        middleware  reserved         head + fresh load │
//!                 │  Prod: static      prefix?          Prod: cached      │
//!                 │        files         │              precompiled entry │
//!                 │                      ▼ pass-through                   │
//!                 │                     404                               │
//!                 └──────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;

use ssr_dispatch::config::load_config;
use ssr_dispatch::lifecycle::{build_server, Collaborators, Shutdown};
use ssr_dispatch::net::listener;
use ssr_dispatch::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "ssr-dispatch")]
#[command(about = "Dev/prod SSR request dispatcher", long_about = None)]
struct Cli {
    /// Optional TOML config file.
    #[arg(short, long, env = "SSR_CONFIG")]
    config: Option<PathBuf>,

    /// Project root; defaults to the current directory.
    #[arg(short, long, env = "SSR_ROOT")]
    root: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = load_config(cli.config.as_deref())?;
    if let Some(root) = cli.root {
        config.root = root;
    }
    if config.root.as_os_str().is_empty() {
        config.root = std::env::current_dir()?;
    }

    logging::init(&config.observability, config.test_mode);

    if config.test_mode {
        tracing::info!("Test mode: not starting the listener");
        return Ok(());
    }

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        mode = %config.mode(),
        root = %config.root.display(),
        "ssr-dispatch starting"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let server = build_server(&config, Collaborators::default()).await?;
    let listener = listener::bind(&config.listener).await?;
    let port = listener.local_addr()?.port();
    tracing::info!("Client Server: http://localhost:{}", port);

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    shutdown.trigger_on_signal();

    server.run(listener, server_shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
