//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum Router with the handler chain
//! - Wire up middleware (tracing, request ID, compression in Prod)
//! - Mount the mode's front handler ahead of SSR
//! - Serve on a bound listener until shutdown

use std::sync::Arc;

use axum::{
    http::StatusCode,
    middleware,
    response::IntoResponse,
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    compression::CompressionLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::bundler::{dev_tooling_middleware, DevBundler};
use crate::config::ServerConfig;
use crate::http::middleware::{ssr_middleware, static_files_middleware, StaticAssets};
use crate::mode::{RenderStrategy, ServerMode};
use crate::render::Dispatcher;
use crate::routing::RequestClassifier;

/// State injected into the SSR middleware.
#[derive(Clone)]
pub struct AppState {
    pub classifier: Arc<RequestClassifier>,
    pub dispatcher: Dispatcher,
}

/// Handler mounted in front of SSR.
#[derive(Clone)]
pub enum FrontHandler {
    /// Dev: the bundler answers its own paths.
    DevTooling(Arc<dyn DevBundler>),
    /// Prod: files from the client build.
    StaticFiles(StaticAssets),
    /// Nothing ahead of SSR.
    None,
}

/// The pieces a mode contributes to the server.
pub struct ModeRuntime {
    pub strategy: Arc<dyn RenderStrategy>,
    pub front: FrontHandler,
}

/// HTTP server for the dispatch layer.
pub struct HttpServer {
    router: Router,
    mode: ServerMode,
}

impl HttpServer {
    /// Create a new HTTP server for the selected mode.
    pub fn new(config: &ServerConfig, runtime: ModeRuntime) -> Self {
        let mode = runtime.strategy.mode();
        let state = AppState {
            classifier: Arc::new(RequestClassifier::new(config.dev.reserved_prefixes.clone())),
            dispatcher: Dispatcher::new(runtime.strategy),
        };

        let compress = mode == ServerMode::Prod && config.prod.compression;
        let router = Self::build_router(state, runtime.front, compress);
        Self { router, mode }
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(state: AppState, front: FrontHandler, compress: bool) -> Router {
        let mut router = Router::new()
            .fallback(not_found)
            .layer(middleware::from_fn_with_state(state, ssr_middleware));

        router = match front {
            FrontHandler::DevTooling(bundler) => {
                router.layer(middleware::from_fn_with_state(bundler, dev_tooling_middleware))
            }
            FrontHandler::StaticFiles(assets) => {
                router.layer(middleware::from_fn_with_state(assets, static_files_middleware))
            }
            FrontHandler::None => router,
        };

        if compress {
            router = router.layer(CompressionLayer::new());
        }

        router
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    pub fn mode(&self) -> ServerMode {
        self.mode
    }

    /// The assembled router, for embedding or driving in tests.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Serve on `listener` until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, mode = %self.mode, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// End of the chain for requests nobody handled.
async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, "Not Found")
}
