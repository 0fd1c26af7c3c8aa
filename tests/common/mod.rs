//! Shared mock collaborators for integration tests.
#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, HeaderValue, Request, StatusCode},
    response::{IntoResponse, Response},
    Router,
};
use tower::ServiceExt;

use ssr_dispatch::bundler::DevBundler;
use ssr_dispatch::lifecycle::{build_server, Collaborators};
use ssr_dispatch::render::{EntryLoader, ModuleError, RenderContext, RenderEntry};
use ssr_dispatch::ServerConfig;

pub const REMAP_MARKER: &str = "    at render (src/entry-server.tsx:12:7)";

/// Renders a fixed page and records what it saw.
pub struct PageEntry {
    pub status: StatusCode,
    pub body: String,
    pub calls: AtomicUsize,
    pub heads: Mutex<Vec<String>>,
    pub urls: Mutex<Vec<String>>,
}

impl PageEntry {
    pub fn new(body: &str) -> Arc<Self> {
        Arc::new(Self {
            status: StatusCode::OK,
            body: body.to_string(),
            calls: AtomicUsize::new(0),
            heads: Mutex::new(Vec::new()),
            urls: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_head(&self) -> Option<String> {
        self.heads.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl RenderEntry for PageEntry {
    async fn render(&self, ctx: RenderContext<'_>) -> Result<(), ModuleError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.heads.lock().unwrap().push(ctx.head.to_string());
        self.urls.lock().unwrap().push(ctx.request.original_url.clone());

        ctx.response.set_status(self.status);
        ctx.response.set_header(
            header::CONTENT_TYPE,
            HeaderValue::from_static("text/html; charset=utf-8"),
        );
        ctx.response.end(format!(
            "<html><head>{}</head><body>{}</body></html>",
            ctx.head, self.body
        ));
        Ok(())
    }
}

/// Writes part of the page, then throws.
pub struct PartialThenFailEntry {
    pub calls: AtomicUsize,
}

impl PartialThenFailEntry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl RenderEntry for PartialThenFailEntry {
    async fn render(&self, ctx: RenderContext<'_>) -> Result<(), ModuleError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        ctx.response.write("<html><body><h1>Half");
        Err(ModuleError::new("component exploded")
            .with_stack("Error: component exploded\n    at App (entry-server.js:40:11)"))
    }
}

/// Scriptable dev bundler.
pub struct MockBundler {
    pub transform_result: Result<String, ModuleError>,
    pub entry: Arc<dyn RenderEntry>,
    pub load_error: Option<ModuleError>,
    pub transform_calls: AtomicUsize,
    pub load_calls: AtomicUsize,
    pub remap_calls: AtomicUsize,
    pub served: AtomicUsize,
}

impl MockBundler {
    pub fn new(entry: Arc<dyn RenderEntry>) -> Self {
        Self {
            transform_result: Ok("<html><head><title>Dev</title></head><body></body></html>".into()),
            entry,
            load_error: None,
            transform_calls: AtomicUsize::new(0),
            load_calls: AtomicUsize::new(0),
            remap_calls: AtomicUsize::new(0),
            served: AtomicUsize::new(0),
        }
    }

    pub fn with_transform(mut self, result: Result<String, ModuleError>) -> Self {
        self.transform_result = result;
        self
    }

    pub fn with_load_error(mut self, error: ModuleError) -> Self {
        self.load_error = Some(error);
        self
    }

    pub fn count(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DevBundler for MockBundler {
    async fn transform_head(&self, _url: &str, skeleton: &str) -> Result<String, ModuleError> {
        self.transform_calls.fetch_add(1, Ordering::SeqCst);
        assert_eq!(skeleton, "<html><head></head><body></body></html>");
        self.transform_result.clone()
    }

    async fn load_render_module(&self, module_path: &str) -> Result<Arc<dyn RenderEntry>, ModuleError> {
        self.load_calls.fetch_add(1, Ordering::SeqCst);
        assert_eq!(module_path, "/src/entry-server.tsx");
        match &self.load_error {
            Some(e) => Err(e.clone()),
            None => Ok(self.entry.clone()),
        }
    }

    async fn remap_stack(&self, error: ModuleError) -> ModuleError {
        self.remap_calls.fetch_add(1, Ordering::SeqCst);
        let stack = format!("{}\n{}", error.stack(), REMAP_MARKER);
        error.with_stack(stack)
    }

    fn handles(&self, path: &str) -> bool {
        path.starts_with("/@")
    }

    async fn serve(&self, _request: Request<Body>) -> Response {
        self.served.fetch_add(1, Ordering::SeqCst);
        (StatusCode::OK, "// hmr client").into_response()
    }
}

/// Entry loader that counts loads and can be slowed down to widen races.
pub struct CountingLoader {
    pub entry: Arc<dyn RenderEntry>,
    pub loads: AtomicUsize,
    pub delay: Duration,
    pub fail_first: usize,
}

impl CountingLoader {
    pub fn new(entry: Arc<dyn RenderEntry>) -> Self {
        Self {
            entry,
            loads: AtomicUsize::new(0),
            delay: Duration::ZERO,
            fail_first: 0,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn failing_first(mut self, n: usize) -> Self {
        self.fail_first = n;
        self
    }

    pub fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EntryLoader for CountingLoader {
    async fn load(&self, path: &std::path::Path) -> Result<Arc<dyn RenderEntry>, ModuleError> {
        let attempt = self.loads.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if attempt < self.fail_first {
            return Err(ModuleError::new(format!("Cannot find module '{}'", path.display())));
        }
        Ok(self.entry.clone())
    }
}

pub fn dev_config() -> ServerConfig {
    ServerConfig {
        test_mode: true,
        ..Default::default()
    }
}

pub fn prod_config(root: &std::path::Path) -> ServerConfig {
    ServerConfig {
        production: true,
        test_mode: true,
        root: root.to_path_buf(),
        ..Default::default()
    }
}

pub async fn dev_router(bundler: Arc<MockBundler>) -> Router {
    let collaborators = Collaborators {
        bundler: Some(bundler as Arc<dyn DevBundler>),
        entry_loader: None,
    };
    build_server(&dev_config(), collaborators).await.unwrap().router()
}

pub async fn prod_router(config: &ServerConfig, loader: Arc<CountingLoader>) -> Router {
    let collaborators = Collaborators {
        bundler: None,
        entry_loader: Some(loader as Arc<dyn EntryLoader>),
    };
    build_server(config, collaborators).await.unwrap().router()
}

/// Send a GET through the router and collect status, headers and body.
pub async fn get(router: &Router, uri: &str) -> (StatusCode, axum::http::HeaderMap, String) {
    let request = Request::get(uri).body(Body::empty()).unwrap();
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, headers, String::from_utf8_lossy(&bytes).into_owned())
}
