//! Prod static assets.
//!
//! # Responsibilities
//! - Serve files from the client build directory
//! - Decline (pass through) anything without a matching file
//! - Report the build directory contents at startup
//!
//! # Design Decisions
//! - Directory index responses are disabled
//! - A missing build directory is logged, never fatal: SSR routes still work

use std::path::{Path, PathBuf};

use axum::{
    body::Body,
    extract::State,
    http::{Method, Request, StatusCode},
    middleware::Next,
    response::Response,
};
use tower::ServiceExt;
use tower_http::services::ServeDir;

/// File server for the client build output.
#[derive(Clone)]
pub struct StaticAssets {
    dir: PathBuf,
    serve_dir: ServeDir,
}

impl StaticAssets {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        let serve_dir = ServeDir::new(&dir).append_index_html_on_directories(false);
        Self { dir, serve_dir }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Serve `request` from disk, or `None` when no file matches.
    ///
    /// Takes the request by value: only `GET`/`HEAD` requests built by
    /// [`file_request`] are worth looking up.
    pub async fn try_serve(&self, request: Request<Body>) -> Option<Response> {
        match self.serve_dir.clone().oneshot(request).await {
            Ok(response) if response.status() != StatusCode::NOT_FOUND => Some(response.map(Body::new)),
            Ok(_) => None,
            Err(e) => match e {},
        }
    }
}

/// Body-less copy of `request` for the file server, or `None` for methods
/// that never map to a file.
pub fn file_request(request: &Request<Body>) -> Option<Request<Body>> {
    if !matches!(*request.method(), Method::GET | Method::HEAD) {
        return None;
    }

    let mut lookup = Request::builder()
        .method(request.method().clone())
        .uri(request.uri().clone())
        .version(request.version())
        .body(Body::empty())
        .ok()?;
    *lookup.headers_mut() = request.headers().clone();
    Some(lookup)
}

/// Mounted ahead of SSR in Prod mode.
pub async fn static_files_middleware(
    State(assets): State<StaticAssets>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let Some(lookup) = file_request(&request) else {
        return next.run(request).await;
    };
    match assets.try_serve(lookup).await {
        Some(response) => response,
        None => next.run(request).await,
    }
}

/// List the build directory, logging its contents or the failure.
pub async fn inspect_dist_dir(dir: &Path) -> Option<Vec<String>> {
    tracing::info!(path = %dir.display(), "Resolved build directory");

    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) => {
            tracing::error!(path = %dir.display(), error = %e, "Failed to read build directory");
            return None;
        }
    };

    let mut names = Vec::new();
    loop {
        match entries.next_entry().await {
            Ok(Some(entry)) => names.push(entry.file_name().to_string_lossy().into_owned()),
            Ok(None) => break,
            Err(e) => {
                tracing::error!(path = %dir.display(), error = %e, "Failed to read build directory");
                return None;
            }
        }
    }
    names.sort();

    for name in &names {
        tracing::info!(path = %dir.display(), entry = %name, "Build directory entry");
    }
    Some(names)
}
