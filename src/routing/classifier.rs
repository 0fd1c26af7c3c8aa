//! Request classification.
//!
//! # Responsibilities
//! - Decide whether a request path is an application route (SSR) or
//!   belongs to another handler (static asset, dev tooling)
//!
//! # Design Decisions
//! - Routes are extensionless by convention: any path with a file extension
//!   is passed through. An extensioned application route cannot be
//!   expressed; there is no route registry.
//! - Reserved dev-tooling prefixes are passed through regardless of extension
//! - Only the path is inspected; the query string is carried along untouched
//! - Pure function, no I/O

use axum::http::Uri;

/// Outcome of classifying a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteClassification {
    /// Render this URL (path plus query, as received).
    ApplicationRoute(String),
    /// Not ours; hand the request to the next handler.
    PassThrough,
}

/// Extension-or-reserved-prefix classifier.
#[derive(Debug, Clone, Default)]
pub struct RequestClassifier {
    reserved_prefixes: Vec<String>,
}

impl RequestClassifier {
    pub fn new<I, S>(reserved_prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            reserved_prefixes: reserved_prefixes.into_iter().map(Into::into).collect(),
        }
    }

    pub fn reserved_prefixes(&self) -> &[String] {
        &self.reserved_prefixes
    }

    /// Classify a request target.
    pub fn classify(&self, uri: &Uri) -> RouteClassification {
        let path = uri.path();
        if self.is_reserved(path) || !extension(path).is_empty() {
            return RouteClassification::PassThrough;
        }

        let url = uri
            .path_and_query()
            .map(|pq| pq.as_str().to_string())
            .unwrap_or_else(|| path.to_string());
        RouteClassification::ApplicationRoute(url)
    }

    /// Whether `path` belongs to dev tooling.
    pub fn is_reserved(&self, path: &str) -> bool {
        self.reserved_prefixes.iter().any(|p| path.starts_with(p.as_str()))
    }
}

/// File extension of the last path segment, including the dot.
///
/// Trailing slashes are ignored. A leading dot (`/.well-known`) does not
/// start an extension; a trailing dot (`/file.`) yields `"."`.
pub fn extension(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    let name = match trimmed.rfind('/') {
        Some(i) => &trimmed[i + 1..],
        None => trimmed,
    };
    if name == ".." {
        return "";
    }
    match name.rfind('.') {
        Some(0) | None => "",
        Some(i) => &name[i..],
    }
}
