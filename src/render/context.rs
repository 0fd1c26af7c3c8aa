//! Request, response and context handed to a render entry.
//!
//! # Design Decisions
//! - The render entry owns the response: it sets status, headers and body
//!   and ends it. The dispatcher never inspects what was written.
//! - Output is buffered in [`ResponseWriter`] and turned into an axum
//!   response once the pipeline returns, so a failure after a partial write
//!   can still be finalised as a 500.

use axum::{
    body::Body,
    http::{request::Parts, HeaderMap, HeaderName, HeaderValue, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
};

/// The inbound request as seen by a render entry.
#[derive(Debug, Clone)]
pub struct IncomingRequest {
    pub method: Method,
    pub uri: Uri,
    pub headers: HeaderMap,
    /// Path and query exactly as received.
    pub original_url: String,
}

impl IncomingRequest {
    /// Build from the head of an axum request.
    pub fn from_parts(parts: &Parts) -> Self {
        let original_url = parts
            .uri
            .path_and_query()
            .map(|pq| pq.as_str().to_string())
            .unwrap_or_else(|| parts.uri.path().to_string());

        Self {
            method: parts.method.clone(),
            uri: parts.uri.clone(),
            headers: parts.headers.clone(),
            original_url,
        }
    }

    /// Path component of the request target.
    pub fn original_path(&self) -> &str {
        self.uri.path()
    }

    /// `x-request-id` set by the request-id layer, if any.
    pub fn request_id(&self) -> &str {
        self.headers
            .get("x-request-id")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("unknown")
    }

    /// Headers as string pairs; non-UTF-8 values are skipped.
    pub fn header_pairs(&self) -> Vec<(String, String)> {
        self.headers
            .iter()
            .filter_map(|(k, v)| v.to_str().ok().map(|v| (k.as_str().to_string(), v.to_string())))
            .collect()
    }
}

/// Buffered, mutable response written by a render entry.
#[derive(Debug)]
pub struct ResponseWriter {
    status: StatusCode,
    headers: HeaderMap,
    body: Vec<u8>,
    started: bool,
    ended: bool,
}

impl Default for ResponseWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl ResponseWriter {
    pub fn new() -> Self {
        Self {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            body: Vec::new(),
            started: false,
            ended: false,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn set_status(&mut self, status: StatusCode) {
        self.status = status;
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Insert a header, replacing an existing value.
    pub fn set_header(&mut self, name: HeaderName, value: HeaderValue) {
        self.headers.insert(name, value);
    }

    /// Append a body chunk. Marks the response as started.
    pub fn write(&mut self, chunk: impl AsRef<[u8]>) {
        self.started = true;
        self.body.extend_from_slice(chunk.as_ref());
    }

    /// Write a final chunk and end the response.
    pub fn end(&mut self, chunk: impl AsRef<[u8]>) {
        self.write(chunk);
        self.ended = true;
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Whether any body bytes have been written.
    pub fn is_started(&self) -> bool {
        self.started
    }

    pub fn is_ended(&self) -> bool {
        self.ended
    }

    /// Finalise with an error status and a plain-text body.
    ///
    /// Any partial output is discarded. Returns `true` when partial output
    /// existed, in which case the client-visible result conflicts with
    /// what the render entry meant to send.
    pub fn fail(&mut self, status: StatusCode, body: &str) -> bool {
        let had_partial = self.started;
        self.status = status;
        self.headers.clear();
        self.headers.insert(
            axum::http::header::CONTENT_TYPE,
            HeaderValue::from_static("text/plain; charset=utf-8"),
        );
        self.body.clear();
        self.end(body);
        had_partial
    }
}

impl IntoResponse for ResponseWriter {
    fn into_response(self) -> Response {
        if !self.ended {
            tracing::warn!(
                status = %self.status,
                "Render entry returned without ending the response"
            );
        }
        let mut response = Response::new(Body::from(self.body));
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        response
    }
}

/// Everything a render entry receives for one request.
pub struct RenderContext<'a> {
    pub request: &'a IncomingRequest,
    pub response: &'a mut ResponseWriter,
    /// Inner contents of `<head>`, possibly empty.
    pub head: &'a str,
}
