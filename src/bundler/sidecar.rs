//! Dev bundler running as a companion HTTP server.
//!
//! # Endpoints
//! - `POST /__ssr/transform-head` `{ url, html }` → `{ html }`
//! - `POST /__ssr/load` `{ module }` → `{}`
//! - `POST /__ssr/render` `RenderRequest` → `RenderOutcome`
//! - `POST /__ssr/fix-stacktrace` `{ message, stack }` → `{ stack }`
//!
//! Non-2xx answers carry `{ message, stack }`. Every other request the
//! bundler claims (tooling prefixes, module sources) is forwarded verbatim.
//!
//! `scripts/dev-sidecar.mjs` implements this contract on top of Vite in
//! middleware mode; run it from the application root before starting the
//! server in Dev mode.

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{
        uri::{Authority, InvalidUri, Scheme},
        Request, StatusCode, Uri,
    },
    response::{IntoResponse, Response},
};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;

use crate::bundler::DevBundler;
use crate::render::wire::{RenderOutcome, RenderRequest};
use crate::render::{ModuleError, RenderContext, RenderEntry};
use crate::routing::classifier::extension;

/// Error building a [`SidecarBundler`].
#[derive(Debug, Error)]
pub enum SidecarError {
    #[error("invalid dev bundler url `{url}`: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: InvalidUri,
    },
    #[error("dev bundler url `{0}` must include scheme and host")]
    IncompleteUrl(String),
    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

#[derive(Serialize)]
struct TransformRequest<'a> {
    url: &'a str,
    html: &'a str,
}

#[derive(Deserialize)]
struct TransformResponse {
    html: String,
}

#[derive(Serialize)]
struct LoadRequest<'a> {
    module: &'a str,
}

#[derive(Deserialize)]
struct LoadResponse {}

#[derive(Deserialize)]
struct FixStackResponse {
    stack: String,
}

/// JSON-over-HTTP calls to the sidecar.
#[derive(Clone)]
struct SidecarRpc {
    base_url: String,
    http: reqwest::Client,
}

impl SidecarRpc {
    async fn call<Req, Res>(&self, endpoint: &str, body: &Req) -> Result<Res, ModuleError>
    where
        Req: Serialize + ?Sized,
        Res: DeserializeOwned,
    {
        let url = format!("{}/__ssr/{}", self.base_url, endpoint);
        let response = self
            .http
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| ModuleError::new(format!("Dev bundler unreachable at {}: {}", url, e)))?;

        let status = response.status();
        if status.is_success() {
            return response
                .json::<Res>()
                .await
                .map_err(|e| ModuleError::new(format!("Invalid reply from {}: {}", url, e)));
        }

        match response.json::<ModuleError>().await {
            Ok(error) => Err(error),
            Err(_) => Err(ModuleError::new(format!("Dev bundler returned {} for {}", status, url))),
        }
    }
}

/// [`DevBundler`] backed by a companion dev server.
pub struct SidecarBundler {
    rpc: SidecarRpc,
    proxy: Client<HttpConnector, Body>,
    scheme: Scheme,
    authority: Authority,
    reserved_prefixes: Vec<String>,
}

impl SidecarBundler {
    /// `base_url` is the sidecar origin, e.g. `http://127.0.0.1:5173`.
    pub fn new(base_url: &str, reserved_prefixes: Vec<String>) -> Result<Self, SidecarError> {
        let base_url = base_url.trim_end_matches('/').to_string();
        let uri: Uri = base_url.parse().map_err(|source| SidecarError::InvalidUrl {
            url: base_url.clone(),
            source,
        })?;
        let (Some(scheme), Some(authority)) = (uri.scheme().cloned(), uri.authority().cloned()) else {
            return Err(SidecarError::IncompleteUrl(base_url));
        };

        let http = reqwest::Client::builder().no_proxy().build()?;
        let proxy = Client::builder(TokioExecutor::new()).build(HttpConnector::new());

        Ok(Self {
            rpc: SidecarRpc { base_url, http },
            proxy,
            scheme,
            authority,
            reserved_prefixes,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.rpc.base_url
    }
}

#[async_trait]
impl DevBundler for SidecarBundler {
    async fn transform_head(&self, url: &str, skeleton: &str) -> Result<String, ModuleError> {
        let response: TransformResponse = self
            .rpc
            .call("transform-head", &TransformRequest { url, html: skeleton })
            .await?;
        Ok(response.html)
    }

    async fn load_render_module(&self, module_path: &str) -> Result<Arc<dyn RenderEntry>, ModuleError> {
        let _: LoadResponse = self
            .rpc
            .call("load", &LoadRequest { module: module_path })
            .await?;
        Ok(Arc::new(SidecarEntry {
            rpc: self.rpc.clone(),
            module: module_path.to_string(),
        }))
    }

    async fn remap_stack(&self, error: ModuleError) -> ModuleError {
        match self.rpc.call::<_, FixStackResponse>("fix-stacktrace", &error).await {
            Ok(fixed) => ModuleError {
                stack: fixed.stack,
                ..error
            },
            Err(e) => {
                tracing::warn!(error = %e, "Stack remapping failed; keeping original trace");
                error
            }
        }
    }

    fn handles(&self, path: &str) -> bool {
        self.reserved_prefixes.iter().any(|p| path.starts_with(p.as_str())) || !extension(path).is_empty()
    }

    async fn serve(&self, request: Request<Body>) -> Response {
        let (parts, body) = request.into_parts();

        let mut uri_parts = parts.uri.clone().into_parts();
        uri_parts.scheme = Some(self.scheme.clone());
        uri_parts.authority = Some(self.authority.clone());
        let uri = match Uri::from_parts(uri_parts) {
            Ok(uri) => uri,
            Err(e) => {
                tracing::warn!(uri = %parts.uri, error = %e, "Cannot forward request to dev bundler");
                return (StatusCode::BAD_REQUEST, "Invalid request target").into_response();
            }
        };

        let mut forwarded = Request::from_parts(parts, body);
        *forwarded.uri_mut() = uri;

        match self.proxy.request(forwarded).await {
            Ok(response) => {
                let (parts, body) = response.into_parts();
                Response::from_parts(parts, Body::new(body))
            }
            Err(e) => {
                tracing::error!(error = %e, bundler = %self.rpc.base_url, "Dev bundler request failed");
                (StatusCode::BAD_GATEWAY, "Dev bundler unavailable").into_response()
            }
        }
    }
}

/// Render entry resolved by the sidecar; rendering happens there.
struct SidecarEntry {
    rpc: SidecarRpc,
    module: String,
}

#[async_trait]
impl RenderEntry for SidecarEntry {
    async fn render(&self, ctx: RenderContext<'_>) -> Result<(), ModuleError> {
        let request = RenderRequest::new(self.module.clone(), ctx.request, ctx.head);
        let outcome: RenderOutcome = self.rpc.call("render", &request).await?;
        outcome.apply(ctx.response)
    }
}
