//! JSON wire format shared by the out-of-process render adapters.

use axum::http::{HeaderName, HeaderValue, StatusCode};
use serde::{Deserialize, Serialize};

use crate::render::context::{IncomingRequest, ResponseWriter};
use crate::render::error::ModuleError;

/// What a render adapter sends to the JavaScript side.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderRequest {
    /// Module to render with. Empty for the precompiled Prod entry.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub module: String,
    pub url: String,
    pub method: String,
    pub headers: Vec<(String, String)>,
    pub head: String,
}

impl RenderRequest {
    pub fn new(module: impl Into<String>, request: &IncomingRequest, head: &str) -> Self {
        Self {
            module: module.into(),
            url: request.original_url.clone(),
            method: request.method.to_string(),
            headers: request.header_pairs(),
            head: head.to_string(),
        }
    }
}

/// Response state captured after `render({ req, res, head })` returned
/// or threw.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RenderOutcome {
    #[serde(default = "default_status")]
    pub status: u16,
    #[serde(default)]
    pub headers: Vec<(String, String)>,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub ended: bool,
    #[serde(default)]
    pub error: Option<ModuleError>,
}

fn default_status() -> u16 {
    200
}

impl RenderOutcome {
    /// Replay the captured state into `writer`, then surface the error the
    /// entry raised, if any.
    pub fn apply(self, writer: &mut ResponseWriter) -> Result<(), ModuleError> {
        match StatusCode::from_u16(self.status) {
            Ok(status) => writer.set_status(status),
            Err(_) => tracing::warn!(status = self.status, "Render entry set an invalid status"),
        }

        for (name, value) in &self.headers {
            match (
                HeaderName::from_bytes(name.as_bytes()),
                HeaderValue::from_str(value),
            ) {
                (Ok(name), Ok(value)) => writer.set_header(name, value),
                _ => tracing::warn!(header = %name, "Dropping invalid response header"),
            }
        }

        if !self.body.is_empty() {
            writer.write(self.body.as_bytes());
        }
        if self.ended {
            writer.end("");
        }

        match self.error {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}
