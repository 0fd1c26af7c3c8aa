//! Render dispatch for application routes.
//!
//! # Responsibilities
//! - Obtain head fragment and render entry from the active strategy
//! - Invoke the entry with `{ request, response, head }`
//! - Collapse transform, load and render failures into one 500 path

use std::sync::Arc;
use std::time::Instant;

use axum::http::StatusCode;

use crate::mode::{RenderStrategy, ServerMode};
use crate::observability::metrics;
use crate::render::{DispatchError, IncomingRequest, RenderContext, ResponseWriter};

/// Result of one dispatch, for logging and tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The render entry returned normally.
    Rendered,
    /// A stage failed and a 500 was written.
    Failed {
        stage: &'static str,
        /// Partial output from the entry was discarded.
        discarded_partial: bool,
    },
}

/// Drives a [`RenderStrategy`] for each application route.
#[derive(Clone)]
pub struct Dispatcher {
    strategy: Arc<dyn RenderStrategy>,
}

impl Dispatcher {
    pub fn new(strategy: Arc<dyn RenderStrategy>) -> Self {
        Self { strategy }
    }

    pub fn mode(&self) -> ServerMode {
        self.strategy.mode()
    }

    /// Render `url` into `response`.
    ///
    /// On failure the response is finalised with status 500 and the
    /// (Dev: remapped) stack trace as a plain-text body.
    pub async fn dispatch(
        &self,
        url: &str,
        request: &IncomingRequest,
        response: &mut ResponseWriter,
    ) -> DispatchOutcome {
        let start = Instant::now();
        let mode = self.strategy.mode();

        match self.render(url, request, response).await {
            Ok(()) => {
                metrics::record_render(mode, "rendered", start);
                DispatchOutcome::Rendered
            }
            Err(error) => {
                let error = self.strategy.fix_error(error).await;
                let stage = error.stage();

                tracing::error!(
                    request_id = %request.request_id(),
                    url = %url,
                    mode = %mode,
                    stage,
                    error = %error,
                    "{}",
                    error.stack()
                );

                let discarded_partial = response.fail(StatusCode::INTERNAL_SERVER_ERROR, error.stack());
                if discarded_partial {
                    tracing::warn!(
                        request_id = %request.request_id(),
                        url = %url,
                        "Render failed after writing output; partial response replaced with 500"
                    );
                }

                metrics::record_render(mode, stage, start);
                DispatchOutcome::Failed {
                    stage,
                    discarded_partial,
                }
            }
        }
    }

    async fn render(
        &self,
        url: &str,
        request: &IncomingRequest,
        response: &mut ResponseWriter,
    ) -> Result<(), DispatchError> {
        let head = self.strategy.resolve_head(url).await?;
        let entry = self.strategy.resolve_render_entry(url).await?;

        tracing::info!(request_id = %request.request_id(), url = %url, "Rendering");
        entry
            .render(RenderContext {
                request,
                response,
                head: &head,
            })
            .await
            .map_err(DispatchError::Render)
    }
}
