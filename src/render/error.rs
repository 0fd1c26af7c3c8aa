//! Failure types for the render pipeline.
//!
//! Collaborators (bundler, precompiled entry) report failures as
//! [`ModuleError`]: a message plus the stack text they produced. The
//! dispatcher wraps those into a [`DispatchError`] tagged with the stage
//! that failed.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// An error reported by an external module or the bundler.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{message}")]
pub struct ModuleError {
    /// Short human-readable message.
    pub message: String,

    /// Reported stack trace. Falls back to `Error: <message>` when the
    /// collaborator did not provide one.
    #[serde(default)]
    pub stack: String,
}

impl ModuleError {
    /// Create an error whose stack is just its message line.
    pub fn new(message: impl Into<String>) -> Self {
        let message = message.into();
        let stack = format!("Error: {}", message);
        Self { message, stack }
    }

    /// Replace the reported stack trace.
    pub fn with_stack(mut self, stack: impl Into<String>) -> Self {
        self.stack = stack.into();
        self
    }

    /// Stack text, never empty.
    pub fn stack(&self) -> &str {
        if self.stack.is_empty() {
            &self.message
        } else {
            &self.stack
        }
    }
}

/// A failure at one of the three dispatch stages.
///
/// All variants are terminal for the current request.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// Head-fragment generation failed (Dev only).
    #[error("head transform failed: {0}")]
    Transform(#[source] ModuleError),

    /// The render entry could not be loaded.
    #[error("failed to load render entry `{module}`: {source}")]
    ModuleResolution {
        module: String,
        #[source]
        source: ModuleError,
    },

    /// The render entry failed while executing.
    #[error("render failed: {0}")]
    Render(#[source] ModuleError),
}

impl DispatchError {
    /// Stage label used for logs and metrics.
    pub fn stage(&self) -> &'static str {
        match self {
            DispatchError::Transform(_) => "transform",
            DispatchError::ModuleResolution { .. } => "module_resolution",
            DispatchError::Render(_) => "render",
        }
    }

    /// The collaborator error underneath.
    pub fn module_error(&self) -> &ModuleError {
        match self {
            DispatchError::Transform(e) | DispatchError::Render(e) => e,
            DispatchError::ModuleResolution { source, .. } => source,
        }
    }

    /// Stack text written as the body of the 500 response.
    pub fn stack(&self) -> &str {
        self.module_error().stack()
    }
}
