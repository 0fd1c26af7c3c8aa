//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, tracing, compression)
//!     → middleware/static_files.rs (Prod) | bundler middleware (Dev)
//!     → middleware/ssr.rs (classify → dispatch or pass through)
//!     → 404 fallback
//! ```

pub mod middleware;
pub mod server;

pub use server::{AppState, FrontHandler, HttpServer, ModeRuntime};
