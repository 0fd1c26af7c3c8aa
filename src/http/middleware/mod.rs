//! Request handler chain.
//!
//! ```text
//! request
//!     → front handler (dev tooling | static files), may answer
//!     → ssr (classify; render application routes)
//!     → fallback 404
//! ```

pub mod ssr;
pub mod static_files;

pub use ssr::ssr_middleware;
pub use static_files::{inspect_dist_dir, static_files_middleware, StaticAssets};
