//! Mode-aware SSR dispatch library.

pub mod bundler;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod mode;
pub mod net;
pub mod observability;
pub mod render;
pub mod routing;

pub use config::ServerConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use mode::{RenderStrategy, ServerMode};
