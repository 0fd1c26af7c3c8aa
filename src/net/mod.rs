//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Port range (3000-3100)
//!     → listener.rs (try each port in order, keep the first that binds)
//!     → Hand off to HTTP layer
//! ```

pub mod listener;

pub use listener::{bind_first_available, ListenerError};
