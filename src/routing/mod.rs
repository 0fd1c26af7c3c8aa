//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (path, query)
//!     → classifier.rs (reserved prefix? file extension?)
//!     → Return: ApplicationRoute(url) or PassThrough
//! ```
//!
//! # Design Decisions
//! - Classification is a heuristic, not a route table
//! - Deterministic: same path always classifies the same way
//! - Prefixes fixed at startup, immutable at runtime

pub mod classifier;

pub use classifier::{RequestClassifier, RouteClassification};
