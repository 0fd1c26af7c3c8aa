//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Classifier, dispatcher, strategies produce:
//!     → logging.rs (structured log events)
//!     → metrics.rs (counters, histograms)
//!
//! Consumers:
//!     → stdout
//!     → Metrics endpoint (Prometheus scrape, optional)
//! ```
//!
//! # Design Decisions
//! - Request ID (`x-request-id`) is attached to dispatch log events
//! - Metrics are cheap (atomic increments) and off by default

pub mod logging;
pub mod metrics;
