//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Router, ReloadCoordinator, admin endpoints produce:
//!     → logging.rs (structured log events, request-id spans)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Consumers:
//!     → stdout (JSON in release mode, pretty in debug mode)
//!     → Prometheus scrape of the metrics listener
//! ```
//!
//! # Design Decisions
//! - Request ID flows through every span for a request
//! - Metrics are cheap (atomic increments) and no-ops until a recorder is installed
//! - Secrets never appear in log fields

pub mod logging;
pub mod metrics;
