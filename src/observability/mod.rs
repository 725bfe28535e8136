//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (tracing subscriber: filter, stdout, host log layer)
//!     → metrics.rs (counters and gauges)
//!
//! Consumers:
//!     → stdout
//!     → host LogCallback (via bridge::log)
//!     → Prometheus scrape endpoint (optional)
//! ```

pub mod logging;
pub mod metrics;
