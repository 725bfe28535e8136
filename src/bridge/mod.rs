//! Host callback bridge.
//!
//! # Data Flow
//! ```text
//! tracing event  → log.rs (HostLogLayer)        → LogCallback::on_log
//! fatal exit     → log.rs (exit)                → EventCallback::on_process_exit
//! store mutation → data_change.rs (subscription) → DataChangeCallback::on_change
//! listener exit  → lifecycle                     → EventCallback::on_start_error / on_shutdown
//! ```

pub mod callbacks;
pub mod data_change;
pub mod log;

pub use callbacks::{DataChangeCallback, EventCallback, LogCallback, TracingEvents};
