//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Delay → Bootstrap steps → Routing tree + idle reset → Arm idle timer
//!     → Launch listeners → Subscribe data-change bridge
//!
//! Idle (idle.rs):
//!     Request → reset deadline; deadline passes → shutdown(0) on its own task
//!
//! Shutdown (shutdown.rs):
//!     http → https → unix: stop accepting → drain within deadline → report
//!     → Disarm idle timer → Dispose data-change subscription
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → standalone binary shuts down
//! ```
//!
//! # Design Decisions
//! - All state lives in one injectable `ServerRuntime`, no globals
//! - Listener slots are taken with compare-and-swap; whoever empties a slot
//!   reports that listener's exit, so the host hears about it exactly once
//! - Shutdown has a per-listener deadline and stops at the first miss

pub mod idle;
pub mod runtime;
pub mod shutdown;
pub mod signals;
pub mod startup;
pub mod state;

pub use idle::IdleTimer;
pub use runtime::{ServerRuntime, ServerRuntimeBuilder};
pub use shutdown::ShutdownError;
pub use startup::StartError;
pub use state::ServerState;
