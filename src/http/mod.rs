//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! accepted stream (TCP, TLS, Unix)
//!     → server.rs (hyper auto builder: HTTP/1.1 or HTTP/2)
//!     → TraceLayer (access log)
//!     → middleware/idle_reset.rs (push idle deadline)
//!     → embedder's routing tree
//! ```

pub mod middleware;
pub mod server;

pub use server::{build_routing_tree, default_routes, serve_connection};
