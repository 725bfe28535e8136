//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! ListenerSpec (from SchemeConfig)
//!     → listener.rs (bind, accept loop, shutdown flag)
//!     → tls.rs (certificate loading, handshake on HTTPS)
//!     → unix.rs (socket file bind, permissions, cleanup)
//!     → connection.rs (live-connection count for drain)
//!     → Hand off to HTTP layer
//! ```
//!
//! # Design Decisions
//! - One task per listener kind; a failed bind stays local to that kind
//! - Shutdown stops accepting first, then waits for live connections
//! - Accept errors back off instead of ending the listener

pub mod connection;
pub mod listener;
pub mod tls;
#[cfg(unix)]
pub mod unix;
