//! Embeddable lifecycle controller for a multi-listener HTTP server, with
//! configuration snapshot backup and restore.

pub mod backup;
pub mod bridge;
pub mod config;
pub mod host;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod ops;
pub mod store;

pub use config::schema::ServerConfig;
pub use host::HostController;
pub use lifecycle::ServerRuntime;
pub use net::listener::ListenerKind;
