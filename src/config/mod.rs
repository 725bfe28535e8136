//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → ServerConfig (validated, immutable)
//!     → shared via Arc with the server runtime
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; the host restarts the server to apply changes
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{
    BackupConfig, DataChangeConfig, LifecycleConfig, ObservabilityConfig, SchemeConfig,
    ServerConfig, DISABLED_PORT,
};
