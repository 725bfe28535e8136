//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the server.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

use crate::store::EntitySet;

/// Port value that disables a TCP listener.
pub const DISABLED_PORT: i32 = -1;

/// Root configuration for the mount server.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ServerConfig {
    /// Listener addresses, ports and socket settings.
    pub scheme: SchemeConfig,

    /// Seconds to wait before running bootstrap steps on start.
    pub delayed_start: u64,

    /// Idle timer and shutdown settings.
    pub lifecycle: LifecycleConfig,

    /// Entity kinds written by backups.
    pub backup: BackupConfig,

    /// Entity kinds whose mutations are published to the host.
    pub data_change: DataChangeConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration for the three transports.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SchemeConfig {
    /// Bind address shared by the HTTP and HTTPS listeners.
    pub address: String,

    /// Plain HTTP port, `-1` disables the listener.
    pub http_port: i32,

    /// TLS port, `-1` disables the listener.
    pub https_port: i32,

    /// Certificate chain (PEM) for the TLS listener.
    pub cert_file: String,

    /// Private key (PEM) for the TLS listener.
    pub key_file: String,

    /// Unix socket path, empty disables the listener.
    pub unix_file: String,

    /// Octal permission applied to the socket file (e.g. "0666").
    pub unix_file_perm: String,
}

impl Default for SchemeConfig {
    fn default() -> Self {
        Self {
            address: "0.0.0.0".to_string(),
            http_port: 5244,
            https_port: DISABLED_PORT,
            cert_file: String::new(),
            key_file: String::new(),
            unix_file: String::new(),
            unix_file_perm: String::new(),
        }
    }
}

impl SchemeConfig {
    /// A scheme with every listener disabled.
    pub fn disabled() -> Self {
        Self {
            http_port: DISABLED_PORT,
            https_port: DISABLED_PORT,
            ..Self::default()
        }
    }
}

/// Lifecycle configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LifecycleConfig {
    /// Hours without requests before the server stops itself (0 = never).
    pub auto_stop_hours: u32,

    /// Drain deadline used by the standalone binary on exit.
    pub shutdown_timeout_ms: u64,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            auto_stop_hours: 0,
            shutdown_timeout_ms: 5_000,
        }
    }
}

/// Backup configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct BackupConfig {
    /// Kinds included in a snapshot.
    pub kinds: EntitySet,
}

/// Data-change hook configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct DataChangeConfig {
    /// Kinds whose writes notify the host.
    pub kinds: EntitySet,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable the Prometheus metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}
