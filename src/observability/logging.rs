//! Structured logging setup.
//!
//! One global subscriber per process: `EnvFilter` (from `RUST_LOG`, falling
//! back to the configured level), a `fmt` layer for stdout, and the host log
//! layer. Later calls leave the subscriber in place.

use std::sync::OnceLock;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::bridge::log::HostLogLayer;

static INSTALLED: OnceLock<()> = OnceLock::new();

/// Install the global subscriber. Returns `false` if it was already set up.
pub fn init(default_level: &str) -> bool {
    let mut first = false;
    INSTALLED.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(format!("mount_server={default_level},tower_http={default_level}")));

        // Another subscriber may already be global (for example in tests).
        first = tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .with(HostLogLayer::global())
            .try_init()
            .is_ok();
    });
    first
}
