//! Synchronous control surface for an embedding host.
//!
//! The host owns no async runtime of its own; [`HostController`] keeps a
//! multi-threaded tokio runtime and blocks the calling thread on each
//! operation.

use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::Runtime;

use crate::backup::RestoreReport;
use crate::bridge::{self, DataChangeCallback, EventCallback, LogCallback};
use crate::config::ServerConfig;
use crate::lifecycle::{ServerRuntime, ShutdownError, StartError};
use crate::observability::logging;

pub struct HostController {
    runtime: Runtime,
    server: ServerRuntime,
}

impl std::fmt::Debug for HostController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostController").field("server", &self.server).finish()
    }
}

impl HostController {
    /// Wrap `server` with a fresh runtime.
    pub fn new(server: ServerRuntime) -> std::io::Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .thread_name("mount-server")
            .build()?;
        Ok(Self { runtime, server })
    }

    /// A controller over a default runtime built from `config`.
    pub fn from_config(config: ServerConfig) -> std::io::Result<Self> {
        Self::new(ServerRuntime::new(config))
    }

    pub fn server(&self) -> &ServerRuntime {
        &self.server
    }

    /// Install the host's log and event sinks. Calling again swaps them.
    pub fn init(&self, events: Arc<dyn EventCallback>, log: Arc<dyn LogCallback>) {
        logging::init(&self.server.config().observability.log_level);
        bridge::log::install(log, Arc::clone(&events));
        self.server.set_events(events);
        tracing::info!("Host bridge installed");
    }

    pub fn start(&self, data_change: Arc<dyn DataChangeCallback>) -> Result<(), StartError> {
        self.runtime.block_on(self.server.start(data_change))
    }

    pub fn shutdown(&self, timeout_ms: u64) -> Result<(), ShutdownError> {
        self.runtime
            .block_on(self.server.shutdown(Duration::from_millis(timeout_ms)))
    }

    /// `"http"`, `"https"` or `"unix"`; any other name asks whether all
    /// three are running.
    pub fn is_running(&self, kind: &str) -> bool {
        self.server.is_running_named(kind)
    }

    pub fn set_auto_stop_hours(&self, hours: u32) {
        self.server.set_auto_stop_hours(hours);
    }

    /// Snapshot text, or an empty string if the backup failed.
    pub fn backup(&self) -> String {
        self.server.backup().unwrap_or_default()
    }

    pub fn restore(&self, text: &str) -> RestoreReport {
        self.server.restore(text)
    }
}
