//! Coordinated shutdown.

use std::time::Duration;

use super::runtime::ServerRuntime;
use crate::net::listener::ListenerKind;
use crate::observability::metrics;

/// Error type for shutdown.
#[derive(Debug, thiserror::Error)]
pub enum ShutdownError {
    #[error("{kind} listener did not drain within {timeout:?}")]
    DrainTimeout { kind: ListenerKind, timeout: Duration },
}

impl ServerRuntime {
    /// Drain listeners in http, https, unix order, each within `timeout`.
    ///
    /// The first listener that misses its deadline aborts the remaining
    /// steps. Empty slots are skipped, so repeated calls succeed.
    pub async fn shutdown(&self, timeout: Duration) -> Result<(), ShutdownError> {
        for kind in ListenerKind::ALL {
            let Some(handle) = self.inner.state.current(kind) else {
                continue;
            };

            tracing::info!(listener = %kind, connections = handle.active_connections(), "Shutting down listener");
            if !handle.drain(timeout).await {
                tracing::error!(listener = %kind, ?timeout, "Listener drain timed out");
                return Err(ShutdownError::DrainTimeout { kind, timeout });
            }

            if self.inner.state.release(&handle) {
                metrics::record_listener_exit(kind.as_str(), "shutdown");
                self.events().on_shutdown(kind.as_str());
            }
        }

        self.inner.idle.disarm();
        self.inner.state.dispose_subscription();
        tracing::info!("Shutdown complete");
        Ok(())
    }
}
