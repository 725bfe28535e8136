//! Startup orchestration.
//!
//! # Responsibilities
//! - Wait out the configured start delay
//! - Run bootstrap steps in order (fatal on failure)
//! - Assemble the routing tree and arm the idle timer
//! - Launch each configured listener on its own task
//! - Subscribe the host to data-change events
//!
//! # Design Decisions
//! - Bootstrap runs before any listener binds (traffic only when ready)
//! - A listener that fails to bind is reported to the host; the others keep going
//! - A kind whose slot is already occupied is left running

use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, warn};

use super::runtime::ServerRuntime;
use crate::bridge::{self, DataChangeCallback};
use crate::http::build_routing_tree;
use crate::net::listener::{self, ListenerHandle, ListenerSpec};
use crate::observability::metrics;
use crate::ops::OperationError;

/// Error type for startup.
#[derive(Debug, thiserror::Error)]
pub enum StartError {
    #[error("bootstrap step {step} failed: {source}")]
    Bootstrap {
        step: &'static str,
        #[source]
        source: OperationError,
    },
}

impl ServerRuntime {
    /// Start the server. Returns once every listener has been launched;
    /// bind results arrive through the host event sink.
    pub async fn start(&self, data_change: Arc<dyn DataChangeCallback>) -> Result<(), StartError> {
        let delay = self.inner.config.delayed_start;
        if delay > 0 {
            info!(seconds = delay, "Delaying start");
            tokio::time::sleep(Duration::from_secs(delay)).await;
        }

        self.bootstrap().inspect_err(|error| {
            error!(error = %error, "Bootstrap failed");
            bridge::log::exit(1);
        })?;

        let app = build_routing_tree(self.inner.router.clone(), Arc::clone(&self.inner.idle));
        self.arm_idle_timer();

        for spec in ListenerSpec::from_config(&self.inner.config.scheme) {
            self.launch(spec, app.clone());
        }

        let subscription = bridge::data_change::subscribe(self.inner.repository.notifier(), data_change);
        self.inner.state.set_subscription(subscription);
        Ok(())
    }

    fn bootstrap(&self) -> Result<(), StartError> {
        let operations = &self.inner.operations;
        run_step("init_offline_download_tools", || operations.init_offline_download_tools())?;
        run_step("load_storages", || operations.load_storages())?;
        run_step("init_task_manager", || operations.init_task_manager())
    }

    fn arm_idle_timer(&self) {
        let runtime = Arc::downgrade(&self.inner);
        self.inner.idle.arm(move || {
            let Some(inner) = runtime.upgrade() else {
                return;
            };
            let runtime = ServerRuntime { inner };
            tokio::spawn(async move {
                info!("Idle timeout reached, shutting down");
                if let Err(error) = runtime.shutdown(Duration::ZERO).await {
                    warn!(error = %error, "Idle shutdown incomplete");
                }
            });
        });
    }

    fn launch(&self, spec: ListenerSpec, app: axum::Router) {
        let kind = spec.kind;
        let handle = ListenerHandle::new(kind);
        if !self.inner.state.install(Arc::clone(&handle)) {
            warn!(listener = %kind, "Listener already running");
            return;
        }

        info!(listener = %kind, endpoint = %spec.endpoint, "Starting listener");
        let runtime = self.clone();
        tokio::spawn(async move {
            let result = listener::run(spec, app, Arc::clone(&handle)).await;
            if !runtime.inner.state.release(&handle) {
                return;
            }
            let events = runtime.events();
            match result {
                Ok(()) => {
                    metrics::record_listener_exit(kind.as_str(), "shutdown");
                    events.on_shutdown(kind.as_str());
                }
                Err(error) => {
                    error!(listener = %kind, error = %error, "Listener failed");
                    metrics::record_listener_exit(kind.as_str(), "error");
                    events.on_start_error(kind.as_str(), &error.to_string());
                }
            }
        });
    }
}

fn run_step(
    step: &'static str,
    run: impl FnOnce() -> Result<(), OperationError>,
) -> Result<(), StartError> {
    tracing::debug!(step, "Running bootstrap step");
    run().map_err(|source| StartError::Bootstrap { step, source })
}
