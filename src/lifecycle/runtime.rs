//! The server runtime aggregate.
//!
//! Everything a running server needs (configuration, routing tree, store,
//! listener slots, idle timer, host event sink) hangs off one cloneable
//! [`ServerRuntime`]. Start and shutdown live in `startup.rs` and
//! `shutdown.rs`.

use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use axum::Router;

use super::idle::IdleTimer;
use super::state::ServerState;
use crate::backup::{BackupError, RestoreReport, Restorer, SnapshotCodec};
use crate::bridge::{EventCallback, TracingEvents};
use crate::config::ServerConfig;
use crate::http::default_routes;
use crate::net::listener::ListenerKind;
use crate::ops::{MountOperations, Operations};
use crate::store::{MemoryStore, Repository, Store};

#[derive(Clone)]
pub struct ServerRuntime {
    pub(super) inner: Arc<RuntimeInner>,
}

pub(super) struct RuntimeInner {
    pub(super) config: ServerConfig,
    pub(super) router: Router,
    pub(super) repository: Arc<Repository>,
    pub(super) operations: Arc<dyn Operations>,
    pub(super) events: ArcSwap<Arc<dyn EventCallback>>,
    pub(super) state: ServerState,
    pub(super) idle: Arc<IdleTimer>,
}

impl std::fmt::Debug for ServerRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerRuntime")
            .field("state", &self.inner.state)
            .field("idle", &self.inner.idle)
            .finish()
    }
}

/// Builder for [`ServerRuntime`]. Unset parts fall back to an in-memory
/// store, a `/ping` routing tree, [`MountOperations`], and log-only events.
pub struct ServerRuntimeBuilder {
    config: ServerConfig,
    store: Option<Arc<dyn Store>>,
    router: Option<Router>,
    operations: Option<Arc<dyn Operations>>,
    events: Option<Arc<dyn EventCallback>>,
}

impl ServerRuntimeBuilder {
    pub fn store(mut self, store: Arc<dyn Store>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn router(mut self, router: Router) -> Self {
        self.router = Some(router);
        self
    }

    pub fn operations(mut self, operations: Arc<dyn Operations>) -> Self {
        self.operations = Some(operations);
        self
    }

    pub fn events(mut self, events: Arc<dyn EventCallback>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn build(self) -> ServerRuntime {
        let store = self.store.unwrap_or_else(|| Arc::new(MemoryStore::new()));
        let repository = Arc::new(Repository::new(store, self.config.data_change.kinds.clone()));
        let operations = self
            .operations
            .unwrap_or_else(|| Arc::new(MountOperations::new(Arc::clone(&repository))));
        let events = self.events.unwrap_or_else(|| Arc::new(TracingEvents));

        let idle = Arc::new(IdleTimer::default());
        idle.set_auto_stop_hours(self.config.lifecycle.auto_stop_hours);

        ServerRuntime {
            inner: Arc::new(RuntimeInner {
                router: self.router.unwrap_or_else(default_routes),
                config: self.config,
                repository,
                operations,
                events: ArcSwap::from_pointee(events),
                state: ServerState::new(),
                idle,
            }),
        }
    }
}

impl ServerRuntime {
    pub fn builder(config: ServerConfig) -> ServerRuntimeBuilder {
        ServerRuntimeBuilder {
            config,
            store: None,
            router: None,
            operations: None,
            events: None,
        }
    }

    /// A runtime with every default part.
    pub fn new(config: ServerConfig) -> Self {
        Self::builder(config).build()
    }

    pub fn config(&self) -> &ServerConfig {
        &self.inner.config
    }

    pub fn repository(&self) -> &Arc<Repository> {
        &self.inner.repository
    }

    pub fn operations(&self) -> &Arc<dyn Operations> {
        &self.inner.operations
    }

    /// Replace the sink for listener and exit notifications.
    pub fn set_events(&self, events: Arc<dyn EventCallback>) {
        self.inner.events.store(Arc::new(events));
    }

    pub(super) fn events(&self) -> Arc<dyn EventCallback> {
        let events = self.inner.events.load_full();
        Arc::clone(events.as_ref())
    }

    pub fn is_running(&self, kind: ListenerKind) -> bool {
        self.inner.state.is_running(kind)
    }

    /// Host-facing check by kind name. An unrecognized name asks whether
    /// every listener is running.
    pub fn is_running_named(&self, kind: &str) -> bool {
        match kind.parse::<ListenerKind>() {
            Ok(kind) => self.is_running(kind),
            Err(_) => self.inner.state.is_running_all(),
        }
    }

    pub fn is_running_any(&self) -> bool {
        self.inner.state.is_running_any()
    }

    /// `0` disables auto-stop. Applies to a running countdown immediately.
    pub fn set_auto_stop_hours(&self, hours: u32) {
        self.inner.idle.set_auto_stop_hours(hours);
    }

    pub fn set_idle_window(&self, window: Duration) {
        self.inner.idle.set_window(window);
    }

    pub fn idle_window(&self) -> Duration {
        self.inner.idle.window()
    }

    /// Snapshot the kinds enabled in `backup.kinds`.
    pub fn backup(&self) -> Result<String, BackupError> {
        SnapshotCodec::new(&self.inner.repository, &self.inner.config.backup.kinds).backup()
    }

    /// Apply a snapshot; the storage cache is reloaded if the plain HTTP
    /// listener is running once storages are written.
    pub fn restore(&self, text: &str) -> RestoreReport {
        Restorer::new(&self.inner.repository, self.inner.operations.as_ref(), || {
            self.is_running(ListenerKind::Http)
        })
        .restore(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SchemeConfig;
    use crate::store::{EntityKind, Storage};

    fn runtime() -> ServerRuntime {
        let config = ServerConfig {
            scheme: SchemeConfig::disabled(),
            ..ServerConfig::default()
        };
        ServerRuntime::new(config)
    }

    #[test]
    fn unknown_kind_name_requires_all() {
        let runtime = runtime();
        assert!(!runtime.is_running_named("http"));
        assert!(!runtime.is_running_named("all"));
    }

    #[test]
    fn auto_stop_hours_from_config() {
        let mut config = ServerConfig::default();
        config.lifecycle.auto_stop_hours = 3;
        let runtime = ServerRuntime::new(config);
        assert_eq!(runtime.idle_window(), Duration::from_secs(3 * 60 * 60));

        runtime.set_auto_stop_hours(0);
        assert_eq!(runtime.idle_window(), Duration::from_secs(876_000 * 60 * 60));
    }

    #[test]
    fn backup_then_restore_converges() {
        let source = runtime();
        for (id, path) in [(1, "/a"), (2, "/b")] {
            source
                .repository()
                .upsert_storage(&Storage { id, mount_path: path.into(), ..Storage::default() })
                .unwrap();
        }
        let text = source.backup().unwrap();

        let target = runtime();
        target
            .repository()
            .upsert_storage(&Storage { id: 1, mount_path: "/stale".into(), ..Storage::default() })
            .unwrap();
        let report = target.restore(&text);

        assert_eq!(report.applied(EntityKind::Storages), 2);
        assert!(!report.cache_reloaded);
        assert_eq!(target.repository().storages().unwrap(), source.repository().storages().unwrap());
    }
}
