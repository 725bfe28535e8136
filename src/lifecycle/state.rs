//! Listener slots and the data-change subscription of a running server.
//!
//! Slots change only through pointer compare-and-swap: a listener task
//! and a concurrent shutdown can both try to release the same handle, and
//! exactly one of them succeeds.

use std::sync::Arc;

use arc_swap::ArcSwapOption;

use crate::net::listener::{ListenerHandle, ListenerKind};
use crate::store::Subscription;

#[derive(Default)]
pub struct ServerState {
    http: ArcSwapOption<ListenerHandle>,
    https: ArcSwapOption<ListenerHandle>,
    unix: ArcSwapOption<ListenerHandle>,
    subscription: ArcSwapOption<Subscription>,
}

impl std::fmt::Debug for ServerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerState")
            .field("http", &self.is_running(ListenerKind::Http))
            .field("https", &self.is_running(ListenerKind::Https))
            .field("unix", &self.is_running(ListenerKind::Unix))
            .finish()
    }
}

impl ServerState {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, kind: ListenerKind) -> &ArcSwapOption<ListenerHandle> {
        match kind {
            ListenerKind::Http => &self.http,
            ListenerKind::Https => &self.https,
            ListenerKind::Unix => &self.unix,
        }
    }

    /// Store `handle` if its slot is empty. Returns `false` if occupied.
    pub fn install(&self, handle: Arc<ListenerHandle>) -> bool {
        let previous = self
            .slot(handle.kind())
            .compare_and_swap(&None::<Arc<ListenerHandle>>, Some(handle));
        previous.is_none()
    }

    pub fn current(&self, kind: ListenerKind) -> Option<Arc<ListenerHandle>> {
        self.slot(kind).load_full()
    }

    /// Empty the slot if it still holds `handle`. Returns `true` only for
    /// the caller that emptied it.
    pub fn release(&self, handle: &Arc<ListenerHandle>) -> bool {
        let expected = Some(Arc::clone(handle));
        let previous = self
            .slot(handle.kind())
            .compare_and_swap(&expected, None::<Arc<ListenerHandle>>);
        (*previous)
            .as_ref()
            .is_some_and(|previous| Arc::ptr_eq(previous, handle))
    }

    pub fn is_running(&self, kind: ListenerKind) -> bool {
        self.slot(kind).load().is_some()
    }

    pub fn is_running_any(&self) -> bool {
        ListenerKind::ALL.into_iter().any(|kind| self.is_running(kind))
    }

    pub fn is_running_all(&self) -> bool {
        ListenerKind::ALL.into_iter().all(|kind| self.is_running(kind))
    }

    /// Keep `subscription` alive until [`ServerState::dispose_subscription`]
    /// or the next call; the replaced one is dropped.
    pub fn set_subscription(&self, subscription: Subscription) {
        self.subscription.store(Some(Arc::new(subscription)));
    }

    pub fn dispose_subscription(&self) {
        self.subscription.store(None);
    }
}
