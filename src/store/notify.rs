//! Data-change observer registration.
//!
//! The notifier holds at most one subscriber. Subscribing replaces the
//! previous subscriber; disposing a stale [`Subscription`] leaves a newer
//! subscriber in place.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use arc_swap::ArcSwapOption;

use super::{EntityKind, Mutation};

/// A notification that an entity kind was mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataChangeEvent {
    pub model: String,
}

impl From<Mutation> for DataChangeEvent {
    fn from(mutation: Mutation) -> Self {
        Self::for_kind(mutation.kind)
    }
}

impl DataChangeEvent {
    pub fn for_kind(kind: EntityKind) -> Self {
        Self {
            model: kind.model_name().to_string(),
        }
    }
}

/// Callback invoked synchronously for every published event.
pub type ChangeListener = Arc<dyn Fn(&DataChangeEvent) + Send + Sync>;

struct Subscriber {
    id: u64,
    listener: ChangeListener,
}

/// Single-subscriber data-change notifier.
#[derive(Default)]
pub struct DataChangeNotifier {
    current: ArcSwapOption<Subscriber>,
    next_id: AtomicU64,
}

impl std::fmt::Debug for DataChangeNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataChangeNotifier")
            .field("subscribed", &self.has_subscriber())
            .finish()
    }
}

impl DataChangeNotifier {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Install `listener`, replacing any current subscriber.
    pub fn subscribe(self: &Arc<Self>, listener: ChangeListener) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let previous = self.current.swap(Some(Arc::new(Subscriber { id, listener })));
        if let Some(previous) = previous {
            tracing::debug!(previous = previous.id, current = id, "Replaced data-change subscriber");
        }
        Subscription {
            id,
            notifier: Arc::downgrade(self),
        }
    }

    /// Deliver `event` to the current subscriber, if any.
    pub fn publish(&self, event: &DataChangeEvent) {
        match self.current.load_full() {
            Some(subscriber) => (subscriber.listener)(event),
            None => tracing::trace!(model = %event.model, "Data change without subscriber"),
        }
    }

    pub fn has_subscriber(&self) -> bool {
        self.current.load().is_some()
    }

    fn unsubscribe(&self, id: u64) {
        let current = self.current.load_full();
        if current.as_ref().is_some_and(|s| s.id == id) {
            self.current.compare_and_swap(&current, None::<Arc<Subscriber>>);
        }
    }
}

/// Handle to an installed subscriber. Dropping it unsubscribes.
#[derive(Debug)]
pub struct Subscription {
    id: u64,
    notifier: Weak<DataChangeNotifier>,
}

impl Subscription {
    pub fn dispose(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(notifier) = self.notifier.upgrade() {
            notifier.unsubscribe(self.id);
        }
    }
}
