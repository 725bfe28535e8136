//! Adapter from the persistence layer's notifier to the host callback.

use std::sync::Arc;

use super::callbacks::DataChangeCallback;
use crate::store::{DataChangeEvent, DataChangeNotifier, Subscription};

/// Subscribe `callback` to `notifier`, replacing any previous subscriber.
pub fn subscribe(
    notifier: &Arc<DataChangeNotifier>,
    callback: Arc<dyn DataChangeCallback>,
) -> Subscription {
    notifier.subscribe(Arc::new(move |event: &DataChangeEvent| {
        callback.on_change(&event.model);
    }))
}
