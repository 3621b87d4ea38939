use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use wattsense_client::BoardId;

use crate::optimistic::TogglePhase;

/// Change notification sent to store subscribers.
///
/// Events carry no data. Subscribers re-read whatever they render from the
/// store, which always hands out the latest snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreEvent {
    /// Board snapshot, phase, error flag or optimistic overlay changed.
    BoardsChanged,
    FloorsChanged,
    /// An optimistic toggle moved to a new phase.
    Toggle { id: BoardId, phase: TogglePhase },
}

/// Callback type for store change notifications.
pub type ChangeHandler = Arc<dyn Fn(&StoreEvent) + Send + Sync>;

/// Handle returned by `subscribe`, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Registered handlers, in subscription order.
pub(crate) struct Subscribers {
    handlers: RwLock<Vec<(SubscriptionId, ChangeHandler)>>,
    next_id: AtomicU64,
}

impl Subscribers {
    pub(crate) fn new() -> Self {
        Self {
            handlers: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    pub(crate) fn subscribe<F>(&self, handler: F) -> SubscriptionId
    where
        F: Fn(&StoreEvent) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.handlers.write().unwrap().push((id, Arc::new(handler)));
        id
    }

    /// Returns `false` if the id was not registered.
    pub(crate) fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut handlers = self.handlers.write().unwrap();
        let before = handlers.len();
        handlers.retain(|(sid, _)| *sid != id);
        handlers.len() != before
    }

    pub(crate) fn clear(&self) {
        self.handlers.write().unwrap().clear();
    }

    pub(crate) fn len(&self) -> usize {
        self.handlers.read().unwrap().len()
    }

    /// Handlers run outside the lock, so a handler may subscribe or
    /// unsubscribe without deadlocking.
    pub(crate) fn notify(&self, event: &StoreEvent) {
        let handlers: Vec<ChangeHandler> = self
            .handlers
            .read()
            .unwrap()
            .iter()
            .map(|(_, h)| h.clone())
            .collect();
        for handler in handlers {
            handler(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notify_reaches_every_subscriber() {
        let subs = Subscribers::new();
        let count = Arc::new(AtomicU64::new(0));
        for _ in 0..3 {
            let c = count.clone();
            subs.subscribe(move |_| {
                c.fetch_add(1, Ordering::Relaxed);
            });
        }

        subs.notify(&StoreEvent::BoardsChanged);
        assert_eq!(count.load(Ordering::Relaxed), 3);
    }

    #[test]
    fn unsubscribe_stops_notifications() {
        let subs = Subscribers::new();
        let count = Arc::new(AtomicU64::new(0));
        let c = count.clone();
        let id = subs.subscribe(move |_| {
            c.fetch_add(1, Ordering::Relaxed);
        });

        assert!(subs.unsubscribe(id));
        assert!(!subs.unsubscribe(id));
        subs.notify(&StoreEvent::FloorsChanged);
        assert_eq!(count.load(Ordering::Relaxed), 0);
        assert_eq!(subs.len(), 0);
    }

    #[test]
    fn ids_are_unique() {
        let subs = Subscribers::new();
        let a = subs.subscribe(|_| {});
        let b = subs.subscribe(|_| {});
        assert_ne!(a, b);
    }

    #[test]
    fn handler_may_unsubscribe_itself() {
        let subs = Arc::new(Subscribers::new());
        let slot: Arc<RwLock<Option<SubscriptionId>>> = Arc::new(RwLock::new(None));

        let subs_c = subs.clone();
        let slot_c = slot.clone();
        let id = subs.subscribe(move |_| {
            if let Some(id) = *slot_c.read().unwrap() {
                subs_c.unsubscribe(id);
            }
        });
        *slot.write().unwrap() = Some(id);

        subs.notify(&StoreEvent::BoardsChanged);
        assert_eq!(subs.len(), 0);
    }
}
