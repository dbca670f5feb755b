//! Per-session registry of message listeners

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use purecool_api::StatusMessage;

/// A callback invoked with every decoded status message
pub type MessageListener = Arc<dyn Fn(&StatusMessage) + Send + Sync>;

/// Handle returned by [`Session::add_message_listener`](crate::Session::add_message_listener)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "listener-{}", self.0)
    }
}

/// Listeners in registration order
///
/// Entries are keyed by id, not by callback, so the same callback added twice
/// is two independent entries.
#[derive(Default)]
pub(crate) struct ListenerRegistry {
    next_id: u64,
    entries: Vec<(ListenerId, MessageListener)>,
}

impl ListenerRegistry {
    pub(crate) fn add(&mut self, listener: MessageListener) -> ListenerId {
        self.next_id += 1;
        let id = ListenerId(self.next_id);
        self.entries.push((id, listener));
        id
    }

    /// Returns false if `id` was not registered
    pub(crate) fn remove(&mut self, id: ListenerId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(entry, _)| *entry != id);
        self.entries.len() != before
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    /// Clone of the current listeners, so they can run without the lock held
    pub(crate) fn snapshot(&self) -> Vec<(ListenerId, MessageListener)> {
        self.entries.clone()
    }
}

/// Invoke each listener in order, isolating panics
pub(crate) fn dispatch(listeners: &[(ListenerId, MessageListener)], message: &StatusMessage) {
    for (id, listener) in listeners {
        if panic::catch_unwind(AssertUnwindSafe(|| listener(message))).is_err() {
            tracing::warn!("{} panicked while handling {}", id, message.kind());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn counting(counter: &Arc<AtomicU32>) -> MessageListener {
        let counter = Arc::clone(counter);
        Arc::new(move |_: &StatusMessage| {
            counter.fetch_add(1, Ordering::SeqCst);
        })
    }

    fn other(kind: &str) -> StatusMessage {
        StatusMessage::Other {
            kind: kind.to_string(),
        }
    }

    #[test]
    fn test_same_listener_twice_is_two_entries() {
        let counter = Arc::new(AtomicU32::new(0));
        let listener = counting(&counter);
        let mut registry = ListenerRegistry::default();

        let first = registry.add(Arc::clone(&listener));
        let second = registry.add(listener);
        assert_ne!(first, second);
        assert_eq!(registry.len(), 2);

        dispatch(&registry.snapshot(), &other("HELLO"));
        assert_eq!(counter.load(Ordering::SeqCst), 2);

        assert!(registry.remove(first));
        assert_eq!(registry.len(), 1);
        dispatch(&registry.snapshot(), &other("HELLO"));
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_remove_unknown_is_noop() {
        let mut registry = ListenerRegistry::default();
        let id = registry.add(Arc::new(|_: &StatusMessage| {}));
        assert!(registry.remove(id));
        assert!(!registry.remove(id));
        assert_eq!(registry.len(), 0);
    }

    #[test]
    fn test_clear() {
        let mut registry = ListenerRegistry::default();
        registry.add(Arc::new(|_: &StatusMessage| {}));
        registry.add(Arc::new(|_: &StatusMessage| {}));
        registry.clear();
        assert_eq!(registry.len(), 0);
    }

    #[test]
    fn test_panicking_listener_does_not_stop_the_rest() {
        let counter = Arc::new(AtomicU32::new(0));
        let mut registry = ListenerRegistry::default();
        registry.add(Arc::new(|_: &StatusMessage| panic!("listener failure")));
        registry.add(counting(&counter));

        dispatch(&registry.snapshot(), &other("HELLO"));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_dispatch_in_registration_order() {
        let order = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let mut registry = ListenerRegistry::default();
        for n in 0..3 {
            let order = Arc::clone(&order);
            registry.add(Arc::new(move |_: &StatusMessage| order.lock().push(n)));
        }

        dispatch(&registry.snapshot(), &other("HELLO"));
        assert_eq!(*order.lock(), vec![0, 1, 2]);
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        #[derive(Debug, Clone)]
        enum Op {
            Add,
            Remove(usize),
            Clear,
        }

        fn op() -> impl Strategy<Value = Op> {
            prop_oneof![
                4 => Just(Op::Add),
                3 => (0usize..16).prop_map(Op::Remove),
                1 => Just(Op::Clear),
            ]
        }

        proptest! {
            /// The registry behaves like a list of live ids
            #[test]
            fn prop_registry_tracks_live_entries(ops in proptest::collection::vec(op(), 0..40)) {
                let mut registry = ListenerRegistry::default();
                let mut issued: Vec<ListenerId> = Vec::new();
                let mut live: Vec<ListenerId> = Vec::new();

                for op in ops {
                    match op {
                        Op::Add => {
                            let id = registry.add(Arc::new(|_: &StatusMessage| {}));
                            prop_assert!(!issued.contains(&id));
                            issued.push(id);
                            live.push(id);
                        }
                        Op::Remove(index) => {
                            if let Some(id) = issued.get(index).copied() {
                                let was_live = live.contains(&id);
                                prop_assert_eq!(registry.remove(id), was_live);
                                live.retain(|entry| *entry != id);
                            }
                        }
                        Op::Clear => {
                            registry.clear();
                            live.clear();
                        }
                    }
                    prop_assert_eq!(registry.len(), live.len());
                }

                let ids: Vec<ListenerId> =
                    registry.snapshot().into_iter().map(|(id, _)| id).collect();
                prop_assert_eq!(ids, live);
            }
        }
    }
}
