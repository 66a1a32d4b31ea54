//! Observers
//!
//! Observers are how results leave the graph. They are registered against
//! one node, fire during the notifying phase of a turn in which that node
//! changed, and are detached either explicitly or by dropping the handle.
//! Detaching is idempotent; detaching twice is a no-op.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

/// Detachable handle for a registered observer.
///
/// The observer stays registered for as long as the handle is alive;
/// dropping it detaches. A detached observer is never invoked again.
pub struct ObserverHandle {
    active: Arc<AtomicBool>,
}

impl ObserverHandle {
    /// Stop the observer from firing. Idempotent.
    pub fn detach(&self) {
        self.active.store(false, Ordering::SeqCst);
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }
}

impl Drop for ObserverHandle {
    fn drop(&mut self) {
        self.detach();
    }
}

struct ObserverEntry<T> {
    active: Arc<AtomicBool>,
    callback: Arc<dyn Fn(&T) + Send + Sync>,
}

impl<T> Clone for ObserverEntry<T> {
    fn clone(&self) -> Self {
        Self {
            active: Arc::clone(&self.active),
            callback: Arc::clone(&self.callback),
        }
    }
}

/// Per-node observer registry. Detached entries are compacted lazily at
/// delivery time.
pub(crate) struct ObserverList<T> {
    entries: Mutex<Vec<ObserverEntry<T>>>,
}

impl<T> ObserverList<T> {
    pub(crate) fn new() -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn attach(&self, callback: impl Fn(&T) + Send + Sync + 'static) -> ObserverHandle {
        let active = Arc::new(AtomicBool::new(true));
        self.entries.lock().push(ObserverEntry {
            active: Arc::clone(&active),
            callback: Arc::new(callback),
        });
        ObserverHandle { active }
    }

    /// Signal delivery: one call per observer with the settled value.
    pub(crate) fn deliver(&self, value: &T) {
        for entry in self.snapshot() {
            if entry.active.load(Ordering::SeqCst) {
                (entry.callback)(value);
            }
        }
    }

    /// Event delivery: each observer sees every buffered item, in order.
    pub(crate) fn deliver_each(&self, items: &[T]) {
        for entry in self.snapshot() {
            for item in items {
                if !entry.active.load(Ordering::SeqCst) {
                    break;
                }
                (entry.callback)(item);
            }
        }
    }

    /// Snapshot the live entries, dropping detached ones. The lock is not
    /// held while callbacks run, so a callback may attach or detach
    /// observers without deadlocking.
    fn snapshot(&self) -> Vec<ObserverEntry<T>> {
        let mut entries = self.entries.lock();
        entries.retain(|entry| entry.active.load(Ordering::SeqCst));
        entries.clone()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use crate::domain::Domain;

    #[test]
    fn detach_stops_delivery() {
        let domain = Domain::sequential();
        let source = domain.event_source::<i32>().unwrap();
        let total = source.events().fold(0, |v, acc| acc + v).unwrap();

        let fired = Arc::new(AtomicUsize::new(0));
        let counter = fired.clone();
        let handle = total.observe(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        source.inject(1).unwrap();
        assert_eq!(fired.load(Ordering::SeqCst), 1);

        handle.detach();
        source.inject(1).unwrap();
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn double_detach_is_a_noop() {
        let domain = Domain::sequential();
        let source = domain.event_source::<i32>().unwrap();
        let handle = source.events().observe(|_| {});

        handle.detach();
        handle.detach();
        assert!(!handle.is_active());
        source.inject(1).unwrap();
    }

    #[test]
    fn dropping_the_handle_detaches() {
        let domain = Domain::sequential();
        let source = domain.event_source::<i32>().unwrap();

        let fired = Arc::new(AtomicUsize::new(0));
        {
            let counter = fired.clone();
            let _handle = source.events().observe(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            });
        }

        source.inject(1).unwrap();
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn observers_fire_in_level_order() {
        let domain = Domain::sequential();
        let source = domain.event_source::<i32>().unwrap();
        let low = source.events().fold(0, |v, acc| acc + v).unwrap();
        let high = low.map(|v| v * 2).unwrap();

        let order = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let low_sink = order.clone();
        let _low_observer = low.observe(move |_| low_sink.lock().push("low"));
        let high_sink = order.clone();
        let _high_observer = high.observe(move |_| high_sink.lock().push("high"));

        source.inject(1).unwrap();
        assert_eq!(*order.lock(), vec!["low", "high"]);
    }
}
