//! Event Streams
//!
//! An event node holds a per-turn buffer of emitted items. Derived event
//! nodes (filter, map) pull from their predecessor's buffer when the
//! scheduler visits them; source nodes have their buffer written during
//! the collecting phase of a turn.
//!
//! An event node counts as "changed" for a turn exactly when its buffer
//! is non-empty after recomputation. A filter whose output is empty
//! therefore stops propagation on its branch.

use std::sync::Arc;

use parking_lot::Mutex;

use super::observer::{ObserverHandle, ObserverList};
use crate::domain::{DomainCore, Injection};
use crate::error::GraphError;
use crate::graph::node::{EdgeKind, NodeInfo, NodeKind, ReactiveNode};

/// How an event node fills its buffer when visited.
pub(crate) enum EventOp<T> {
    /// Root node; the buffer is staged by injection before propagation.
    Source,
    /// Derived node; reads the predecessor's buffer.
    Derived(Box<dyn Fn(&mut Vec<T>) + Send + Sync>),
}

pub(crate) struct EventCore<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub(crate) info: NodeInfo,
    /// Items emitted this turn; empty outside an active turn.
    pub(crate) buffer: Mutex<Vec<T>>,
    pub(crate) observers: ObserverList<T>,
    op: EventOp<T>,
}

impl<T> ReactiveNode for EventCore<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn info(&self) -> &NodeInfo {
        &self.info
    }

    fn recompute(&self) -> bool {
        let mut buffer = self.buffer.lock();
        if let EventOp::Derived(apply) = &self.op {
            apply(&mut buffer);
        }
        !buffer.is_empty()
    }

    fn changed_this_turn(&self) -> bool {
        !self.buffer.lock().is_empty()
    }

    fn notify(&self) {
        let items = self.buffer.lock().clone();
        self.observers.deliver_each(&items);
    }

    fn settle(&self) {
        self.buffer.lock().clear();
    }
}

/// A stream of discrete occurrences within one domain.
///
/// Handles are cheap to clone; clones refer to the same node.
pub struct Event<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub(crate) core: Arc<EventCore<T>>,
    pub(crate) domain: Arc<DomainCore>,
}

impl<T> Event<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Derive a stream keeping only the items that satisfy `predicate`,
    /// in input order.
    pub fn filter(
        &self,
        predicate: impl Fn(&T) -> bool + Send + Sync + 'static,
    ) -> Result<Event<T>, GraphError> {
        let input = Arc::clone(&self.core);
        self.derive(Box::new(move |out| {
            for item in input.buffer.lock().iter() {
                if predicate(item) {
                    out.push(item.clone());
                }
            }
        }))
    }

    /// Derive a stream mapping every item through `f`, preserving order
    /// and multiplicity.
    pub fn map<U>(
        &self,
        f: impl Fn(&T) -> U + Send + Sync + 'static,
    ) -> Result<Event<U>, GraphError>
    where
        U: Clone + Send + Sync + 'static,
    {
        let input = Arc::clone(&self.core);
        self.derive(Box::new(move |out: &mut Vec<U>| {
            for item in input.buffer.lock().iter() {
                out.push(f(item));
            }
        }))
    }

    /// Register a callback invoked once per item the stream emits, in
    /// emission order, after the turn has settled.
    pub fn observe(&self, callback: impl Fn(&T) + Send + Sync + 'static) -> ObserverHandle {
        self.core.observers.attach(callback)
    }

    fn derive<U>(
        &self,
        apply: Box<dyn Fn(&mut Vec<U>) + Send + Sync>,
    ) -> Result<Event<U>, GraphError>
    where
        U: Clone + Send + Sync + 'static,
    {
        let info = NodeInfo::new(NodeKind::Event, self.core.info.level() + 1, self.domain.id());
        let id = info.id();
        let core = Arc::new(EventCore {
            info,
            buffer: Mutex::new(Vec::new()),
            observers: ObserverList::new(),
            op: EventOp::Derived(apply),
        });
        self.domain.register(core.clone())?;
        self.core.info.connect(id, EdgeKind::Trigger);
        Ok(Event {
            core,
            domain: Arc::clone(&self.domain),
        })
    }
}

impl<T> Clone for Event<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            core: Arc::clone(&self.core),
            domain: Arc::clone(&self.domain),
        }
    }
}

impl<T> std::fmt::Debug for Event<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Event")
            .field("id", &self.core.info.id().raw())
            .field("level", &self.core.info.level())
            .finish()
    }
}

/// A root event node accepting external input.
pub struct EventSource<T>
where
    T: Clone + Send + Sync + 'static,
{
    event: Event<T>,
}

impl<T> EventSource<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub(crate) fn new(domain: &Arc<DomainCore>) -> Result<Self, GraphError> {
        let info = NodeInfo::new(NodeKind::Event, 0, domain.id());
        let core = Arc::new(EventCore {
            info,
            buffer: Mutex::new(Vec::new()),
            observers: ObserverList::new(),
            op: EventOp::Source,
        });
        domain.register(core.clone())?;
        Ok(Self {
            event: Event {
                core,
                domain: Arc::clone(domain),
            },
        })
    }

    /// Inject one value, starting a turn.
    ///
    /// Blocks until the turn has fully completed (through notification).
    /// Called from inside an active turn on this domain (for example from
    /// an observer callback), the value is queued and a fresh turn starts
    /// once the current one finishes.
    pub fn inject(&self, value: T) -> Result<(), GraphError> {
        self.inject_all([value])
    }

    /// Inject several values as a single turn; the stream emits them in
    /// the given order within that one turn.
    pub fn inject_all(&self, values: impl IntoIterator<Item = T>) -> Result<(), GraphError> {
        let staged: Vec<T> = values.into_iter().collect();
        let core = Arc::clone(&self.event.core);
        let node = Arc::clone(&self.event.core) as Arc<dyn ReactiveNode>;
        self.event.domain.inject(Injection::new(node, move || {
            core.buffer.lock().extend(staged);
        }))
    }

    /// The stream view of this source, for attaching combinators.
    pub fn events(&self) -> Event<T> {
        self.event.clone()
    }
}

impl<T> Clone for EventSource<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            event: self.event.clone(),
        }
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
