//! Reactive Domains
//!
//! A domain is one isolated reactive universe: it owns every node created
//! under it, carries the concurrency policy that governs how turns are
//! executed, and serializes input injection.
//!
//! There is no ambient global domain. Applications construct a [`Domain`]
//! handle once at startup and pass it (or clone it; handles are cheap) to
//! whatever code builds the graph and injects input.
//!
//! # Ownership
//!
//! The domain's registry holds one strong reference per node for the
//! domain's lifetime, released at [`Domain::close`]. Downstream nodes keep
//! their predecessors alive through the closures generated at
//! construction, and forward edges are plain node IDs resolved through the
//! registry, so reference cycles cannot form.

mod turn;

use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, ThreadId};

use indexmap::IndexMap;
use parking_lot::Mutex;
use tracing::trace;

use crate::error::GraphError;
use crate::graph::node::{NodeId, ReactiveNode};
use crate::reactive::EventSource;

pub(crate) use turn::Injection;

/// Unique identifier for a domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DomainId(u64);

impl DomainId {
    fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    pub(crate) fn raw(&self) -> u64 {
        self.0
    }
}

/// How turns execute within a domain.
///
/// Turns themselves are always serialized: one turn runs to completion
/// before the next begins, regardless of policy. The policy chooses how
/// much parallelism a single turn may use internally.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Policy {
    /// Fully single-threaded propagation. The only policy that guarantees
    /// a deterministic notification sequence for a deterministic input
    /// sequence; use it whenever correctness depends on turn ordering.
    Sequential,

    /// Independent nodes at the same level recompute concurrently on
    /// worker threads. The result of a turn is still level-ordered and
    /// glitch-free; turn-to-turn ordering across injecting threads
    /// follows the FIFO queueing discipline of the domain. A closure
    /// executing on a worker thread counts as inside the turn: node
    /// construction from it fails with [`GraphError::TurnActive`] and
    /// injection from it is queued, exactly as on the injecting thread.
    Parallel,
}

/// Handle to a reactive domain. Cloning is cheap and all clones refer to
/// the same domain.
#[derive(Clone)]
pub struct Domain {
    core: Arc<DomainCore>,
}

impl Domain {
    pub fn new(policy: Policy) -> Self {
        Self {
            core: Arc::new(DomainCore {
                id: DomainId::new(),
                policy,
                closed: AtomicBool::new(false),
                turns: AtomicU64::new(0),
                registry: Mutex::new(IndexMap::new()),
                turn_lock: Mutex::new(()),
                turn_threads: Mutex::new(HashSet::new()),
                pending: Mutex::new(VecDeque::new()),
            }),
        }
    }

    /// A domain with [`Policy::Sequential`].
    pub fn sequential() -> Self {
        Self::new(Policy::Sequential)
    }

    /// A domain with [`Policy::Parallel`].
    pub fn parallel() -> Self {
        Self::new(Policy::Parallel)
    }

    pub fn policy(&self) -> Policy {
        self.core.policy
    }

    pub(crate) fn id(&self) -> DomainId {
        self.core.id
    }

    /// Construct a root event node. Sources are the only nodes external
    /// code may inject values into.
    pub fn event_source<T>(&self) -> Result<EventSource<T>, GraphError>
    where
        T: Clone + Send + Sync + 'static,
    {
        EventSource::new(&self.core)
    }

    /// Number of nodes registered in this domain.
    pub fn node_count(&self) -> usize {
        self.core.registry.lock().len()
    }

    pub fn is_closed(&self) -> bool {
        self.core.closed.load(Ordering::SeqCst)
    }

    /// Tear the domain down.
    ///
    /// Blocks until any in-flight turn completes, then drops the
    /// registry's strong references and rejects all further injection
    /// with [`GraphError::DomainClosed`]. Nodes stay readable through
    /// handles that outlive the domain. Closing from inside a turn fails
    /// with [`GraphError::TurnActive`].
    pub fn close(&self) -> Result<(), GraphError> {
        if self.core.is_turn_thread() {
            return Err(GraphError::TurnActive);
        }
        let _guard = self.core.turn_lock.lock();
        self.core.closed.store(true, Ordering::SeqCst);
        self.core.pending.lock().clear();
        self.core.registry.lock().clear();
        trace!(domain = self.core.id.raw(), "domain closed");
        Ok(())
    }
}

impl std::fmt::Debug for Domain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Domain")
            .field("id", &self.core.id.raw())
            .field("policy", &self.core.policy)
            .field("nodes", &self.node_count())
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// Shared state behind a [`Domain`] handle.
pub(crate) struct DomainCore {
    id: DomainId,
    policy: Policy,
    closed: AtomicBool,
    /// Monotonic turn counter.
    turns: AtomicU64,
    /// All nodes in the domain, in creation order.
    registry: Mutex<IndexMap<NodeId, Arc<dyn ReactiveNode>>>,
    /// Serializes turns under both policies.
    turn_lock: Mutex<()>,
    /// Threads currently participating in a turn: the injecting thread
    /// plus, under [`Policy::Parallel`], every worker recomputing a
    /// bucket. Used to detect re-entrant calls.
    turn_threads: Mutex<HashSet<ThreadId>>,
    /// Inputs waiting for their own turn, FIFO.
    pending: Mutex<VecDeque<Injection>>,
}

impl DomainCore {
    pub(crate) fn id(&self) -> DomainId {
        self.id
    }

    pub(crate) fn policy(&self) -> Policy {
        self.policy
    }

    pub(crate) fn next_turn_id(&self) -> u64 {
        self.turns.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Register a freshly constructed node.
    pub(crate) fn register(&self, node: Arc<dyn ReactiveNode>) -> Result<(), GraphError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(GraphError::DomainClosed);
        }
        if self.is_turn_thread() {
            return Err(GraphError::TurnActive);
        }
        let info = node.info();
        trace!(
            node = info.id().raw(),
            level = info.level(),
            domain = self.id.raw(),
            "node registered"
        );
        self.registry.lock().insert(info.id(), node);
        Ok(())
    }

    pub(crate) fn node(&self, id: NodeId) -> Option<Arc<dyn ReactiveNode>> {
        self.registry.lock().get(&id).cloned()
    }

    pub(crate) fn is_turn_thread(&self) -> bool {
        self.turn_threads.lock().contains(&thread::current().id())
    }

    /// Mark the current thread as participating in the active turn.
    /// Returns false if it was already marked.
    pub(crate) fn mark_turn_thread(&self) -> bool {
        self.turn_threads.lock().insert(thread::current().id())
    }

    pub(crate) fn unmark_turn_thread(&self) {
        self.turn_threads.lock().remove(&thread::current().id());
    }

    /// Inject staged input, blocking until the turn it triggers (and any
    /// turns queued ahead of it) have fully completed.
    ///
    /// Called from inside an active turn, the input is queued and its
    /// turn starts only after the current one finishes notifying. A
    /// concurrent [`Domain::close`] that discards the entry before its
    /// turn could run makes this return [`GraphError::DomainClosed`];
    /// `Ok` means the input's turn actually completed.
    pub(crate) fn inject(&self, injection: Injection) -> Result<(), GraphError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(GraphError::DomainClosed);
        }
        let done = Arc::clone(&injection.done);
        self.pending.lock().push_back(injection);
        if self.is_turn_thread() {
            return Ok(());
        }
        self.drain();
        // Not run and the domain is closed: the entry was discarded by a
        // concurrent close between the push above and its turn.
        if !done.load(Ordering::SeqCst) && self.closed.load(Ordering::SeqCst) {
            return Err(GraphError::DomainClosed);
        }
        Ok(())
    }

    /// Run queued inputs, one turn per input, strict FIFO.
    fn drain(&self) {
        loop {
            let _guard = self.turn_lock.lock();
            if self.closed.load(Ordering::SeqCst) {
                return;
            }
            let Some(injection) = self.pending.lock().pop_front() else {
                return;
            };
            self.run_turn(injection);
        }
    }
}
