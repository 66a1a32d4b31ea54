//! Turn Lifecycle
//!
//! A turn is the atomic unit of propagation: it is created when external
//! input is injected, runs `Collecting -> Propagating -> Notifying` on the
//! injecting thread, and is discarded when the domain returns to idle.
//!
//! The turn owns the list of nodes it touched. Settling those nodes
//! (clearing event buffers and changed flags) happens in the turn's drop
//! guard, so a panic inside a user closure still leaves the graph
//! structurally valid: nodes recomputed before the panic keep their new
//! values, nothing downstream of the panic runs, and no stale per-turn
//! state leaks into the next turn.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, trace, trace_span};

use super::DomainCore;
use crate::graph::node::ReactiveNode;
use crate::graph::propagation::Propagation;

/// One staged external input: the source node it targets and a closure
/// that writes the injected values into the source's buffer.
pub(crate) struct Injection {
    pub(crate) node: Arc<dyn ReactiveNode>,
    pub(crate) stage: Box<dyn FnOnce() + Send>,
    /// Set once the turn for this input has fully completed, notification
    /// included. An entry discarded by `close` before it runs never sets
    /// it, which is how the injector learns its input was dropped.
    pub(crate) done: Arc<AtomicBool>,
}

impl Injection {
    pub(crate) fn new(node: Arc<dyn ReactiveNode>, stage: impl FnOnce() + Send + 'static) -> Self {
        Self {
            node,
            stage: Box::new(stage),
            done: Arc::new(AtomicBool::new(false)),
        }
    }
}

/// Phases of an active turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TurnState {
    Collecting,
    Propagating,
    Notifying,
}

/// Bookkeeping for one propagation cycle, plus the drop guard that
/// returns the domain to idle.
struct Turn<'a> {
    domain: &'a DomainCore,
    id: u64,
    state: TurnState,
    touched: Vec<Arc<dyn ReactiveNode>>,
}

impl<'a> Turn<'a> {
    fn begin(domain: &'a DomainCore, id: u64) -> Self {
        domain.mark_turn_thread();
        Self {
            domain,
            id,
            state: TurnState::Collecting,
            touched: Vec::new(),
        }
    }

    fn advance(&mut self, state: TurnState) {
        trace!(turn = self.id, ?state, "turn phase");
        self.state = state;
    }
}

impl Drop for Turn<'_> {
    fn drop(&mut self) {
        for node in &self.touched {
            node.settle();
        }
        self.domain.unmark_turn_thread();
        trace!(turn = self.id, state = ?self.state, "turn complete");
    }
}

impl DomainCore {
    /// Execute one full turn for a single staged input.
    ///
    /// Caller holds the domain's turn lock.
    pub(crate) fn run_turn(&self, injection: Injection) {
        let turn_id = self.next_turn_id();
        let _span = trace_span!("turn", id = turn_id, domain = self.id().raw()).entered();

        let Injection { node, stage, done } = injection;
        let mut turn = Turn::begin(self, turn_id);

        // Collecting: write the injected values into the source buffer.
        stage();

        turn.advance(TurnState::Propagating);
        let mut queue = Propagation::new();
        queue.enqueue(node);
        let changed = queue.run(self, &mut turn.touched);
        debug!(
            turn = turn_id,
            touched = turn.touched.len(),
            changed = changed.len(),
            "propagation settled"
        );

        // Notifying: same level order as propagation. Observers may
        // inject new input here; it is queued and becomes its own turn
        // once this one is discarded.
        turn.advance(TurnState::Notifying);
        for node in &changed {
            debug_assert!(node.changed_this_turn());
            node.notify();
        }
        done.store(true, Ordering::SeqCst);
    }
}
