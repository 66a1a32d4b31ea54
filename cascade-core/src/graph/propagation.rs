//! Turn Propagation
//!
//! The propagation queue determines the order in which dirty nodes
//! recompute within one turn.
//!
//! # Algorithm
//!
//! 1. Seed the queue with the injected source nodes (level 0).
//! 2. Pop the lowest populated level and recompute every node in it.
//!    Same-level nodes cannot be mutual predecessors (a consumer is
//!    always at least one level above its inputs), so the bucket may be
//!    processed in any order, or in parallel under `Policy::Parallel`.
//! 3. For each node that reported a change, enqueue its trigger
//!    successors. A node already queued this turn is never queued again,
//!    so each node recomputes at most once even when it is reachable
//!    through several dirty predecessors.
//! 4. Repeat until no levels remain.
//!
//! By the time a node recomputes, every predecessor at a strictly lower
//! level has finished recomputing for this turn. That is the
//! glitch-freedom guarantee: a node only ever observes a fully updated
//! set of inputs.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use rayon::prelude::*;
use tracing::trace;

use super::node::{NodeId, ReactiveNode};
use crate::domain::{DomainCore, Policy};

/// Level-ordered work queue for a single turn.
pub struct Propagation {
    buckets: BTreeMap<u32, Vec<Arc<dyn ReactiveNode>>>,
    queued: HashSet<NodeId>,
}

impl Propagation {
    pub fn new() -> Self {
        Self {
            buckets: BTreeMap::new(),
            queued: HashSet::new(),
        }
    }

    /// Mark a node dirty for this turn. Idempotent per turn.
    pub fn enqueue(&mut self, node: Arc<dyn ReactiveNode>) {
        let info = node.info();
        if self.queued.insert(info.id()) {
            self.buckets.entry(info.level()).or_default().push(node);
        }
    }

    /// Run until no dirty nodes remain.
    ///
    /// Every visited node is appended to `touched` before it recomputes,
    /// so the turn's drop guard can settle it even if a later user
    /// closure panics. Returns the nodes that changed, in level order;
    /// this is also the notification order.
    pub fn run(
        mut self,
        domain: &DomainCore,
        touched: &mut Vec<Arc<dyn ReactiveNode>>,
    ) -> Vec<Arc<dyn ReactiveNode>> {
        let mut changed = Vec::new();

        while let Some((level, batch)) = self.pop_lowest() {
            trace!(level, nodes = batch.len(), "processing level");

            for node in &batch {
                touched.push(Arc::clone(node));
            }

            let flags: Vec<bool> = match domain.policy() {
                Policy::Sequential => batch.iter().map(|node| node.recompute()).collect(),
                // Same-level nodes are independent, so the bucket can fan
                // out across worker threads. Each worker registers itself
                // as a turn participant so user closures running on it get
                // the same re-entrancy treatment as on the injecting
                // thread.
                Policy::Parallel => batch
                    .par_iter()
                    .map(|node| {
                        let _participant = TurnThreadGuard::enter(domain);
                        node.recompute()
                    })
                    .collect(),
            };

            for (node, did_change) in batch.into_iter().zip(flags) {
                if !did_change {
                    continue;
                }
                for successor_id in node.info().trigger_successors() {
                    if let Some(successor) = domain.node(successor_id) {
                        debug_assert!(successor.info().level() > node.info().level());
                        self.enqueue(successor);
                    }
                }
                changed.push(node);
            }
        }

        changed
    }

    fn pop_lowest(&mut self) -> Option<(u32, Vec<Arc<dyn ReactiveNode>>)> {
        let level = *self.buckets.keys().next()?;
        self.buckets.remove(&level).map(|batch| (level, batch))
    }
}

impl Default for Propagation {
    fn default() -> Self {
        Self::new()
    }
}

/// Marks the current thread as a turn participant for the duration of one
/// recompute. When rayon runs a task inline on the injecting thread the
/// mark already exists; the guard then leaves it in place on drop.
struct TurnThreadGuard<'a> {
    domain: &'a DomainCore,
    owned: bool,
}

impl<'a> TurnThreadGuard<'a> {
    fn enter(domain: &'a DomainCore) -> Self {
        Self {
            domain,
            owned: domain.mark_turn_thread(),
        }
    }
}

impl Drop for TurnThreadGuard<'_> {
    fn drop(&mut self) {
        if self.owned {
            self.domain.unmark_turn_thread();
        }
    }
}
