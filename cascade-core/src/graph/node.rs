//! Graph Nodes
//!
//! This module defines node identity, kinds, edges, and the type-erased
//! node interface the scheduler drives.

use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use smallvec::SmallVec;

use crate::domain::DomainId;

/// Unique identifier for a node in the dependency graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(u64);

impl NodeId {
    /// Generate a new unique node ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

/// The kind of node in the dependency graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// An event node. Holds a buffer of items emitted during the current
    /// turn; the buffer is empty outside an active turn.
    Event,

    /// A signal node. Holds a persistent current value.
    Signal,
}

/// How a successor relates to this node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeKind {
    /// A change in this node marks the successor dirty.
    Trigger,

    /// The successor snapshots this node's value when it recomputes, but a
    /// change here never wakes the successor on its own. Sample edges
    /// still raise the successor's level, which is what guarantees the
    /// snapshot is taken after this node has settled for the turn.
    Sample,
}

/// Shared bookkeeping embedded in every node.
///
/// The level is fixed at construction and never changes; the successor
/// list grows as downstream combinators attach themselves.
#[derive(Debug)]
pub struct NodeInfo {
    id: NodeId,
    kind: NodeKind,
    level: u32,
    domain: DomainId,
    successors: Mutex<SmallVec<[(NodeId, EdgeKind); 2]>>,
}

impl NodeInfo {
    pub fn new(kind: NodeKind, level: u32, domain: DomainId) -> Self {
        Self {
            id: NodeId::new(),
            kind,
            level,
            domain,
            successors: Mutex::new(SmallVec::new()),
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    /// Distance from the graph's sources; orders recomputation in a turn.
    pub fn level(&self) -> u32 {
        self.level
    }

    pub fn domain(&self) -> DomainId {
        self.domain
    }

    /// Attach a consumer edge.
    pub fn connect(&self, successor: NodeId, kind: EdgeKind) {
        self.successors.lock().push((successor, kind));
    }

    /// Successors that must be marked dirty when this node changes.
    pub fn trigger_successors(&self) -> SmallVec<[NodeId; 2]> {
        self.successors
            .lock()
            .iter()
            .filter(|(_, kind)| *kind == EdgeKind::Trigger)
            .map(|(id, _)| *id)
            .collect()
    }
}

/// The capability set the scheduler needs from a node, independent of the
/// node's value type.
pub trait ReactiveNode: Send + Sync {
    /// Identity, kind, level, and edges.
    fn info(&self) -> &NodeInfo;

    /// Recompute from the predecessors' turn-local state.
    ///
    /// Called at most once per turn, strictly after every predecessor at a
    /// lower level has settled. Returns true if the node changed this
    /// turn: a signal whose new value differs from the old one, or an
    /// event node whose buffer is non-empty.
    fn recompute(&self) -> bool;

    /// Whether the node changed during the current turn.
    fn changed_this_turn(&self) -> bool;

    /// Deliver the settled value/buffer to this node's observers.
    fn notify(&self);

    /// Clear per-turn state: event buffers and changed flags.
    fn settle(&self);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Domain;

    #[test]
    fn node_ids_are_unique() {
        let id1 = NodeId::new();
        let id2 = NodeId::new();
        assert_ne!(id1, id2);
    }

    #[test]
    fn trigger_successors_exclude_sample_edges() {
        let domain = Domain::sequential();
        let info = NodeInfo::new(NodeKind::Signal, 3, domain.id());

        let trigger = NodeId::new();
        let sample = NodeId::new();
        info.connect(trigger, EdgeKind::Trigger);
        info.connect(sample, EdgeKind::Sample);

        let successors = info.trigger_successors();
        assert_eq!(successors.len(), 1);
        assert_eq!(successors[0], trigger);
    }

    #[test]
    fn info_reports_construction_values() {
        let domain = Domain::sequential();
        let info = NodeInfo::new(NodeKind::Event, 0, domain.id());
        assert_eq!(info.kind(), NodeKind::Event);
        assert_eq!(info.level(), 0);
        assert_eq!(info.domain(), domain.id());
    }
}
