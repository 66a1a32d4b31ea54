//! Error types for graph construction and input injection.
//!
//! Failures inside user code (a fold, a filter predicate, an observer
//! callback) are not represented here: a panic in user code unwinds to the
//! injecting caller and the turn's drop guard restores the graph to a
//! structurally valid state. `GraphError` covers the conditions the engine
//! itself detects.

use thiserror::Error;

/// Errors reported by node construction and injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum GraphError {
    /// The domain has been closed; no further nodes or turns are accepted.
    #[error("domain is closed")]
    DomainClosed,

    /// A combinator was given predecessors from different domains.
    /// Domains never share edges.
    #[error("nodes belong to different domains")]
    DomainMismatch,

    /// Graph structure was mutated from inside an active turn, e.g. a node
    /// constructed from an observer callback. Observers may inject new
    /// input (it is queued for the next turn) but may not add nodes.
    #[error("graph mutation attempted inside an active turn")]
    TurnActive,
}
