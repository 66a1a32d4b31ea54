//! Dependency Graph
//!
//! This module implements the untyped layer of the dataflow graph: node
//! identity, level bookkeeping, edge lists, and the per-turn propagation
//! queue.
//!
//! # Overview
//!
//! The graph is a directed acyclic graph (DAG) where:
//!
//! - Nodes are event streams (per-turn buffers) or signals (persistent
//!   values), created by the combinators in [`crate::reactive`]
//! - Edges point from a node to its consumers; an edge is either a
//!   `Trigger` edge (changes propagate along it) or a `Sample` edge
//!   (orders recomputation but never wakes the consumer by itself)
//!
//! # Design Decisions
//!
//! 1. Every node is assigned an integer level at construction time:
//!    0 for sources, otherwise 1 + the maximum predecessor level. Levels
//!    are immutable, so ordering a turn is a cheap bucket walk instead of
//!    a topological sort per update.
//!
//! 2. The scheduler works over a type-erased [`node::ReactiveNode`]
//!    interface. Typed value access is confined to the closures generated
//!    when a node is constructed.
//!
//! 3. Acyclicity is structural: a combinator can only reference nodes that
//!    already exist, so a cycle cannot be expressed. Feedback is modeled
//!    by fold nodes reading their own previous value, not by back-edges.

pub mod node;
pub mod propagation;
