//! Cascade Core
//!
//! This crate implements a push-based reactive dataflow engine.
//! Applications describe continuously valued state ([`Signal`]) and
//! discrete occurrences ([`Event`]) as nodes of a dependency graph owned
//! by a [`Domain`]; the engine guarantees that each node recomputes at
//! most once per input batch, strictly after all of its upstream
//! dependencies have settled, and before any of its consumers or
//! observers see it. That ordering is what rules out *glitches*: a node
//! observed with a value computed from a partially updated set of inputs.
//!
//! # Architecture
//!
//! The crate is organized into three modules:
//!
//! - `domain`: isolated graph instances, the concurrency policy, and the
//!   turn (atomic update cycle) lifecycle
//! - `graph`: the untyped node/edge layer and the level-ordered
//!   propagation queue that schedules recomputation within a turn
//! - `reactive`: the typed primitives (event streams, signals, the
//!   combinators that derive them, and observer registration)
//!
//! # Example
//!
//! ```rust
//! use cascade_core::{lift, Domain};
//!
//! let domain = Domain::sequential();
//! let clicks = domain.event_source::<i32>().unwrap();
//!
//! let total = clicks.events().fold(0, |v, acc| acc + v).unwrap();
//! let count = clicks.events().fold(0, |_, acc: i32| acc + 1).unwrap();
//! let mean = lift((total.clone(), count), |(t, c)| {
//!     if c == 0 { 0 } else { t / c }
//! }).unwrap();
//!
//! // Injection blocks until the turn has settled and notified.
//! clicks.inject_all([10, 20, 30]).unwrap();
//! assert_eq!(total.value(), 60);
//! assert_eq!(mean.value(), 20);
//! ```

mod error;
mod graph;

pub mod domain;
pub mod reactive;

pub use domain::{Domain, Policy};
pub use error::GraphError;
pub use reactive::{lift, Event, EventSource, ObserverHandle, Signal, SignalGroup};
