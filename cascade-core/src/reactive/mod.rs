//! Reactive Primitives
//!
//! This module implements the typed surface of the engine: event streams,
//! signals, the combinators that derive new nodes from existing ones, and
//! observer registration.
//!
//! # Concepts
//!
//! ## Events
//!
//! An [`Event`] is a stream of discrete occurrences. During a turn it
//! holds the items emitted this turn, in emission order; between turns the
//! buffer is empty. Root events ([`EventSource`]) are the only place
//! external code feeds values into a domain.
//!
//! ## Signals
//!
//! A [`Signal`] is a continuously valued piece of state. Signals are
//! derived, never set directly: [`lift`] combines the current values of
//! other signals, and [`Event::fold`] accumulates state over the items an
//! event emits. A signal whose recomputed value equals its previous value
//! (by `PartialEq`) does not propagate downstream and does not notify its
//! observers, even though it was recomputed.
//!
//! ## Observers
//!
//! [`Event::observe`] and [`Signal::observe`] register callbacks that run
//! at the end of a turn, after the whole graph has settled. Event
//! observers see each buffered item in order; signal observers see the
//! post-turn value once per turn in which it changed.
//!
//! # Implementation Notes
//!
//! Combinators declare their dependencies explicitly, so the dependency
//! graph is fully known at construction time. There is no runtime
//! dependency tracking; each node's level is computed once when it is
//! built, and scheduling a turn is a walk over level buckets.

mod event;
mod fold;
mod observer;
mod signal;

pub use event::{Event, EventSource};
pub use observer::ObserverHandle;
pub use signal::{lift, Signal, SignalGroup, SignalPart};
