//! Signals
//!
//! A signal node holds a persistent current value. It recomputes when the
//! scheduler visits it during a turn, compares the result to its previous
//! value, and suppresses downstream propagation when the two are equal.
//! The freshly computed value is stored either way.
//!
//! # Equality Hook
//!
//! Change suppression uses `PartialEq` on the value type. This is what
//! stops a diamond of derived signals from cascading when an upstream
//! change happens to produce the same derived value, and it is why every
//! signal value type carries a `PartialEq` bound.
//!
//! # Reading
//!
//! [`Signal::value`] may be called at any time. Outside an active turn it
//! returns the settled value of the last turn; while a turn is in flight
//! on another thread the value is whatever the propagation has reached,
//! so readers that need turn-consistent values should use
//! [`Signal::observe`] instead of polling.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use super::observer::{ObserverHandle, ObserverList};
use crate::domain::{DomainCore, DomainId};
use crate::error::GraphError;
use crate::graph::node::{EdgeKind, NodeId, NodeInfo, NodeKind, ReactiveNode};

/// How a signal node computes its next value when visited.
pub(crate) enum SignalOp<T> {
    /// Derived from other signals' current values.
    Lift(Box<dyn Fn() -> T + Send + Sync>),
    /// Folds the driver event's buffered items over the previous value.
    Fold(Box<dyn Fn(T) -> T + Send + Sync>),
}

pub(crate) struct SignalCore<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    pub(crate) info: NodeInfo,
    pub(crate) value: RwLock<T>,
    changed: AtomicBool,
    pub(crate) observers: ObserverList<T>,
    op: SignalOp<T>,
}

impl<T> ReactiveNode for SignalCore<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    fn info(&self) -> &NodeInfo {
        &self.info
    }

    fn recompute(&self) -> bool {
        let next = match &self.op {
            SignalOp::Lift(compute) => compute(),
            SignalOp::Fold(step) => step(self.value.read().clone()),
        };
        let mut value = self.value.write();
        let did_change = *value != next;
        // Store even when equal; only propagation is suppressed.
        *value = next;
        if did_change {
            self.changed.store(true, Ordering::Relaxed);
        }
        did_change
    }

    fn changed_this_turn(&self) -> bool {
        self.changed.load(Ordering::Relaxed)
    }

    fn notify(&self) {
        let value = self.value.read().clone();
        self.observers.deliver(&value);
    }

    fn settle(&self) {
        self.changed.store(false, Ordering::Relaxed);
    }
}

/// A continuously valued node within one domain.
///
/// Handles are cheap to clone; clones refer to the same node.
pub struct Signal<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    pub(crate) core: Arc<SignalCore<T>>,
    pub(crate) domain: Arc<DomainCore>,
}

impl<T> Signal<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    /// The current value.
    pub fn value(&self) -> T {
        self.core.value.read().clone()
    }

    /// Derive a signal from this one. Sugar for single-input [`lift`].
    pub fn map<R>(
        &self,
        f: impl Fn(&T) -> R + Send + Sync + 'static,
    ) -> Result<Signal<R>, GraphError>
    where
        R: Clone + PartialEq + Send + Sync + 'static,
    {
        let input = Arc::clone(&self.core);
        let initial = f(&input.value.read());
        let derived = Signal::build(
            &self.domain,
            initial,
            self.core.info.level() + 1,
            SignalOp::Lift(Box::new(move || f(&input.value.read()))),
        )?;
        self.core.info.connect(derived.core.info.id(), EdgeKind::Trigger);
        Ok(derived)
    }

    /// Register a callback invoked once per turn in which this signal's
    /// value changed, with the post-turn value.
    pub fn observe(&self, callback: impl Fn(&T) + Send + Sync + 'static) -> ObserverHandle {
        self.core.observers.attach(callback)
    }

    pub(crate) fn build(
        domain: &Arc<DomainCore>,
        initial: T,
        level: u32,
        op: SignalOp<T>,
    ) -> Result<Signal<T>, GraphError> {
        let info = NodeInfo::new(NodeKind::Signal, level, domain.id());
        let core = Arc::new(SignalCore {
            info,
            value: RwLock::new(initial),
            changed: AtomicBool::new(false),
            observers: ObserverList::new(),
            op,
        });
        domain.register(core.clone())?;
        Ok(Signal {
            core,
            domain: Arc::clone(domain),
        })
    }
}

impl<T> Clone for Signal<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            core: Arc::clone(&self.core),
            domain: Arc::clone(&self.domain),
        }
    }
}

impl<T> std::fmt::Debug for Signal<T>
where
    T: Clone + PartialEq + Send + Sync + std::fmt::Debug + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signal")
            .field("id", &self.core.info.id().raw())
            .field("level", &self.core.info.level())
            .field("value", &self.value())
            .finish()
    }
}

/// One member of a [`SignalGroup`], type-erased for wiring.
pub struct SignalPart {
    node: Arc<dyn ReactiveNode>,
    domain: Arc<DomainCore>,
}

impl SignalPart {
    pub(crate) fn new(node: Arc<dyn ReactiveNode>, domain: Arc<DomainCore>) -> Self {
        Self { node, domain }
    }

    pub(crate) fn level(&self) -> u32 {
        self.node.info().level()
    }

    pub(crate) fn domain_id(&self) -> DomainId {
        self.node.info().domain()
    }

    pub(crate) fn connect(&self, successor: NodeId, kind: EdgeKind) {
        self.node.info().connect(successor, kind);
    }
}

/// A non-empty tuple of signals used as a combinator input, implemented
/// for arities 1 through 4.
pub trait SignalGroup: Clone + Send + Sync + 'static {
    /// Tuple of the member signals' value types.
    type Values;

    /// Snapshot of every member's current value.
    fn sample(&self) -> Self::Values;

    #[doc(hidden)]
    fn parts(&self) -> Vec<SignalPart>;
}

macro_rules! impl_signal_group {
    ($(($T:ident, $idx:tt)),+) => {
        impl<$($T),+> SignalGroup for ($(Signal<$T>,)+)
        where
            $($T: Clone + PartialEq + Send + Sync + 'static),+
        {
            type Values = ($($T,)+);

            fn sample(&self) -> Self::Values {
                ($(self.$idx.value(),)+)
            }

            fn parts(&self) -> Vec<SignalPart> {
                vec![$(SignalPart::new(
                    Arc::clone(&self.$idx.core) as Arc<dyn ReactiveNode>,
                    Arc::clone(&self.$idx.domain),
                )),+]
            }
        }
    };
}

impl_signal_group!((A, 0));
impl_signal_group!((A, 0), (B, 1));
impl_signal_group!((A, 0), (B, 1), (C, 2));
impl_signal_group!((A, 0), (B, 1), (C, 2), (D, 3));

/// All parts must share one domain; returns it.
pub(crate) fn same_domain(parts: &[SignalPart]) -> Result<Arc<DomainCore>, GraphError> {
    let first = parts.first().ok_or(GraphError::DomainMismatch)?;
    for part in parts {
        if part.domain_id() != first.domain_id() {
            return Err(GraphError::DomainMismatch);
        }
    }
    Ok(Arc::clone(&first.domain))
}

/// Derive a signal from the current values of a group of signals.
///
/// The derived node recomputes whenever any input changed during the
/// turn; `f` receives a snapshot of every input's settled value. The
/// initial value is `f` applied to the inputs' current values.
///
/// ```
/// use cascade_core::{lift, Domain};
///
/// let domain = Domain::sequential();
/// let ticks = domain.event_source::<i32>().unwrap();
/// let count = ticks.events().fold(0, |_, acc| acc + 1).unwrap();
/// let sum = ticks.events().fold(0, |v, acc| acc + v).unwrap();
/// let mean = lift((sum, count), |(s, n)| if n == 0 { 0 } else { s / n }).unwrap();
///
/// ticks.inject_all([4, 8]).unwrap();
/// assert_eq!(mean.value(), 6);
/// ```
pub fn lift<G, R>(
    inputs: G,
    f: impl Fn(G::Values) -> R + Send + Sync + 'static,
) -> Result<Signal<R>, GraphError>
where
    G: SignalGroup,
    R: Clone + PartialEq + Send + Sync + 'static,
{
    let parts = inputs.parts();
    let domain = same_domain(&parts)?;
    let level = parts.iter().map(SignalPart::level).max().unwrap_or(0) + 1;

    let initial = f(inputs.sample());
    let group = inputs;
    let signal = Signal::build(
        &domain,
        initial,
        level,
        SignalOp::Lift(Box::new(move || f(group.sample()))),
    )?;
    for part in &parts {
        part.connect(signal.core.info.id(), EdgeKind::Trigger);
    }
    Ok(signal)
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::lift;
    use crate::domain::Domain;
    use crate::error::GraphError;

    #[test]
    fn lift_combines_current_values() {
        let domain = Domain::sequential();
        let source = domain.event_source::<i32>().unwrap();
        let total = source.events().fold(0, |v, acc| acc + v).unwrap();
        let count = source.events().fold(0, |_, acc: i32| acc + 1).unwrap();

        let pair = lift((total.clone(), count.clone()), |(t, c)| (t, c)).unwrap();
        assert_eq!(pair.value(), (0, 0));

        source.inject_all([10, 20]).unwrap();
        assert_eq!(pair.value(), (30, 2));
    }

    #[test]
    fn map_is_single_input_lift() {
        let domain = Domain::sequential();
        let source = domain.event_source::<i32>().unwrap();
        let total = source.events().fold(0, |v, acc| acc + v).unwrap();
        let squared = total.map(|v| v * v).unwrap();

        assert_eq!(squared.value(), 0);
        source.inject(3).unwrap();
        assert_eq!(squared.value(), 9);
    }

    #[test]
    fn equal_value_suppresses_observers_and_successors() {
        let domain = Domain::sequential();
        let source = domain.event_source::<i32>().unwrap();
        let count = source.events().fold(0, |v, acc| acc + v).unwrap();

        let recomputes = Arc::new(AtomicUsize::new(0));
        let recompute_counter = recomputes.clone();
        let parity_of_zero = count
            .map(move |n| {
                recompute_counter.fetch_add(1, Ordering::SeqCst);
                n % 2 == 0 && *n < 0 // always false for injected inputs
            })
            .unwrap();

        let fired = Arc::new(AtomicUsize::new(0));
        let fire_counter = fired.clone();
        let _observer = parity_of_zero.observe(move |_| {
            fire_counter.fetch_add(1, Ordering::SeqCst);
        });

        source.inject(2).unwrap();
        source.inject(2).unwrap();

        // Recomputed once per turn (plus construction), but the value
        // never changed, so no observer fired.
        assert_eq!(recomputes.load(Ordering::SeqCst), 3);
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn lift_rejects_mixed_domains() {
        let domain_a = Domain::sequential();
        let domain_b = Domain::sequential();
        let source_a = domain_a.event_source::<i32>().unwrap();
        let source_b = domain_b.event_source::<i32>().unwrap();
        let sig_a = source_a.events().fold(0, |v, acc| acc + v).unwrap();
        let sig_b = source_b.events().fold(0, |v, acc| acc + v).unwrap();

        let result = lift((sig_a, sig_b), |(a, b)| a + b);
        assert_eq!(result.err(), Some(GraphError::DomainMismatch));
    }

    #[test]
    fn lift_level_is_above_every_input() {
        let domain = Domain::sequential();
        let source = domain.event_source::<i32>().unwrap();
        let shallow = source.events().fold(0, |v, acc| acc + v).unwrap();
        let deep = shallow.map(|v| *v).unwrap().map(|v| *v).unwrap();

        let combined = lift((shallow.clone(), deep.clone()), |(a, b)| a + b).unwrap();
        assert!(combined.core.info.level() > shallow.core.info.level());
        assert!(combined.core.info.level() > deep.core.info.level());
    }
}
