//! Folds Over Time
//!
//! A fold is the engine's only state-carrying primitive. It produces a
//! signal whose value accumulates over the items a driver event emits:
//! when the driver emits N items in one turn, the fold function is
//! applied N times in emission order, threading the state through.
//!
//! Feedback without cycles: the fold reads its *own previous value*
//! internally when it recomputes. That value never enters the graph as an
//! incoming edge, so accumulating state (a position integrating a
//! velocity, say) needs no structural cycle.
//!
//! `fold_with` additionally snapshots a group of signals at fold time.
//! Those signals become `Sample` predecessors: they raise the fold node's
//! level, so a same-turn update to them settles before the fold reads
//! them, but a change in them alone never re-runs the fold.

use std::sync::Arc;

use super::event::Event;
use super::signal::{Signal, SignalGroup, SignalOp, SignalPart};
use crate::error::GraphError;
use crate::graph::node::EdgeKind;

impl<T> Event<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Accumulate state over this stream's emissions.
    ///
    /// `f` is applied once per emitted item, in emission order, as
    /// `state = f(item, state)`; the resulting signal starts at `init`.
    pub fn fold<S>(
        &self,
        init: S,
        f: impl Fn(&T, S) -> S + Send + Sync + 'static,
    ) -> Result<Signal<S>, GraphError>
    where
        S: Clone + PartialEq + Send + Sync + 'static,
    {
        let driver = Arc::clone(&self.core);
        let signal = Signal::build(
            &self.domain,
            init,
            self.core.info.level() + 1,
            SignalOp::Fold(Box::new(move |state: S| {
                driver
                    .buffer
                    .lock()
                    .iter()
                    .fold(state, |acc, item| f(item, acc))
            })),
        )?;
        self.core.info.connect(signal.core.info.id(), EdgeKind::Trigger);
        Ok(signal)
    }

    /// Like [`Event::fold`], with read-only signal snapshots.
    ///
    /// `f` is applied per item as `state = f(item, state, with.sample())`.
    /// The `with` signals are sampled at fold time with their settled
    /// values for the turn; they order recomputation but never drive it.
    pub fn fold_with<S, W>(
        &self,
        init: S,
        with: W,
        f: impl Fn(&T, S, W::Values) -> S + Send + Sync + 'static,
    ) -> Result<Signal<S>, GraphError>
    where
        S: Clone + PartialEq + Send + Sync + 'static,
        W: SignalGroup,
    {
        let parts = with.parts();
        for part in &parts {
            if part.domain_id() != self.core.info.domain() {
                return Err(GraphError::DomainMismatch);
            }
        }
        let level = parts
            .iter()
            .map(SignalPart::level)
            .chain([self.core.info.level()])
            .max()
            .unwrap_or(0)
            + 1;

        let driver = Arc::clone(&self.core);
        let signal = Signal::build(
            &self.domain,
            init,
            level,
            SignalOp::Fold(Box::new(move |state: S| {
                driver
                    .buffer
                    .lock()
                    .iter()
                    .fold(state, |acc, item| f(item, acc, with.sample()))
            })),
        )?;
        self.core.info.connect(signal.core.info.id(), EdgeKind::Trigger);
        for part in &parts {
            part.connect(signal.core.info.id(), EdgeKind::Sample);
        }
        Ok(signal)
    }
}

#[cfg(test)]
mod tests {
    use crate::domain::Domain;
    use crate::error::GraphError;

    /// N items in one turn fold N times, in emission order.
    #[test]
    fn fold_applies_in_emission_order() {
        let domain = Domain::sequential();
        let source = domain.event_source::<i32>().unwrap();
        let digits = source.events().fold(0, |d, acc| acc * 10 + d).unwrap();

        source.inject_all([1, 2, 3]).unwrap();
        assert_eq!(digits.value(), 123);

        source.inject(4).unwrap();
        assert_eq!(digits.value(), 1234);
    }

    /// A turn with no driver emissions leaves the fold untouched.
    #[test]
    fn fold_ignores_unrelated_turns() {
        let domain = Domain::sequential();
        let driver = domain.event_source::<i32>().unwrap();
        let other = domain.event_source::<i32>().unwrap();
        let total = driver.events().fold(0, |v, acc| acc + v).unwrap();

        driver.inject(5).unwrap();
        other.inject(100).unwrap();
        assert_eq!(total.value(), 5);
    }

    /// The with-signals are snapshots, not drivers: changing them alone
    /// must not re-run the fold.
    #[test]
    fn with_signals_do_not_drive() {
        let domain = Domain::sequential();
        let driver = domain.event_source::<i32>().unwrap();
        let scale_input = domain.event_source::<i32>().unwrap();

        let scale = scale_input.events().fold(1, |v, _| *v).unwrap();
        let scaled_total = driver
            .events()
            .fold_with(0, (scale.clone(),), |v, acc, (s,)| acc + v * s)
            .unwrap();

        scale_input.inject(10).unwrap();
        // The fold did not run; only its snapshot source moved.
        assert_eq!(scaled_total.value(), 0);

        driver.inject(3).unwrap();
        assert_eq!(scaled_total.value(), 30);
    }

    /// When driver and with-signal update in the same turn, the fold sees
    /// the with-signal's post-update value (it settles first, being at a
    /// lower level).
    #[test]
    fn with_signals_sample_settled_values() {
        let domain = Domain::sequential();
        let ticks = domain.event_source::<i32>().unwrap();

        let count = ticks.events().fold(0, |_, acc: i32| acc + 1).unwrap();
        let recorded = ticks
            .events()
            .fold_with(Vec::new(), (count.clone(),), |_, mut acc: Vec<i32>, (c,)| {
                acc.push(c);
                acc
            })
            .unwrap();

        ticks.inject(0).unwrap();
        ticks.inject(0).unwrap();

        // Each turn the fold observed the freshly incremented count,
        // never the stale one.
        assert_eq!(recorded.value(), vec![1, 2]);
    }

    #[test]
    fn fold_with_rejects_foreign_signals() {
        let domain_a = Domain::sequential();
        let domain_b = Domain::sequential();
        let driver = domain_a.event_source::<i32>().unwrap();
        let foreign_source = domain_b.event_source::<i32>().unwrap();
        let foreign = foreign_source.events().fold(0, |v, _| *v).unwrap();

        let result = driver
            .events()
            .fold_with(0, (foreign,), |v, acc, (s,)| acc + v + s);
        assert_eq!(result.err(), Some(GraphError::DomainMismatch));
    }
}
