#![forbid(unsafe_code)]

//! Echo-free two-way binding between two [`ObservableValue`]s.
//!
//! A [`Binding<S, T>`] owns two directional observers:
//!
//! ```text
//!            forward (S → T, UpdateStrategy<S, T>)
//!   source ─────────────────────────────────────────► target
//!          ◄─────────────────────────────────────────
//!            backward (T → S, UpdateStrategy<T, S>)
//! ```
//!
//! Each observer knows its reverse counterpart. While the forward observer
//! writes into the target, the backward observer is detached (muted) and
//! reattached afterwards, so a change on one side can never bounce back into
//! the side it came from. The backward observer stays in the target's
//! observer list throughout, so it keeps its place in the notification order.
//!
//! # Invariants
//!
//! 1. During a propagation in one direction the reverse channel is not live:
//!    notifications it receives from the cell being written are dropped.
//! 2. The propagated value is re-read from the originating cell, not taken
//!    from the notification payload.
//! 3. A direction without a strategy is a no-op (one-way binding).
//! 4. After [`unbind`](Binding::unbind) (or drop) neither cell holds an
//!    observer of this binding.
//!
//! # Initial synchronization
//!
//! [`arm`](Binding::arm) registers the forward observer on the source first,
//! then the backward observer on the target, both with an initial emission.
//! The source's value is therefore pushed into the target first and wins;
//! the backward pass that follows only writes back what the target now
//! holds. When the forward direction has no strategy, the target's value
//! flows into the source instead.
//!
//! # Failure Modes
//!
//! - Validation rejections, conversion failures and vetoes stop the current
//!   propagation and are logged at `debug` level. They never reach the caller
//!   of the `set` that triggered the propagation.
//! - A bound pair keeps both cells alive (each cell holds an observer that
//!   holds the other cell) until the binding is unbound or dropped.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use tracing::{debug, debug_span, trace};

use crate::observable::{ObservableValue, ObserverRef, ValueKey};
use crate::strategy::{Propagation, UpdateStrategy};

/// Propagation state of one binding direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropagationState {
    Idle,
    Propagating,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lifecycle {
    Created,
    Armed,
    Unbound,
}

/// Observer of one side that pushes changes into the other side.
struct DirectedObserver<S, T> {
    label: &'static str,
    source: Rc<dyn ObservableValue<S>>,
    target: Rc<dyn ObservableValue<T>>,
    strategy: Option<UpdateStrategy<S, T>>,
    /// The observer registered on `target`, muted while we write into it.
    reverse: RefCell<Weak<DirectedObserver<T, S>>>,
    armed: Rc<Cell<bool>>,
    /// Set by the reverse observer while it writes into `source`.
    muted: Cell<bool>,
    /// Nesting depth of propagations in this direction.
    depth: Cell<u32>,
}

impl<S: 'static, T: 'static> DirectedObserver<S, T> {
    fn new(
        label: &'static str,
        source: Rc<dyn ObservableValue<S>>,
        target: Rc<dyn ObservableValue<T>>,
        strategy: Option<UpdateStrategy<S, T>>,
        armed: Rc<Cell<bool>>,
    ) -> Self {
        Self {
            label,
            source,
            target,
            strategy,
            reverse: RefCell::new(Weak::new()),
            armed,
            muted: Cell::new(false),
            depth: Cell::new(0),
        }
    }

    fn state(&self) -> PropagationState {
        if self.depth.get() == 0 {
            PropagationState::Idle
        } else {
            PropagationState::Propagating
        }
    }

    fn log_outcome(&self, outcome: &Propagation) {
        match outcome {
            Propagation::Applied | Propagation::Unchanged => {
                trace!(direction = self.label, ?outcome, "propagated");
            }
            Propagation::RejectedAfterGet(verdict) | Propagation::RejectedBeforeSet(verdict) => {
                debug!(direction = self.label, %verdict, "propagation rejected by validator");
            }
            Propagation::ConversionFailed(err) => {
                debug!(direction = self.label, %err, "propagation stopped by converter");
            }
            Propagation::Vetoed(veto) => {
                debug!(direction = self.label, %veto, "propagation vetoed by target");
            }
        }
    }
}

impl<S: 'static, T: 'static> crate::observable::ValueObserver<S> for DirectedObserver<S, T> {
    fn value_changed(&self, _new: &S, _old: Option<&S>) {
        if !self.armed.get() || self.muted.get() {
            return;
        }
        let Some(strategy) = &self.strategy else {
            return;
        };

        // Only the outermost propagation mutes and unmutes; nested ones run
        // while the reverse channel is already down.
        let reverse = if self.depth.get() == 0 {
            self.reverse.borrow().upgrade()
        } else {
            None
        };
        if let Some(reverse) = &reverse {
            reverse.muted.set(true);
        }

        self.depth.set(self.depth.get() + 1);
        let current = self.source.get();
        let outcome = strategy.apply(&current, &*self.target);
        self.depth.set(self.depth.get() - 1);
        self.log_outcome(&outcome);

        if let Some(reverse) = reverse {
            reverse.muted.set(false);
        }
    }
}

/// A live link between a source and a target observable.
///
/// Single use: once unbound it stays unbound. Dropping an armed binding
/// unbinds it.
pub struct Binding<S: 'static, T: 'static> {
    source: Rc<dyn ObservableValue<S>>,
    target: Rc<dyn ObservableValue<T>>,
    forward: Rc<DirectedObserver<S, T>>,
    backward: Rc<DirectedObserver<T, S>>,
    armed: Rc<Cell<bool>>,
    lifecycle: Cell<Lifecycle>,
}

impl<S: 'static, T: 'static> Binding<S, T> {
    /// Create an unarmed binding. `None` disables that direction.
    #[must_use]
    pub fn new(
        source: Rc<dyn ObservableValue<S>>,
        target: Rc<dyn ObservableValue<T>>,
        source_to_target: Option<UpdateStrategy<S, T>>,
        target_to_source: Option<UpdateStrategy<T, S>>,
    ) -> Self {
        let armed = Rc::new(Cell::new(false));
        let forward = Rc::new(DirectedObserver::new(
            "source->target",
            Rc::clone(&source),
            Rc::clone(&target),
            source_to_target,
            Rc::clone(&armed),
        ));
        let backward = Rc::new(DirectedObserver::new(
            "target->source",
            Rc::clone(&target),
            Rc::clone(&source),
            target_to_source,
            Rc::clone(&armed),
        ));
        *forward.reverse.borrow_mut() = Rc::downgrade(&backward);
        *backward.reverse.borrow_mut() = Rc::downgrade(&forward);

        Self {
            source,
            target,
            forward,
            backward,
            armed,
            lifecycle: Cell::new(Lifecycle::Created),
        }
    }

    /// Subscribe both directions and run the initial synchronization.
    ///
    /// Arming twice, or arming an unbound binding, does nothing.
    pub fn arm(&self) {
        if self.lifecycle.get() != Lifecycle::Created {
            debug!(lifecycle = ?self.lifecycle.get(), "ignoring arm of a used binding");
            return;
        }
        let _span = debug_span!(
            "binding.arm",
            source = ?self.source.key(),
            target = ?self.target.key()
        )
        .entered();

        self.lifecycle.set(Lifecycle::Armed);
        self.armed.set(true);
        let forward: ObserverRef<S> = self.forward.clone();
        self.source.add_observer(forward, true);
        let backward: ObserverRef<T> = self.backward.clone();
        self.target.add_observer(backward, true);
    }

    /// Detach both directions. Only the first call after `arm` has an effect.
    pub fn unbind(&self) {
        if self.lifecycle.get() != Lifecycle::Armed {
            return;
        }
        self.lifecycle.set(Lifecycle::Unbound);
        self.armed.set(false);
        let forward: ObserverRef<S> = self.forward.clone();
        self.source.remove_observer(&forward);
        let backward: ObserverRef<T> = self.backward.clone();
        self.target.remove_observer(&backward);
        debug!(
            source = ?self.source.key(),
            target = ?self.target.key(),
            "binding unbound"
        );
    }

    #[must_use]
    pub fn is_armed(&self) -> bool {
        self.lifecycle.get() == Lifecycle::Armed
    }

    /// State of the source → target direction.
    #[must_use]
    pub fn forward_state(&self) -> PropagationState {
        self.forward.state()
    }

    /// State of the target → source direction.
    #[must_use]
    pub fn backward_state(&self) -> PropagationState {
        self.backward.state()
    }

    #[must_use]
    pub fn source_key(&self) -> ValueKey {
        self.source.key()
    }

    #[must_use]
    pub fn target_key(&self) -> ValueKey {
        self.target.key()
    }
}

impl<S: 'static, T: 'static> Drop for Binding<S, T> {
    fn drop(&mut self) {
        self.unbind();
    }
}

impl<S: 'static, T: 'static> fmt::Debug for Binding<S, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binding")
            .field("source", &self.source.key())
            .field("target", &self.target.key())
            .field("lifecycle", &self.lifecycle.get())
            .field("forward", &self.forward.strategy.is_some())
            .field("backward", &self.backward.strategy.is_some())
            .finish()
    }
}

/// Type-erased view used by the binding context.
pub(crate) trait AnyBinding {
    fn unbind(&self);
    fn is_armed(&self) -> bool;
}

impl<S: 'static, T: 'static> AnyBinding for Binding<S, T> {
    fn unbind(&self) {
        Binding::unbind(self);
    }

    fn is_armed(&self) -> bool {
        Binding::is_armed(self)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
