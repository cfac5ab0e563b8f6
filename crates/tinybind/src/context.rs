#![forbid(unsafe_code)]

//! Registry that owns the bindings between pairs of observables.
//!
//! A [`BindingContext`] is keyed by the ordered pair `(source, target)` of
//! cell identities. `unbind(a, b)` therefore does not match a binding that
//! was created as `bind(b, a)`.
//!
//! Unbinding leaves a tombstone in the slot so a second `unbind` of the same
//! pair is a no-op. Binding the same pair again tears down the previous
//! binding first, so at most one live binding exists per ordered pair.
//!
//! Dropping the context unbinds everything it still owns.

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use tracing::{debug, debug_span};

use crate::binding::{AnyBinding, Binding};
use crate::observable::{ObservableValue, ValueKey};
use crate::strategy::UpdateStrategy;

type PairKey = (ValueKey, ValueKey);

enum Slot {
    Active(Box<dyn AnyBinding>),
    /// The binding was unbound; further unbinds of this pair do nothing.
    Removed,
}

/// Owner of a set of bindings.
#[derive(Default)]
pub struct BindingContext {
    slots: HashMap<PairKey, Slot>,
}

impl BindingContext {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `source` to `target` and run the initial synchronization.
    ///
    /// `None` disables a direction. The source's value wins when both
    /// directions are enabled. An existing binding of the same ordered pair
    /// is unbound first.
    pub fn bind<S, T, A, B>(
        &mut self,
        source: &A,
        target: &B,
        source_to_target: Option<UpdateStrategy<S, T>>,
        target_to_source: Option<UpdateStrategy<T, S>>,
    ) where
        S: 'static,
        T: 'static,
        A: ObservableValue<S> + Clone + 'static,
        B: ObservableValue<T> + Clone + 'static,
    {
        let key = (source.key(), target.key());
        let _span = debug_span!("context.bind", source = ?key.0, target = ?key.1).entered();

        if let Some(Slot::Active(previous)) = self.slots.remove(&key) {
            debug!("replacing existing binding");
            previous.unbind();
        }

        let source: Rc<dyn ObservableValue<S>> = Rc::new(source.clone());
        let target: Rc<dyn ObservableValue<T>> = Rc::new(target.clone());
        let binding = Binding::new(source, target, source_to_target, target_to_source);
        binding.arm();
        self.slots.insert(key, Slot::Active(Box::new(binding)));
    }

    /// Bind both directions with identity strategies.
    pub fn bind_default<S, T, A, B>(&mut self, source: &A, target: &B)
    where
        S: Clone + Into<T> + 'static,
        T: Clone + Into<S> + 'static,
        A: ObservableValue<S> + Clone + 'static,
        B: ObservableValue<T> + Clone + 'static,
    {
        self.bind(
            source,
            target,
            Some(UpdateStrategy::new()),
            Some(UpdateStrategy::new()),
        );
    }

    /// Tear down the binding created as `bind(source, target, ..)`.
    ///
    /// Returns `true` when a live binding was removed. Unbinding a pair that
    /// was already unbound, or never bound, returns `false`.
    pub fn unbind<S, T>(
        &mut self,
        source: &impl ObservableValue<S>,
        target: &impl ObservableValue<T>,
    ) -> bool {
        self.unbind_keys(source.key(), target.key())
    }

    /// [`unbind`](Self::unbind) by cell identities.
    pub fn unbind_keys(&mut self, source: ValueKey, target: ValueKey) -> bool {
        let Some(slot) = self.slots.get_mut(&(source, target)) else {
            return false;
        };
        match std::mem::replace(slot, Slot::Removed) {
            Slot::Active(binding) => {
                binding.unbind();
                true
            }
            Slot::Removed => false,
        }
    }

    /// Tear down every live binding and forget all pairs, tombstones included.
    pub fn unbind_all(&mut self) {
        let live = self.len();
        for (_, slot) in self.slots.drain() {
            if let Slot::Active(binding) = slot {
                binding.unbind();
            }
        }
        if live > 0 {
            debug!(count = live, "unbound all bindings");
        }
    }

    #[must_use]
    pub fn is_bound<S, T>(
        &self,
        source: &impl ObservableValue<S>,
        target: &impl ObservableValue<T>,
    ) -> bool {
        matches!(
            self.slots.get(&(source.key(), target.key())),
            Some(Slot::Active(binding)) if binding.is_armed()
        )
    }

    /// Number of live bindings.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots
            .values()
            .filter(|slot| matches!(slot, Slot::Active(_)))
            .count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Drop for BindingContext {
    fn drop(&mut self) {
        self.unbind_all();
    }
}

impl fmt::Debug for BindingContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BindingContext")
            .field("live", &self.len())
            .field("tombstones", &(self.slots.len() - self.len()))
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
