#![forbid(unsafe_code)]

//! Fluent construction of bindings.
//!
//! ```ignore
//! bind(&name).to(&label).in_context(&mut ctx);
//!
//! bind(&text)
//!     .to_converting(&number, Parse::new(), infallible(|n: &i32| n.to_string()))
//!     .in_context(&mut ctx);
//!
//! // one-way: only the source -> target direction was configured
//! bind(&a)
//!     .to(&b)
//!     .update_target(|s| s.with_after_get(|v: &i32| ValidationResult::ok()))
//!     .in_context(&mut ctx);
//! ```
//!
//! Without any per-direction configuration the binding is two-way. As soon
//! as one direction is configured (a converter or an `update_*` call), the
//! directions that were never configured are left out.

use crate::context::BindingContext;
use crate::convert::Converter;
use crate::observable::ObservableValue;
use crate::strategy::UpdateStrategy;

/// Start a binding from `source`.
#[must_use]
pub fn bind<A: Clone>(source: &A) -> OngoingBinding<A> {
    OngoingBinding {
        source: source.clone(),
    }
}

/// A binding with a source but no target yet.
#[derive(Debug, Clone)]
#[must_use]
pub struct OngoingBinding<A> {
    source: A,
}

impl<A: Clone + 'static> OngoingBinding<A> {
    /// Target `target` with identity conversion in both directions.
    pub fn to<S, T, B>(self, target: &B) -> PendingBinding<S, T, A, B>
    where
        S: Clone + Into<T> + 'static,
        T: Clone + Into<S> + 'static,
        A: ObservableValue<S>,
        B: ObservableValue<T> + Clone + 'static,
    {
        PendingBinding::new(
            self.source,
            target.clone(),
            UpdateStrategy::new(),
            UpdateStrategy::new(),
        )
    }

    /// Target `target` with explicit converters for types that do not
    /// convert into each other.
    pub fn to_converting<S, T, B>(
        self,
        target: &B,
        source_to_target: impl Converter<S, T> + 'static,
        target_to_source: impl Converter<T, S> + 'static,
    ) -> PendingBinding<S, T, A, B>
    where
        S: 'static,
        T: 'static,
        A: ObservableValue<S>,
        B: ObservableValue<T> + Clone + 'static,
    {
        PendingBinding::new(
            self.source,
            target.clone(),
            UpdateStrategy::converting(source_to_target),
            UpdateStrategy::converting(target_to_source),
        )
    }
}

/// A fully addressed binding waiting to be placed in a context.
#[must_use]
pub struct PendingBinding<S, T, A, B> {
    source: A,
    target: B,
    forward: UpdateStrategy<S, T>,
    backward: UpdateStrategy<T, S>,
    forward_configured: bool,
    backward_configured: bool,
}

impl<S, T, A, B> PendingBinding<S, T, A, B>
where
    S: 'static,
    T: 'static,
    A: ObservableValue<S> + Clone + 'static,
    B: ObservableValue<T> + Clone + 'static,
{
    fn new(
        source: A,
        target: B,
        forward: UpdateStrategy<S, T>,
        backward: UpdateStrategy<T, S>,
    ) -> Self {
        Self {
            source,
            target,
            forward,
            backward,
            forward_configured: false,
            backward_configured: false,
        }
    }

    /// Converter used when the source changes.
    pub fn source_converter(mut self, converter: impl Converter<S, T> + 'static) -> Self {
        self.forward = self.forward.with_converter(converter);
        self.forward_configured = true;
        self
    }

    /// Converter used when the target changes.
    pub fn target_converter(mut self, converter: impl Converter<T, S> + 'static) -> Self {
        self.backward = self.backward.with_converter(converter);
        self.backward_configured = true;
        self
    }

    /// Configure the source → target strategy.
    pub fn update_target(
        mut self,
        configure: impl FnOnce(UpdateStrategy<S, T>) -> UpdateStrategy<S, T>,
    ) -> Self {
        self.forward = configure(self.forward);
        self.forward_configured = true;
        self
    }

    /// Configure the target → source strategy.
    pub fn update_source(
        mut self,
        configure: impl FnOnce(UpdateStrategy<T, S>) -> UpdateStrategy<T, S>,
    ) -> Self {
        self.backward = configure(self.backward);
        self.backward_configured = true;
        self
    }

    /// Bind in `context` and return it for chaining.
    pub fn in_context(self, context: &mut BindingContext) -> &mut BindingContext {
        let explicit = self.forward_configured || self.backward_configured;
        let forward = (!explicit || self.forward_configured).then_some(self.forward);
        let backward = (!explicit || self.backward_configured).then_some(self.backward);
        context.bind(&self.source, &self.target, forward, backward);
        context
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
