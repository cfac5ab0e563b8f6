#![forbid(unsafe_code)]

//! Observable values and echo-free two-way data bindings.
//!
//! - [`Observable`]: a shared, version-tracked value cell implementing the
//!   [`ObservableValue`] contract.
//! - [`UpdateStrategy`]: the validate → convert → validate → write pipeline
//!   for one binding direction.
//! - [`Binding`]: a live link between two cells that never echoes a change
//!   back into the cell it came from.
//! - [`BindingContext`]: owns bindings keyed by `(source, target)` and tears
//!   them down on `unbind`, `unbind_all` or drop.
//! - [`bind`]: fluent construction, e.g. `bind(&a).to(&b).in_context(&mut ctx)`.
//! - [`ObservableList`] and [`ObservableMap`]: collections reporting
//!   structural changes.
//!
//! # Invariants
//!
//! 1. Setting a value equal to the current one is a no-op (no version bump,
//!    no notifications). `None` vs `Some(_)` is a change.
//! 2. Observers are notified in registration order, synchronously, before
//!    `set` returns.
//! 3. Binding two cells leaves both holding the source's value.
//! 4. A change propagates to the peer at most once and never returns to its
//!    origin through the same binding.
//! 5. After `unbind_all` every cell's observer count is back to its
//!    pre-bind value.
//!
//! Everything is single-threaded (`Rc`-based, `!Send`).

pub mod binding;
pub mod builder;
pub mod context;
pub mod convert;
pub mod list;
pub mod map;
pub mod observable;
pub mod strategy;
pub mod validation;

pub use binding::{Binding, PropagationState};
pub use builder::{OngoingBinding, PendingBinding, bind};
pub use context::BindingContext;
pub use convert::{ConversionError, Converter, Identity, Infallible, Parse, infallible};
pub use list::{IndexOutOfBounds, ListObserver, ListObserverRef, ObservableList};
pub use map::{MapObserver, MapObserverRef, ObservableMap};
pub use observable::{
    Observable, ObservableValue, ObserverRef, Subscription, ValueKey, ValueObserver, Veto,
    WriteHook,
};
pub use strategy::{Propagation, UpdateStrategy};
pub use validation::{AcceptAll, ValidationResult, Validator};
