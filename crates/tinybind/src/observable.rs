#![forbid(unsafe_code)]

//! Observable value cells with change notification and version tracking.
//!
//! # Design
//!
//! [`ObservableValue<T>`] is the contract the binding engine consumes: read,
//! write with change detection, and observer registration with an optional
//! synthetic "initial value" emission. [`Observable<T>`] is the in-memory
//! implementation, wrapping its state in shared, reference-counted storage
//! (`Rc<RefCell<..>>`). Cloning a handle shares the cell.
//!
//! Nullable cells are plain `Observable<Option<U>>`: `Option`'s `PartialEq`
//! treats two `None`s as equal and `None` vs `Some(_)` as a change.
//!
//! # Guarded writes
//!
//! A cell created with [`Observable::guarded`] forwards every change to a
//! [`WriteHook`] (a widget, a record field, ...) *before* committing it. The
//! hook may [`Veto`] the value, in which case the whole `set` is rejected:
//! the cell keeps its old value, the version does not move and no observer
//! fires. While the hook runs, nested `set` calls on the same cell are
//! ignored; this swallows the echo of a store that reports its own update
//! back into the cell.
//!
//! Changes that originate in the store (a user typing into a widget) enter
//! through [`Observable::set_from_store`], which commits and notifies but
//! never calls the hook.
//!
//! # Performance
//!
//! | Operation        | Complexity                 |
//! |------------------|----------------------------|
//! | `get()`          | O(1) + clone of `T`        |
//! | `set()`          | O(S) where S = observers   |
//! | `add_observer()` | O(S) (duplicate check)     |
//!
//! # Failure Modes
//!
//! - **Re-entrant set**: no borrow is held while observers run, so an
//!   observer may set this or any other cell. Observers registered or removed
//!   during a notification take effect from the next notification on (the
//!   observer list is snapshotted).
//! - **Observer leak**: observers are held strongly until removed. Use
//!   [`Observable::subscribe`] for closures that should go away on drop.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use tracing::{debug, trace};

/// Receives change notifications from an [`ObservableValue`].
///
/// `old` is `None` for the synthetic notification emitted when an observer
/// is registered with `emit_initial = true`.
pub trait ValueObserver<T> {
    fn value_changed(&self, new: &T, old: Option<&T>);
}

impl<T, F> ValueObserver<T> for F
where
    F: Fn(&T, Option<&T>),
{
    fn value_changed(&self, new: &T, old: Option<&T>) {
        self(new, old)
    }
}

/// Shared handle to an observer. Registration identity is the allocation.
pub type ObserverRef<T> = Rc<dyn ValueObserver<T>>;

/// Identity of an observable cell, stable for the cell's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ValueKey(usize);

impl ValueKey {
    /// Key derived from the address of a shared allocation.
    #[must_use]
    pub fn of<P: ?Sized>(shared: &Rc<P>) -> Self {
        Self(Rc::as_ptr(shared).cast::<()>() as usize)
    }
}

/// Refusal of an external store to accept a value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Veto {
    reason: String,
}

impl Veto {
    #[must_use]
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    #[must_use]
    pub fn reason(&self) -> &str {
        &self.reason
    }
}

impl fmt::Display for Veto {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "write vetoed: {}", self.reason)
    }
}

impl std::error::Error for Veto {}

/// Pushes a value into the store backing a guarded [`Observable`].
pub trait WriteHook<T> {
    /// # Errors
    ///
    /// Returns [`Veto`] when the store cannot apply `value`.
    fn write(&self, value: &T) -> Result<(), Veto>;
}

impl<T, F> WriteHook<T> for F
where
    F: Fn(&T) -> Result<(), Veto>,
{
    fn write(&self, value: &T) -> Result<(), Veto> {
        self(value)
    }
}

/// The observable value contract consumed by the binding engine.
///
/// Implementations must honor:
///
/// 1. `set(v)` with `v == get()` returns `false` and notifies nobody.
/// 2. On change, observers are called in registration order with
///    `(new, Some(old))` before `set` returns.
/// 3. `add_observer(o, true)` calls `o` once with `(current, None)`.
/// 4. Registering the same observer twice keeps a single registration.
/// 5. Removing an unregistered observer is a no-op.
pub trait ObservableValue<T> {
    /// Current value.
    fn get(&self) -> T;

    /// Install `value` if it differs from the current one. Returns whether
    /// a change was committed.
    fn set(&self, value: T) -> bool;

    /// Like [`set`](Self::set), but reports a veto from the backing store.
    ///
    /// # Errors
    ///
    /// Returns [`Veto`] when the backing store refused the value.
    fn try_set(&self, value: T) -> Result<bool, Veto> {
        Ok(self.set(value))
    }

    fn add_observer(&self, observer: ObserverRef<T>, emit_initial: bool);

    fn remove_observer(&self, observer: &ObserverRef<T>);

    /// Identity of the underlying cell.
    fn key(&self) -> ValueKey;
}

pub(crate) fn same_rc<P: ?Sized>(a: &Rc<P>, b: &Rc<P>) -> bool {
    std::ptr::addr_eq(Rc::as_ptr(a), Rc::as_ptr(b))
}

/// Shared interior for [`Observable<T>`].
struct ObservableInner<T> {
    value: T,
    version: u64,
    observers: Vec<ObserverRef<T>>,
    hook: Option<Rc<dyn WriteHook<T>>>,
    /// Set while the write hook runs; nested writes are echoes.
    writing: bool,
}

/// A shared, version-tracked value with change notification.
///
/// # Invariants
///
/// 1. `version` increments by exactly 1 on each committed change.
/// 2. `set(v)` where `v == current` is a no-op.
/// 3. Observers are notified in registration order.
/// 4. A vetoed write leaves value, version and observers untouched.
pub struct Observable<T> {
    inner: Rc<RefCell<ObservableInner<T>>>,
}

// Manual Clone: shares the same Rc.
impl<T> Clone for Observable<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Observable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("Observable")
            .field("value", &inner.value)
            .field("version", &inner.version)
            .field("observer_count", &inner.observers.len())
            .field("guarded", &inner.hook.is_some())
            .finish()
    }
}

impl<T: Clone + PartialEq + Default + 'static> Default for Observable<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

/// Resets the `writing` flag even if the hook unwinds.
struct WritingGuard<'a, T> {
    inner: &'a RefCell<ObservableInner<T>>,
}

impl<T> Drop for WritingGuard<'_, T> {
    fn drop(&mut self) {
        self.inner.borrow_mut().writing = false;
    }
}

impl<T: Clone + PartialEq + 'static> Observable<T> {
    /// Create a new observable with the given initial value.
    ///
    /// The initial version is 0 and no observers are registered.
    #[must_use]
    pub fn new(value: T) -> Self {
        Self::with_hook(value, None)
    }

    /// Create an observable backed by an external store.
    ///
    /// `hook` receives every changed value before it is committed and may
    /// veto it. The initial value is assumed to already match the store.
    #[must_use]
    pub fn guarded(value: T, hook: impl WriteHook<T> + 'static) -> Self {
        Self::with_hook(value, Some(Rc::new(hook)))
    }

    fn with_hook(value: T, hook: Option<Rc<dyn WriteHook<T>>>) -> Self {
        Self {
            inner: Rc::new(RefCell::new(ObservableInner {
                value,
                version: 0,
                observers: Vec::new(),
                hook,
                writing: false,
            })),
        }
    }

    /// Get a clone of the current value.
    #[must_use]
    pub fn get(&self) -> T {
        self.inner.borrow().value.clone()
    }

    /// Access the current value by reference without cloning.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.inner.borrow().value)
    }

    /// Set a new value. Returns `true` if the value changed.
    ///
    /// A vetoed write returns `false`; use [`try_set`](Self::try_set) to
    /// see the veto.
    pub fn set(&self, value: T) -> bool {
        self.try_set(value).unwrap_or(false)
    }

    /// Set a new value, surfacing a veto from the write hook.
    ///
    /// # Errors
    ///
    /// Returns the hook's [`Veto`]; the cell is left unchanged.
    pub fn try_set(&self, value: T) -> Result<bool, Veto> {
        let hook = {
            let inner = self.inner.borrow();
            if inner.value == value {
                return Ok(false);
            }
            if inner.writing {
                trace!("ignoring write-back while the backing store is updated");
                return Ok(false);
            }
            inner.hook.clone()
        };

        if let Some(hook) = hook {
            self.inner.borrow_mut().writing = true;
            let guard = WritingGuard { inner: &self.inner };
            let written = hook.write(&value);
            drop(guard);
            if let Err(veto) = written {
                debug!(reason = veto.reason(), "backing store vetoed write");
                return Err(veto);
            }
        }

        self.commit(value);
        Ok(true)
    }

    /// Install a value reported by the backing store.
    ///
    /// Commits and notifies like [`set`](Self::set) but skips the write
    /// hook, since the store already holds `value`. Returns whether the
    /// value changed. On an unguarded cell this is the same as `set`.
    pub fn set_from_store(&self, value: T) -> bool {
        {
            let inner = self.inner.borrow();
            if inner.value == value {
                return false;
            }
            if inner.writing {
                trace!("ignoring store update while the backing store is written");
                return false;
            }
        }
        self.commit(value);
        true
    }

    fn commit(&self, value: T) {
        let (old, observers) = {
            let mut inner = self.inner.borrow_mut();
            let old = std::mem::replace(&mut inner.value, value);
            inner.version += 1;
            (old, inner.observers.clone())
        };
        let new = self.get();
        for observer in &observers {
            observer.value_changed(&new, Some(&old));
        }
    }

    /// Modify a copy of the value via a closure and [`set`](Self::set) it.
    ///
    /// Goes through the write hook like any other change. Returns whether
    /// the value changed.
    pub fn update(&self, f: impl FnOnce(&mut T)) -> bool {
        let mut next = self.get();
        f(&mut next);
        self.set(next)
    }

    /// Register an observer. With `emit_initial`, the observer is called
    /// once right away with `(current, None)`.
    pub fn add_observer(&self, observer: ObserverRef<T>, emit_initial: bool) {
        {
            let mut inner = self.inner.borrow_mut();
            if !inner.observers.iter().any(|o| same_rc(o, &observer)) {
                inner.observers.push(Rc::clone(&observer));
            }
        }
        if emit_initial {
            let current = self.get();
            observer.value_changed(&current, None);
        }
    }

    pub fn remove_observer(&self, observer: &ObserverRef<T>) {
        self.inner
            .borrow_mut()
            .observers
            .retain(|o| !same_rc(o, observer));
    }

    /// Subscribe a closure to value changes.
    ///
    /// No initial notification is emitted. Dropping the returned
    /// [`Subscription`] removes the closure.
    pub fn subscribe(&self, callback: impl Fn(&T, Option<&T>) + 'static) -> Subscription {
        let observer: ObserverRef<T> = Rc::new(callback);
        self.add_observer(Rc::clone(&observer), false);
        let cell: Weak<RefCell<ObservableInner<T>>> = Rc::downgrade(&self.inner);
        Subscription {
            detach: Some(Box::new(move || {
                if let Some(inner) = cell.upgrade() {
                    inner
                        .borrow_mut()
                        .observers
                        .retain(|o| !same_rc(o, &observer));
                }
            })),
        }
    }

    /// Current version number. Increments by 1 on each committed change.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.inner.borrow().version
    }

    /// Number of registered observers.
    #[must_use]
    pub fn observer_count(&self) -> usize {
        self.inner.borrow().observers.len()
    }

    /// Identity of this cell (shared by all clones of the handle).
    #[must_use]
    pub fn key(&self) -> ValueKey {
        ValueKey::of(&self.inner)
    }
}

impl<U: Clone + PartialEq + 'static> Observable<Option<U>> {
    /// Create an empty cell.
    #[must_use]
    pub fn nil() -> Self {
        Self::new(None)
    }
}

impl<T: Clone + PartialEq + 'static> ObservableValue<T> for Observable<T> {
    fn get(&self) -> T {
        Observable::get(self)
    }

    fn set(&self, value: T) -> bool {
        Observable::set(self, value)
    }

    fn try_set(&self, value: T) -> Result<bool, Veto> {
        Observable::try_set(self, value)
    }

    fn add_observer(&self, observer: ObserverRef<T>, emit_initial: bool) {
        Observable::add_observer(self, observer, emit_initial);
    }

    fn remove_observer(&self, observer: &ObserverRef<T>) {
        Observable::remove_observer(self, observer);
    }

    fn key(&self) -> ValueKey {
        Observable::key(self)
    }
}

/// RAII guard for a closure subscribed with [`Observable::subscribe`].
///
/// Dropping the guard removes the closure from the cell's observer list.
/// Outliving the cell is fine.
pub struct Subscription {
    detach: Option<Box<dyn FnOnce()>>,
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(detach) = self.detach.take() {
            detach();
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
