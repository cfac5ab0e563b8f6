#![forbid(unsafe_code)]

//! Observable ordered collection.
//!
//! [`ObservableList<E>`] wraps a `Vec<E>` and reports structural changes to
//! [`ListObserver`]s. Observer registration follows the same rules as
//! [`Observable`](crate::Observable): identity-deduplicated, registration
//! order, snapshot before notification.
//!
//! | Mutation            | Notification                         |
//! |---------------------|--------------------------------------|
//! | `push` / `insert`   | `values_added(index, 1)`             |
//! | `extend`            | `values_added(first, count)`         |
//! | `insert_all`        | `values_added(index, count)`         |
//! | `remove`            | `values_removed(index, &[removed])`  |
//! | `replace`           | `value_replaced(index, &old)`        |
//! | `clear`             | `values_removed(0, &all)`            |
//!
//! Empty `extend` or `insert_all` and `clear` of an empty list notify nobody.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use tracing::trace;

use crate::observable::{ValueKey, same_rc};

/// Receives structural changes of an [`ObservableList`].
///
/// All methods default to no-ops.
pub trait ListObserver<E> {
    fn values_added(&self, _index: usize, _count: usize) {}

    fn values_removed(&self, _index: usize, _removed: &[E]) {}

    fn value_replaced(&self, _index: usize, _old: &E) {}
}

pub type ListObserverRef<E> = Rc<dyn ListObserver<E>>;

/// An index was outside the list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexOutOfBounds {
    pub index: usize,
    pub len: usize,
}

impl fmt::Display for IndexOutOfBounds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "index {} out of bounds for length {}", self.index, self.len)
    }
}

impl std::error::Error for IndexOutOfBounds {}

struct ListInner<E> {
    items: Vec<E>,
    observers: Vec<ListObserverRef<E>>,
}

/// Shared, observable `Vec<E>`. Cloning a handle shares the list.
pub struct ObservableList<E> {
    inner: Rc<RefCell<ListInner<E>>>,
}

impl<E> Clone for ObservableList<E> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<E: fmt::Debug> fmt::Debug for ObservableList<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("ObservableList")
            .field("items", &inner.items)
            .field("observer_count", &inner.observers.len())
            .finish()
    }
}

impl<E> Default for ObservableList<E> {
    fn default() -> Self {
        Self::from(Vec::new())
    }
}

impl<E> From<Vec<E>> for ObservableList<E> {
    fn from(items: Vec<E>) -> Self {
        Self {
            inner: Rc::new(RefCell::new(ListInner {
                items,
                observers: Vec::new(),
            })),
        }
    }
}

impl<E> ObservableList<E> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.borrow().items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Borrow the items for the duration of `f`.
    pub fn with<R>(&self, f: impl FnOnce(&[E]) -> R) -> R {
        f(&self.inner.borrow().items)
    }

    /// Append an element.
    pub fn push(&self, element: E) {
        let index = {
            let mut inner = self.inner.borrow_mut();
            inner.items.push(element);
            inner.items.len() - 1
        };
        self.notify(|o| o.values_added(index, 1));
    }

    /// Insert `element` at `index`, shifting later elements.
    ///
    /// # Errors
    ///
    /// Returns [`IndexOutOfBounds`] when `index > len`.
    pub fn insert(&self, index: usize, element: E) -> Result<(), IndexOutOfBounds> {
        {
            let mut inner = self.inner.borrow_mut();
            let len = inner.items.len();
            if index > len {
                return Err(IndexOutOfBounds { index, len });
            }
            inner.items.insert(index, element);
        }
        self.notify(|o| o.values_added(index, 1));
        Ok(())
    }

    /// Append all elements of `elements` as one change.
    pub fn extend(&self, elements: impl IntoIterator<Item = E>) {
        let (index, count) = {
            let mut inner = self.inner.borrow_mut();
            let index = inner.items.len();
            inner.items.extend(elements);
            (index, inner.items.len() - index)
        };
        if count > 0 {
            self.notify(|o| o.values_added(index, count));
        }
    }

    /// Insert all of `elements` at `index` as one change.
    ///
    /// # Errors
    ///
    /// Returns [`IndexOutOfBounds`] when `index > len`; nothing is inserted.
    pub fn insert_all(
        &self,
        index: usize,
        elements: impl IntoIterator<Item = E>,
    ) -> Result<(), IndexOutOfBounds> {
        let count = {
            let mut inner = self.inner.borrow_mut();
            let len = inner.items.len();
            if index > len {
                return Err(IndexOutOfBounds { index, len });
            }
            inner.items.splice(index..index, elements);
            inner.items.len() - len
        };
        if count > 0 {
            self.notify(|o| o.values_added(index, count));
        }
        Ok(())
    }

    /// Remove and return the element at `index`.
    ///
    /// # Errors
    ///
    /// Returns [`IndexOutOfBounds`] when `index >= len`.
    pub fn remove(&self, index: usize) -> Result<E, IndexOutOfBounds> {
        let removed = {
            let mut inner = self.inner.borrow_mut();
            let len = inner.items.len();
            if index >= len {
                return Err(IndexOutOfBounds { index, len });
            }
            inner.items.remove(index)
        };
        self.notify(|o| o.values_removed(index, std::slice::from_ref(&removed)));
        Ok(removed)
    }

    /// Replace the element at `index` and return the old one.
    ///
    /// # Errors
    ///
    /// Returns [`IndexOutOfBounds`] when `index >= len`.
    pub fn replace(&self, index: usize, element: E) -> Result<E, IndexOutOfBounds> {
        let old = {
            let mut inner = self.inner.borrow_mut();
            let len = inner.items.len();
            let Some(slot) = inner.items.get_mut(index) else {
                return Err(IndexOutOfBounds { index, len });
            };
            std::mem::replace(slot, element)
        };
        self.notify(|o| o.value_replaced(index, &old));
        Ok(old)
    }

    /// Remove all elements as one change.
    pub fn clear(&self) {
        let removed = std::mem::take(&mut self.inner.borrow_mut().items);
        if !removed.is_empty() {
            self.notify(|o| o.values_removed(0, &removed));
        }
    }

    /// Register an observer. Registering the same observer twice is a no-op.
    pub fn add_observer(&self, observer: ListObserverRef<E>) {
        let mut inner = self.inner.borrow_mut();
        if !inner.observers.iter().any(|o| same_rc(o, &observer)) {
            inner.observers.push(observer);
        }
    }

    pub fn remove_observer(&self, observer: &ListObserverRef<E>) {
        self.inner
            .borrow_mut()
            .observers
            .retain(|o| !same_rc(o, observer));
    }

    #[must_use]
    pub fn observer_count(&self) -> usize {
        self.inner.borrow().observers.len()
    }

    #[must_use]
    pub fn key(&self) -> ValueKey {
        ValueKey::of(&self.inner)
    }

    fn notify(&self, event: impl Fn(&dyn ListObserver<E>)) {
        let observers = self.inner.borrow().observers.clone();
        trace!(observers = observers.len(), "list changed");
        for observer in &observers {
            event(observer.as_ref());
        }
    }
}

impl<E: Clone> ObservableList<E> {
    /// Clone of the element at `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<E> {
        self.inner.borrow().items.get(index).cloned()
    }

    /// Clone of all elements.
    #[must_use]
    pub fn to_vec(&self) -> Vec<E> {
        self.inner.borrow().items.clone()
    }
}

impl<E> FromIterator<E> for ObservableList<E> {
    fn from_iter<I: IntoIterator<Item = E>>(iter: I) -> Self {
        Self::from(iter.into_iter().collect::<Vec<_>>())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    enum Event {
        Added(usize, usize),
        Removed(usize, Vec<String>),
        Replaced(usize, String),
    }

    #[derive(Default)]
    struct Recorder {
        events: RefCell<Vec<Event>>,
    }

    impl ListObserver<String> for Recorder {
        fn values_added(&self, index: usize, count: usize) {
            self.events.borrow_mut().push(Event::Added(index, count));
        }

        fn values_removed(&self, index: usize, removed: &[String]) {
            self.events
                .borrow_mut()
                .push(Event::Removed(index, removed.to_vec()));
        }

        fn value_replaced(&self, index: usize, old: &String) {
            self.events
                .borrow_mut()
                .push(Event::Replaced(index, old.clone()));
        }
    }

    fn watched() -> (ObservableList<String>, Rc<Recorder>) {
        let list: ObservableList<String> = ObservableList::new();
        let recorder = Rc::new(Recorder::default());
        list.add_observer(recorder.clone());
        (list, recorder)
    }

    fn s(text: &str) -> String {
        text.to_string()
    }

    #[test]
    fn push_and_insert_report_additions() {
        let (list, rec) = watched();
        list.push(s("a"));
        list.push(s("c"));
        list.insert(1, s("b")).unwrap();
        assert_eq!(list.to_vec(), vec![s("a"), s("b"), s("c")]);
        assert_eq!(
            *rec.events.borrow(),
            vec![Event::Added(0, 1), Event::Added(1, 1), Event::Added(1, 1)]
        );
    }

    #[test]
    fn insert_out_of_bounds_is_rejected_silently() {
        let (list, rec) = watched();
        let err = list.insert(3, s("x")).unwrap_err();
        assert_eq!(err, IndexOutOfBounds { index: 3, len: 0 });
        assert_eq!(err.to_string(), "index 3 out of bounds for length 0");
        assert!(rec.events.borrow().is_empty());
    }

    #[test]
    fn extend_reports_one_batch() {
        let (list, rec) = watched();
        list.push(s("a"));
        list.extend([s("b"), s("c")]);
        list.extend(Vec::<String>::new());
        assert_eq!(list.len(), 3);
        assert_eq!(
            *rec.events.borrow(),
            vec![Event::Added(0, 1), Event::Added(1, 2)]
        );
    }

    #[test]
    fn insert_all_reports_batch_at_index() {
        let (list, rec) = watched();
        list.extend([s("a"), s("d")]);
        list.insert_all(1, [s("b"), s("c")]).unwrap();
        list.insert_all(4, Vec::new()).unwrap();
        assert_eq!(
            list.insert_all(6, [s("x")]),
            Err(IndexOutOfBounds { index: 6, len: 4 })
        );

        assert_eq!(list.to_vec(), vec![s("a"), s("b"), s("c"), s("d")]);
        assert_eq!(
            *rec.events.borrow(),
            vec![Event::Added(0, 2), Event::Added(1, 2)]
        );
    }

    #[test]
    fn remove_and_replace() {
        let list: ObservableList<String> = vec![s("a"), s("b"), s("c")].into();
        let rec = Rc::new(Recorder::default());
        list.add_observer(rec.clone());

        assert_eq!(list.remove(1), Ok(s("b")));
        assert_eq!(list.replace(0, s("z")), Ok(s("a")));
        assert!(list.remove(5).is_err());
        assert!(list.replace(2, s("q")).is_err());

        assert_eq!(list.to_vec(), vec![s("z"), s("c")]);
        assert_eq!(
            *rec.events.borrow(),
            vec![Event::Removed(1, vec![s("b")]), Event::Replaced(0, s("a"))]
        );
    }

    #[test]
    fn clear_reports_all_removed_once() {
        let (list, rec) = watched();
        list.clear();
        assert!(rec.events.borrow().is_empty());

        list.extend([s("a"), s("b")]);
        list.clear();
        assert!(list.is_empty());
        assert_eq!(
            rec.events.borrow().last(),
            Some(&Event::Removed(0, vec![s("a"), s("b")]))
        );
    }

    #[test]
    fn observers_are_deduplicated_and_removable() {
        let list: ObservableList<String> = ObservableList::new();
        let rec = Rc::new(Recorder::default());
        let observer: ListObserverRef<String> = rec.clone();
        list.add_observer(Rc::clone(&observer));
        list.add_observer(Rc::clone(&observer));
        assert_eq!(list.observer_count(), 1);

        list.push(s("a"));
        list.remove_observer(&observer);
        list.push(s("b"));
        assert_eq!(rec.events.borrow().len(), 1);
    }

    #[test]
    fn observer_may_mutate_list_during_notification() {
        struct Mirror {
            list: ObservableList<i32>,
        }
        impl ListObserver<i32> for Mirror {
            fn values_added(&self, _index: usize, _count: usize) {
                if self.list.len() < 3 {
                    self.list.push(0);
                }
            }
        }

        let list: ObservableList<i32> = ObservableList::new();
        let mirror: ListObserverRef<i32> = Rc::new(Mirror { list: list.clone() });
        list.add_observer(Rc::clone(&mirror));
        list.push(1);
        assert_eq!(list.to_vec(), vec![1, 0, 0]);
        list.remove_observer(&mirror);
    }

    #[test]
    fn get_and_with() {
        let list: ObservableList<i32> = (1..=3).collect();
        assert_eq!(list.get(0), Some(1));
        assert_eq!(list.get(3), None);
        assert_eq!(list.with(|items| items.iter().sum::<i32>()), 6);
        assert_eq!(list.clone().key(), list.key());
    }
}
