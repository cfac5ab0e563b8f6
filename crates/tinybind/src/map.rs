#![forbid(unsafe_code)]

//! Observable key/value collection.
//!
//! [`ObservableMap<K, V>`] wraps a `BTreeMap<K, V>` so that iteration and
//! the order of `clear` notifications follow key order.
//!
//! `insert` reports `value_added` for a new key and `value_changed` with the
//! previous value for an existing key, even when the value is equal.
//! `extend` inserts entry by entry with the same reporting. `clear` removes
//! entries one at a time and reports each removal as it happens.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use tracing::trace;

use crate::observable::{ValueKey, same_rc};

/// Receives entry changes of an [`ObservableMap`]. All methods default to
/// no-ops.
pub trait MapObserver<K, V> {
    fn value_added(&self, _key: &K) {}

    /// `last` is the value that was replaced.
    fn value_changed(&self, _key: &K, _last: &V) {}

    fn value_removed(&self, _key: &K, _value: &V) {}
}

pub type MapObserverRef<K, V> = Rc<dyn MapObserver<K, V>>;

struct MapInner<K, V> {
    entries: BTreeMap<K, V>,
    observers: Vec<MapObserverRef<K, V>>,
}

/// Shared, observable `BTreeMap<K, V>`. Cloning a handle shares the map.
pub struct ObservableMap<K, V> {
    inner: Rc<RefCell<MapInner<K, V>>>,
}

impl<K, V> Clone for ObservableMap<K, V> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for ObservableMap<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("ObservableMap")
            .field("entries", &inner.entries)
            .field("observer_count", &inner.observers.len())
            .finish()
    }
}

impl<K: Ord, V> Default for ObservableMap<K, V> {
    fn default() -> Self {
        Self::from(BTreeMap::new())
    }
}

impl<K: Ord, V> From<BTreeMap<K, V>> for ObservableMap<K, V> {
    fn from(entries: BTreeMap<K, V>) -> Self {
        Self {
            inner: Rc::new(RefCell::new(MapInner {
                entries,
                observers: Vec::new(),
            })),
        }
    }
}

impl<K: Ord, V> FromIterator<(K, V)> for ObservableMap<K, V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self::from(iter.into_iter().collect::<BTreeMap<_, _>>())
    }
}

impl<K: Ord, V> ObservableMap<K, V> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.borrow().entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn contains_key(&self, key: &K) -> bool {
        self.inner.borrow().entries.contains_key(key)
    }

    /// Remove `key`, returning its value.
    pub fn remove(&self, key: &K) -> Option<V> {
        let (key, value) = self.inner.borrow_mut().entries.remove_entry(key)?;
        self.notify(|o| o.value_removed(&key, &value));
        Some(value)
    }

    /// Remove every entry, one notification per entry in key order.
    pub fn clear(&self) {
        loop {
            let Some((key, value)) = self.inner.borrow_mut().entries.pop_first() else {
                break;
            };
            self.notify(|o| o.value_removed(&key, &value));
        }
    }

    /// Borrow the entries for the duration of `f`.
    pub fn with<R>(&self, f: impl FnOnce(&BTreeMap<K, V>) -> R) -> R {
        f(&self.inner.borrow().entries)
    }

    pub fn add_observer(&self, observer: MapObserverRef<K, V>) {
        let mut inner = self.inner.borrow_mut();
        if !inner.observers.iter().any(|o| same_rc(o, &observer)) {
            inner.observers.push(observer);
        }
    }

    pub fn remove_observer(&self, observer: &MapObserverRef<K, V>) {
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

    fn notify(&self, event: impl Fn(&dyn MapObserver<K, V>)) {
        let observers = self.inner.borrow().observers.clone();
        trace!(observers = observers.len(), "map changed");
        for observer in &observers {
            event(observer.as_ref());
        }
    }
}

impl<K: Ord + Clone, V> ObservableMap<K, V> {
    /// Insert `value` under `key`, returning the previous value.
    pub fn insert(&self, key: K, value: V) -> Option<V> {
        let previous = self.inner.borrow_mut().entries.insert(key.clone(), value);
        match &previous {
            Some(last) => self.notify(|o| o.value_changed(&key, last)),
            None => self.notify(|o| o.value_added(&key)),
        }
        previous
    }

    /// Insert every entry of `entries`, one notification per entry.
    pub fn extend(&self, entries: impl IntoIterator<Item = (K, V)>) {
        for (key, value) in entries {
            self.insert(key, value);
        }
    }

    /// Keys in ascending order.
    #[must_use]
    pub fn keys(&self) -> Vec<K> {
        self.inner.borrow().entries.keys().cloned().collect()
    }
}

impl<K: Ord, V: Clone> ObservableMap<K, V> {
    #[must_use]
    pub fn get(&self, key: &K) -> Option<V> {
        self.inner.borrow().entries.get(key).cloned()
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
        Added(&'static str),
        Changed(&'static str, i32),
        Removed(&'static str, i32),
    }

    #[derive(Default)]
    struct Recorder {
        events: RefCell<Vec<Event>>,
    }

    impl MapObserver<&'static str, i32> for Recorder {
        fn value_added(&self, key: &&'static str) {
            self.events.borrow_mut().push(Event::Added(*key));
        }

        fn value_changed(&self, key: &&'static str, last: &i32) {
            self.events.borrow_mut().push(Event::Changed(*key, *last));
        }

        fn value_removed(&self, key: &&'static str, value: &i32) {
            self.events.borrow_mut().push(Event::Removed(*key, *value));
        }
    }

    fn watched() -> (ObservableMap<&'static str, i32>, Rc<Recorder>) {
        let map: ObservableMap<&'static str, i32> = ObservableMap::new();
        let recorder = Rc::new(Recorder::default());
        map.add_observer(recorder.clone());
        (map, recorder)
    }

    #[test]
    fn insert_reports_added_then_changed() {
        let (map, rec) = watched();
        assert_eq!(map.insert("a", 1), None);
        assert_eq!(map.insert("a", 2), Some(1));
        assert_eq!(map.insert("a", 2), Some(2));
        assert_eq!(map.get(&"a"), Some(2));
        assert_eq!(
            *rec.events.borrow(),
            vec![Event::Added("a"), Event::Changed("a", 1), Event::Changed("a", 2)]
        );
    }

    #[test]
    fn extend_reports_each_entry() {
        let (map, rec) = watched();
        map.insert("b", 1);
        map.extend([("a", 10), ("b", 20), ("c", 30)]);
        map.extend(Vec::new());

        assert_eq!(map.keys(), vec!["a", "b", "c"]);
        assert_eq!(map.get(&"b"), Some(20));
        assert_eq!(
            *rec.events.borrow(),
            vec![
                Event::Added("b"),
                Event::Added("a"),
                Event::Changed("b", 1),
                Event::Added("c"),
            ]
        );
    }

    #[test]
    fn remove_reports_only_present_keys() {
        let (map, rec) = watched();
        map.insert("a", 1);
        assert_eq!(map.remove(&"a"), Some(1));
        assert_eq!(map.remove(&"a"), None);
        assert!(!map.contains_key(&"a"));
        assert_eq!(
            *rec.events.borrow(),
            vec![Event::Added("a"), Event::Removed("a", 1)]
        );
    }

    #[test]
    fn clear_reports_each_entry_in_key_order() {
        let map: ObservableMap<&'static str, i32> = [("b", 2), ("a", 1)].into_iter().collect();
        let rec = Rc::new(Recorder::default());
        map.add_observer(rec.clone());

        map.clear();
        assert!(map.is_empty());
        assert_eq!(
            *rec.events.borrow(),
            vec![Event::Removed("a", 1), Event::Removed("b", 2)]
        );

        map.clear();
        assert_eq!(rec.events.borrow().len(), 2);
    }

    #[test]
    fn clear_is_observed_incrementally() {
        struct Sizes {
            map: ObservableMap<&'static str, i32>,
            seen: RefCell<Vec<usize>>,
        }
        impl MapObserver<&'static str, i32> for Sizes {
            fn value_removed(&self, _key: &&'static str, _value: &i32) {
                self.seen.borrow_mut().push(self.map.len());
            }
        }

        let map: ObservableMap<&'static str, i32> =
            [("a", 1), ("b", 2), ("c", 3)].into_iter().collect();
        let sizes = Rc::new(Sizes {
            map: map.clone(),
            seen: RefCell::new(Vec::new()),
        });
        let observer: MapObserverRef<&'static str, i32> = sizes.clone();
        map.add_observer(Rc::clone(&observer));
        map.clear();
        assert_eq!(*sizes.seen.borrow(), vec![2, 1, 0]);
        map.remove_observer(&observer);
    }

    #[test]
    fn keys_and_dedup() {
        let (map, rec) = watched();
        let observer: MapObserverRef<&'static str, i32> = rec.clone();
        map.add_observer(Rc::clone(&observer));
        assert_eq!(map.observer_count(), 1);

        map.insert("z", 26);
        map.insert("m", 13);
        assert_eq!(map.keys(), vec!["m", "z"]);
        assert_eq!(map.len(), 2);
        assert_eq!(map.with(|entries| entries.values().sum::<i32>()), 39);

        map.remove_observer(&observer);
        map.insert("q", 0);
        assert_eq!(rec.events.borrow().len(), 2);
    }
}
