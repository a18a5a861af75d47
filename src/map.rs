use std::{
    borrow::Borrow,
    cmp::Ordering,
    collections::{hash_map::RandomState, HashMap},
    fmt,
    hash::{BuildHasher, Hash},
    iter::FromIterator,
    mem,
};

use crate::arena::NodeHandle;
use crate::linked::LinkedSequence;
use crate::sequence::{Iter, Keys, Sequence, Values};
use crate::skip::{EntryComparator, SkipOptions, SkipSequence};

/// What decides iteration order in an [`OrderedMap`]. Fixed for the map's
/// lifetime.
pub enum OrderPolicy<K, V> {
    /// First-insertion order. Updating a value never moves its entry.
    Insertion,

    /// Comparator order over keys. Updating a value never moves its entry,
    /// since the key it's ordered by can't change.
    ByKey(EntryComparator<K, V>),

    /// Comparator order over values. Updating a value repositions its entry.
    ByValue(EntryComparator<K, V>),
}

impl<K, V> OrderPolicy<K, V> {
    /// Orders entries by `cmp` over their keys.
    pub fn by_key<F>(cmp: F) -> Self
    where
        F: Fn(&K, &K) -> Ordering + 'static,
    {
        OrderPolicy::ByKey(Box::new(move |k1: &K, k2: &K, _: &V, _: &V| cmp(k1, k2)))
    }

    /// Orders entries by `cmp` over their values.
    pub fn by_value<F>(cmp: F) -> Self
    where
        F: Fn(&V, &V) -> Ordering + 'static,
    {
        OrderPolicy::ByValue(Box::new(move |_: &K, _: &K, v1: &V, v2: &V| cmp(v1, v2)))
    }
}

impl<K, V> fmt::Debug for OrderPolicy<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderPolicy::Insertion => f.write_str("Insertion"),
            OrderPolicy::ByKey(_) => f.write_str("ByKey"),
            OrderPolicy::ByValue(_) => f.write_str("ByValue"),
        }
    }
}

/// Construction options for an [`OrderedMap`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MapOptions {
    /// Entries to reserve room for up front, in both the index and the
    /// sequence.
    pub capacity: usize,

    /// Options for the skip list backing the comparator-ordered policies.
    /// Ignored under [`OrderPolicy::Insertion`].
    pub skip: SkipOptions,
}

/// The sequence picked at construction.
enum Backend<K, V> {
    Linked(LinkedSequence<K, V>),
    Skip(SkipSequence<K, V>),
}

impl<K, V> Sequence<K, V> for Backend<K, V> {
    fn insert(&mut self, key: K, value: V) -> NodeHandle {
        match self {
            Backend::Linked(seq) => seq.insert(key, value),
            Backend::Skip(seq) => seq.insert(key, value),
        }
    }

    fn delete(&mut self, handle: NodeHandle) -> (K, V) {
        match self {
            Backend::Linked(seq) => seq.delete(handle),
            Backend::Skip(seq) => seq.delete(handle),
        }
    }

    fn entry(&self, handle: NodeHandle) -> (&K, &V) {
        match self {
            Backend::Linked(seq) => seq.entry(handle),
            Backend::Skip(seq) => seq.entry(handle),
        }
    }

    fn value_mut(&mut self, handle: NodeHandle) -> &mut V {
        match self {
            Backend::Linked(seq) => seq.value_mut(handle),
            Backend::Skip(seq) => seq.value_mut(handle),
        }
    }

    fn first(&self) -> Option<NodeHandle> {
        match self {
            Backend::Linked(seq) => seq.first(),
            Backend::Skip(seq) => seq.first(),
        }
    }

    fn successor(&self, handle: NodeHandle) -> Option<NodeHandle> {
        match self {
            Backend::Linked(seq) => seq.successor(handle),
            Backend::Skip(seq) => seq.successor(handle),
        }
    }

    fn len(&self) -> usize {
        match self {
            Backend::Linked(seq) => seq.len(),
            Backend::Skip(seq) => seq.len(),
        }
    }

    fn clear(&mut self) {
        match self {
            Backend::Linked(seq) => seq.clear(),
            Backend::Skip(seq) => seq.clear(),
        }
    }
}

impl<K, V> fmt::Debug for Backend<K, V>
where
    K: fmt::Debug,
    V: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Backend::Linked(seq) => seq.fmt(f),
            Backend::Skip(seq) => seq.fmt(f),
        }
    }
}

/// A layer on top of [`HashMap`] that links its entries into a sequence so
/// they can be iterated in insertion, key or value order.
///
/// The hash map holds a handle to each entry's node, so lookups never pay for
/// ordering, and removal unlinks the node straight from its handle.
pub struct OrderedMap<K, V, S = RandomState>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    index: HashMap<K, NodeHandle, S>,
    sequence: Backend<K, V>,

    /// Whether an update has to move the entry, i.e. the order depends on the
    /// value.
    reposition_on_update: bool,
}

impl<K, V> OrderedMap<K, V, RandomState>
where
    K: Eq + Hash + Clone,
{
    /// Makes a new map in insertion order.
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Makes a new map in insertion order with room for `capacity` entries.
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_capacity_and_hash_builder(capacity, Default::default())
    }

    /// Makes a new map ordered by `cmp` over keys.
    pub fn with_key_order<F>(cmp: F) -> Self
    where
        F: Fn(&K, &K) -> Ordering + 'static,
    {
        Self::with_policy(
            OrderPolicy::by_key(cmp),
            MapOptions::default(),
            Default::default(),
        )
    }

    /// Makes a new map ordered by `cmp` over values. Entries with equal values
    /// iterate in the order they were last set.
    pub fn with_value_order<F>(cmp: F) -> Self
    where
        F: Fn(&V, &V) -> Ordering + 'static,
    {
        Self::with_policy(
            OrderPolicy::by_value(cmp),
            MapOptions::default(),
            Default::default(),
        )
    }
}

impl<K, V, S> OrderedMap<K, V, S>
where
    K: Eq + Hash + Clone,
    S: BuildHasher,
{
    /// Makes a new map in insertion order with a specified capacity and hasher.
    pub fn with_capacity_and_hash_builder(capacity: usize, hash_builder: S) -> Self {
        Self::with_policy(
            OrderPolicy::Insertion,
            MapOptions {
                capacity,
                ..MapOptions::default()
            },
            hash_builder,
        )
    }

    /// Makes a new map with every knob exposed.
    pub fn with_policy(policy: OrderPolicy<K, V>, options: MapOptions, hash_builder: S) -> Self {
        let capacity = options.capacity;
        let (sequence, reposition_on_update) = match policy {
            OrderPolicy::Insertion => (
                Backend::Linked(LinkedSequence::with_capacity(capacity)),
                false,
            ),
            OrderPolicy::ByKey(cmp) => (
                Backend::Skip(SkipSequence::with_capacity_and_options(
                    capacity,
                    cmp,
                    options.skip,
                )),
                false,
            ),
            OrderPolicy::ByValue(cmp) => (
                Backend::Skip(SkipSequence::with_capacity_and_options(
                    capacity,
                    cmp,
                    options.skip,
                )),
                true,
            ),
        };

        Self {
            index: HashMap::with_capacity_and_hasher(capacity, hash_builder),
            sequence,
            reposition_on_update,
        }
    }

    /// Sets the value at `k`, returning the previous value if the key was
    /// already present.
    ///
    /// A new key is linked into the sequence. An existing key keeps its place,
    /// except when the map is ordered by value, in which case its node is
    /// unlinked and linked again with the new value.
    pub fn insert(&mut self, k: K, v: V) -> Option<V> {
        let previous = match self.index.get_mut(&k) {
            Some(handle) if self.reposition_on_update => {
                let (key, value) = self.sequence.delete(*handle);
                *handle = self.sequence.insert(key, v);

                #[cfg(feature = "tracing")]
                tracing::trace!(len = self.sequence.len(), "repositioned updated entry");

                Some(value)
            }
            Some(handle) => Some(mem::replace(self.sequence.value_mut(*handle), v)),
            None => {
                let handle = self.sequence.insert(k.clone(), v);
                self.index.insert(k, handle);
                None
            }
        };

        #[cfg(test)]
        self.consistency_test();

        previous
    }

    /// Returns the value at `k`, if any. Lookups only touch the hash index.
    pub fn get<Q>(&self, k: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.index
            .get(k)
            .map(|handle| self.sequence.entry(*handle).1)
    }

    /// Returns the stored key and value at `k`, if any.
    pub fn get_key_value<Q>(&self, k: &Q) -> Option<(&K, &V)>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.index
            .get(k)
            .map(|handle| self.sequence.entry(*handle))
    }

    /// Returns the value at `k`, or `default` when the key is absent.
    pub fn get_or<'a, Q>(&'a self, k: &Q, default: &'a V) -> &'a V
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.get(k).unwrap_or(default)
    }

    /// Returns a mutable reference to the value at `k`.
    ///
    /// Always `None` for a map ordered by value, where editing a value in place
    /// would leave it out of order; use [`insert`](Self::insert) there.
    pub fn get_mut<Q>(&mut self, k: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        if self.reposition_on_update {
            return None;
        }

        let handle = *self.index.get(k)?;
        Some(self.sequence.value_mut(handle))
    }

    pub fn contains_key<Q>(&self, k: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.index.contains_key(k)
    }

    /// Removes `k`, returning its value if it was present. Removing an absent
    /// key does nothing.
    pub fn remove<Q>(&mut self, k: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let handle = self.index.remove(k)?;
        let (_, value) = self.sequence.delete(handle);

        #[cfg(test)]
        self.consistency_test();

        Some(value)
    }

    pub fn clear(&mut self) {
        self.index.clear();
        self.sequence.clear();

        #[cfg(test)]
        {
            assert_eq!(0, self.len());
            self.consistency_test();
        }
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Iterates `(key, value)` pairs in the map's order. Each call starts over
    /// from the front.
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter::new(&self.sequence)
    }

    /// Keys in the map's order.
    pub fn keys(&self) -> Keys<'_, K, V> {
        Keys(self.iter())
    }

    /// Values in the map's order.
    pub fn values(&self) -> Values<'_, K, V> {
        Values(self.iter())
    }

    /// Renders the backing sequence's internal shape, every skip list level
    /// included. For debugging only; the format may change at any time.
    pub fn structure(&self) -> String
    where
        K: fmt::Debug,
        V: fmt::Debug,
    {
        format!("{:?}", self.sequence)
    }

    /// Checks that the index and the sequence name exactly the same nodes.
    #[cfg(test)]
    fn consistency_test(&self) {
        assert_eq!(self.index.len(), self.sequence.len());

        let mut count = 0;
        let mut cursor = self.sequence.first();
        while let Some(handle) = cursor {
            count += 1;
            assert!(count <= self.len());

            let (k, _) = self.sequence.entry(handle);
            assert_eq!(Some(&handle), self.index.get(k));
            cursor = self.sequence.successor(handle);
        }

        assert_eq!(self.len(), count);
    }
}

impl<K, V, S> fmt::Debug for OrderedMap<K, V, S>
where
    K: Eq + Hash + Clone + fmt::Debug,
    V: fmt::Debug,
    S: BuildHasher,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<K, V> Default for OrderedMap<K, V, RandomState>
where
    K: Eq + Hash + Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<'a, K, V, S> IntoIterator for &'a OrderedMap<K, V, S>
where
    K: Eq + Hash + Clone,
    S: BuildHasher,
{
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<K, V, S> Extend<(K, V)> for OrderedMap<K, V, S>
where
    K: Eq + Hash + Clone,
    S: BuildHasher,
{
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (k, v) in iter {
            self.insert(k, v);
        }
    }
}

/// Collects into a map in insertion order.
impl<K, V, S> FromIterator<(K, V)> for OrderedMap<K, V, S>
where
    K: Eq + Hash + Clone,
    S: BuildHasher + Default,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let iter = iter.into_iter();
        let mut map = Self::with_capacity_and_hash_builder(iter.size_hint().0, S::default());
        map.extend(iter);
        map
    }
}
