use std::iter::FusedIterator;

pub use crate::arena::NodeHandle;

/// Describes what an ordering backend is. Both [`LinkedSequence`] and
/// [`SkipSequence`] implement it, and [`OrderedMap`] only ever talks to its
/// backend through it.
///
/// The sequence never searches by key; keeping keys unique is the job of
/// whoever holds the handles.
///
/// [`LinkedSequence`]: crate::LinkedSequence
/// [`SkipSequence`]: crate::SkipSequence
/// [`OrderedMap`]: crate::OrderedMap
pub trait Sequence<K, V> {
    /// Links a new entry into the sequence at the position the backend's
    /// ordering dictates, returning a handle to its node.
    fn insert(&mut self, key: K, value: V) -> NodeHandle;

    /// Unlinks the node behind `handle` and hands back its entry.
    ///
    /// # Panics
    ///
    /// If `handle` wasn't issued by this sequence or its node is already gone.
    fn delete(&mut self, handle: NodeHandle) -> (K, V);

    /// The entry stored in the node behind `handle`.
    fn entry(&self, handle: NodeHandle) -> (&K, &V);

    /// A mutable reference to the value in the node behind `handle`. Changing
    /// it never moves the node.
    fn value_mut(&mut self, handle: NodeHandle) -> &mut V;

    /// The first data node, or `None` if the sequence is empty.
    fn first(&self) -> Option<NodeHandle>;

    /// The data node following `handle` in iteration order, or `None` when
    /// `handle` is the last one.
    fn successor(&self, handle: NodeHandle) -> Option<NodeHandle>;

    /// The number of entries linked into the sequence.
    fn len(&self) -> usize;

    /// Unlinks every entry. Outstanding handles become invalid.
    fn clear(&mut self);

    /// Whether the sequence holds no entries.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Forward iterator over the entries of a [`Sequence`], front to back.
pub struct Iter<'a, K: 'a, V: 'a> {
    sequence: &'a dyn Sequence<K, V>,
    cursor: Option<NodeHandle>,
    remaining: usize,
}

impl<'a, K, V> Iter<'a, K, V> {
    pub(crate) fn new(sequence: &'a dyn Sequence<K, V>) -> Self {
        Iter {
            sequence,
            cursor: sequence.first(),
            remaining: sequence.len(),
        }
    }
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        let handle = self.cursor?;
        let sequence = self.sequence;
        self.cursor = sequence.successor(handle);
        self.remaining -= 1;
        Some(sequence.entry(handle))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> ExactSizeIterator for Iter<'_, K, V> {}

impl<K, V> FusedIterator for Iter<'_, K, V> {}

impl<K, V> Clone for Iter<'_, K, V> {
    fn clone(&self) -> Self {
        Iter {
            sequence: self.sequence,
            cursor: self.cursor,
            remaining: self.remaining,
        }
    }
}

/// Keys of a sequence, in iteration order.
pub struct Keys<'a, K: 'a, V: 'a>(pub(crate) Iter<'a, K, V>);

impl<'a, K, V> Iterator for Keys<'a, K, V> {
    type Item = &'a K;

    fn next(&mut self) -> Option<Self::Item> {
        self.0.next().map(|(k, _)| k)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.0.size_hint()
    }
}

impl<K, V> ExactSizeIterator for Keys<'_, K, V> {}

impl<K, V> FusedIterator for Keys<'_, K, V> {}

/// Values of a sequence, in iteration order.
pub struct Values<'a, K: 'a, V: 'a>(pub(crate) Iter<'a, K, V>);

impl<'a, K, V> Iterator for Values<'a, K, V> {
    type Item = &'a V;

    fn next(&mut self) -> Option<Self::Item> {
        self.0.next().map(|(_, v)| v)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.0.size_hint()
    }
}

impl<K, V> ExactSizeIterator for Values<'_, K, V> {}

impl<K, V> FusedIterator for Values<'_, K, V> {}
