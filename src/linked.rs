//! A doubly linked list that flattens all its nodes onto a Vec for storage,
//! keeping insertion order with O(1) append and O(1) removal of any node a
//! handle points at.

use std::fmt;

use crate::arena::{Arena, NodeHandle};
use crate::sequence::{Iter, Sequence};

/// A node that lives in a linked list.
struct Node<K, V> {
    /// The entry being stored. `None` marks one of the two sentinels.
    entry: Option<(K, V)>,

    /// The node previous to this one.
    prev: NodeHandle,

    /// The next node in the list.
    next: NodeHandle,
}

impl<K, V> Node<K, V> {
    fn sentinel() -> Self {
        Node {
            entry: None,
            prev: NodeHandle::NIL,
            next: NodeHandle::NIL,
        }
    }
}

/// Keeps entries in the order they were inserted.
///
/// The list is bounded by a `head` and a `tail` sentinel which live in the
/// same storage as the data nodes, so appending and unlinking never have to
/// special-case the ends of the list.
pub struct LinkedSequence<K, V> {
    /// Every node, sentinels included.
    store: Arena<Node<K, V>>,

    head: NodeHandle,
    tail: NodeHandle,

    len: usize,
}

impl<K, V> LinkedSequence<K, V> {
    /// Creates an empty list.
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Creates an empty list with room for `capacity` entries.
    pub fn with_capacity(capacity: usize) -> Self {
        let mut store = Arena::with_capacity(capacity + 2);
        let (head, tail) = Self::link_sentinels(&mut store);

        Self {
            store,
            head,
            tail,
            len: 0,
        }
    }

    /// Iterates the entries front to back.
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter::new(self)
    }

    fn link_sentinels(store: &mut Arena<Node<K, V>>) -> (NodeHandle, NodeHandle) {
        let head = store.insert(Node::sentinel());
        let tail = store.insert(Node::sentinel());
        store.get_mut(head).next = tail;
        store.get_mut(tail).prev = head;
        (head, tail)
    }

    fn data_node(&self, handle: NodeHandle) -> &(K, V) {
        match &self.store.get(handle).entry {
            Some(entry) => entry,
            None => panic!("node handle {:?} refers to a sentinel", handle),
        }
    }

    #[cfg(test)]
    fn continuity_test(&self) {
        // walk forwards and make sure it matches the number of entries
        let mut count = 0;
        let mut cursor = self.store.get(self.head).next;
        while cursor != self.tail {
            let node = self.store.get(cursor);
            assert!(node.entry.is_some());
            assert_eq!(cursor, self.store.get(node.next).prev);
            count += 1;
            assert!(count <= self.len);
            cursor = node.next;
        }
        assert_eq!(self.len, count);

        // and backwards
        count = 0;
        let mut cursor = self.store.get(self.tail).prev;
        while cursor != self.head {
            count += 1;
            assert!(count <= self.len);
            cursor = self.store.get(cursor).prev;
        }
        assert_eq!(self.len, count);

        // sentinels + data nodes account for every occupied slot
        assert_eq!(self.len + 2, self.store.len());
    }
}

impl<K, V> Default for LinkedSequence<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> Sequence<K, V> for LinkedSequence<K, V> {
    /// Pushes the entry onto the back of the list.
    fn insert(&mut self, key: K, value: V) -> NodeHandle {
        let prev = self.store.get(self.tail).prev;
        let idx = self.store.insert(Node {
            entry: Some((key, value)),
            prev,
            next: self.tail,
        });

        // link this node into the chain
        self.store.get_mut(prev).next = idx;
        self.store.get_mut(self.tail).prev = idx;
        self.len += 1;

        #[cfg(test)]
        self.continuity_test();

        idx
    }

    fn delete(&mut self, handle: NodeHandle) -> (K, V) {
        assert!(
            self.store.get(handle).entry.is_some(),
            "node handle {:?} refers to a sentinel",
            handle
        );

        // link prev to next and next to prev so node doesn't exist in the
        // chain anymore, then freelist its slot
        let node = self.store.remove(handle);
        self.store.get_mut(node.prev).next = node.next;
        self.store.get_mut(node.next).prev = node.prev;
        self.len -= 1;

        #[cfg(test)]
        self.continuity_test();

        match node.entry {
            Some(entry) => entry,
            None => unreachable!("sentinels are rejected above"),
        }
    }

    fn entry(&self, handle: NodeHandle) -> (&K, &V) {
        let (k, v) = self.data_node(handle);
        (k, v)
    }

    fn value_mut(&mut self, handle: NodeHandle) -> &mut V {
        match &mut self.store.get_mut(handle).entry {
            Some((_, v)) => v,
            None => panic!("node handle {:?} refers to a sentinel", handle),
        }
    }

    fn first(&self) -> Option<NodeHandle> {
        let first = self.store.get(self.head).next;
        if first == self.tail {
            None
        } else {
            Some(first)
        }
    }

    fn successor(&self, handle: NodeHandle) -> Option<NodeHandle> {
        let next = self.store.get(handle).next;
        if next == self.tail {
            None
        } else {
            Some(next)
        }
    }

    fn len(&self) -> usize {
        self.len
    }

    /// Clears this linked list. Does not free the underlying buffer.
    fn clear(&mut self) {
        self.store.clear();
        let (head, tail) = Self::link_sentinels(&mut self.store);
        self.head = head;
        self.tail = tail;
        self.len = 0;
    }
}

impl<K, V> fmt::Debug for LinkedSequence<K, V>
where
    K: fmt::Debug,
    V: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "double linked list:")?;
        for (k, v) in self.iter() {
            write!(f, "[Key:{:?},Value:{:?}],", k, v)?;
        }
        Ok(())
    }
}
