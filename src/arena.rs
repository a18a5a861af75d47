//! Slot storage for sequence nodes. Nodes live in a single contiguous Vec and
//! are addressed by their position in it, with a freelist of vacated slots to
//! reuse on the next insert.
//!
//! Every handle carries the id of the arena that issued it and the generation
//! of the slot at the time, so a handle that outlives its node (or wandered in
//! from another sequence) is caught instead of quietly rewiring someone else's
//! links.

use std::sync::atomic::{AtomicU32, Ordering};

/// Arena ids start at 1; 0 is reserved for [`NodeHandle::NIL`].
static NEXT_OWNER: AtomicU32 = AtomicU32::new(1);

fn next_owner() -> u32 {
    NEXT_OWNER.fetch_add(1, Ordering::Relaxed)
}

/// Opaque reference to a node living in a sequence.
///
/// Handles are only ever produced by a sequence's `insert` and are only
/// meaningful to that same sequence. Passing a handle to a different sequence,
/// or reusing one after its node was deleted, panics.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct NodeHandle {
    owner: u32,
    generation: u32,
    index: usize,
}

impl NodeHandle {
    /// Placeholder link for a node which isn't wired up yet.
    pub(crate) const NIL: NodeHandle = NodeHandle {
        owner: 0,
        generation: 0,
        index: usize::MAX,
    };
}

struct Slot<T> {
    generation: u32,
    node: Option<T>,
}

/// Storage vec plus freelist. There's no compaction; cleared slots get
/// overwritten on a later insert.
pub(crate) struct Arena<T> {
    owner: u32,

    /// The slots, occupied or not.
    store: Vec<Slot<T>>,

    /// Slots which aren't in use anymore. These will be reused.
    free: Vec<usize>,
}

impl<T> Arena<T> {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            owner: next_owner(),
            store: Vec::with_capacity(capacity),
            free: Vec::new(),
        }
    }

    /// The number of occupied slots.
    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.store.len() - self.free.len()
    }

    /// Puts `node` into the first available slot and returns its handle.
    pub(crate) fn insert(&mut self, node: T) -> NodeHandle {
        // use the first available location in the storage vec, or push onto
        // the end of it.
        if let Some(index) = self.free.pop() {
            let slot = &mut self.store[index];
            slot.generation = slot.generation.wrapping_add(1);
            slot.node = Some(node);

            return NodeHandle {
                owner: self.owner,
                generation: slot.generation,
                index,
            };
        }

        let index = self.store.len();
        self.store.push(Slot {
            generation: 0,
            node: Some(node),
        });

        NodeHandle {
            owner: self.owner,
            generation: 0,
            index,
        }
    }

    /// Takes the node out of its slot and freelists the slot.
    pub(crate) fn remove(&mut self, handle: NodeHandle) -> T {
        let index = self.validate(handle);
        let node = match self.store[index].node.take() {
            Some(node) => node,
            None => panic!("node handle {:?} refers to a vacant slot", handle),
        };
        self.free.push(index);
        node
    }

    pub(crate) fn get(&self, handle: NodeHandle) -> &T {
        let index = self.validate(handle);
        match &self.store[index].node {
            Some(node) => node,
            None => panic!("node handle {:?} refers to a vacant slot", handle),
        }
    }

    pub(crate) fn get_mut(&mut self, handle: NodeHandle) -> &mut T {
        let index = self.validate(handle);
        match &mut self.store[index].node {
            Some(node) => node,
            None => panic!("node handle {:?} refers to a vacant slot", handle),
        }
    }

    /// Drops every node and rotates the arena id, so that handles issued
    /// before the clear are rejected rather than matched against new nodes.
    /// Does not free the underlying buffer.
    pub(crate) fn clear(&mut self) {
        self.store.clear();
        self.free.clear();
        self.owner = next_owner();
    }

    fn validate(&self, handle: NodeHandle) -> usize {
        assert_eq!(
            self.owner, handle.owner,
            "node handle {:?} was not issued by this sequence",
            handle
        );
        match self.store.get(handle.index) {
            Some(slot) if slot.generation == handle.generation => handle.index,
            _ => panic!("node handle {:?} is stale", handle),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Arena;

    #[test]
    fn test_slot_reuse() {
        let mut arena: Arena<u64> = Arena::with_capacity(4);

        let a = arena.insert(1);
        let b = arena.insert(2);
        assert_eq!(2, arena.len());

        assert_eq!(1, arena.remove(a));
        assert_eq!(1, arena.len());

        // the freed slot is handed out again, under a fresh generation
        let c = arena.insert(3);
        assert_eq!(2, arena.len());
        assert_eq!(2, arena.store.len());
        assert_ne!(a, c);

        assert_eq!(&2, arena.get(b));
        *arena.get_mut(c) += 10;
        assert_eq!(&13, arena.get(c));
    }

    #[test]
    #[should_panic(expected = "stale")]
    fn test_stale_handle_panics() {
        let mut arena: Arena<u64> = Arena::with_capacity(4);
        let a = arena.insert(1);
        arena.remove(a);
        arena.insert(2);
        arena.get(a);
    }

    #[test]
    #[should_panic(expected = "not issued by this sequence")]
    fn test_foreign_handle_panics() {
        let mut first: Arena<u64> = Arena::with_capacity(4);
        let second: Arena<u64> = Arena::with_capacity(4);
        let a = first.insert(1);
        second.get(a);
    }

    #[test]
    #[should_panic(expected = "not issued by this sequence")]
    fn test_clear_invalidates_handles() {
        let mut arena: Arena<u64> = Arena::with_capacity(4);
        let a = arena.insert(1);
        arena.clear();
        arena.insert(1);
        arena.get(a);
    }
}
