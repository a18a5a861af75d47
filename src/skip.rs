//! Skip list - a probabilistic ordered sequence whose order is defined by a
//! comparator over whole entries.
//!
//! ```text
//! Level 3:  HEAD ─────────────────────► 50 ──────────────────► TAIL
//!             │                          │
//! Level 2:  HEAD ────────► 20 ──────────► 50 ──────────────────► TAIL
//!             │            │              │
//! Level 1:  HEAD ──► 10 ──► 20 ──► 30 ──► 50 ──► 60 ──────────► TAIL
//! ```
//!
//! Every node carries a tower of `(prev, next)` lanes, one per level it
//! occupies, so it can be unlinked in O(1) per level straight from its handle.
//! Inserts search from the highest occupied level and cost O(log n) expected.
//!
//! The comparator sees both keys and both values. Ordering by key and ordering
//! by value are the same machinery with a different comparator plugged in.

use std::cmp::Ordering;
use std::fmt;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::arena::{Arena, NodeHandle};
use crate::sequence::{Iter, Sequence};

/// Tallest tower a node can have. The sentinels span all of them.
pub const MAX_LEVEL: usize = 32;

/// Total order over `(key, value)` entries, called as
/// `cmp(key_a, key_b, value_a, value_b)`.
pub type EntryComparator<K, V> = Box<dyn Fn(&K, &K, &V, &V) -> Ordering>;

/// Tuning knobs for a [`SkipSequence`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SkipOptions {
    /// Controls the fan-out between levels: a node climbs one more level with
    /// probability `1 / level_ratio`.
    ///
    /// - 2: standard (p=0.5), ~2 links per node average
    /// - 4: Redis-style (p=0.25), ~1.33 links per node average
    ///
    /// Values below 2 are rounded up to 2.
    pub level_ratio: u32,

    /// Seed for level selection. `None` seeds from OS entropy; a fixed seed
    /// makes tower heights reproducible.
    pub seed: Option<u64>,
}

impl Default for SkipOptions {
    fn default() -> Self {
        SkipOptions {
            level_ratio: 4,
            seed: None,
        }
    }
}

#[derive(Copy, Clone)]
struct Lane {
    prev: NodeHandle,
    next: NodeHandle,
}

/// A node in the skip list. `lanes[i]` links it into level i.
struct Node<K, V> {
    /// `None` marks one of the two sentinels.
    entry: Option<(K, V)>,
    lanes: Vec<Lane>,
}

/// A sequence kept in comparator order.
///
/// Entries that compare equal stay in the order they arrived in.
pub struct SkipSequence<K, V> {
    store: Arena<Node<K, V>>,

    head: NodeHandle,
    tail: NodeHandle,

    cmp: EntryComparator<K, V>,

    /// Random number generator for level assignment.
    rng: SmallRng,
    level_ratio: u32,

    /// Number of occupied levels; the height of the tallest live node.
    level: usize,

    len: usize,
}

impl<K, V> SkipSequence<K, V> {
    /// Creates an empty skip list ordered by `cmp`, with default options.
    pub fn new<F>(cmp: F) -> Self
    where
        F: Fn(&K, &K, &V, &V) -> Ordering + 'static,
    {
        Self::with_capacity_and_options(0, Box::new(cmp), SkipOptions::default())
    }

    /// Creates an empty skip list ordered by `cmp`.
    pub fn with_options<F>(cmp: F, options: SkipOptions) -> Self
    where
        F: Fn(&K, &K, &V, &V) -> Ordering + 'static,
    {
        Self::with_capacity_and_options(0, Box::new(cmp), options)
    }

    /// Creates an empty skip list ordered by `cmp`, with room for `capacity`
    /// entries.
    pub fn with_capacity_and_options(
        capacity: usize,
        cmp: EntryComparator<K, V>,
        options: SkipOptions,
    ) -> Self {
        let rng = match options.seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => SmallRng::from_entropy(),
        };

        let mut store = Arena::with_capacity(capacity + 2);
        let (head, tail) = Self::link_sentinels(&mut store);

        Self {
            store,
            head,
            tail,
            cmp,
            rng,
            level_ratio: options.level_ratio.max(2),
            level: 0,
            len: 0,
        }
    }

    /// Iterates the entries in comparator order.
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter::new(self)
    }

    /// The number of occupied levels, which is the height of the tallest live
    /// node (0 when empty).
    pub fn level(&self) -> usize {
        self.level
    }

    fn link_sentinels(store: &mut Arena<Node<K, V>>) -> (NodeHandle, NodeHandle) {
        let unlinked = Lane {
            prev: NodeHandle::NIL,
            next: NodeHandle::NIL,
        };
        let head = store.insert(Node {
            entry: None,
            lanes: vec![unlinked; MAX_LEVEL],
        });
        let tail = store.insert(Node {
            entry: None,
            lanes: vec![unlinked; MAX_LEVEL],
        });

        for lane in store.get_mut(head).lanes.iter_mut() {
            lane.next = tail;
        }
        for lane in store.get_mut(tail).lanes.iter_mut() {
            lane.prev = head;
        }

        (head, tail)
    }

    /// Geometric level in `1..=MAX_LEVEL`, favouring short towers.
    fn random_level(&mut self) -> usize {
        let mut level = 1;
        while level < MAX_LEVEL && self.rng.gen_ratio(1, self.level_ratio) {
            level += 1;
        }
        level
    }

    fn data_node(&self, handle: NodeHandle) -> &(K, V) {
        match &self.store.get(handle).entry {
            Some(entry) => entry,
            None => panic!("node handle {:?} refers to a sentinel", handle),
        }
    }

    /// Whether the walk should step past `node` when placing `(key, value)`.
    /// Steps past equal entries too, so ties keep arrival order.
    fn walks_past(&self, node: NodeHandle, key: &K, value: &V) -> bool {
        let (k, v) = self.data_node(node);
        (self.cmp)(k, key, v, value) != Ordering::Greater
    }

    #[cfg(test)]
    fn height(&self, handle: NodeHandle) -> usize {
        self.store.get(handle).lanes.len()
    }

    /// Checks that every level is a properly linked, ordered subset of the
    /// level below it and that the tracked level matches the tallest tower.
    #[cfg(test)]
    fn tower_test(&self) {
        use std::collections::HashSet;

        let mut live = HashSet::new();
        let mut tallest = 0;
        let mut cursor = self.store.get(self.head).lanes[0].next;
        while cursor != self.tail {
            let node = self.store.get(cursor);
            assert!(node.entry.is_some());
            assert!(!node.lanes.is_empty() && node.lanes.len() <= MAX_LEVEL);
            tallest = tallest.max(node.lanes.len());
            assert!(live.insert(cursor));
            assert!(live.len() <= self.len);
            cursor = node.lanes[0].next;
        }
        assert_eq!(self.len, live.len());
        assert_eq!(self.len + 2, self.store.len());
        assert_eq!(self.level, tallest);

        for i in 0..MAX_LEVEL {
            let expected = live.iter().filter(|h| self.height(**h) > i).count();
            let mut count = 0;
            let mut prev = self.head;
            let mut cursor = self.store.get(self.head).lanes[i].next;
            while cursor != self.tail {
                assert!(live.contains(&cursor));
                assert!(self.height(cursor) > i);
                assert_eq!(prev, self.store.get(cursor).lanes[i].prev);
                if prev != self.head {
                    let (pk, pv) = self.data_node(prev);
                    let (ck, cv) = self.data_node(cursor);
                    assert_ne!(Ordering::Greater, (self.cmp)(pk, ck, pv, cv));
                }
                count += 1;
                prev = cursor;
                cursor = self.store.get(cursor).lanes[i].next;
            }
            assert_eq!(prev, self.store.get(self.tail).lanes[i].prev);
            assert_eq!(expected, count);
            if i >= self.level {
                assert_eq!(0, count);
            }
        }
    }
}

impl<K, V> Sequence<K, V> for SkipSequence<K, V> {
    fn insert(&mut self, key: K, value: V) -> NodeHandle {
        // levels at or above self.level are empty, so head is already the
        // right predecessor there
        let mut update = [self.head; MAX_LEVEL];
        let mut cursor = self.head;
        for i in (0..self.level).rev() {
            loop {
                let next = self.store.get(cursor).lanes[i].next;
                if next == self.tail || !self.walks_past(next, &key, &value) {
                    break;
                }
                cursor = next;
            }
            update[i] = cursor;
        }

        let level = self.random_level();
        let lanes: Vec<Lane> = (0..level)
            .map(|i| Lane {
                prev: update[i],
                next: self.store.get(update[i]).lanes[i].next,
            })
            .collect();

        let idx = self.store.insert(Node {
            entry: Some((key, value)),
            lanes: lanes.clone(),
        });

        for (i, lane) in lanes.iter().enumerate() {
            self.store.get_mut(lane.prev).lanes[i].next = idx;
            self.store.get_mut(lane.next).lanes[i].prev = idx;
        }

        if level > self.level {
            #[cfg(feature = "tracing")]
            tracing::trace!(from = self.level, to = level, "skip list raised its level");
            self.level = level;
        }
        self.len += 1;

        #[cfg(test)]
        self.tower_test();

        idx
    }

    fn delete(&mut self, handle: NodeHandle) -> (K, V) {
        assert!(
            self.store.get(handle).entry.is_some(),
            "node handle {:?} refers to a sentinel",
            handle
        );

        // the slot is freelisted here, so a retained handle can't read
        // through to stale links afterwards
        let node = self.store.remove(handle);
        for (i, lane) in node.lanes.iter().enumerate() {
            self.store.get_mut(lane.prev).lanes[i].next = lane.next;
            self.store.get_mut(lane.next).lanes[i].prev = lane.prev;
        }

        while self.level > 0 && self.store.get(self.head).lanes[self.level - 1].next == self.tail {
            self.level -= 1;
            #[cfg(feature = "tracing")]
            tracing::trace!(to = self.level, "skip list lowered its level");
        }
        self.len -= 1;

        #[cfg(test)]
        self.tower_test();

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
        self.successor(self.head)
    }

    fn successor(&self, handle: NodeHandle) -> Option<NodeHandle> {
        let next = self.store.get(handle).lanes[0].next;
        if next == self.tail {
            None
        } else {
            Some(next)
        }
    }

    fn len(&self) -> usize {
        self.len
    }

    fn clear(&mut self) {
        self.store.clear();
        let (head, tail) = Self::link_sentinels(&mut self.store);
        self.head = head;
        self.tail = tail;
        self.level = 0;
        self.len = 0;
    }
}

/// Renders every occupied level, top down. Meant for eyeballing, the format
/// isn't stable.
impl<K, V> fmt::Debug for SkipSequence<K, V>
where
    K: fmt::Debug,
    V: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "skip list:{}", self.level)?;
        for i in (0..self.level).rev() {
            write!(f, "\n[level:{}]=>", i + 1)?;
            let mut cursor = self.store.get(self.head).lanes[i].next;
            while cursor != self.tail {
                let (k, v) = self.data_node(cursor);
                write!(f, "[Key:{:?},Value:{:?}],", k, v)?;
                cursor = self.store.get(cursor).lanes[i].next;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use rand::rngs::SmallRng;
    use rand::{Rng, SeedableRng};

    use super::{SkipOptions, SkipSequence, MAX_LEVEL};
    use crate::arena::NodeHandle;
    use crate::sequence::Sequence;

    const INSERT_KEYS: [u64; 11] = [9, 2, 6, 8, 599, 4, 9, 10, 5, 8, 100];
    const DELETE_KEYS: [u64; 5] = [5, 8, 9, 7, 999];

    fn seeded(seed: u64) -> SkipOptions {
        SkipOptions {
            seed: Some(seed),
            ..SkipOptions::default()
        }
    }

    fn by_key_then_value() -> SkipSequence<u64, usize> {
        SkipSequence::with_options(
            |k1: &u64, k2: &u64, v1: &usize, v2: &usize| k1.cmp(k2).then(v1.cmp(v2)),
            seeded(12345),
        )
    }

    fn keys<V>(list: &SkipSequence<u64, V>) -> Vec<u64> {
        list.iter().map(|(k, _)| *k).collect()
    }

    #[test]
    fn test_new_is_empty() {
        let list = by_key_then_value();
        assert!(list.is_empty());
        assert_eq!(0, list.level());
        assert_eq!(None, list.first());
        assert_eq!(0, list.iter().count());
    }

    #[test]
    fn test_insert_then_delete() {
        let mut list = by_key_then_value();
        let mut handles: HashMap<u64, NodeHandle> = HashMap::new();
        for (i, k) in INSERT_KEYS.iter().enumerate() {
            // later duplicates overwrite the handle, leaving the older node
            // linked; the sequence itself never dedupes
            handles.insert(*k, list.insert(*k, i));
        }
        assert_eq!(
            vec![2, 4, 5, 6, 8, 8, 9, 9, 10, 100, 599],
            keys(&list)
        );

        for k in DELETE_KEYS.iter() {
            if let Some(handle) = handles.remove(k) {
                list.delete(handle);
            }
        }
        assert_eq!(vec![2, 4, 6, 8, 9, 10, 100, 599], keys(&list));
        // the surviving duplicates are the first arrivals
        let survivors: Vec<_> = list
            .iter()
            .filter(|(k, _)| **k == 8 || **k == 9)
            .map(|(k, v)| (*k, *v))
            .collect();
        assert_eq!(vec![(8, 3), (9, 0)], survivors);
    }

    #[test]
    fn test_ties_keep_arrival_order() {
        let mut list: SkipSequence<u64, u32> = SkipSequence::with_options(
            |_: &u64, _: &u64, v1: &u32, v2: &u32| v1.cmp(v2),
            seeded(7),
        );
        for (k, v) in [(1, 5), (2, 3), (3, 5), (4, 1), (5, 3), (6, 5)].iter() {
            list.insert(*k, *v);
        }

        assert_eq!(vec![4, 2, 5, 1, 3, 6], keys(&list));
    }

    #[test]
    fn test_delete_by_handle() {
        let mut list = by_key_then_value();
        let a = list.insert(10, 0);
        let b = list.insert(20, 0);
        let c = list.insert(30, 0);

        assert_eq!((20, 0), list.delete(b));
        assert_eq!(vec![10, 30], keys(&list));
        assert_eq!((10, 0), list.delete(a));
        assert_eq!((30, 0), list.delete(c));
        assert!(list.is_empty());
        assert_eq!(0, list.level());
    }

    #[test]
    fn test_value_mut_does_not_move() {
        let mut list = by_key_then_value();
        list.insert(1, 1);
        let b = list.insert(2, 2);
        list.insert(3, 3);

        *list.value_mut(b) = 100;
        assert_eq!((&2, &100), list.entry(b));
        assert_eq!(vec![1, 2, 3], keys(&list));
    }

    /// Random inserts and deletes; tower_test runs after every mutation and
    /// checks level subsets, link symmetry, order and the tracked level.
    #[test]
    fn test_random_churn_keeps_towers_intact() {
        for ratio in [2u32, 4, 16].iter() {
            let mut list: SkipSequence<u64, usize> = SkipSequence::with_options(
                |k1: &u64, k2: &u64, _: &usize, _: &usize| k1.cmp(k2),
                SkipOptions {
                    level_ratio: *ratio,
                    seed: Some(99),
                },
            );
            let mut rng = SmallRng::seed_from_u64(42);
            let mut live: Vec<(u64, NodeHandle)> = Vec::new();

            for i in 0..600 {
                if live.is_empty() || rng.gen_ratio(3, 5) {
                    let k = rng.gen_range(0..200);
                    live.push((k, list.insert(k, i)));
                } else {
                    let at = rng.gen_range(0..live.len());
                    let (k, handle) = live.swap_remove(at);
                    assert_eq!(k, list.delete(handle).0);
                }
            }

            let mut expected: Vec<u64> = live.iter().map(|(k, _)| *k).collect();
            expected.sort();
            assert_eq!(expected, keys(&list));

            for (_, handle) in live.drain(..) {
                list.delete(handle);
            }
            assert!(list.is_empty());
            assert_eq!(0, list.level());
        }
    }

    #[test]
    fn test_random_level_is_bounded() {
        let mut list = by_key_then_value();
        // the most aggressive fan-out climbs as often as it can
        list.level_ratio = 2;
        let mut seen_tall = false;
        for _ in 0..10_000 {
            let level = list.random_level();
            assert!(level >= 1 && level <= MAX_LEVEL);
            seen_tall |= level > 1;
        }
        assert!(seen_tall);
    }

    #[test]
    fn test_level_ratio_is_normalized() {
        let list: SkipSequence<u64, usize> = SkipSequence::with_options(
            |k1: &u64, k2: &u64, _: &usize, _: &usize| k1.cmp(k2),
            SkipOptions {
                level_ratio: 0,
                seed: Some(1),
            },
        );
        assert_eq!(2, list.level_ratio);
    }

    #[test]
    fn test_same_seed_same_towers() {
        let mut a = by_key_then_value();
        let mut b = by_key_then_value();
        for k in 0..64u64 {
            let ha = a.insert(k, 0);
            let hb = b.insert(k, 0);
            assert_eq!(a.height(ha), b.height(hb));
        }
        assert_eq!(a.level(), b.level());
    }

    #[test]
    fn test_clear() {
        let mut list = by_key_then_value();
        for k in 0..32u64 {
            list.insert(k, 0);
        }
        list.clear();
        assert!(list.is_empty());
        assert_eq!(0, list.level());

        list.insert(5, 5);
        assert_eq!(vec![5], keys(&list));
    }

    #[test]
    #[should_panic(expected = "vacant slot")]
    fn test_double_delete_panics() {
        let mut list = by_key_then_value();
        let a = list.insert(1, 1);
        list.insert(2, 2);
        list.delete(a);
        list.delete(a);
    }

    #[test]
    fn test_debug_rendering() {
        let mut list = by_key_then_value();
        list.insert(2, 20);
        list.insert(1, 10);

        let rendered = format!("{:?}", list);
        assert!(rendered.starts_with(&format!("skip list:{}", list.level())));
        assert!(rendered.ends_with("[level:1]=>[Key:1,Value:10],[Key:2,Value:20],"));
    }
}
