//! A hash map that remembers an order. Lookups go straight through a
//! [`HashMap`](std::collections::HashMap) index; iteration walks a linked
//! sequence of the entries, which is kept in one of three orders:
//!
//! - insertion order, backed by a doubly linked list ([`LinkedSequence`]);
//! - key order, backed by a skip list ([`SkipSequence`]);
//! - value order, backed by the same skip list with a value comparator.
//!
//! ```
//! use mysterious_ordered_map::OrderedMap;
//!
//! let mut map = OrderedMap::new();
//! map.insert("put", 1);
//! map.insert("things", 2);
//! map.insert("in", 3);
//! map.insert("put", 4);
//!
//! // re-inserting updates the value, not the position
//! assert_eq!(map.keys().copied().collect::<Vec<_>>(), ["put", "things", "in"]);
//! assert_eq!(map.get("put"), Some(&4));
//!
//! let mut sorted = OrderedMap::<&str, i32>::with_key_order(|a, b| a.cmp(b));
//! sorted.extend(map.iter().map(|(k, v)| (*k, *v)));
//! assert_eq!(sorted.keys().copied().collect::<Vec<_>>(), ["in", "put", "things"]);
//! ```
//!
//! The map is meant for a single owner on a single thread. Wrap it in a lock
//! if it has to be shared.
//!
//! # Feature Flags
//!
//! - `tracing` - emit `trace`-level events when the skip list changes height
//!   and when an update repositions an entry

mod arena;
mod linked;
mod map;
mod sequence;
mod skip;

pub use linked::LinkedSequence;
pub use map::{MapOptions, OrderPolicy, OrderedMap};
pub use sequence::{Iter, Keys, NodeHandle, Sequence, Values};
pub use skip::{EntryComparator, SkipOptions, SkipSequence, MAX_LEVEL};
