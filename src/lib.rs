//! range-hashmap: a single-threaded hash map resolving collisions through
//! double hashing, with each bucket owning a contiguous range of one shared,
//! insertion-ordered entry list.
//!
//! Internal Design:
//!
//! Summary
//! - Goal: bound every lookup to at most two bucket probes by construction,
//!   while keeping all entries in one ordered store so traversal and
//!   range-splice operations stay O(1) per link.
//! - Layers:
//!   - EntryList<K, V>: the entry store, an arena-indexed doubly linked
//!     list over `slotmap`. Owns every (key, value) node together with the
//!     key's precomputed hash; hands out stable generational positions.
//!   - RangeHashMap<K, V, S>: the bucket directory of `capacity` descriptors,
//!     each idle or holding a (start, end) span into the entry list plus an
//!     occupancy counter. Implements candidate selection, insert, find,
//!     erase, growth, and keyed access on top of the store.
//!
//! Candidate selection
//! - A key's primary bucket is `hash(key) % capacity`; its secondary bucket
//!   re-hashes the primary hash's numeric output through the same
//!   `BuildHasher`. These are the only two buckets ever consulted for the
//!   key, so chain length is capped by the occupancy of two spans rather
//!   than by unbounded chaining.
//! - New entries go to the less loaded candidate (tie to the primary),
//!   keeping both spans from growing unboundedly.
//!
//! Growth
//! - The directory starts at 16 buckets and doubles whenever an insert
//!   would leave more entries than half the buckets. Growth re-homes every
//!   entry in store order through the normal placement path using cached
//!   hashes; nodes are relinked in place, never moved, so positions survive
//!   growth and `K: Hash` is never invoked after insertion.
//!
//! Constraints
//! - Single-threaded: no internal synchronization; concurrent mutation is
//!   out of scope.
//! - Entries are allocated once; every operation rewrites links and span
//!   marks only. A `Position` stays valid until its entry is erased or the
//!   map is cleared, and a stale position can never alias a later entry
//!   (generational slot keys).
//! - First-write-wins: inserting a present key is a documented no-op, not
//!   an overwrite. The only user-facing failure is `KeyNotFound` from `at`;
//!   everything else reports through `Option` sentinels.
//!
//! Why this split?
//! - The store knows nothing about hashing and the directory owns no
//!   entries, so each side has a small contract: the store guarantees link
//!   integrity, the directory guarantees span contiguity and candidate
//!   residency. The property tests audit both after every operation.
//! - Unsafe is confined to one lifetime extension inside the store's
//!   mutable iterator.

mod entry_list;
mod range_hash_map;
#[cfg(test)]
mod range_hash_map_proptest;

// Public surface
pub use entry_list::{Iter, IterMut, Position};
pub use range_hash_map::{KeyNotFound, RangeHashMap};
