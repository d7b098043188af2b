//! RangeHashMap: the bucket directory and public map API.
//!
//! Each of the `capacity` buckets is either idle or holds a span: the start
//! and end positions of a contiguous run of entries in the shared
//! [`EntryList`] that currently belong to it. A key is only ever stored in
//! one of the two buckets produced by double hashing, so every lookup and
//! erase inspects at most two spans.

use crate::entry_list::{EntryList, Iter, IterMut, Position};
use core::borrow::Borrow;
use core::fmt;
use core::hash::{BuildHasher, Hash};
use slotmap::DefaultKey;
use std::collections::hash_map::RandomState;

/// Buckets in a fresh map. The directory only ever doubles from here.
const INITIAL_BUCKETS: usize = 16;

/// Start and end positions of one bucket's contiguous run of entries.
/// Both ends are inclusive; a one-entry run has `start == end`.
#[derive(Copy, Clone)]
struct Span {
    start: DefaultKey,
    end: DefaultKey,
}

#[derive(Copy, Clone, Default)]
struct Bucket {
    /// `None` means idle. An active span always covers at least one entry.
    span: Option<Span>,
    /// Occupancy counter driving the less-loaded placement choice. Equals
    /// the number of entries in `span`; updated on every placement and
    /// every erase.
    len: usize,
}

/// Error returned by [`RangeHashMap::at`] when the key is absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyNotFound;

impl fmt::Display for KeyNotFound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("key not found")
    }
}

impl std::error::Error for KeyNotFound {}

/// Hash map resolving collisions through two candidate buckets per key,
/// each holding a contiguous range of one shared, insertion-ordered entry
/// list.
///
/// Single-threaded by design; all entry storage is owned by the map and
/// bucket spans are purely structural views into it. Entries are allocated
/// once and never move, so a [`Position`] stays valid until its entry is
/// erased or the map is cleared; growth relinks entries without moving
/// them.
pub struct RangeHashMap<K, V, S = RandomState> {
    hasher: S,
    entries: EntryList<K, V>,
    buckets: Vec<Bucket>,
}

impl<K, V> RangeHashMap<K, V>
where
    K: Eq + Hash,
{
    pub fn new() -> Self {
        Self::with_hasher(Default::default())
    }
}

impl<K, V> Default for RangeHashMap<K, V>
where
    K: Eq + Hash,
{
    fn default() -> Self {
        Self::new()
    }
}

impl Position {
    pub fn key<'a, K, V, S>(&self, map: &'a RangeHashMap<K, V, S>) -> Option<&'a K> {
        map.entries.key_of(self.raw())
    }

    pub fn value<'a, K, V, S>(&self, map: &'a RangeHashMap<K, V, S>) -> Option<&'a V> {
        map.entries.value_of(self.raw())
    }

    pub fn value_mut<'a, K, V, S>(&self, map: &'a mut RangeHashMap<K, V, S>) -> Option<&'a mut V> {
        map.entries.value_of_mut(self.raw())
    }
}

impl<K, V, S> RangeHashMap<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    pub fn with_hasher(hasher: S) -> Self {
        Self {
            hasher,
            entries: EntryList::new(),
            buckets: vec![Bucket::default(); INITIAL_BUCKETS],
        }
    }

    /// Build a map from a pair sequence under a custom hasher. Duplicate
    /// keys in the input follow first-write-wins, as with [`insert`].
    ///
    /// [`insert`]: RangeHashMap::insert
    pub fn from_iter_with_hasher<I>(iter: I, hasher: S) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
    {
        let mut map = Self::with_hasher(hasher);
        map.extend(iter);
        map
    }

    fn make_hash<Q>(&self, q: &Q) -> u64
    where
        Q: ?Sized + Hash,
    {
        self.hasher.hash_one(q)
    }

    /// The two bucket indices a hash may land in. The secondary hash
    /// re-hashes the primary hash's numeric output through the same
    /// `BuildHasher`; no other bucket is ever consulted for this hash.
    fn candidates(&self, hash: u64) -> (usize, usize) {
        let cap = self.buckets.len() as u64;
        let h1 = (hash % cap) as usize;
        let h2 = (self.hasher.hash_one(hash) % cap) as usize;
        (h1, h2)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Current number of buckets. Starts at 16 and only ever doubles.
    pub fn capacity(&self) -> usize {
        self.buckets.len()
    }

    pub fn hasher(&self) -> &S {
        &self.hasher
    }

    /// Number of entries currently assigned to bucket `bucket`; zero for
    /// idle or out-of-range indices.
    pub fn bucket_len(&self, bucket: usize) -> usize {
        self.buckets.get(bucket).map(|b| b.len).unwrap_or(0)
    }

    /// The two buckets `q` may reside in under the current capacity.
    pub fn candidate_buckets<Q>(&self, q: &Q) -> (usize, usize)
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash,
    {
        self.candidates(self.make_hash(q))
    }

    /// Linear scan of one bucket's span for `q`.
    fn scan_bucket<Q>(&self, bucket: usize, q: &Q) -> Option<DefaultKey>
    where
        K: Borrow<Q>,
        Q: ?Sized + Eq,
    {
        let span = self.buckets[bucket].span?;
        let mut cur = span.start;
        loop {
            if self
                .entries
                .key_of(cur)
                .map(|k| k.borrow() == q)
                .unwrap_or(false)
            {
                return Some(cur);
            }
            if cur == span.end {
                return None;
            }
            cur = self.entries.next_of(cur)?;
        }
    }

    fn lookup<Q>(&self, hash: u64, q: &Q) -> Option<DefaultKey>
    where
        K: Borrow<Q>,
        Q: ?Sized + Eq,
    {
        let (h1, h2) = self.candidates(hash);
        if let Some(k) = self.scan_bucket(h1, q) {
            return Some(k);
        }
        if h2 != h1 {
            return self.scan_bucket(h2, q);
        }
        None
    }

    /// Locate `q`, inspecting only its two candidate buckets' spans.
    pub fn find<Q>(&self, q: &Q) -> Option<Position>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.lookup(self.make_hash(q), q).map(Position::new)
    }

    pub fn contains_key<Q>(&self, q: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.find(q).is_some()
    }

    /// Read-only keyed access; the one fallible accessor.
    pub fn at<Q>(&self, q: &Q) -> Result<&V, KeyNotFound>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let k = self.lookup(self.make_hash(q), q).ok_or(KeyNotFound)?;
        self.entries.value_of(k).ok_or(KeyNotFound)
    }

    /// Insert `key` with `value` if absent; return the entry's position
    /// either way.
    ///
    /// First-write-wins: an already present key keeps its stored value and
    /// `value` is dropped. The growth check runs before duplicate detection,
    /// so inserting a present key at the growth threshold may still double
    /// the bucket directory once.
    pub fn insert(&mut self, key: K, value: V) -> Position {
        Position::new(self.insert_inner(key, move || value))
    }

    /// Mutable access to `key`'s value, inserting `default()` first when the
    /// key is absent. `default` runs only on actual insertion.
    pub fn get_or_insert_with<F>(&mut self, key: K, default: F) -> &mut V
    where
        F: FnOnce() -> V,
    {
        let k = self.insert_inner(key, default);
        self.entries
            .value_of_mut(k)
            .expect("position returned by insert_inner is live")
    }

    /// Upsert access: like indexing, but with the insertion side effect made
    /// explicit. Absent keys are inserted with `V::default()`.
    pub fn get_or_insert_default(&mut self, key: K) -> &mut V
    where
        V: Default,
    {
        self.get_or_insert_with(key, V::default)
    }

    fn insert_inner<F>(&mut self, key: K, make: F) -> DefaultKey
    where
        F: FnOnce() -> V,
    {
        // Grow first so the post-insert state keeps 2 * len <= capacity.
        // One doubling always suffices; the re-placement loop below runs
        // inserts on a directory that already satisfies the rule.
        if 2 * (self.entries.len() + 1) > self.buckets.len() {
            self.rebuild();
        }
        let hash = self.make_hash(&key);
        // Presence must be confirmed against both candidate spans before
        // placement; the chosen bucket being idle says nothing about the
        // other candidate.
        if let Some(existing) = self.lookup(hash, &key) {
            return existing;
        }
        let k = self.entries.alloc(key, make(), hash);
        self.place(k);
        k
    }

    /// Assign an allocated, unlinked entry to the less loaded of its two
    /// candidate buckets (tie goes to the primary) and splice it into that
    /// bucket's span.
    fn place(&mut self, k: DefaultKey) {
        let hash = self.entries.hash_of(k).unwrap_or(0);
        let (h1, h2) = self.candidates(hash);
        let target = if self.buckets[h1].len <= self.buckets[h2].len {
            h1
        } else {
            h2
        };
        match self.buckets[target].span {
            None => {
                self.entries.link_back(k);
                self.buckets[target].span = Some(Span { start: k, end: k });
            }
            Some(span) => {
                // Splicing right after the span's end cannot disturb any
                // other bucket's span: neighbors' start/end marks are nodes,
                // not offsets, and stay where they are.
                self.entries.link_after(span.end, k);
                self.buckets[target].span = Some(Span {
                    start: span.start,
                    end: k,
                });
            }
        }
        self.buckets[target].len += 1;
    }

    /// Double the bucket directory and re-home every entry, in store order,
    /// through the normal placement path. Entries are relinked in place
    /// (nothing is copied or reallocated) using each entry's cached hash, so
    /// `K: Hash` is not invoked here.
    fn rebuild(&mut self) {
        self.buckets = vec![Bucket::default(); self.buckets.len() * 2];
        let order = self.entries.keys_in_order();
        self.entries.reset_links();
        for k in order {
            self.place(k);
        }
    }

    /// Remove `q`'s entry if present, returning the owned pair. Absent keys
    /// are a no-op. Only the owning bucket's span is adjusted: removing a
    /// span endpoint shifts that endpoint inward (collapsing a one-entry
    /// span to idle); removing an interior entry just unlinks it.
    pub fn erase<Q>(&mut self, q: &Q) -> Option<(K, V)>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let hash = self.make_hash(q);
        let (h1, h2) = self.candidates(hash);
        let (bucket, k) = match self.scan_bucket(h1, q) {
            Some(k) => (h1, k),
            None if h2 != h1 => (h2, self.scan_bucket(h2, q)?),
            None => return None,
        };
        let span = self.buckets[bucket].span?;
        self.buckets[bucket].span = match (span.start == k, span.end == k) {
            (true, true) => None,
            (true, false) => self.entries.next_of(k).map(|start| Span {
                start,
                end: span.end,
            }),
            (false, true) => self.entries.prev_of(k).map(|end| Span {
                start: span.start,
                end,
            }),
            (false, false) => Some(span),
        };
        self.buckets[bucket].len -= 1;
        self.entries.remove(k)
    }

    /// Drop every entry and mark every bucket idle; capacity is kept.
    pub fn clear(&mut self) {
        self.entries.clear();
        for b in &mut self.buckets {
            *b = Bucket::default();
        }
    }

    /// Entries in current store order.
    pub fn iter(&self) -> Iter<'_, K, V> {
        self.entries.iter()
    }

    /// Entries in current store order with mutable value access.
    pub fn iter_mut(&mut self) -> IterMut<'_, K, V> {
        self.entries.iter_mut()
    }
}

impl<K, V, S> Extend<(K, V)> for RangeHashMap<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (k, v) in iter {
            self.insert(k, v);
        }
    }
}

impl<K, V, S> FromIterator<(K, V)> for RangeHashMap<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher + Default,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self::from_iter_with_hasher(iter, S::default())
    }
}

impl<K, V, S, const N: usize> From<[(K, V); N]> for RangeHashMap<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher + Default,
{
    fn from(pairs: [(K, V); N]) -> Self {
        Self::from_iter(pairs)
    }
}

impl<K, V, S> Clone for RangeHashMap<K, V, S>
where
    K: Eq + Hash + Clone,
    V: Clone,
    S: BuildHasher + Clone,
{
    fn clone(&self) -> Self {
        let mut map = Self::with_hasher(self.hasher.clone());
        for (_, k, v) in self.iter() {
            map.insert(k.clone(), v.clone());
        }
        map
    }

    /// Rebuilds `self` from empty by re-inserting every entry of `source`
    /// in store order; the two maps share nothing afterward.
    fn clone_from(&mut self, source: &Self) {
        self.clear();
        self.hasher = source.hasher.clone();
        for (_, k, v) in source.iter() {
            self.insert(k.clone(), v.clone());
        }
    }
}

impl<K, V, S> fmt::Debug for RangeHashMap<K, V, S>
where
    K: fmt::Debug,
    V: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.entries.iter().map(|(_, k, v)| (k, v)))
            .finish()
    }
}

#[cfg(test)]
impl<K, V, S> RangeHashMap<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    /// Full structural audit, used by the property tests after every
    /// operation.
    pub(crate) fn check_invariants(&self) {
        let mut covered = 0usize;
        for (i, b) in self.buckets.iter().enumerate() {
            match b.span {
                None => assert_eq!(b.len, 0, "idle bucket {i} has nonzero occupancy"),
                Some(span) => {
                    assert!(b.len > 0, "active bucket {i} has zero occupancy");
                    let mut cur = span.start;
                    let mut n = 0usize;
                    loop {
                        n += 1;
                        let hash = self.entries.hash_of(cur).expect("span member is allocated");
                        let (h1, h2) = self.candidates(hash);
                        assert!(
                            i == h1 || i == h2,
                            "bucket {i} holds an entry whose candidates are {h1}/{h2}"
                        );
                        if cur == span.end {
                            break;
                        }
                        cur = self
                            .entries
                            .next_of(cur)
                            .expect("span is contiguous up to its end mark");
                    }
                    assert_eq!(n, b.len, "bucket {i} occupancy counter out of sync");
                    covered += n;
                }
            }
        }
        assert_eq!(
            covered,
            self.entries.len(),
            "span coverage differs from store length"
        );
        assert!(
            2 * self.entries.len() <= self.buckets.len(),
            "growth rule violated: {} entries in {} buckets",
            self.entries.len(),
            self.buckets.len()
        );
        let order = self.entries.keys_in_order();
        assert_eq!(order.len(), self.entries.len(), "list traversal misses nodes");
        for w in order.windows(2) {
            assert_eq!(self.entries.prev_of(w[1]), Some(w[0]), "asymmetric links");
        }
    }
}
