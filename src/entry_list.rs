//! EntryList: the shared entry store behind `RangeHashMap`.
//!
//! An arena-indexed doubly linked list over `slotmap::SlotMap`. Nodes carry
//! the key, the value, and the key's precomputed primary hash; positions are
//! generational slot keys, so a position freed by removal can never resolve
//! to a later entry that reuses the physical slot. Nodes are never moved or
//! copied after allocation; every structural operation rewrites links only.

use slotmap::{DefaultKey, SlotMap};

/// Stable reference to one entry in the store.
///
/// Obtained from insert/find/iteration on the map. Resolves to `None` once
/// the entry it names has been erased (or the map cleared); it is never
/// reused for another entry.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct Position(DefaultKey);

impl Position {
    pub(crate) fn new(k: DefaultKey) -> Self {
        Position(k)
    }
    pub(crate) fn raw(&self) -> DefaultKey {
        self.0
    }
}

struct Node<K, V> {
    key: K,
    value: V,
    hash: u64,
    prev: Option<DefaultKey>,
    next: Option<DefaultKey>,
}

pub(crate) struct EntryList<K, V> {
    slots: SlotMap<DefaultKey, Node<K, V>>,
    head: Option<DefaultKey>,
    tail: Option<DefaultKey>,
}

impl<K, V> EntryList<K, V> {
    pub(crate) fn new() -> Self {
        Self {
            slots: SlotMap::new(),
            head: None,
            tail: None,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.slots.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub(crate) fn head(&self) -> Option<DefaultKey> {
        self.head
    }

    /// Allocate a node without linking it into the list. The caller must
    /// follow up with `link_back` or `link_after`.
    pub(crate) fn alloc(&mut self, key: K, value: V, hash: u64) -> DefaultKey {
        self.slots.insert(Node {
            key,
            value,
            hash,
            prev: None,
            next: None,
        })
    }

    /// Link an allocated, currently unlinked node at the list tail.
    pub(crate) fn link_back(&mut self, k: DefaultKey) {
        let old_tail = self.tail;
        if let Some(node) = self.slots.get_mut(k) {
            node.prev = old_tail;
            node.next = None;
        }
        match old_tail {
            Some(t) => {
                if let Some(tn) = self.slots.get_mut(t) {
                    tn.next = Some(k);
                }
            }
            None => self.head = Some(k),
        }
        self.tail = Some(k);
    }

    /// Splice an allocated, currently unlinked node immediately after
    /// `anchor`, which must be linked.
    pub(crate) fn link_after(&mut self, anchor: DefaultKey, k: DefaultKey) {
        let anchor_next = match self.slots.get(anchor) {
            Some(a) => a.next,
            None => return,
        };
        if let Some(node) = self.slots.get_mut(k) {
            node.prev = Some(anchor);
            node.next = anchor_next;
        }
        if let Some(a) = self.slots.get_mut(anchor) {
            a.next = Some(k);
        }
        match anchor_next {
            Some(n) => {
                if let Some(nn) = self.slots.get_mut(n) {
                    nn.prev = Some(k);
                }
            }
            None => self.tail = Some(k),
        }
    }

    fn unlink(&mut self, k: DefaultKey) {
        let (prev, next) = match self.slots.get(k) {
            Some(n) => (n.prev, n.next),
            None => return,
        };
        match prev {
            Some(p) => {
                if let Some(pn) = self.slots.get_mut(p) {
                    pn.next = next;
                }
            }
            None => self.head = next,
        }
        match next {
            Some(n) => {
                if let Some(nn) = self.slots.get_mut(n) {
                    nn.prev = prev;
                }
            }
            None => self.tail = prev,
        }
    }

    /// Unlink and deallocate one node, returning its pair.
    pub(crate) fn remove(&mut self, k: DefaultKey) -> Option<(K, V)> {
        self.unlink(k);
        self.slots.remove(k).map(|n| (n.key, n.value))
    }

    pub(crate) fn key_of(&self, k: DefaultKey) -> Option<&K> {
        self.slots.get(k).map(|n| &n.key)
    }

    pub(crate) fn value_of(&self, k: DefaultKey) -> Option<&V> {
        self.slots.get(k).map(|n| &n.value)
    }

    pub(crate) fn value_of_mut(&mut self, k: DefaultKey) -> Option<&mut V> {
        self.slots.get_mut(k).map(|n| &mut n.value)
    }

    pub(crate) fn hash_of(&self, k: DefaultKey) -> Option<u64> {
        self.slots.get(k).map(|n| n.hash)
    }

    pub(crate) fn next_of(&self, k: DefaultKey) -> Option<DefaultKey> {
        self.slots.get(k).and_then(|n| n.next)
    }

    pub(crate) fn prev_of(&self, k: DefaultKey) -> Option<DefaultKey> {
        self.slots.get(k).and_then(|n| n.prev)
    }

    /// Snapshot of all node keys in list order.
    pub(crate) fn keys_in_order(&self) -> Vec<DefaultKey> {
        let mut order = Vec::with_capacity(self.len());
        let mut cur = self.head;
        while let Some(k) = cur {
            order.push(k);
            cur = self.next_of(k);
        }
        order
    }

    /// Detach every node from the list without deallocating any of them.
    /// Every node must subsequently be relinked exactly once via
    /// `link_back`/`link_after`, which rewrite its stale link fields.
    pub(crate) fn reset_links(&mut self) {
        self.head = None;
        self.tail = None;
    }

    pub(crate) fn clear(&mut self) {
        self.slots.clear();
        self.head = None;
        self.tail = None;
    }

    pub(crate) fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            list: self,
            cur: self.head,
        }
    }

    pub(crate) fn iter_mut(&mut self) -> IterMut<'_, K, V> {
        let cur = self.head;
        IterMut {
            slots: &mut self.slots,
            cur,
        }
    }
}

/// Iterator over entries in store order.
pub struct Iter<'a, K, V> {
    list: &'a EntryList<K, V>,
    cur: Option<DefaultKey>,
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (Position, &'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        let k = self.cur?;
        let node = self.list.slots.get(k)?;
        self.cur = node.next;
        Some((Position::new(k), &node.key, &node.value))
    }
}

/// Iterator over entries in store order with mutable value access.
pub struct IterMut<'a, K, V> {
    slots: &'a mut SlotMap<DefaultKey, Node<K, V>>,
    cur: Option<DefaultKey>,
}

impl<'a, K, V> Iterator for IterMut<'a, K, V> {
    type Item = (Position, &'a K, &'a mut V);

    fn next(&mut self) -> Option<Self::Item> {
        let k = self.cur?;
        let node = self.slots.get_mut(k)?;
        self.cur = node.next;
        // The traversal visits each slot at most once (the list is acyclic),
        // so successively yielded borrows never alias.
        let node = unsafe { &mut *(node as *mut Node<K, V>) };
        Some((Position::new(k), &node.key, &mut node.value))
    }
}
