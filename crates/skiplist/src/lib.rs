//! # Skiplist
//!
//! A probabilistic skip list: the ordered, mutable structure backing the
//! RiptideKV memtable. It gives the same sorted-iteration and O(log n)
//! point-lookup guarantees as a `BTreeMap`, but with arena-indexed nodes
//! (`Vec<Node<K, V>>` plus `usize` links) rather than a pointer-based tree,
//! which is how skip lists are normally expressed in safe Rust.
//!
//! Besides the map surface (`insert`/`get`/`remove`/`contains_key`/`clear`),
//! it carries a running [`SkipList::total_size`] for callers that weigh
//! entries by byte size, a snapshotted [`SkipList::cursor_init`] for
//! stepping forward/backward, `copy`/`destroy` for an explicit deep clone
//! and teardown, and an internal lock (`read_lock`/`write_lock`) a caller
//! can hold across a multi-step sequence of calls.
//!
//! ## Example
//! ```rust
//! use skiplist::SkipList;
//!
//! let mut list = SkipList::new();
//! list.insert(3, "c");
//! list.insert(1, "a");
//! list.insert(2, "b");
//!
//! assert_eq!(list.get(&2), Some(&"b"));
//! let keys: Vec<_> = list.iter().map(|(k, _)| *k).collect();
//! assert_eq!(keys, vec![1, 2, 3]);
//! ```

use rand::Rng;
use std::sync::RwLock;

/// Maximum tower height any node can have. 16 levels comfortably covers
/// well over a million entries at `P = 0.25`.
const MAX_LEVEL: usize = 16;
/// Probability a node promoted to level `i` is also promoted to `i + 1`.
const P: f64 = 0.25;
/// Sentinel "no node" link value, used instead of `Option<usize>` to keep
/// the forward-pointer arrays a flat `Vec<usize>`.
const NIL: usize = usize::MAX;

#[derive(Debug)]
struct Node<K, V> {
    key: Option<K>,
    value: Option<V>,
    /// Byte size this entry contributes to [`SkipList::total_size`], as
    /// given by the caller at insert time. `0` for entries inserted through
    /// the plain [`insert`](SkipList::insert).
    size: usize,
    forward: Vec<usize>,
}

/// An ordered map backed by a probabilistic skip list.
#[derive(Debug)]
pub struct SkipList<K, V> {
    arena: Vec<Node<K, V>>,
    /// Index of the head sentinel node (always `0`).
    head: usize,
    /// Highest level currently in use by any node (0-indexed).
    level: usize,
    len: usize,
    /// Sum of every live entry's recorded size; see [`insert_sized`](SkipList::insert_sized).
    total_size: usize,
    /// Internal coordination lock. A single call into this skip list is
    /// already exclusive/shared at the Rust type level via `&mut
    /// self`/`&self`; this lock exists for callers that need to hold
    /// several such calls together as one logical sequence (e.g. a batch of
    /// inserts that must appear atomic to a concurrent reader) without
    /// reaching for a lock external to the list itself.
    lock: RwLock<()>,
}

impl<K: Ord + Clone, V> SkipList<K, V> {
    /// Creates a new, empty skip list.
    pub fn new() -> Self {
        let head = Node {
            key: None,
            value: None,
            size: 0,
            forward: vec![NIL; MAX_LEVEL],
        };
        Self {
            arena: vec![head],
            head: 0,
            level: 0,
            len: 0,
            total_size: 0,
            lock: RwLock::new(()),
        }
    }

    /// Acquires this list's internal lock for a read-only multi-step sequence.
    pub fn read_lock(&self) -> std::sync::RwLockReadGuard<'_, ()> {
        self.lock.read().expect("skiplist lock poisoned")
    }

    /// Acquires this list's internal lock for a mutating multi-step sequence.
    pub fn write_lock(&self) -> std::sync::RwLockWriteGuard<'_, ()> {
        self.lock.write().expect("skiplist lock poisoned")
    }

    /// Returns the sum of every live entry's recorded size (see
    /// [`insert_sized`](SkipList::insert_sized)).
    #[must_use]
    pub fn total_size(&self) -> usize {
        self.total_size
    }

    /// Returns the number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if the list holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn random_level(&self) -> usize {
        let mut level = 0;
        let mut rng = rand::thread_rng();
        while level < MAX_LEVEL - 1 && rng.gen_bool(P) {
            level += 1;
        }
        level
    }

    /// Finds, for each level, the index of the last node whose key is
    /// strictly less than `key`. Used by both search and insert/remove.
    fn find_predecessors(&self, key: &K) -> [usize; MAX_LEVEL] {
        let mut update = [self.head; MAX_LEVEL];
        let mut cur = self.head;

        for lvl in (0..=self.level).rev() {
            loop {
                let next = self.arena[cur].forward[lvl];
                if next == NIL {
                    break;
                }
                let next_key = self.arena[next].key.as_ref().expect("non-head node");
                if next_key < key {
                    cur = next;
                } else {
                    break;
                }
            }
            update[lvl] = cur;
        }
        update
    }

    /// Inserts `key`/`value`, returning the previous value if the key
    /// already existed. Equivalent to [`insert_sized`](SkipList::insert_sized)
    /// with a size of `0`, so it does not move [`total_size`](SkipList::total_size).
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        self.insert_sized(key, value, 0)
    }

    /// Inserts `key`/`value`, recording `size` as this entry's contribution
    /// to [`total_size`](SkipList::total_size). Replacing an existing key
    /// removes its previously recorded size before adding the new one.
    pub fn insert_sized(&mut self, key: K, value: V, size: usize) -> Option<V> {
        let update = self.find_predecessors(&key);
        let candidate = self.arena[update[0]].forward[0];

        if candidate != NIL {
            if let Some(existing_key) = &self.arena[candidate].key {
                if existing_key == &key {
                    self.total_size = self.total_size - self.arena[candidate].size + size;
                    self.arena[candidate].size = size;
                    return self.arena[candidate].value.replace(value);
                }
            }
        }

        let new_level = self.random_level();
        if new_level > self.level {
            self.level = new_level;
        }

        let mut forward = vec![NIL; new_level + 1];
        let new_idx = self.arena.len();
        for lvl in 0..=new_level {
            let pred = update[lvl];
            forward[lvl] = self.arena[pred].forward[lvl];
        }
        self.arena.push(Node {
            key: Some(key),
            value: Some(value),
            size,
            forward,
        });
        for lvl in 0..=new_level {
            let pred = update[lvl];
            self.arena[pred].forward[lvl] = new_idx;
        }

        self.len += 1;
        self.total_size += size;
        None
    }

    /// Looks up `key`, returning its value if present.
    pub fn get(&self, key: &K) -> Option<&V> {
        let idx = self.find_index(key)?;
        self.arena[idx].value.as_ref()
    }

    /// Returns `true` if `key` is present.
    pub fn contains_key(&self, key: &K) -> bool {
        self.find_index(key).is_some()
    }

    fn find_index(&self, key: &K) -> Option<usize> {
        let mut cur = self.head;
        for lvl in (0..=self.level).rev() {
            loop {
                let next = self.arena[cur].forward[lvl];
                if next == NIL {
                    break;
                }
                let next_key = self.arena[next].key.as_ref().expect("non-head node");
                if next_key < key {
                    cur = next;
                } else {
                    break;
                }
            }
        }
        let candidate = self.arena[cur].forward[0];
        if candidate == NIL {
            return None;
        }
        if self.arena[candidate].key.as_ref() == Some(key) {
            Some(candidate)
        } else {
            None
        }
    }

    /// Removes `key`, returning its value if it was present.
    ///
    /// The vacated arena slot is left in place (its key/value are cleared)
    /// rather than compacted, since the memtable workload is dominated by
    /// inserts and a full flush discards the whole structure anyway.
    pub fn remove(&mut self, key: &K) -> Option<V> {
        let update = self.find_predecessors(key);
        let candidate = self.arena[update[0]].forward[0];
        if candidate == NIL {
            return None;
        }
        if self.arena[candidate].key.as_ref() != Some(key) {
            return None;
        }

        for lvl in 0..=self.level {
            let pred = update[lvl];
            if self.arena[pred].forward.get(lvl) == Some(&candidate) {
                let next = self.arena[candidate].forward[lvl];
                self.arena[pred].forward[lvl] = next;
            }
        }

        while self.level > 0 && self.arena[self.head].forward[self.level] == NIL {
            self.level -= 1;
        }

        self.len -= 1;
        self.total_size = self.total_size.saturating_sub(self.arena[candidate].size);
        self.arena[candidate].size = 0;
        let removed = self.arena[candidate].value.take();
        self.arena[candidate].key = None;
        removed
    }

    /// Returns an iterator over `(key, value)` pairs in ascending key order.
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            arena: &self.arena,
            next: self.arena[self.head].forward[0],
        }
    }

    /// Removes every entry, resetting the list to its just-constructed state.
    pub fn clear(&mut self) {
        *self = Self::new();
    }

    /// Initializes a forward/backward cursor over this list's entries,
    /// starting before the first one. The key order is snapshotted at this
    /// call; later mutations through `&mut self` do not move the cursor,
    /// the same guarantee [`pager::PageCursor`] gives over pager pages.
    #[must_use]
    pub fn cursor_init(&self) -> Cursor<'_, K, V> {
        let mut order = Vec::with_capacity(self.len);
        let mut cur = self.arena[self.head].forward[0];
        while cur != NIL {
            order.push(cur);
            cur = self.arena[cur].forward[0];
        }
        Cursor {
            arena: &self.arena,
            order,
            pos: None,
        }
    }

    /// Returns a deep copy of this list, independent of the original.
    pub fn copy(&self) -> Self
    where
        K: Clone,
        V: Clone,
    {
        let arena = self
            .arena
            .iter()
            .map(|n| Node {
                key: n.key.clone(),
                value: n.value.clone(),
                size: n.size,
                forward: n.forward.clone(),
            })
            .collect();
        Self {
            arena,
            head: self.head,
            level: self.level,
            len: self.len,
            total_size: self.total_size,
            lock: RwLock::new(()),
        }
    }

    /// Consumes and releases the list. Provided for symmetry with the
    /// skiplist contract's explicit `destroy` operation; a no-op beyond
    /// dropping.
    pub fn destroy(self) {
        drop(self);
    }
}

impl<K: Ord + Clone, V> Default for SkipList<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

/// A forward/backward cursor over a [`SkipList`]'s entries, snapshotted in
/// ascending key order at [`SkipList::cursor_init`].
pub struct Cursor<'a, K, V> {
    arena: &'a [Node<K, V>],
    order: Vec<usize>,
    pos: Option<usize>,
}

impl<'a, K, V> Cursor<'a, K, V> {
    /// Advances to the next entry. Returns `false` if already past the end.
    pub fn next(&mut self) -> bool {
        let next = match self.pos {
            None => 0,
            Some(p) => p + 1,
        };
        if next >= self.order.len() {
            self.pos = Some(self.order.len());
            return false;
        }
        self.pos = Some(next);
        true
    }

    /// Moves to the previous entry. Returns `false` if already before the start.
    pub fn prev(&mut self) -> bool {
        match self.pos {
            None => false,
            Some(0) => {
                self.pos = None;
                false
            }
            Some(p) => {
                self.pos = Some(p - 1);
                true
            }
        }
    }

    /// Returns the entry the cursor currently points at, if any.
    pub fn get(&self) -> Option<(&'a K, &'a V)> {
        let p = self.pos.filter(|&p| p < self.order.len())?;
        let node = &self.arena[self.order[p]];
        Some((node.key.as_ref().unwrap(), node.value.as_ref().unwrap()))
    }

    /// Releases the cursor. Provided for symmetry with the skiplist
    /// contract's explicit `free` operation; a no-op beyond dropping.
    pub fn free(self) {
        drop(self);
    }
}

/// Ascending-order iterator over a [`SkipList`]'s entries.
pub struct Iter<'a, K, V> {
    arena: &'a [Node<K, V>],
    next: usize,
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        if self.next == NIL {
            return None;
        }
        let node = &self.arena[self.next];
        self.next = node.forward[0];
        // removed nodes are fully unlinked by `remove`, so anything still
        // reachable here has a live key/value.
        Some((node.key.as_ref().unwrap(), node.value.as_ref().unwrap()))
    }
}
