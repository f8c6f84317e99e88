//! # Memtable
//!
//! An in-memory, sorted, mutable write buffer for the RiptideKV storage engine.
//!
//! The memtable is the first point of contact for every write operation. It buffers
//! recent `PUT` and `DELETE` operations in a sorted structure (a [`skiplist::SkipList`])
//! before they are flushed to immutable on-disk SSTables.
//!
//! ## Key properties
//! - **Sorted order**: entries are always in ascending key order (required for SSTable flush).
//! - **Sequence-number gated**: stale writes (lower sequence number) are silently rejected.
//! - **Tombstone support**: a delete is a put of the [`codec::TOMBSTONE`] sentinel value,
//!   not a separate "no value" state — the same record shape the data model uses on disk.
//! - **TTL carried, not enforced**: each entry carries its `ttl`; whether it has expired is
//!   for the reader to decide against the current time, since the memtable has no clock of its own.
//! - **Approximate size tracking**: tracks the byte size of keys + values for flush threshold decisions.
//!
//! ## Example
//! ```rust
//! use memtable::Memtable;
//!
//! let mut m = Memtable::new();
//! m.put(b"hello".to_vec(), b"world".to_vec(), 1, -1);
//! assert_eq!(m.get(b"hello").unwrap().1, b"world");
//!
//! m.delete(b"hello".to_vec(), 2);
//! assert!(m.get(b"hello").is_none());
//! ```

use codec::TOMBSTONE;
use skiplist::SkipList;

/// A single entry in the memtable, pairing a sequence number and TTL with
/// the raw value bytes.
///
/// A tombstone is represented the same way a live value is — as a `value`
/// payload — except its bytes equal the 4-byte little-endian
/// [`codec::TOMBSTONE`] marker. This mirrors the on-disk record shape
/// exactly, so a memtable entry can be written straight to an SSTable
/// without reshaping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueEntry {
    /// Monotonically increasing sequence number assigned at write time.
    pub seq: u64,
    /// Raw value bytes; the tombstone marker for a deleted key.
    pub value: Vec<u8>,
    /// `-1` for no expiry, otherwise an absolute epoch-second deadline.
    pub ttl: i64,
}

impl ValueEntry {
    /// Returns `true` if this entry's value is the tombstone marker.
    #[must_use]
    pub fn is_tombstone(&self) -> bool {
        self.value.len() == 4 && self.value == TOMBSTONE.to_le_bytes()
    }
}

/// An ordered, in-memory write buffer backed by a [`skiplist::SkipList`].
///
/// The memtable tracks an approximate byte size (keys + values) so the engine
/// can decide when to flush to an SSTable. Sequence numbers gate every mutation:
/// a write with a sequence number <= the existing entry's sequence is silently
/// dropped, ensuring consistency during WAL replay and concurrent recovery.
#[derive(Debug)]
pub struct Memtable {
    map: SkipList<Vec<u8>, ValueEntry>,
    approx_size: usize,
}

impl Memtable {
    /// Creates a new, empty memtable.
    pub fn new() -> Self {
        Self {
            map: SkipList::new(),
            approx_size: 0,
        }
    }

    /// Inserts a key-value pair with the given sequence number and TTL.
    ///
    /// If the key already exists with a **newer or equal** sequence number, the
    /// write is silently ignored (stale-write protection). Otherwise the old
    /// entry is replaced and `approx_size` is adjusted accordingly.
    pub fn put(&mut self, key: Vec<u8>, value: Vec<u8>, seq: u64, ttl: i64) {
        match self.map.get(&key) {
            Some(old) if old.seq >= seq => {
                // stale or equal write, ignore
                return;
            }
            Some(old) => {
                self.approx_size = self.approx_size.saturating_sub(old.value.len());
            }
            None => {
                self.approx_size = self.approx_size.saturating_add(key.len());
            }
        }

        self.approx_size = self.approx_size.saturating_add(value.len());
        self.map.insert(key, ValueEntry { seq, value, ttl });
    }

    /// Records a tombstone (delete marker) for the given key.
    ///
    /// This is just [`put`](Memtable::put) with the tombstone value and a
    /// non-expiring TTL, per the data model's "a delete is a put of the
    /// tombstone value" rule. The same stale-write protection applies.
    pub fn delete(&mut self, key: Vec<u8>, seq: u64) {
        self.put(key, TOMBSTONE.to_le_bytes().to_vec(), seq, -1);
    }

    /// Returns a borrowed reference to the value for the given key if it exists
    /// and is **not** a tombstone.
    ///
    /// Returns `Some((seq, value_bytes, ttl))` for live entries, `None` for
    /// missing keys or tombstones.
    ///
    /// **Prefer [`get_entry`](Memtable::get_entry)** when you need to
    /// distinguish between "key not found" and "key was deleted" (tombstone),
    /// or when the caller needs to apply its own TTL-expiry check.
    pub fn get(&self, key: &[u8]) -> Option<(u64, &[u8], i64)> {
        let entry = self.map.get(&key.to_vec())?;
        if entry.is_tombstone() {
            return None;
        }
        Some((entry.seq, entry.value.as_slice(), entry.ttl))
    }

    /// Returns an iterator over all entries in **ascending key order**.
    ///
    /// This includes tombstones. The ordering guarantee is provided by the
    /// underlying skip list and is required for correct SSTable flush.
    pub fn iter(&self) -> impl Iterator<Item = (&[u8], &ValueEntry)> {
        self.map.iter().map(|(k, v)| (k.as_slice(), v))
    }

    /// Returns the number of entries (including tombstones).
    #[must_use]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Returns the approximate byte size of all keys and values stored.
    ///
    /// This is used by the engine to decide when to flush the memtable to an
    /// SSTable. The size tracks key bytes + value bytes but does **not** include
    /// skip-list node overhead.
    #[must_use]
    pub fn approx_size(&self) -> usize {
        self.approx_size
    }

    /// Returns `true` if the memtable contains zero entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Returns the raw [`ValueEntry`] for the given key, if present.
    ///
    /// Unlike [`get`](Memtable::get), this does **not** filter out
    /// tombstones or apply any TTL check — the engine uses this to see the
    /// full picture (found-live, found-tombstone, found-but-expired, or
    /// not-found) before deciding how to answer a read.
    pub fn get_entry(&self, key: &[u8]) -> Option<&ValueEntry> {
        self.map.get(&key.to_vec())
    }

    /// Returns `true` if the memtable contains the given key (including tombstones).
    pub fn contains_key(&self, key: &[u8]) -> bool {
        self.map.contains_key(&key.to_vec())
    }

    /// Removes all entries and resets `approx_size` to zero.
    pub fn clear(&mut self) {
        self.map.clear();
        self.approx_size = 0;
    }

    /// Replaces this memtable with a fresh empty one and returns the old
    /// one, moving its entries out rather than copying them.
    ///
    /// This is the flush pipeline's "snapshot" step: ownership of the full
    /// write buffer passes to the caller (destined for the flush queue)
    /// while the live memtable immediately starts absorbing new writes
    /// into an empty structure.
    pub fn take(&mut self) -> Memtable {
        std::mem::take(self)
    }
}

impl Default for Memtable {
    fn default() -> Self {
        Self::new()
    }
}
