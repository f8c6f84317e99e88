//! Ordered, bidirectional traversal across one column family's memtable and
//! SSTables.
//!
//! A cursor binds to a single column family and takes a point-in-time
//! snapshot of every entry visible at that moment: the memtable's entries in
//! key order, then each SSTable's entries in key order, newest SSTable
//! first. `next`/`prev` walk that snapshot; later writes to the column
//! family are invisible to an already-bound cursor. Unlike [`Database::get`],
//! [`Cursor::get`] distinguishes a tombstoned key from an expired one instead
//! of collapsing both into "not found".

use crate::catalog::ColumnFamily;
use crate::error::{EngineError, Result};
use crate::read::{is_expired, now_epoch_seconds};
use crate::Database;

struct CursorEntry {
    key: Vec<u8>,
    value: Vec<u8>,
    ttl: i64,
    tombstone: bool,
}

enum CursorPos {
    BeforeStart,
    At(usize, usize),
    AfterEnd,
}

/// A snapshot-ordered cursor over one column family.
///
/// Segment 0 is the memtable (ascending key order); segments 1.. are the
/// SSTables present at bind time, newest first, each ascending.
pub struct Cursor {
    segments: Vec<Vec<CursorEntry>>,
    pos: CursorPos,
}

impl Cursor {
    pub(crate) fn build(cf: &ColumnFamily) -> Result<Cursor> {
        let mem = cf.memtable.read().expect("memtable lock poisoned");
        let mem_segment: Vec<CursorEntry> = mem
            .iter()
            .map(|(key, entry)| CursorEntry {
                key: key.to_vec(),
                value: entry.value.clone(),
                ttl: entry.ttl,
                tombstone: entry.is_tombstone(),
            })
            .collect();
        drop(mem);

        let sstables = cf.sstables.read().expect("sstables lock poisoned");
        let mut segments = vec![mem_segment];
        for sst in sstables.iter().rev() {
            let mut segment = Vec::with_capacity(sst.len());
            for key in sst.keys() {
                if let Some(kv) = sst.get(key)? {
                    segment.push(CursorEntry {
                        key: kv.key,
                        value: kv.value,
                        ttl: kv.ttl,
                        tombstone: kv.is_tombstone(),
                    });
                }
            }
            segments.push(segment);
        }
        drop(sstables);

        Ok(Cursor {
            segments,
            pos: CursorPos::BeforeStart,
        })
    }

    /// Advances to the next entry in key/segment order.
    ///
    /// Fails with [`EngineError::AtEndOfCursor`] if already past the last
    /// entry; a cursor that has run off either end must be rebuilt via
    /// [`Database::cursor`] to be used again.
    pub fn next(&mut self) -> Result<()> {
        self.pos = match self.pos {
            CursorPos::BeforeStart => self.first_position(),
            CursorPos::At(seg, idx) if idx + 1 < self.segments[seg].len() => {
                CursorPos::At(seg, idx + 1)
            }
            CursorPos::At(seg, _) => self.next_segment_start(seg),
            CursorPos::AfterEnd => return Err(EngineError::AtEndOfCursor),
        };
        Ok(())
    }

    /// Moves to the previous entry in key/segment order.
    ///
    /// Fails with [`EngineError::AtStartOfCursor`] if already before the
    /// first entry.
    pub fn prev(&mut self) -> Result<()> {
        self.pos = match self.pos {
            CursorPos::AfterEnd => self.last_position(),
            CursorPos::At(seg, idx) if idx > 0 => CursorPos::At(seg, idx - 1),
            CursorPos::At(seg, _) => self.prev_segment_end(seg),
            CursorPos::BeforeStart => return Err(EngineError::AtStartOfCursor),
        };
        Ok(())
    }

    /// Returns the key and value at the cursor's current position.
    ///
    /// Fails with [`EngineError::KeyTombstoned`] or [`EngineError::KeyExpired`]
    /// if the current entry is a tombstone or has expired — callers that want
    /// `get`'s "not found" collapsing behavior should match on those two
    /// variants as absence. Fails with [`EngineError::AtStartOfCursor`] or
    /// [`EngineError::AtEndOfCursor`] if the cursor is off either end.
    pub fn get(&self) -> Result<(Vec<u8>, Vec<u8>)> {
        match self.pos {
            CursorPos::At(seg, idx) => {
                let entry = &self.segments[seg][idx];
                if entry.tombstone {
                    return Err(EngineError::KeyTombstoned);
                }
                if is_expired(entry.ttl, now_epoch_seconds()) {
                    return Err(EngineError::KeyExpired);
                }
                Ok((entry.key.clone(), entry.value.clone()))
            }
            CursorPos::BeforeStart => Err(EngineError::AtStartOfCursor),
            CursorPos::AfterEnd => Err(EngineError::AtEndOfCursor),
        }
    }

    fn first_position(&self) -> CursorPos {
        for (seg, entries) in self.segments.iter().enumerate() {
            if !entries.is_empty() {
                return CursorPos::At(seg, 0);
            }
        }
        CursorPos::AfterEnd
    }

    fn last_position(&self) -> CursorPos {
        for seg in (0..self.segments.len()).rev() {
            if !self.segments[seg].is_empty() {
                return CursorPos::At(seg, self.segments[seg].len() - 1);
            }
        }
        CursorPos::BeforeStart
    }

    fn next_segment_start(&self, from: usize) -> CursorPos {
        for seg in (from + 1)..self.segments.len() {
            if !self.segments[seg].is_empty() {
                return CursorPos::At(seg, 0);
            }
        }
        CursorPos::AfterEnd
    }

    fn prev_segment_end(&self, from: usize) -> CursorPos {
        for seg in (0..from).rev() {
            if !self.segments[seg].is_empty() {
                return CursorPos::At(seg, self.segments[seg].len() - 1);
            }
        }
        CursorPos::BeforeStart
    }
}

impl Database {
    /// Builds a cursor over `cf_name`'s current entries.
    pub fn cursor(&self, cf_name: &str) -> Result<Cursor> {
        let cf = self.find_cf(cf_name)?;
        Cursor::build(&cf)
    }
}

#[cfg(test)]
#[path = "tests/cursor_tests.rs"]
mod tests;
