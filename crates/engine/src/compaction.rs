//! Pairwise, multi-threaded compaction.
//!
//! A compaction pass sorts a column family's SSTables oldest-to-newest and
//! splits them into contiguous slots, one per worker thread, each walked
//! pairwise — `(0,1), (2,3), …` — merging every pair with
//! [`sstable::MergeIterator`] (already newest-seq-wins over however many
//! readers it's given; a two-way merge is just that same iterator handed a
//! two-element slice). An unpaired trailing SSTable passes through untouched.
//!
//! The slot size is `ceil(N / max_threads)` rounded up to the nearest even
//! number, and the thread count driving that division is capped at `N / 2` —
//! otherwise a caller passing `max_threads >= N` would get `N` singleton
//! slots, none of which can pair, leaving the SSTable count untouched. An odd
//! slot size only ever falls on the last slot, so at most one SSTable across
//! the whole pass ever goes through unpaired, which is what keeps the result
//! at or under `ceil(N/2)` regardless of how many threads were requested.
//!
//! Per merged pair, tombstones and TTL-expired entries are dropped
//! unconditionally — this compaction operates only on the pair in hand, with
//! no visibility into whether an older SSTable outside the pair still holds
//! a shadowed value, matching the pairwise scheme the compaction engine is
//! specified to use.

use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use codec::KvRecord;
use sstable::{MergeIterator, SSTableReader, SSTableWriter};

use crate::catalog::ColumnFamily;
use crate::error::{EngineError, Result};

fn now_epoch_seconds() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

fn is_live(kv: &KvRecord, now: i64) -> bool {
    !kv.is_tombstone() && (kv.ttl < 0 || kv.ttl > now)
}

/// Merges two SSTables into one, dropping tombstones and expired entries and
/// resolving duplicate keys by highest sequence number. Deletes both input
/// files on success. Returns `Ok(None)` if nothing survived the merge (the
/// boundary case where an empty pair produces no output SSTable); the input
/// files are still deleted in that case.
fn merge_pair(
    a: SSTableReader,
    b: SSTableReader,
    dir: &Path,
    compressed: bool,
    new_id: u64,
) -> Result<Option<SSTableReader>> {
    let a_path = a.path().to_path_buf();
    let b_path = b.path().to_path_buf();
    let estimated = a.len() + b.len();

    let pair = [a, b];
    let now = now_epoch_seconds();
    let mut live = Vec::with_capacity(estimated);
    {
        let mut merge = MergeIterator::new(&pair);
        while let Some((_, kv)) = merge.next_entry()? {
            if is_live(&kv, now) {
                live.push(kv);
            }
        }
    }
    drop(pair);

    std::fs::remove_file(&a_path)?;
    std::fs::remove_file(&b_path)?;

    if live.is_empty() {
        return Ok(None);
    }

    let new_path = dir.join(format!("sstable_{new_id:020}.sst"));
    let count = live.len();
    SSTableWriter::write_from_iterator(&new_path, count, live.into_iter(), compressed)?;
    Ok(Some(SSTableReader::open(&new_path)?))
}

/// Processes one contiguous slot: pairwise merge, with a trailing unpaired
/// SSTable passed through untouched.
fn process_slot(
    slot: Vec<SSTableReader>,
    dir: &Path,
    compressed: bool,
    cf: &ColumnFamily,
) -> Result<Vec<SSTableReader>> {
    let mut out = Vec::new();
    let mut iter = slot.into_iter();
    loop {
        let Some(first) = iter.next() else { break };
        match iter.next() {
            Some(second) => {
                let id = cf.next_sstable_id();
                if let Some(merged) = merge_pair(first, second, dir, compressed, id)? {
                    out.push(merged);
                }
            }
            None => out.push(first),
        }
    }
    Ok(out)
}

/// Compacts all of `cf`'s SSTables pairwise across up to `max_threads`
/// worker threads.
///
/// Requires at least two SSTables; fails with
/// [`EngineError::NotEnoughSstablesToCompact`] otherwise (the SSTable list is
/// left untouched in that case). On success, replaces the column family's
/// SSTable list with the compacted result — at most `ceil(N/2)` entries.
///
/// Mutually exclusive with reads and flush publishes on this column family
/// via `cf.sstables`'s write lock, held for the duration of the pass.
pub fn compact(cf: &ColumnFamily, max_threads: usize) -> Result<()> {
    if max_threads < 1 {
        return Err(EngineError::ThreadsTooLow);
    }

    let mut guard = cf.sstables.write().expect("sstables lock poisoned");
    let readers = std::mem::take(&mut *guard);
    let n = readers.len();
    if n < 2 {
        *guard = readers;
        return Err(EngineError::NotEnoughSstablesToCompact(n));
    }

    let effective_threads = max_threads.min((n / 2).max(1));
    let raw_slot_size = (n + effective_threads - 1) / effective_threads;
    let slot_size = raw_slot_size + (raw_slot_size % 2);
    let mut slots: Vec<Vec<SSTableReader>> = Vec::new();
    let mut remaining = readers;
    while !remaining.is_empty() {
        let take = slot_size.min(remaining.len());
        let rest = remaining.split_off(take);
        slots.push(remaining);
        remaining = rest;
    }

    let dir = cf.dir_path().to_path_buf();
    let compressed = cf.config().compressed();

    let results: Vec<Result<Vec<SSTableReader>>> = std::thread::scope(|scope| {
        let handles: Vec<_> = slots
            .into_iter()
            .map(|slot| {
                let dir = dir.clone();
                scope.spawn(move || process_slot(slot, &dir, compressed, cf))
            })
            .collect();
        handles
            .into_iter()
            .map(|h| h.join().expect("compaction worker thread panicked"))
            .collect()
    });

    let mut merged = Vec::new();
    let mut first_err = None;
    for result in results {
        match result {
            Ok(mut readers) => merged.append(&mut readers),
            Err(e) if first_err.is_none() => first_err = Some(e),
            Err(_) => {}
        }
    }

    *guard = merged;
    drop(guard);

    match first_err {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

#[cfg(test)]
#[path = "tests/compaction_tests.rs"]
mod tests;
