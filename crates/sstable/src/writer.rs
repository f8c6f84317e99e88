use bloom::BloomFilter;
use codec::KvRecord;
use pager::Pager;
use std::fs::rename;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::SstError;
use crate::format::encode_index;

/// Default bloom filter false positive rate (1%).
const BLOOM_FPR: f64 = 0.01;

fn now_epoch_seconds() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

/// Whether `kv` should count toward a bloom filter's membership set: a
/// tombstoned or TTL-expired record is still written to the SSTable itself
/// (the read path needs to see it to shadow an older value), it just never
/// makes a `GET` short-circuit via bloom membership.
fn is_live(kv: &KvRecord, now: i64) -> bool {
    !kv.is_tombstone() && (kv.ttl < 0 || kv.ttl > now)
}

/// Writes sorted key/value records to disk as an immutable SSTable file.
///
/// The writer is stateless — all work happens inside
/// [`write_from_memtable`](SSTableWriter::write_from_memtable) or
/// [`write_from_iterator`](SSTableWriter::write_from_iterator). The write is
/// crash-safe: data is written to a temporary pager file, fsynced, and then
/// atomically renamed to the final path.
pub struct SSTableWriter;

impl SSTableWriter {
    /// Flushes `mem` to a new SSTable file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`SstError::EmptyInput`] if the memtable is empty, or any
    /// I/O or pager error encountered while writing.
    pub fn write_from_memtable(
        path: &Path,
        mem: &memtable::Memtable,
        compressed: bool,
    ) -> Result<(), SstError> {
        if mem.is_empty() {
            return Err(SstError::EmptyInput);
        }
        let iter = mem.iter().map(|(k, v)| KvRecord {
            key: k.to_vec(),
            value: v.value.clone(),
            seq: v.seq,
            ttl: v.ttl,
        });
        Self::write_internal(path, mem.len(), iter, compressed)
    }

    /// Writes an SSTable from an iterator of [`KvRecord`]s, in ascending key
    /// order. This is the streaming compaction entry point — it does not
    /// require the whole dataset to be materialized in a `Memtable` first.
    ///
    /// `expected_count` sizes the bloom filter; over-estimating is safe,
    /// under-estimating only raises the false-positive rate.
    ///
    /// # Errors
    ///
    /// Returns [`SstError::EmptyInput`] if `iter` yields nothing.
    pub fn write_from_iterator<I>(
        path: &Path,
        expected_count: usize,
        iter: I,
        compressed: bool,
    ) -> Result<(), SstError>
    where
        I: Iterator<Item = KvRecord>,
    {
        Self::write_internal(path, expected_count.max(1), iter, compressed)
    }

    fn write_internal<I>(
        path: &Path,
        expected_count: usize,
        iter: I,
        compressed: bool,
    ) -> Result<(), SstError>
    where
        I: Iterator<Item = KvRecord>,
    {
        let tmp_path = path.with_extension("sst.tmp");
        // A prior crashed attempt may have left a partial tmp file behind;
        // the pager only ever appends, so start from a clean slate.
        let _ = std::fs::remove_file(&tmp_path);
        let mut pager = Pager::open(&tmp_path, false)?;

        let mut bloom = BloomFilter::new(expected_count.max(1), BLOOM_FPR);
        let mut index_entries: Vec<(Vec<u8>, u64)> = Vec::new();
        let mut max_seq: u64 = 0;
        let now = now_epoch_seconds();

        for kv in iter {
            max_seq = max_seq.max(kv.seq);
            if is_live(&kv, now) {
                bloom.insert(&kv.key);
            }
            let key = kv.key.clone();
            let bytes = codec::serialize_kv(&kv, compressed)?;
            let page_no = pager.write(&bytes)?;
            index_entries.push((key, page_no));
        }

        if index_entries.is_empty() {
            drop(pager);
            let _ = std::fs::remove_file(&tmp_path);
            return Err(SstError::EmptyInput);
        }

        let bloom_bytes = codec::serialize_bloomfilter(&bloom, compressed)?;
        let bloom_page_no = pager.write(&bloom_bytes)?;

        let index_bytes = encode_index(&index_entries, bloom_page_no, max_seq)?;
        pager.write(&index_bytes)?;

        pager.sync_all()?;
        pager.close();

        rename(&tmp_path, path)?;

        // Fsync the parent directory so the rename itself is durable; a
        // crash after rename but before dir sync can otherwise lose the
        // entry on ext4/XFS (NTFS journals metadata so this is a no-op there).
        if let Some(parent) = path.parent() {
            if let Ok(dir) = std::fs::File::open(parent) {
                let _ = dir.sync_all();
            }
        }

        Ok(())
    }
}

#[cfg(test)]
#[path = "writer_tests.rs"]
mod tests;
