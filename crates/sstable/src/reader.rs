use bloom::BloomFilter;
use codec::KvRecord;
use pager::Pager;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::error::SstError;
use crate::format::decode_index;

/// Reads an SSTable file for point lookups.
///
/// On [`open`](SSTableReader::open) the index page (always the file's last
/// page) and the bloom filter page it points at are loaded into memory; the
/// data pages are read lazily, one seek + read per [`get`](SSTableReader::get)
/// call.
///
/// The pager's file handle is kept open for the reader's lifetime, wrapped
/// in a `Mutex` so `get` can be called through a shared `&self` reference.
pub struct SSTableReader {
    /// Path to the `.sst` file on disk.
    path: PathBuf,
    /// In-memory index mapping each key to its data page number.
    index: BTreeMap<Vec<u8>, u64>,
    bloom: BloomFilter,
    max_seq: u64,
    pager: Mutex<Pager>,
}

impl SSTableReader {
    /// Opens an SSTable file, loading its index and bloom filter into memory.
    ///
    /// # Errors
    ///
    /// Returns [`SstError::Empty`] if the file has no pages, or a pager/codec
    /// error if a page fails its CRC check or fails to decode.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, SstError> {
        let path_buf = path.as_ref().to_path_buf();
        let mut pager = Pager::open_existing(&path_buf, false)?;

        let pages = pager.pages_count();
        if pages == 0 {
            return Err(SstError::Empty);
        }

        let index_page_no = pages - 1;
        let index_bytes = pager.read(index_page_no)?;
        let (entries, bloom_page_no, max_seq) = decode_index(&index_bytes)?;

        let bloom_bytes = pager.read(bloom_page_no)?;
        let bloom = codec::deserialize_bloomfilter(&bloom_bytes)?;

        let index = entries.into_iter().collect();

        Ok(Self {
            path: path_buf,
            index,
            bloom,
            max_seq,
            pager: Mutex::new(pager),
        })
    }

    /// Point lookup for a single key.
    ///
    /// The in-memory index, built from every record this file holds, is
    /// authoritative — unlike the bloom filter, it does not omit tombstoned
    /// or TTL-expired entries, so checking it directly never causes a
    /// present-but-not-live record to be mistaken for absent (which would
    /// let a newer tombstone fail to shadow an older SSTable's value).
    /// Returns `Ok(Some(record))` if the key exists — the record may be a
    /// tombstone. Returns `Ok(None)` if it is not present.
    pub fn get(&self, key: &[u8]) -> Result<Option<KvRecord>, SstError> {
        let page_no = match self.index.get(key) {
            Some(&p) => p,
            None => return Ok(None),
        };

        let mut pager = self.pager.lock().expect("sstable pager mutex poisoned");
        let bytes = pager.read(page_no)?;
        let kv = codec::deserialize_kv(&bytes)?;

        if kv.key != key {
            return Err(SstError::IndexMismatch(page_no));
        }

        Ok(Some(kv))
    }

    /// Returns the path of the `.sst` file backing this reader.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Checks `key` against this file's bloom filter directly, without
    /// consulting the index. A `false` result means `key` was never live
    /// when this file was written (it may still be present as a tombstone
    /// or expired entry); a `true` result is only a hint. `get` does not use
    /// this for its correctness-affecting presence check — see its doc.
    #[must_use]
    pub fn may_contain(&self, key: &[u8]) -> bool {
        self.bloom.may_contain(key)
    }

    /// Returns the highest sequence number stored in this SSTable.
    #[must_use]
    pub fn max_seq(&self) -> u64 {
        self.max_seq
    }

    /// Returns the number of entries in the in-memory index.
    #[must_use]
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Returns `true` if the SSTable contains zero entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Returns an iterator over all keys in the in-memory index, in
    /// ascending sorted order (guaranteed by `BTreeMap`).
    pub fn keys(&self) -> impl Iterator<Item = &[u8]> {
        self.index.keys().map(|k| k.as_slice())
    }
}

#[cfg(test)]
#[path = "reader_tests.rs"]
mod tests;
