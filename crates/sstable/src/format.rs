//! SSTable index-page encoding.
//!
//! An SSTable is a sequence of [`pager::Pager`] pages, written in this
//! order:
//!
//! - pages `0..N`: one [`codec::KvRecord`] per page (via
//!   [`codec::serialize_kv`]), in ascending key order
//! - page `N`: the bloom filter, via [`codec::serialize_bloomfilter`]
//! - the last page: the index, encoded by [`encode_index`]
//!
//! The index is always the file's last page, so opening a reader never
//! needs a separate footer or magic number to find it — `pages_count() - 1`
//! is the index page by construction. Pager page CRC32 takes the place of
//! the teacher's per-record checksum.

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Read, Result as IoResult, Write};

/// Encodes the index page.
///
/// Layout: `[entry_count: u32]` followed by `entry_count` repetitions of
/// `[key_len: u32][key][page_no: u64]`, then `[bloom_page_no: u64]` and
/// `[max_seq: u64]`.
pub fn encode_index(entries: &[(Vec<u8>, u64)], bloom_page_no: u64, max_seq: u64) -> IoResult<Vec<u8>> {
    let mut buf = Vec::new();
    buf.write_u32::<LittleEndian>(entries.len() as u32)?;
    for (key, page_no) in entries {
        buf.write_u32::<LittleEndian>(key.len() as u32)?;
        buf.write_all(key)?;
        buf.write_u64::<LittleEndian>(*page_no)?;
    }
    buf.write_u64::<LittleEndian>(bloom_page_no)?;
    buf.write_u64::<LittleEndian>(max_seq)?;
    Ok(buf)
}

/// Decodes an index page produced by [`encode_index`], returning
/// `(entries, bloom_page_no, max_seq)`.
pub fn decode_index(bytes: &[u8]) -> IoResult<(Vec<(Vec<u8>, u64)>, u64, u64)> {
    let mut cursor = bytes;
    let count = cursor.read_u32::<LittleEndian>()?;
    let mut entries = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let key_len = cursor.read_u32::<LittleEndian>()? as usize;
        let mut key = vec![0u8; key_len];
        cursor.read_exact(&mut key)?;
        let page_no = cursor.read_u64::<LittleEndian>()?;
        entries.push((key, page_no));
    }
    let bloom_page_no = cursor.read_u64::<LittleEndian>()?;
    let max_seq = cursor.read_u64::<LittleEndian>()?;
    Ok((entries, bloom_page_no, max_seq))
}
