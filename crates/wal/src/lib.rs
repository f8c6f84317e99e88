//! # WAL — Write-Ahead Log
//!
//! Provides crash-safe durability for the RiptideKV storage engine.
//!
//! Every mutation (`PUT` or `DELETE`) is serialized via [`codec`] into an
//! [`Operation`] and appended to the WAL **before** the corresponding
//! in-memory update. On restart the WAL is replayed to reconstruct the
//! memtable, guaranteeing that no acknowledged write is lost.
//!
//! ## Framing
//!
//! One operation is one [`pager::Pager`] page: the CRC-checksummed framing
//! that used to be hand-rolled here (`[record_len: u32][crc32: u32][body]`)
//! is now the pager's job, and a torn trailing frame (a crash mid-write) is
//! treated as a clean end of log by the pager's own scan-on-open, exactly
//! as it was treated here before.
//!
//! ## Example
//!
//! ```rust,no_run
//! use codec::{Operation, OpCode, KvRecord};
//! use wal::{WalWriter, WalReader};
//!
//! let w = WalWriter::create("wal.log", true, false).unwrap();
//! w.append(&Operation {
//!     op_code: OpCode::Put,
//!     column_family: "default".to_string(),
//!     kv: KvRecord { key: b"hello".to_vec(), value: b"world".to_vec(), seq: 1, ttl: -1 },
//! }).unwrap();
//! drop(w);
//!
//! let mut r = WalReader::open("wal.log").unwrap();
//! r.replay(|op| println!("{:?}", op)).unwrap();
//! ```

use std::path::Path;
use std::sync::Mutex;

use codec::Operation;
use pager::Pager;
use thiserror::Error;

pub use codec::Operation as WalRecord;

/// Errors that can occur during WAL operations.
#[derive(Debug, Error)]
pub enum WalError {
    /// An underlying pager (I/O, CRC) error.
    #[error("pager error: {0}")]
    Pager(#[from] pager::PagerError),

    /// An operation failed to encode or decode.
    #[error("codec error: {0}")]
    Codec(#[from] codec::CodecError),
}

/// Append-only WAL writer.
///
/// Wraps a [`pager::Pager`] behind a `Mutex` so `append` takes `&self` and
/// can be shared (e.g. `Arc<WalWriter>`) between the engine's write path
/// and a background flush worker without an outer lock.
pub struct WalWriter {
    pager: Mutex<Pager>,
    compressed: bool,
}

impl WalWriter {
    /// Opens (or creates) a WAL file.
    ///
    /// * `path` - file system path for the WAL.
    /// * `sync` - if true, every `append` is followed by `fsync`.
    /// * `compressed` - if true, every operation is LZ4-compressed before
    ///   being written.
    pub fn create<P: AsRef<Path>>(path: P, sync: bool, compressed: bool) -> Result<Self, WalError> {
        let pager = Pager::open(path, sync)?;
        Ok(Self {
            pager: Mutex::new(pager),
            compressed,
        })
    }

    /// Serializes `op` and appends it as a new WAL page.
    pub fn append(&self, op: &Operation) -> Result<u64, WalError> {
        let bytes = codec::serialize_operation(op, self.compressed)?;
        let mut pager = self.pager.lock().expect("wal pager mutex poisoned");
        let page_no = pager.write(&bytes)?;
        Ok(page_no)
    }

    /// Forces all buffered data to be written to disk via `fsync`.
    ///
    /// Useful when the writer was opened with `sync = false` and the
    /// caller wants to guarantee durability at a specific point (e.g.
    /// before acknowledging a batch).
    pub fn sync_to_disk(&self) -> Result<(), WalError> {
        let mut pager = self.pager.lock().expect("wal pager mutex poisoned");
        pager.sync_all()?;
        Ok(())
    }

    /// Truncates the WAL to its first `checkpoint` pages, discarding the
    /// rest. Called after a flush has durably written every page up to
    /// `checkpoint` into an SSTable.
    pub fn truncate(&self, checkpoint: u64) -> Result<(), WalError> {
        let mut pager = self.pager.lock().expect("wal pager mutex poisoned");
        pager.truncate(checkpoint)?;
        Ok(())
    }

    /// Number of operations currently recorded in the WAL.
    pub fn pages_count(&self) -> u64 {
        let pager = self.pager.lock().expect("wal pager mutex poisoned");
        pager.pages_count()
    }
}

/// Sequential WAL reader that yields operations for replay.
pub struct WalReader {
    pager: Pager,
}

impl WalReader {
    /// Opens an existing WAL file for sequential replay.
    ///
    /// Returns `WalError::Pager(PagerError::Io(_))` with
    /// `ErrorKind::NotFound` if the WAL file does not exist yet — callers
    /// doing crash recovery treat that as "nothing to replay" rather than
    /// a hard failure.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, WalError> {
        // sync is irrelevant for a read-only replay pass.
        let pager = Pager::open_existing(path, false)?;
        Ok(Self { pager })
    }

    /// Replays every operation in the WAL, calling `apply` for each one in
    /// append order.
    ///
    /// A CRC mismatch on a complete page surfaces as `WalError::Pager`; a
    /// torn trailing page never reaches here at all, since the pager's own
    /// `open` scan already excludes it from `pages_count`.
    pub fn replay<F>(&mut self, mut apply: F) -> Result<(), WalError>
    where
        F: FnMut(Operation),
    {
        let mut cursor = self.pager.cursor_init();
        while cursor.next() {
            if let Some(bytes) = cursor.get(&mut self.pager)? {
                let op = codec::deserialize_operation(&bytes)?;
                apply(op);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests;
