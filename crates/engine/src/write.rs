//! Write path: `put`, `delete`, and the flush-threshold check shared by both.
//!
//! Every mutation is appended to the WAL first, then applied to the target
//! column family's memtable. When that memtable crosses its configured
//! flush threshold, its entries are handed to the background flush worker
//! (see [`crate::flush`]) and the live memtable is swapped for an empty one
//! before the call returns — the actual SSTable write happens off this
//! thread.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use codec::{KvRecord, OpCode, Operation};
use memtable::Memtable;

use crate::catalog::ColumnFamily;
use crate::error::{EngineError, Result};
use crate::flush::{self, FlushJob};
use crate::Database;

impl Database {
    /// Inserts `key` -> `value` into `cf_name`, durable once this returns.
    ///
    /// `ttl` is an absolute epoch-second deadline, or `-1` for no expiry.
    pub fn put(&self, cf_name: &str, key: Vec<u8>, value: Vec<u8>, ttl: i64) -> Result<()> {
        if key.is_empty() {
            return Err(EngineError::NullArg);
        }
        let cf = self.find_cf(cf_name)?;
        let seq = self.next_seq();
        let kv = KvRecord { key, value, seq, ttl };

        self.wal.append(&Operation {
            op_code: OpCode::Put,
            column_family: cf_name.to_string(),
            kv: kv.clone(),
        })?;

        let mut mem = cf.memtable.write().expect("memtable lock poisoned");
        mem.put(kv.key, kv.value, kv.seq, kv.ttl);
        self.maybe_enqueue_flush(&cf, &mut mem);
        Ok(())
    }

    /// Deletes `key` from `cf_name` by writing a tombstone.
    pub fn delete(&self, cf_name: &str, key: Vec<u8>) -> Result<()> {
        if key.is_empty() {
            return Err(EngineError::NullArg);
        }
        let cf = self.find_cf(cf_name)?;
        let seq = self.next_seq();

        self.wal.append(&Operation {
            op_code: OpCode::Delete,
            column_family: cf_name.to_string(),
            kv: KvRecord::tombstone(key.clone(), seq),
        })?;

        let mut mem = cf.memtable.write().expect("memtable lock poisoned");
        mem.delete(key, seq);
        self.maybe_enqueue_flush(&cf, &mut mem);
        Ok(())
    }

    /// Forces a flush of `cf_name`'s memtable regardless of its current
    /// size, run inline rather than handed to the background worker — once
    /// this returns, the data is in an SSTable. A no-op if the memtable is
    /// empty. Internal only: not part of the engine's public surface, used
    /// by tests and maintenance tooling that need a deterministic flush.
    pub(crate) fn force_flush(&self, cf_name: &str) -> Result<()> {
        let cf = self.find_cf(cf_name)?;
        let mut mem = cf.memtable.write().expect("memtable lock poisoned");
        if mem.is_empty() {
            return Ok(());
        }
        let checkpoint = self.wal.pages_count();
        let snapshot = mem.take();
        drop(mem);
        flush::run_now(
            FlushJob {
                cf: Arc::clone(&cf),
                snapshot,
                checkpoint,
            },
            &self.wal,
        );
        Ok(())
    }

    /// Allocates the next write sequence number.
    pub(crate) fn next_seq(&self) -> u64 {
        self.seq.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Enqueues a flush for `cf` if `mem` has crossed its configured
    /// threshold. Shared with [`crate::txn`], whose `commit` applies the
    /// same check after a batch of staged ops lands in the memtable.
    pub(crate) fn maybe_enqueue_flush(&self, cf: &Arc<ColumnFamily>, mem: &mut Memtable) {
        if mem.approx_size() >= cf.config().flush_threshold() as usize {
            self.enqueue_flush(cf, mem);
        }
    }

    /// Snapshots `mem` (swapping in an empty one) and enqueues it for the
    /// background flush worker, recording the current WAL page count as the
    /// checkpoint the worker will truncate back to once the SSTable lands.
    fn enqueue_flush(&self, cf: &Arc<ColumnFamily>, mem: &mut Memtable) {
        let checkpoint = self.wal.pages_count();
        let snapshot = mem.take();
        self.flush.enqueue(FlushJob {
            cf: Arc::clone(cf),
            snapshot,
            checkpoint,
        });
    }
}

#[cfg(test)]
#[path = "tests/write_tests.rs"]
mod tests;
