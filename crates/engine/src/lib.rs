//! # Engine — embedded LSM-tree storage engine
//!
//! The central orchestrator tying together the [`config`], [`memtable`],
//! [`wal`], and [`sstable`] crates into a multi-column-family key-value
//! store.
//!
//! ## Architecture
//!
//! ```text
//! Client
//!   |
//!   v
//! ┌─────────────────────────────────────────────────────┐
//! │                      DATABASE                       │
//! │                                                      │
//! │ write.rs → WAL append → column family's Memtable     │
//! │              |                                       │
//! │              |  (flush_threshold exceeded?)          │
//! │              |              yes                      │
//! │              v                                       │
//! │         flush.rs (background worker) → new SSTable   │
//! │                                                      │
//! │ read.rs  → Memtable → SSTables, newest first          │
//! │ cursor.rs → ordered traversal, same layering          │
//! │ txn.rs   → staged ops, single commit/rollback         │
//! │ compaction.rs → pairwise merge, multi-threaded        │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module responsibilities
//!
//! | Module       | Purpose                                                |
//! |--------------|---------------------------------------------------------|
//! | [`lib`]      | `Database` struct, `open`/`close`, column family management |
//! | [`catalog`]  | On-disk column family layout: create, load, drop         |
//! | [`recovery`] | WAL replay, `.sst.tmp` cleanup                            |
//! | [`write`]    | `put`, `delete`, `force_flush`                            |
//! | [`read`]     | `get`                                                     |
//! | [`flush`]    | Background flush worker                                   |
//! | [`compaction`] | Pairwise, multi-threaded SSTable merge                  |
//! | [`cursor`]   | Ordered bidirectional traversal                            |
//! | [`txn`]      | Staged single-column-family transactions                   |
//! | [`error`]    | `EngineError` taxonomy                                     |
//!
//! Each column family owns one memtable and one flat, oldest-to-newest list
//! of SSTables — there is no L0/L1 level split. All column families share a
//! single write-ahead log; every WAL record carries the name of the column
//! family it belongs to so replay can route it correctly.
//!
//! ## Crash safety
//!
//! Every write is appended to the WAL before the memtable update. The WAL is
//! only truncated after a flush's SSTable has been written and published.
//! SSTables are written atomically via temp file + rename; the catalog's
//! `.cfc` file is written once, at column family creation, and never
//! rewritten.

mod catalog;
mod compaction;
mod cursor;
mod error;
mod flush;
mod read;
mod recovery;
mod txn;
mod write;

pub use catalog::ColumnFamily;
pub use config::{ColumnFamilyConfig, DbConfig};
pub use cursor::Cursor;
pub use error::{EngineError, Result};
pub use txn::Transaction;

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use flush::FlushHandle;
use wal::WalWriter;

/// An open database: a shared WAL plus a set of independently managed
/// column families, each with its own memtable and SSTable list.
pub struct Database {
    db_path: PathBuf,
    compressed_wal: bool,
    column_families: RwLock<Vec<Arc<ColumnFamily>>>,
    wal: Arc<WalWriter>,
    flush: FlushHandle,
    seq: AtomicU64,
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self
            .column_families
            .read()
            .expect("column families lock poisoned")
            .iter()
            .map(|cf| cf.name())
            .collect();
        f.debug_struct("Database")
            .field("db_path", &self.db_path)
            .field("compressed_wal", &self.compressed_wal)
            .field("seq", &self.seq.load(Ordering::SeqCst))
            .field("column_families", &names)
            .finish()
    }
}

impl Database {
    /// Opens (or creates) a database at `config.db_path`.
    ///
    /// Recovery steps:
    /// 1. Create `db_path` if it does not exist.
    /// 2. Remove any leftover `.sst.tmp` files from interrupted flushes.
    /// 3. Load every column family's catalog entry and SSTable list.
    /// 4. Replay the shared WAL into each column family's memtable.
    /// 5. Open the WAL writer in append mode.
    /// 6. Seed the write-sequence counter from the highest sequence number
    ///    observed across the WAL replay and every loaded SSTable.
    /// 7. Spawn the background flush worker.
    pub fn open(config: DbConfig) -> Result<Self> {
        let db_path = PathBuf::from(&config.db_path);
        std::fs::create_dir_all(&db_path)?;

        recovery::cleanup_tmp_files(&db_path);

        let loaded = catalog::load_all(&db_path)?;
        let wal_path = db_path.join("wal");
        let wal_seq = recovery::replay_wal(&wal_path, &loaded)?;

        let max_sst_seq = loaded
            .iter()
            .map(|cf| {
                cf.sstables
                    .read()
                    .expect("sstables lock poisoned")
                    .iter()
                    .map(sstable::SSTableReader::max_seq)
                    .max()
                    .unwrap_or(0)
            })
            .max()
            .unwrap_or(0);

        let wal = Arc::new(WalWriter::create(&wal_path, true, config.compressed_wal)?);
        let flush = FlushHandle::spawn(Arc::clone(&wal));

        Ok(Self {
            db_path,
            compressed_wal: config.compressed_wal,
            column_families: RwLock::new(loaded.into_iter().map(Arc::new).collect()),
            wal,
            flush,
            seq: AtomicU64::new(wal_seq.max(max_sst_seq)),
        })
    }

    /// Closes the database: stops accepting new flush jobs, joins the
    /// background flush worker (draining whatever was already queued), and
    /// syncs the WAL to disk. Consumes `self`.
    pub fn close(self) -> Result<()> {
        drop(self.flush);
        self.wal.sync_to_disk()?;
        Ok(())
    }

    /// Creates a new column family named `name` with the given validated
    /// configuration parameters.
    #[allow(clippy::too_many_arguments)]
    pub fn create_column_family(
        &self,
        name: &str,
        flush_threshold: u32,
        max_level: i32,
        probability: f32,
        compressed: bool,
    ) -> Result<()> {
        let cf = catalog::create(&self.db_path, name, flush_threshold, max_level, probability, compressed)?;
        self.column_families
            .write()
            .expect("column families lock poisoned")
            .push(Arc::new(cf));
        Ok(())
    }

    /// Removes a column family and its entire on-disk directory.
    ///
    /// Fails with [`EngineError::CfNotFound`] if no such column family is
    /// currently open.
    pub fn drop_column_family(&self, name: &str) -> Result<()> {
        let mut guard = self.column_families.write().expect("column families lock poisoned");
        let pos = guard
            .iter()
            .position(|cf| cf.name() == name)
            .ok_or_else(|| EngineError::CfNotFound(name.to_string()))?;
        let cf = guard.remove(pos);
        catalog::drop_column_family(&cf)
    }

    /// Runs a pairwise compaction pass over `cf_name`'s SSTables, using up
    /// to `max_threads` worker threads.
    pub fn compact_sstables(&self, cf_name: &str, max_threads: usize) -> Result<()> {
        let cf = self.find_cf(cf_name)?;
        compaction::compact(&cf, max_threads)
    }

    /// Names of every currently open column family.
    #[must_use]
    pub fn column_family_names(&self) -> Vec<String> {
        self.column_families
            .read()
            .expect("column families lock poisoned")
            .iter()
            .map(|cf| cf.name().to_string())
            .collect()
    }

    /// Number of SSTables currently on disk for `cf_name`.
    pub fn sstable_count(&self, cf_name: &str) -> Result<usize> {
        Ok(self.find_cf(cf_name)?.sstable_count())
    }

    /// Current write-sequence counter (the sequence number assigned to the
    /// most recent write, across every column family).
    #[must_use]
    pub fn seq(&self) -> u64 {
        self.seq.load(Ordering::SeqCst)
    }

    fn find_cf(&self, name: &str) -> Result<Arc<ColumnFamily>> {
        self.column_families
            .read()
            .expect("column families lock poisoned")
            .iter()
            .find(|cf| cf.name() == name)
            .map(Arc::clone)
            .ok_or_else(|| EngineError::CfNotFound(name.to_string()))
    }
}

#[cfg(test)]
#[path = "tests/database_tests.rs"]
mod tests;
