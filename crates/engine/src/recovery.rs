//! WAL replay and cold-start cleanup.
//!
//! Handles the database's cold-start path: replaying the single shared WAL
//! into each column family's fresh memtable, routed by the operation's
//! `column_family` name, and removing `.sst.tmp` leftovers from interrupted
//! flushes across every column family directory.

use std::path::Path;

use codec::OpCode;
use pager::PagerError;
use wal::{WalError, WalReader};

use crate::catalog::ColumnFamily;
use crate::error::{EngineError, Result};

/// Replays the WAL at `wal_path`, applying each operation to the matching
/// column family's memtable by name.
///
/// If the WAL does not exist yet, this is a fresh start: returns `Ok(0)`.
/// If a record names a column family absent from `column_families` (a
/// catalog older than the WAL, or external tampering), replay stops
/// applying further records — the WAL file itself is read-only throughout,
/// so nothing about it changes; only the partially-replayed state is
/// surfaced via a warning.
///
/// Returns the highest sequence number observed across all replayed
/// records, for seeding the database's write-sequence counter.
pub fn replay_wal(wal_path: &Path, column_families: &[ColumnFamily]) -> Result<u64> {
    let mut reader = match WalReader::open(wal_path) {
        Ok(reader) => reader,
        Err(WalError::Pager(PagerError::Io(ref io_err)))
            if io_err.kind() == std::io::ErrorKind::NotFound =>
        {
            return Ok(0);
        }
        Err(e) => return Err(EngineError::WalReplayFailed(e)),
    };

    let mut max_seq = 0u64;
    let mut missing_cf: Option<String> = None;

    reader
        .replay(|op| {
            if missing_cf.is_some() {
                return;
            }
            let Some(cf) = column_families.iter().find(|cf| cf.name() == op.column_family) else {
                missing_cf = Some(op.column_family.clone());
                return;
            };

            let mut mem = cf.memtable.write().expect("memtable lock poisoned");
            match op.op_code {
                OpCode::Put => mem.put(op.kv.key, op.kv.value, op.kv.seq, op.kv.ttl),
                OpCode::Delete => mem.delete(op.kv.key, op.kv.seq),
            }
            max_seq = max_seq.max(op.kv.seq);
        })
        .map_err(EngineError::WalReplayFailed)?;

    if let Some(name) = missing_cf {
        tracing::warn!(cf = %name, "wal replay stopped at unknown column family");
    }

    Ok(max_seq)
}

/// Removes leftover `<cf>/*.sst.tmp` files from interrupted flushes, across
/// every column family directory directly under `db_path`.
pub fn cleanup_tmp_files(db_path: &Path) {
    let Ok(entries) = std::fs::read_dir(db_path) else {
        return;
    };
    for entry in entries.flatten() {
        let dir = entry.path();
        if !dir.is_dir() {
            continue;
        }
        let Ok(files) = std::fs::read_dir(&dir) else {
            continue;
        };
        for file in files.flatten() {
            let path = file.path();
            if path.extension().and_then(|e| e.to_str()) == Some("tmp") {
                let _ = std::fs::remove_file(&path);
            }
        }
    }
}

#[cfg(test)]
#[path = "tests/recovery_tests.rs"]
mod tests;
