//! Read path: `get`.
//!
//! Checks the memtable first (freshest data), then the column family's
//! SSTables from newest to oldest, stopping at the first one whose index
//! holds the key. A tombstone or an expired TTL at any layer is equivalent
//! to "not found"; the read path never distinguishes them (that distinction
//! exists only for [`crate::cursor::Cursor`]).

use std::time::{SystemTime, UNIX_EPOCH};

use crate::catalog::ColumnFamily;
use crate::error::{EngineError, Result};
use crate::Database;

pub(crate) fn now_epoch_seconds() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

pub(crate) fn is_expired(ttl: i64, now: i64) -> bool {
    ttl >= 0 && ttl <= now
}

/// Looks up `key` directly against a bound column family, memtable first
/// then SSTables newest to oldest. Shared by [`Database::get`] and
/// [`crate::txn::Transaction::delete`]'s rollback-value snapshot.
pub(crate) fn get_from_cf(cf: &ColumnFamily, key: &[u8]) -> Result<Vec<u8>> {
    let now = now_epoch_seconds();

    {
        let mem = cf.memtable.read().expect("memtable lock poisoned");
        if let Some(entry) = mem.get_entry(key) {
            if entry.is_tombstone() || is_expired(entry.ttl, now) {
                return Err(EngineError::KeyNotFound);
            }
            return Ok(entry.value.clone());
        }
    }

    let sstables = cf.sstables.read().expect("sstables lock poisoned");
    for sst in sstables.iter().rev() {
        if let Some(kv) = sst.get(key)? {
            if kv.is_tombstone() || is_expired(kv.ttl, now) {
                return Err(EngineError::KeyNotFound);
            }
            return Ok(kv.value);
        }
    }

    Err(EngineError::KeyNotFound)
}

impl Database {
    /// Looks up `key` in `cf_name`.
    ///
    /// Returns `Ok(value)` if a live, unexpired entry exists. Returns
    /// [`EngineError::KeyNotFound`] if the key is absent, was deleted, or
    /// has expired — standard `get` never distinguishes those cases, only
    /// [`crate::cursor::Cursor`] does.
    pub fn get(&self, cf_name: &str, key: &[u8]) -> Result<Vec<u8>> {
        let cf = self.find_cf(cf_name)?;
        get_from_cf(&cf, key)
    }
}

#[cfg(test)]
#[path = "tests/read_tests.rs"]
mod tests;
