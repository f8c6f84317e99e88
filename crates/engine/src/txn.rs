//! Single-column-family transaction: a staged, ordered op buffer with commit
//! and rollback.
//!
//! `put`/`delete` only buffer; nothing touches the memtable or WAL until
//! [`Database::commit`]. A staged delete snapshots the key's current live
//! value *at the moment `delete` is called* — not at commit time — so
//! [`Database::rollback`] can restore exactly what was there before the
//! transaction touched it, even if an intervening staged op in the same
//! transaction already overwrote it.
//!
//! Cross-column-family and multi-transaction atomicity are out of scope:
//! each transaction is scoped to the single column family it began against.

use std::sync::Arc;

use codec::{KvRecord, OpCode, Operation};

use crate::catalog::ColumnFamily;
use crate::error::{EngineError, Result};
use crate::read::get_from_cf;
use crate::Database;

enum StagedOp {
    Put { key: Vec<u8>, value: Vec<u8>, ttl: i64 },
    Delete { key: Vec<u8>, prior: Option<Vec<u8>> },
}

struct AppliedOp {
    op: StagedOp,
    committed: bool,
}

/// An ordered buffer of staged operations against one column family.
pub struct Transaction {
    cf: Arc<ColumnFamily>,
    cf_name: String,
    ops: Vec<AppliedOp>,
    finished: bool,
}

impl Transaction {
    pub(crate) fn new(cf_name: String, cf: Arc<ColumnFamily>) -> Self {
        Self {
            cf,
            cf_name,
            ops: Vec::new(),
            finished: false,
        }
    }

    /// The column family this transaction is scoped to.
    #[must_use]
    pub fn column_family(&self) -> &str {
        &self.cf_name
    }

    /// Stages an insert. Carries no rollback payload of its own: undoing a
    /// PUT, committed or not, is always just removing the key.
    pub fn put(&mut self, key: Vec<u8>, value: Vec<u8>, ttl: i64) {
        self.ops.push(AppliedOp {
            op: StagedOp::Put { key, value, ttl },
            committed: false,
        });
    }

    /// Stages a delete, snapshotting the key's current live value right now
    /// so a later `rollback` can restore it even after `commit`.
    pub fn delete(&mut self, key: Vec<u8>) {
        let prior = get_from_cf(&self.cf, &key).ok();
        self.ops.push(AppliedOp {
            op: StagedOp::Delete { key, prior },
            committed: false,
        });
    }
}

impl Database {
    /// Begins a transaction scoped to `cf_name`.
    pub fn begin(&self, cf_name: &str) -> Result<Transaction> {
        let cf = self.find_cf(cf_name)?;
        Ok(Transaction::new(cf_name.to_string(), cf))
    }

    /// Applies every staged, not-yet-committed op in `txn` under a single
    /// hold of the column family's memtable write lock, journaling each to
    /// the WAL exactly as a standalone `put`/`delete` would. Checks the
    /// flush threshold once, after the whole batch has landed.
    ///
    /// Calling `commit` again on an already-finished transaction fails with
    /// [`EngineError::TransactionFinished`]; already-committed ops are
    /// skipped rather than re-applied, so a transaction can be committed
    /// again after staging more ops without redoing earlier ones.
    pub fn commit(&self, txn: &mut Transaction) -> Result<()> {
        if txn.finished {
            return Err(EngineError::TransactionFinished);
        }

        let cf = Arc::clone(&txn.cf);
        let mut mem = cf.memtable.write().expect("memtable lock poisoned");
        for applied in &mut txn.ops {
            if applied.committed {
                continue;
            }
            let seq = self.next_seq();
            match &applied.op {
                StagedOp::Put { key, value, ttl } => {
                    self.wal.append(&Operation {
                        op_code: OpCode::Put,
                        column_family: txn.cf_name.clone(),
                        kv: KvRecord {
                            key: key.clone(),
                            value: value.clone(),
                            seq,
                            ttl: *ttl,
                        },
                    })?;
                    mem.put(key.clone(), value.clone(), seq, *ttl);
                }
                StagedOp::Delete { key, .. } => {
                    self.wal.append(&Operation {
                        op_code: OpCode::Delete,
                        column_family: txn.cf_name.clone(),
                        kv: KvRecord::tombstone(key.clone(), seq),
                    })?;
                    mem.delete(key.clone(), seq);
                }
            }
            applied.committed = true;
        }
        self.maybe_enqueue_flush(&cf, &mut mem);
        Ok(())
    }

    /// Undoes every committed op in `txn`, latest first: a committed PUT is
    /// undone by deleting the key, a committed DELETE by restoring the value
    /// snapshotted when that delete was staged (or deleting again, if the
    /// key did not exist at that point). Marks the transaction finished.
    pub fn rollback(&self, txn: &mut Transaction) -> Result<()> {
        if txn.finished {
            return Err(EngineError::TransactionFinished);
        }

        let cf = Arc::clone(&txn.cf);
        let mut mem = cf.memtable.write().expect("memtable lock poisoned");
        for applied in txn.ops.iter().rev() {
            if !applied.committed {
                continue;
            }
            let seq = self.next_seq();
            match &applied.op {
                StagedOp::Put { key, .. } => {
                    self.wal.append(&Operation {
                        op_code: OpCode::Delete,
                        column_family: txn.cf_name.clone(),
                        kv: KvRecord::tombstone(key.clone(), seq),
                    })?;
                    mem.delete(key.clone(), seq);
                }
                StagedOp::Delete { key, prior: Some(value) } => {
                    self.wal.append(&Operation {
                        op_code: OpCode::Put,
                        column_family: txn.cf_name.clone(),
                        kv: KvRecord {
                            key: key.clone(),
                            value: value.clone(),
                            seq,
                            ttl: -1,
                        },
                    })?;
                    mem.put(key.clone(), value.clone(), seq, -1);
                }
                StagedOp::Delete { key, prior: None } => {
                    self.wal.append(&Operation {
                        op_code: OpCode::Delete,
                        column_family: txn.cf_name.clone(),
                        kv: KvRecord::tombstone(key.clone(), seq),
                    })?;
                    mem.delete(key.clone(), seq);
                }
            }
        }
        txn.finished = true;
        Ok(())
    }
}

#[cfg(test)]
#[path = "tests/txn_tests.rs"]
mod tests;
