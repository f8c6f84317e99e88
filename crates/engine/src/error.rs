//! Unified error type for the storage engine's public surface.
//!
//! Every public entry point returns `Result<T, EngineError>`. Each variant
//! carries a stable numeric code (`EngineError::code`) grouped by the
//! taxonomy's six kinds (argument, resource, state, data, lookup,
//! lifecycle) so that callers across a language boundary (the CLI, or any
//! future binding) can match on a code instead of a string.

use thiserror::Error;

/// Errors surfaced by [`crate::Database`] and its collaborators.
#[derive(Debug, Error)]
pub enum EngineError {
    // ---- Argument errors (1xx) ----
    /// A key or value argument was empty where a non-empty byte string is required.
    #[error("argument must not be empty")]
    NullArg,
    /// Column-family configuration rejected by `config::ColumnFamilyConfig::new`.
    #[error("invalid column family config: {0}")]
    InvalidConfig(#[from] config::ConfigError),
    /// `compact` was asked to use zero worker threads.
    #[error("max_threads must be >= 1")]
    ThreadsTooLow,

    // ---- Resource errors (2xx) ----
    /// A column-family directory could not be created.
    #[error("failed to create directory {path}: {source}")]
    DirCreateFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// Any other I/O failure (file open, read, write, rename, remove).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // ---- State errors (3xx) ----
    /// No column family with the given name exists.
    #[error("column family not found: {0}")]
    CfNotFound(String),
    /// A column family with the given name already exists.
    #[error("column family already exists: {0}")]
    CfExists(String),
    /// `compact` was called with fewer than two SSTables present.
    #[error("not enough sstables to compact (have {0}, need >= 2)")]
    NotEnoughSstablesToCompact(usize),
    /// A transaction was committed or rolled back twice, or committed after rollback.
    #[error("transaction already finished")]
    TransactionFinished,

    // ---- Data errors (4xx) ----
    /// Failed to serialize a record for WAL or SSTable storage.
    #[error("serialization failed: {0}")]
    Codec(#[from] codec::CodecError),
    /// A lower-level WAL failure (pager I/O, CRC mismatch, corrupt frame).
    #[error("wal error: {0}")]
    Wal(#[from] wal::WalError),
    /// A lower-level SSTable failure (pager I/O, CRC mismatch, malformed index).
    #[error("sstable error: {0}")]
    Sstable(#[from] sstable::SstError),

    // ---- Lookup errors (5xx) ----
    /// The key does not exist, was deleted, or has expired.
    #[error("key not found")]
    KeyNotFound,
    /// Cursor-only: the key at the cursor's current position is a tombstone.
    #[error("key is tombstoned")]
    KeyTombstoned,
    /// Cursor-only: the key at the cursor's current position has expired.
    #[error("key has expired")]
    KeyExpired,
    /// A cursor was advanced past the first entry.
    #[error("cursor is at start")]
    AtStartOfCursor,
    /// A cursor was advanced past the last entry.
    #[error("cursor is at end")]
    AtEndOfCursor,

    // ---- Lifecycle errors (6xx) ----
    /// The background flush worker's thread failed to start.
    #[error("failed to spawn flush worker thread")]
    ThreadSpawnFailed,
    /// WAL replay on open failed for a reason other than "file absent".
    #[error("wal replay failed: {0}")]
    WalReplayFailed(wal::WalError),
}

impl EngineError {
    /// A stable numeric code for this error, grouped by kind:
    /// 1xx argument, 2xx resource, 3xx state, 4xx data, 5xx lookup, 6xx lifecycle.
    #[must_use]
    pub fn code(&self) -> u32 {
        match self {
            EngineError::NullArg => 100,
            EngineError::InvalidConfig(_) => 101,
            EngineError::ThreadsTooLow => 102,
            EngineError::DirCreateFailed { .. } => 200,
            EngineError::Io(_) => 201,
            EngineError::CfNotFound(_) => 300,
            EngineError::CfExists(_) => 301,
            EngineError::NotEnoughSstablesToCompact(_) => 302,
            EngineError::TransactionFinished => 303,
            EngineError::Codec(_) => 400,
            EngineError::Wal(_) => 401,
            EngineError::Sstable(_) => 402,
            EngineError::KeyNotFound => 500,
            EngineError::KeyTombstoned => 501,
            EngineError::KeyExpired => 502,
            EngineError::AtStartOfCursor => 503,
            EngineError::AtEndOfCursor => 504,
            EngineError::ThreadSpawnFailed => 600,
            EngineError::WalReplayFailed(_) => 601,
        }
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
