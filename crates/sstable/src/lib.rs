//! # SSTable - Sorted String Table
//!
//! Immutable, on-disk storage files for the storage engine.
//!
//! When the in-memory [`memtable::Memtable`] exceeds its size threshold the
//! engine flushes it to disk as an SSTable. SSTables are *write-once,
//! read-many* — once created they are never modified (only replaced during
//! compaction).
//!
//! ## File layout
//!
//! An SSTable is a sequence of [`pager::Pager`] pages:
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │ DATA PAGES — one codec::KvRecord per page, ascending key order │
//! ├───────────────────────────────────────────────────────────────┤
//! │ BLOOM PAGE — one serialized BloomFilter                        │
//! ├───────────────────────────────────────────────────────────────┤
//! │ INDEX PAGE (always the last page) — key -> data page_no map,   │
//! │ the bloom page's page_no, and the file's max sequence number    │
//! └───────────────────────────────────────────────────────────────┘
//! ```
//!
//! Because the index is always the file's last page, opening a reader never
//! needs a footer or magic number to find it: `pages_count() - 1` is the
//! index page by construction. Each page already carries its own CRC32 via
//! the pager, so there is no separate per-record checksum to maintain.

mod error;
mod format;
mod merge;
mod reader;
mod writer;

pub use error::SstError;
pub use merge::MergeIterator;
pub use reader::SSTableReader;
pub use writer::SSTableWriter;
