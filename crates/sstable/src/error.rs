use thiserror::Error;

/// Errors raised while writing, reading, or merging SSTable files.
#[derive(Debug, Error)]
pub enum SstError {
    /// An underlying pager (I/O, CRC) error.
    #[error("pager error: {0}")]
    Pager(#[from] pager::PagerError),

    /// A record failed to encode or decode.
    #[error("codec error: {0}")]
    Codec(#[from] codec::CodecError),

    /// An underlying I/O error (temp-file rename, directory fsync).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// `write_from_memtable`/`write_from_iterator` was given zero entries.
    #[error("refusing to write an empty SSTable")]
    EmptyInput,

    /// A freshly opened SSTable has no pages at all.
    #[error("sstable file has no pages")]
    Empty,

    /// The index pointed at a page whose key did not match the lookup key.
    #[error("index pointed to mismatching key at page {0}")]
    IndexMismatch(u64),
}
