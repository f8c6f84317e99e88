//! # Config
//!
//! Column-family configuration types for the RiptideKV storage engine.
//!
//! A [`ColumnFamilyConfig`] is validated once, at `create_column_family`
//! time, and is immutable for the lifetime of the column family: the flush
//! threshold, bloom false-positive probability, and compression setting
//! recorded here govern every memtable/SSTable the column family ever
//! produces.
//!
//! ## Example
//! ```rust
//! use config::ColumnFamilyConfig;
//!
//! let cfg = ColumnFamilyConfig::new("events", 1 << 20, 5, 0.1, false).unwrap();
//! assert_eq!(cfg.name(), "events");
//! ```

use thiserror::Error;

/// Minimum allowed column-family name length.
pub const MIN_NAME_LEN: usize = 2;
/// Minimum allowed flush threshold, in bytes (1 MiB).
pub const MIN_FLUSH_THRESHOLD: u32 = 1 << 20;
/// Minimum allowed `max_level` (compaction fan-in bound).
pub const MIN_MAX_LEVEL: i32 = 5;
/// Minimum allowed bloom filter false-positive probability.
pub const MIN_PROBABILITY: f32 = 0.1;

/// Errors raised while validating a [`ColumnFamilyConfig`].
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    /// Column-family name shorter than [`MIN_NAME_LEN`].
    #[error("column family name must be at least {MIN_NAME_LEN} characters")]
    NameTooShort,

    /// `flush_threshold` below [`MIN_FLUSH_THRESHOLD`].
    #[error("flush_threshold must be >= {MIN_FLUSH_THRESHOLD} bytes")]
    ThresholdTooLow,

    /// `max_level` below [`MIN_MAX_LEVEL`].
    #[error("max_level must be >= {MIN_MAX_LEVEL}")]
    LevelTooLow,

    /// `probability` below [`MIN_PROBABILITY`].
    #[error("probability must be >= {MIN_PROBABILITY}")]
    ProbabilityTooLow,
}

/// Validated, immutable per-column-family settings.
///
/// Constructed once via [`ColumnFamilyConfig::new`], which rejects anything
/// that would make the resulting column family unsafe or pathological
/// (a name too short to be meaningful, a flush threshold so small it would
/// thrash, a bloom filter with a near-useless false-positive rate).
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnFamilyConfig {
    name: String,
    flush_threshold: u32,
    max_level: i32,
    probability: f32,
    compressed: bool,
}

impl ColumnFamilyConfig {
    /// Validates and constructs a new column-family configuration.
    pub fn new(
        name: impl Into<String>,
        flush_threshold: u32,
        max_level: i32,
        probability: f32,
        compressed: bool,
    ) -> Result<Self, ConfigError> {
        let name = name.into();
        if name.chars().count() < MIN_NAME_LEN {
            return Err(ConfigError::NameTooShort);
        }
        if flush_threshold < MIN_FLUSH_THRESHOLD {
            return Err(ConfigError::ThresholdTooLow);
        }
        if max_level < MIN_MAX_LEVEL {
            return Err(ConfigError::LevelTooLow);
        }
        if probability < MIN_PROBABILITY {
            return Err(ConfigError::ProbabilityTooLow);
        }

        Ok(Self {
            name,
            flush_threshold,
            max_level,
            probability,
            compressed,
        })
    }

    /// The column family's name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Memtable size, in bytes, that triggers a flush to a new SSTable.
    #[must_use]
    pub fn flush_threshold(&self) -> u32 {
        self.flush_threshold
    }

    /// Upper bound on compaction fan-in for this column family.
    #[must_use]
    pub fn max_level(&self) -> i32 {
        self.max_level
    }

    /// Target false-positive rate for per-SSTable bloom filters.
    #[must_use]
    pub fn probability(&self) -> f32 {
        self.probability
    }

    /// Whether SSTable/WAL payloads for this column family are
    /// LZ4-compressed.
    #[must_use]
    pub fn compressed(&self) -> bool {
        self.compressed
    }
}

/// Top-level database configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct DbConfig {
    /// Root directory holding the WAL, manifest, and per-CF subdirectories.
    pub db_path: String,
    /// Whether the WAL itself is LZ4-compressed (independent of any
    /// individual column family's `compressed` setting).
    pub compressed_wal: bool,
}

impl DbConfig {
    /// Creates a new database configuration.
    #[must_use]
    pub fn new(db_path: impl Into<String>, compressed_wal: bool) -> Self {
        Self {
            db_path: db_path.into(),
            compressed_wal,
        }
    }
}
