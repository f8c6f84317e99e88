//! Column-family catalog: on-disk layout, creation, loading, and removal.
//!
//! Each column family lives in its own subdirectory of the database path,
//! named after the column family itself:
//!
//! ```text
//! <db_path>/<cf_name>/<cf_name>.cfc     — serialized config::ColumnFamilyConfig
//! <db_path>/<cf_name>/sstable_<u64>.sst — zero or more SSTables
//! ```
//!
//! `<cf_name>.cfc` holds the codec-serialized [`config::ColumnFamilyConfig`]
//! rather than the line-oriented text manifest this engine's ancestor used —
//! the config never changes after creation, so there is nothing to rewrite
//! atomically once it's written once.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;
use std::time::{SystemTime, UNIX_EPOCH};

use config::ColumnFamilyConfig;
use memtable::Memtable;
use sstable::SSTableReader;

use crate::error::{EngineError, Result};

/// A single column family's runtime state: its immutable config, its
/// in-memory write buffer, and its list of immutable on-disk SSTables
/// ordered oldest-to-newest.
pub struct ColumnFamily {
    config: ColumnFamilyConfig,
    dir_path: PathBuf,
    pub(crate) memtable: RwLock<Memtable>,
    /// Oldest-to-newest; the last element is the newest SSTable.
    pub(crate) sstables: RwLock<Vec<SSTableReader>>,
    id_gen: AtomicU64,
}

impl ColumnFamily {
    /// The column family's validated, immutable configuration.
    #[must_use]
    pub fn config(&self) -> &ColumnFamilyConfig {
        &self.config
    }

    /// The column family's name (shorthand for `config().name()`).
    #[must_use]
    pub fn name(&self) -> &str {
        self.config.name()
    }

    /// The directory this column family's files live under.
    #[must_use]
    pub fn dir_path(&self) -> &Path {
        &self.dir_path
    }

    /// Number of SSTables currently on disk for this column family.
    #[must_use]
    pub fn sstable_count(&self) -> usize {
        self.sstables.read().expect("sstables lock poisoned").len()
    }

    /// Allocates the next monotonic id for this column family's next SSTable
    /// filename, e.g. `sstable_<id>.sst`.
    pub(crate) fn next_sstable_id(&self) -> u64 {
        self.id_gen.fetch_add(1, Ordering::SeqCst)
    }

    fn cfc_path(db_path: &Path, name: &str) -> PathBuf {
        db_path.join(name).join(format!("{name}.cfc"))
    }
}

const SEED_EPOCH_FALLBACK: u64 = 1;

fn now_epoch_seconds() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(SEED_EPOCH_FALLBACK)
}

/// Loads every column family found under `db_path` (one subdirectory per
/// column family, each holding a `<name>.cfc` file).
///
/// Directory entries that are not a directory, or that are a directory
/// without a matching `.cfc` file, are silently skipped — they are not
/// column families this catalog recognizes.
pub fn load_all(db_path: &Path) -> Result<Vec<ColumnFamily>> {
    let mut out = Vec::new();
    if !db_path.exists() {
        return Ok(out);
    }

    for entry in fs::read_dir(db_path)? {
        let entry = entry?;
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let cfc_path = ColumnFamily::cfc_path(db_path, name);
        if !cfc_path.exists() {
            continue;
        }

        let bytes = fs::read(&cfc_path)?;
        let config = codec::deserialize_column_family_config(&bytes)?;
        let sstables = load_sstables(&path)?;

        out.push(ColumnFamily {
            config,
            dir_path: path,
            memtable: RwLock::new(Memtable::new()),
            sstables: RwLock::new(sstables),
            id_gen: AtomicU64::new(now_epoch_seconds()),
        });
    }

    Ok(out)
}

/// Scans `dir` for `*.sst` files, opens each as an [`SSTableReader`], and
/// returns them sorted by file modification time ascending (oldest first,
/// matching the runtime invariant that the last element is newest).
fn load_sstables(dir: &Path) -> Result<Vec<SSTableReader>> {
    let mut dated: Vec<(SystemTime, PathBuf)> = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("sst") {
            continue;
        }
        let mtime = entry.metadata()?.modified()?;
        dated.push((mtime, path));
    }
    dated.sort_by_key(|(mtime, _)| *mtime);

    dated
        .into_iter()
        .map(|(_, path)| SSTableReader::open(&path).map_err(EngineError::from))
        .collect()
}

/// Validates `cfg` and creates a new column family under `db_path`.
///
/// Creates `<db_path>/<name>/`, writes `<name>/<name>.cfc`, and returns the
/// empty runtime column family. Fails with [`EngineError::CfExists`] if the
/// directory already exists.
pub fn create(
    db_path: &Path,
    name: &str,
    flush_threshold: u32,
    max_level: i32,
    probability: f32,
    compressed: bool,
) -> Result<ColumnFamily> {
    let config = ColumnFamilyConfig::new(name, flush_threshold, max_level, probability, compressed)?;

    let dir_path = db_path.join(name);
    if dir_path.exists() {
        return Err(EngineError::CfExists(name.to_string()));
    }
    fs::create_dir_all(&dir_path).map_err(|source| EngineError::DirCreateFailed {
        path: dir_path.display().to_string(),
        source,
    })?;

    let bytes = codec::serialize_column_family_config(&config, false)?;
    fs::write(ColumnFamily::cfc_path(db_path, name), bytes)?;

    Ok(ColumnFamily {
        config,
        dir_path,
        memtable: RwLock::new(Memtable::new()),
        sstables: RwLock::new(Vec::new()),
        id_gen: AtomicU64::new(now_epoch_seconds()),
    })
}

/// Removes a column family's entire directory from disk.
///
/// The directory is removed before the `PathBuf` referencing it is dropped,
/// so there is no window where the path outlives the data it names.
pub fn drop_column_family(cf: &ColumnFamily) -> Result<()> {
    let path = cf.dir_path().to_path_buf();
    fs::remove_dir_all(&path)?;
    drop(path);
    Ok(())
}
