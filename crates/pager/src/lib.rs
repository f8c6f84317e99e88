//! # Pager
//!
//! A fixed-page, append-only file store. Every higher layer in RiptideKV
//! (the WAL, SSTable data/bloom/index sections) is a sequence of *pages*
//! written to one file; the pager is what turns a raw [`std::fs::File`]
//! into that abstraction.
//!
//! A "page" here is a logical unit, not a fixed byte size: `write` always
//! consumes exactly one page regardless of the payload length. Each page is
//! framed on disk as:
//!
//! ```text
//! [len: u32 LE][crc32: u32 LE][payload: len bytes]
//! ```
//!
//! The pager keeps an in-memory index of page offsets so random reads and
//! truncation are O(1) / O(pages truncated) rather than requiring a
//! sequential scan on every call.
//!
//! ## Example
//!
//! ```rust,no_run
//! use pager::Pager;
//!
//! let mut p = Pager::open("data.page", false).unwrap();
//! let page_no = p.write(b"hello").unwrap();
//! assert_eq!(p.read(page_no).unwrap(), b"hello");
//! ```

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use crc32fast::Hasher as Crc32;
use std::fs::{File, OpenOptions};
use std::io::{self, BufReader, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Errors that can occur during pager operations.
#[derive(Debug, Error)]
pub enum PagerError {
    /// An underlying I/O error.
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    /// A page frame failed CRC validation.
    #[error("corrupt page at offset {0}")]
    Corrupt(u64),

    /// A page number was requested that does not exist.
    #[error("page {0} out of range ({1} pages present)")]
    OutOfRange(u64, u64),
}

/// Result alias for pager operations.
pub type Result<T> = std::result::Result<T, PagerError>;

/// Frame header size: `len(u32) + crc32(u32)`.
const FRAME_HEADER_BYTES: u64 = 8;

/// A fixed-page append-only file store.
///
/// Keeps a persistent file handle and an in-memory index mapping each page
/// number to its byte offset in the file, built by scanning the file once on
/// [`open`](Pager::open). Subsequent reads and writes update the index
/// incrementally.
pub struct Pager {
    path: PathBuf,
    file: File,
    /// Byte offset of each page's frame header, in page-number order.
    offsets: Vec<u64>,
    sync: bool,
}

impl Pager {
    /// Opens (or creates) a pager file at `path`.
    ///
    /// Scans the existing file, if any, to rebuild the page offset index. A
    /// truncated trailing frame (a crash mid-write) is treated as the clean
    /// end of the file — pages before it are kept.
    ///
    /// If `sync` is `true`, every [`write`](Pager::write) is followed by an
    /// `fsync`.
    pub fn open<P: AsRef<Path>>(path: P, sync: bool) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&path)?;

        let offsets = Self::scan_offsets(&path)?;

        Ok(Self {
            path,
            file,
            offsets,
            sync,
        })
    }

    /// Opens a pager file at `path`, failing with [`PagerError::Io`]
    /// (`ErrorKind::NotFound`) rather than creating it if it does not
    /// already exist. Used by read-only replay paths that need to tell
    /// "nothing to replay yet" apart from "something is actually broken".
    pub fn open_existing<P: AsRef<Path>>(path: P, sync: bool) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new().read(true).append(true).open(&path)?;
        let offsets = Self::scan_offsets(&path)?;

        Ok(Self {
            path,
            file,
            offsets,
            sync,
        })
    }

    /// Scans `path` from the start, recording the byte offset of each valid
    /// page frame. Stops (without error) at the first truncated or corrupt
    /// trailing frame, since that is the expected shape of a crash mid-write.
    fn scan_offsets(path: &Path) -> Result<Vec<u64>> {
        let file = match File::open(path) {
            Ok(f) => f,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let mut reader = BufReader::new(file);
        let mut offsets = Vec::new();
        let mut pos: u64 = 0;

        loop {
            let len = match reader.read_u32::<LittleEndian>() {
                Ok(v) => v,
                Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => break,
                Err(e) => return Err(e.into()),
            };
            let _crc = match reader.read_u32::<LittleEndian>() {
                Ok(v) => v,
                Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => break,
                Err(e) => return Err(e.into()),
            };
            let mut payload = vec![0u8; len as usize];
            match reader.read_exact(&mut payload) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => break,
                Err(e) => return Err(e.into()),
            }

            offsets.push(pos);
            pos += FRAME_HEADER_BYTES + len as u64;
        }

        Ok(offsets)
    }

    /// Writes `payload` as a new page, appended after the last existing page.
    ///
    /// Returns the new page's number (0-indexed).
    pub fn write(&mut self, payload: &[u8]) -> Result<u64> {
        let mut hasher = Crc32::new();
        hasher.update(payload);
        let crc = hasher.finalize();

        let pos = self.file.stream_position()?;

        self.file.write_u32::<LittleEndian>(payload.len() as u32)?;
        self.file.write_u32::<LittleEndian>(crc)?;
        self.file.write_all(payload)?;
        self.file.flush()?;
        if self.sync {
            self.file.sync_all()?;
        }

        let page_no = self.offsets.len() as u64;
        self.offsets.push(pos);
        Ok(page_no)
    }

    /// Reads the payload of `page_no`.
    pub fn read(&mut self, page_no: u64) -> Result<Vec<u8>> {
        let offset = *self
            .offsets
            .get(page_no as usize)
            .ok_or(PagerError::OutOfRange(page_no, self.offsets.len() as u64))?;

        self.file.seek(SeekFrom::Start(offset))?;
        let len = self.file.read_u32::<LittleEndian>()?;
        let crc = self.file.read_u32::<LittleEndian>()?;
        let mut payload = vec![0u8; len as usize];
        self.file.read_exact(&mut payload)?;

        let mut hasher = Crc32::new();
        hasher.update(&payload);
        if hasher.finalize() != crc {
            return Err(PagerError::Corrupt(offset));
        }

        Ok(payload)
    }

    /// Returns the number of pages currently present.
    #[must_use]
    pub fn pages_count(&self) -> u64 {
        self.offsets.len() as u64
    }

    /// Alias for [`pages_count`](Pager::pages_count); the "current page
    /// count as checkpoint" accessor named in the pager contract.
    #[must_use]
    pub fn size(&self) -> u64 {
        self.pages_count()
    }

    /// Alias for [`pages_count`](Pager::pages_count).
    #[must_use]
    pub fn num_pages(&self) -> u64 {
        self.pages_count()
    }

    /// Returns the path this pager was opened with.
    #[must_use]
    pub fn filename(&self) -> &Path {
        &self.path
    }

    /// Truncates the file to contain only the first `checkpoint` pages.
    ///
    /// `checkpoint` may equal [`pages_count`](Pager::pages_count) (no-op) or
    /// `0` (empty the file). Pages beyond the checkpoint are dropped from
    /// both the file and the in-memory index.
    pub fn truncate(&mut self, checkpoint: u64) -> Result<()> {
        let checkpoint = checkpoint as usize;
        if checkpoint >= self.offsets.len() {
            return Ok(());
        }

        let byte_len = self.offsets[checkpoint];
        self.file.set_len(byte_len)?;
        self.file.seek(SeekFrom::Start(byte_len))?;
        self.offsets.truncate(checkpoint);
        Ok(())
    }

    /// Initializes a forward/backward cursor over this pager's pages,
    /// starting before the first page.
    #[must_use]
    pub fn cursor_init(&self) -> PageCursor {
        PageCursor {
            pos: None,
            len: self.offsets.len() as u64,
        }
    }

    /// Forces all written pages to durable storage via `fsync`, regardless
    /// of whether this pager was opened with `sync = true`.
    pub fn sync_all(&mut self) -> Result<()> {
        self.file.sync_all()?;
        Ok(())
    }

    /// Closes the pager. Equivalent to dropping it; provided for symmetry
    /// with the pager contract's explicit `close` operation.
    pub fn close(self) {
        drop(self);
    }
}

/// A forward/backward cursor over a pager's page numbers.
///
/// The cursor tracks only a position; callers use [`PageCursor::get`] with a
/// `&mut Pager` to fetch the payload at the current position.
#[derive(Debug, Clone, Copy)]
pub struct PageCursor {
    /// Current page number, or `None` before the first / after the last page.
    pos: Option<u64>,
    len: u64,
}

impl PageCursor {
    /// Advances to the next page. Returns `false` if already past the end.
    pub fn next(&mut self) -> bool {
        let next = match self.pos {
            None => 0,
            Some(p) => p + 1,
        };
        if next >= self.len {
            self.pos = Some(self.len);
            return false;
        }
        self.pos = Some(next);
        true
    }

    /// Moves to the previous page. Returns `false` if already before the start.
    ///
    /// From the past-the-end sentinel position this steps back onto the
    /// last valid page, same as from any other position.
    pub fn prev(&mut self) -> bool {
        match self.pos {
            None => false,
            Some(0) => {
                self.pos = None;
                false
            }
            Some(p) => {
                self.pos = Some(p - 1);
                true
            }
        }
    }

    /// Returns the page number the cursor currently points at, if any.
    #[must_use]
    pub fn current(&self) -> Option<u64> {
        self.pos.filter(|&p| p < self.len)
    }

    /// Reads the payload at the current position via `pager`.
    pub fn get(&self, pager: &mut Pager) -> Result<Option<Vec<u8>>> {
        match self.current() {
            Some(p) => pager.read(p).map(Some),
            None => Ok(None),
        }
    }

    /// Releases the cursor. Provided for symmetry with the pager contract's
    /// explicit `free` operation; a no-op beyond dropping.
    pub fn free(self) {
        drop(self);
    }
}

#[cfg(test)]
mod tests;
