//! # Codec
//!
//! Length-prefixed (de)serialization for everything RiptideKV writes to
//! disk: WAL operations, bare key/value records, column-family config
//! blocks, and bloom filters. Every `serialize_*` function takes a
//! `compressed` flag; every `deserialize_*` function detects compression
//! from the encoded bytes and needs no flag of its own, so the two sides of
//! a round-trip never need to agree on it out of band.
//!
//! ## Wire shape
//!
//! Every value is wrapped the same way regardless of kind:
//!
//! ```text
//! [compressed: u8][body]
//! ```
//!
//! `body` is the value's own raw encoding when `compressed == 0`, or that
//! same encoding passed through `lz4_flex::compress_prepend_size` when
//! `compressed == 1`.

use std::io::{Read, Write};

use bloom::BloomFilter;
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use config::ColumnFamilyConfig;
use thiserror::Error;

/// Errors raised while encoding or decoding a codec value.
#[derive(Debug, Error)]
pub enum CodecError {
    /// Bytes ended before a length-prefixed field could be read.
    #[error("truncated input")]
    Truncated,

    /// CRC/shape/compression validation failed.
    #[error("corrupt encoded value")]
    Corrupt,

    /// An unrecognized opcode byte.
    #[error("unknown op code {0}")]
    UnknownOpCode(u8),

    /// Decoded column-family config failed validation.
    #[error("invalid column family config: {0}")]
    Config(#[from] config::ConfigError),

    /// An underlying I/O error (from the in-memory cursor machinery).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

type Result<T> = std::result::Result<T, CodecError>;

/// A write-ahead-log operation kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpCode {
    Put,
    Delete,
}

impl OpCode {
    fn to_u8(self) -> u8 {
        match self {
            OpCode::Put => 0,
            OpCode::Delete => 1,
        }
    }

    fn from_u8(b: u8) -> Result<Self> {
        match b {
            0 => Ok(OpCode::Put),
            1 => Ok(OpCode::Delete),
            other => Err(CodecError::UnknownOpCode(other)),
        }
    }
}

/// A single key/value record, with its sequence number and TTL sentinel.
///
/// `seq` is not part of the distilled spec's terse data model, but the
/// monotonic sequence number it carries is what lets compaction and
/// memtable merges resolve which of two writes to the same key is newer —
/// it is threaded through from the teacher's `WalRecord::{Put,Del}` and
/// `sstable` record layout, both of which already carry a `seq` field for
/// exactly this reason.
///
/// `ttl == -1` means "no expiry"; any other value is an absolute epoch
/// second. A record is a tombstone iff `value` is exactly the 4-byte
/// little-endian encoding of `TOMBSTONE`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KvRecord {
    pub key: Vec<u8>,
    pub value: Vec<u8>,
    pub seq: u64,
    pub ttl: i64,
}

/// The little-endian 4-byte tombstone marker value used as a record's
/// entire `value` payload to mean "deleted".
pub const TOMBSTONE: u32 = 0xFFFF_FFFF;

impl KvRecord {
    /// Builds a tombstone record for `key`, ready for WAL/SSTable writes.
    #[must_use]
    pub fn tombstone(key: Vec<u8>, seq: u64) -> Self {
        Self {
            key,
            value: TOMBSTONE.to_le_bytes().to_vec(),
            seq,
            ttl: -1,
        }
    }

    /// Returns `true` if this record's value is the tombstone marker.
    #[must_use]
    pub fn is_tombstone(&self) -> bool {
        self.value.len() == 4 && self.value == TOMBSTONE.to_le_bytes()
    }
}

/// A WAL operation: an opcode plus the column family and record it applies to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operation {
    pub op_code: OpCode,
    pub column_family: String,
    pub kv: KvRecord,
}

fn wrap(raw: Vec<u8>, compressed: bool) -> Vec<u8> {
    let mut out = Vec::with_capacity(raw.len() + 1);
    if compressed {
        out.push(1);
        out.extend(lz4_flex::compress_prepend_size(&raw));
    } else {
        out.push(0);
        out.extend(raw);
    }
    out
}

fn unwrap(bytes: &[u8]) -> Result<Vec<u8>> {
    let (flag, rest) = bytes.split_first().ok_or(CodecError::Truncated)?;
    match flag {
        0 => Ok(rest.to_vec()),
        1 => lz4_flex::decompress_size_prepended(rest).map_err(|_| CodecError::Corrupt),
        _ => Err(CodecError::Corrupt),
    }
}

fn write_bytes<W: Write>(w: &mut W, bytes: &[u8]) -> Result<()> {
    w.write_u32::<LittleEndian>(bytes.len() as u32)?;
    w.write_all(bytes)?;
    Ok(())
}

fn read_bytes<R: Read>(r: &mut R) -> Result<Vec<u8>> {
    let len = r.read_u32::<LittleEndian>()?;
    let mut buf = vec![0u8; len as usize];
    r.read_exact(&mut buf)?;
    Ok(buf)
}

fn encode_kv_raw(kv: &KvRecord) -> Result<Vec<u8>> {
    let mut raw = Vec::new();
    write_bytes(&mut raw, &kv.key)?;
    raw.write_u64::<LittleEndian>(kv.seq)?;
    raw.write_i64::<LittleEndian>(kv.ttl)?;
    write_bytes(&mut raw, &kv.value)?;
    Ok(raw)
}

fn decode_kv_raw(raw: &[u8]) -> Result<KvRecord> {
    let mut cursor = raw;
    let key = read_bytes(&mut cursor)?;
    let seq = cursor
        .read_u64::<LittleEndian>()
        .map_err(|_| CodecError::Truncated)?;
    let ttl = cursor
        .read_i64::<LittleEndian>()
        .map_err(|_| CodecError::Truncated)?;
    let value = read_bytes(&mut cursor)?;
    Ok(KvRecord { key, value, seq, ttl })
}

/// Encodes a bare key/value record.
pub fn serialize_kv(kv: &KvRecord, compressed: bool) -> Result<Vec<u8>> {
    Ok(wrap(encode_kv_raw(kv)?, compressed))
}

/// Decodes a key/value record produced by [`serialize_kv`].
pub fn deserialize_kv(bytes: &[u8]) -> Result<KvRecord> {
    decode_kv_raw(&unwrap(bytes)?)
}

/// Encodes a WAL operation (opcode, column family name, and kv record).
pub fn serialize_operation(op: &Operation, compressed: bool) -> Result<Vec<u8>> {
    let mut raw = Vec::new();
    raw.push(op.op_code.to_u8());
    write_bytes(&mut raw, op.column_family.as_bytes())?;
    raw.extend(encode_kv_raw(&op.kv)?);
    Ok(wrap(raw, compressed))
}

/// Decodes a WAL operation produced by [`serialize_operation`].
pub fn deserialize_operation(bytes: &[u8]) -> Result<Operation> {
    let raw = unwrap(bytes)?;
    let mut cursor = raw.as_slice();

    let mut op_byte = [0u8; 1];
    cursor
        .read_exact(&mut op_byte)
        .map_err(|_| CodecError::Truncated)?;
    let op_code = OpCode::from_u8(op_byte[0])?;

    let cf_bytes = read_bytes(&mut cursor)?;
    let column_family =
        String::from_utf8(cf_bytes).map_err(|_| CodecError::Corrupt)?;
    let kv = decode_kv_raw(cursor)?;

    Ok(Operation {
        op_code,
        column_family,
        kv,
    })
}

/// Encodes a column-family configuration block.
pub fn serialize_column_family_config(
    cfg: &ColumnFamilyConfig,
    compressed: bool,
) -> Result<Vec<u8>> {
    let mut raw = Vec::new();
    write_bytes(&mut raw, cfg.name().as_bytes())?;
    raw.write_u32::<LittleEndian>(cfg.flush_threshold())?;
    raw.write_i32::<LittleEndian>(cfg.max_level())?;
    raw.write_f32::<LittleEndian>(cfg.probability())?;
    raw.push(u8::from(cfg.compressed()));
    Ok(wrap(raw, compressed))
}

/// Decodes a column-family configuration block produced by
/// [`serialize_column_family_config`], re-validating it in the process.
pub fn deserialize_column_family_config(bytes: &[u8]) -> Result<ColumnFamilyConfig> {
    let raw = unwrap(bytes)?;
    let mut cursor = raw.as_slice();

    let name_bytes = read_bytes(&mut cursor)?;
    let name = String::from_utf8(name_bytes).map_err(|_| CodecError::Corrupt)?;
    let flush_threshold = cursor
        .read_u32::<LittleEndian>()
        .map_err(|_| CodecError::Truncated)?;
    let max_level = cursor
        .read_i32::<LittleEndian>()
        .map_err(|_| CodecError::Truncated)?;
    let probability = cursor
        .read_f32::<LittleEndian>()
        .map_err(|_| CodecError::Truncated)?;
    let mut compressed_byte = [0u8; 1];
    cursor
        .read_exact(&mut compressed_byte)
        .map_err(|_| CodecError::Truncated)?;

    ColumnFamilyConfig::new(
        name,
        flush_threshold,
        max_level,
        probability,
        compressed_byte[0] != 0,
    )
    .map_err(CodecError::from)
}

/// Encodes a bloom filter, delegating to [`bloom::BloomFilter::write_to`]
/// for the inner representation.
pub fn serialize_bloomfilter(bf: &BloomFilter, compressed: bool) -> Result<Vec<u8>> {
    let mut raw = Vec::new();
    bf.write_to(&mut raw)?;
    Ok(wrap(raw, compressed))
}

/// Decodes a bloom filter produced by [`serialize_bloomfilter`].
pub fn deserialize_bloomfilter(bytes: &[u8]) -> Result<BloomFilter> {
    let raw = unwrap(bytes)?;
    let mut cursor = raw.as_slice();
    Ok(BloomFilter::read_from(&mut cursor)?)
}
