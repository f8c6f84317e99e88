use super::*;
use codec::{KvRecord, OpCode};
use tempfile::tempdir;

fn put_op(seq: u64, key: &[u8], value: &[u8]) -> Operation {
    Operation {
        op_code: OpCode::Put,
        column_family: "default".to_string(),
        kv: KvRecord {
            key: key.to_vec(),
            value: value.to_vec(),
            seq,
            ttl: -1,
        },
    }
}

fn del_op(seq: u64, key: &[u8]) -> Operation {
    Operation {
        op_code: OpCode::Delete,
        column_family: "default".to_string(),
        kv: KvRecord::tombstone(key.to_vec(), seq),
    }
}

#[test]
fn append_then_replay_roundtrips() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("wal.log");

    let writer = WalWriter::create(&path, false, false).unwrap();
    writer.append(&put_op(1, b"a", b"1")).unwrap();
    writer.append(&put_op(2, b"b", b"2")).unwrap();
    writer.append(&del_op(3, b"a")).unwrap();
    drop(writer);

    let mut reader = WalReader::open(&path).unwrap();
    let mut seen = Vec::new();
    reader.replay(|op| seen.push(op)).unwrap();

    assert_eq!(seen.len(), 3);
    assert_eq!(seen[0], put_op(1, b"a", b"1"));
    assert_eq!(seen[1], put_op(2, b"b", b"2"));
    assert_eq!(seen[2], del_op(3, b"a"));
}

#[test]
fn replay_on_missing_file_errors() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("does-not-exist.log");
    assert!(WalReader::open(&path).is_err());
}

#[test]
fn compressed_operations_roundtrip() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("wal.log");

    let writer = WalWriter::create(&path, false, true).unwrap();
    let big_value = vec![b'x'; 4096];
    writer.append(&put_op(1, b"big", &big_value)).unwrap();
    drop(writer);

    let mut reader = WalReader::open(&path).unwrap();
    let mut seen = Vec::new();
    reader.replay(|op| seen.push(op)).unwrap();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].kv.value, big_value);
}

#[test]
fn truncate_discards_replayed_entries() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("wal.log");

    let writer = WalWriter::create(&path, false, false).unwrap();
    writer.append(&put_op(1, b"a", b"1")).unwrap();
    writer.append(&put_op(2, b"b", b"2")).unwrap();
    assert_eq!(writer.pages_count(), 2);

    writer.truncate(0).unwrap();
    assert_eq!(writer.pages_count(), 0);
    drop(writer);

    let mut reader = WalReader::open(&path).unwrap();
    let mut seen = Vec::new();
    reader.replay(|op| seen.push(op)).unwrap();
    assert!(seen.is_empty());
}

#[test]
fn sync_to_disk_does_not_error_on_unsynced_writer() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("wal.log");
    let writer = WalWriter::create(&path, false, false).unwrap();
    writer.append(&put_op(1, b"a", b"1")).unwrap();
    writer.sync_to_disk().unwrap();
}

#[test]
fn empty_wal_replays_nothing() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("wal.log");
    let _writer = WalWriter::create(&path, false, false).unwrap();

    let mut reader = WalReader::open(&path).unwrap();
    let mut seen = Vec::new();
    reader.replay(|op| seen.push(op)).unwrap();
    assert!(seen.is_empty());
}
