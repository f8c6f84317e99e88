use crate::error::SstError;
use crate::*;
use memtable::Memtable;
use tempfile::tempdir;

fn make_sample_memtable() -> Memtable {
    let mut m = Memtable::new();
    m.put(b"a".to_vec(), b"apple".to_vec(), 1, -1);
    m.put(b"b".to_vec(), b"banana".to_vec(), 2, -1);
    m.put(b"c".to_vec(), b"".to_vec(), 3, -1);
    m.delete(b"d".to_vec(), 4);
    m
}

// -------------------- Basic open & get --------------------

#[test]
fn open_and_get_entries() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("sample.sst");

    let mem = make_sample_memtable();
    SSTableWriter::write_from_memtable(&path, &mem, false).unwrap();
    let reader = SSTableReader::open(&path).unwrap();

    let keys: Vec<&[u8]> = reader.keys().collect();
    assert!(keys.contains(&b"a".as_slice()));
    assert!(keys.contains(&b"b".as_slice()));
    assert!(keys.contains(&b"c".as_slice()));
    assert!(keys.contains(&b"d".as_slice()));

    let a = reader.get(b"a").unwrap().expect("a must exist");
    assert_eq!(a.seq, 1);
    assert_eq!(a.value, b"apple");

    let b = reader.get(b"b").unwrap().expect("b must exist");
    assert_eq!(b.seq, 2);
    assert_eq!(b.value, b"banana");

    let c = reader.get(b"c").unwrap().expect("c must exist");
    assert_eq!(c.seq, 3);
    assert_eq!(c.value, Vec::<u8>::new());

    let d = reader.get(b"d").unwrap().expect("d must exist");
    assert_eq!(d.seq, 4);
    assert!(d.is_tombstone());

    assert!(reader.get(b"nope").unwrap().is_none());
}

// -------------------- len / is_empty --------------------

#[test]
fn len_and_is_empty() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("len.sst");

    let mem = make_sample_memtable();
    SSTableWriter::write_from_memtable(&path, &mem, false).unwrap();

    let reader = SSTableReader::open(&path).unwrap();
    assert_eq!(reader.len(), 4);
    assert!(!reader.is_empty());
}

// -------------------- Large values --------------------

#[test]
fn large_value_roundtrip() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("bigval.sst");

    let mut mem = Memtable::new();
    let big = vec![b'x'; 500_000];
    mem.put(b"big".to_vec(), big.clone(), 1, -1);
    SSTableWriter::write_from_memtable(&path, &mem, false).unwrap();

    let reader = SSTableReader::open(&path).unwrap();
    let entry = reader.get(b"big").unwrap().unwrap();
    assert_eq!(entry.value.len(), 500_000);
}

// -------------------- Bloom filter --------------------

#[test]
fn bloom_filter_finds_all_inserted_keys() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("bloom_hit.sst");

    let mut mem = Memtable::new();
    for i in 0..500u64 {
        mem.put(format!("key{:04}", i).into_bytes(), b"v".to_vec(), i, -1);
    }
    SSTableWriter::write_from_memtable(&path, &mem, false).unwrap();

    let reader = SSTableReader::open(&path).unwrap();
    for i in 0..500u64 {
        let key = format!("key{:04}", i).into_bytes();
        assert!(reader.get(&key).unwrap().is_some(), "key{:04} should exist", i);
    }
}

#[test]
fn bloom_filter_rejects_most_missing_keys() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("bloom_miss.sst");

    let mut mem = Memtable::new();
    for i in 0..100u64 {
        mem.put(format!("exist{:04}", i).into_bytes(), b"v".to_vec(), i, -1);
    }
    SSTableWriter::write_from_memtable(&path, &mem, false).unwrap();

    let reader = SSTableReader::open(&path).unwrap();

    // Keys that were NOT inserted should mostly return None (bloom filters
    // may have false positives, but never false negatives).
    let mut misses = 0;
    for i in 0..100u64 {
        let key = format!("missing{:04}", i).into_bytes();
        if reader.get(&key).unwrap().is_none() {
            misses += 1;
        }
    }
    assert!(misses > 90, "expected most missing keys to be rejected, got {misses}/100");
}

// -------------------- Validation errors --------------------

#[test]
fn open_empty_file_errors() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("tiny.sst");
    std::fs::write(&path, b"").unwrap();

    let result = SSTableReader::open(&path);
    assert!(matches!(result, Err(SstError::Empty)));
}

#[test]
fn open_garbage_file_errors() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("garbage.sst");
    std::fs::write(&path, b"not a valid pager frame at all, just junk bytes").unwrap();

    assert!(SSTableReader::open(&path).is_err());
}

#[test]
fn open_nonexistent_file_errors() {
    let result = SSTableReader::open("/tmp/no-such-file-for-sstable-tests.sst");
    assert!(result.is_err());
}

// -------------------- Keys iterator ordering --------------------

#[test]
fn keys_are_sorted() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("sorted.sst");

    let mut mem = Memtable::new();
    mem.put(b"z".to_vec(), b"1".to_vec(), 1, -1);
    mem.put(b"a".to_vec(), b"2".to_vec(), 2, -1);
    mem.put(b"m".to_vec(), b"3".to_vec(), 3, -1);
    SSTableWriter::write_from_memtable(&path, &mem, false).unwrap();

    let reader = SSTableReader::open(&path).unwrap();
    let keys: Vec<&[u8]> = reader.keys().collect();
    assert_eq!(keys, vec![b"a".as_slice(), b"m".as_slice(), b"z".as_slice()]);
}

// -------------------- Multiple gets on same reader --------------------

#[test]
fn multiple_gets_same_reader() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("multi.sst");

    let mut mem = Memtable::new();
    for i in 0..100u64 {
        mem.put(format!("k{:03}", i).into_bytes(), b"v".to_vec(), i, -1);
    }
    SSTableWriter::write_from_memtable(&path, &mem, false).unwrap();

    let reader = SSTableReader::open(&path).unwrap();
    for _ in 0..2 {
        for i in 0..100u64 {
            let key = format!("k{:03}", i).into_bytes();
            let entry = reader.get(&key).unwrap().unwrap();
            assert_eq!(entry.seq, i);
        }
    }
}
