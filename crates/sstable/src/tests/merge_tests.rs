use crate::SSTableWriter;
use crate::*;
use memtable::Memtable;
use tempfile::tempdir;

/// Helper: write a memtable to an SSTable and open a reader.
/// `val: None` writes a tombstone via `Memtable::delete`.
fn write_and_open(
    dir: &std::path::Path,
    name: &str,
    entries: &[(&[u8], Option<&[u8]>, u64)],
) -> SSTableReader {
    let path = dir.join(name);
    let mut mem = Memtable::new();
    for &(key, val, seq) in entries {
        match val {
            Some(v) => mem.put(key.to_vec(), v.to_vec(), seq, -1),
            None => mem.delete(key.to_vec(), seq),
        }
    }
    SSTableWriter::write_from_memtable(&path, &mem, false).unwrap();
    SSTableReader::open(&path).unwrap()
}

// -------------------- Basic merge --------------------

#[test]
fn merge_single_sstable() {
    let dir = tempdir().unwrap();
    let r = write_and_open(
        dir.path(),
        "a.sst",
        &[
            (b"a", Some(b"1"), 1),
            (b"b", Some(b"2"), 2),
            (b"c", Some(b"3"), 3),
        ],
    );

    let readers = vec![r];
    let mut iter = MergeIterator::new(&readers);
    let result = iter.collect_all().unwrap();

    assert_eq!(result.len(), 3);
    assert_eq!(result[0].0, b"a");
    assert_eq!(result[1].0, b"b");
    assert_eq!(result[2].0, b"c");
}

#[test]
fn merge_two_non_overlapping() {
    let dir = tempdir().unwrap();
    let r1 = write_and_open(
        dir.path(),
        "a.sst",
        &[(b"a", Some(b"1"), 1), (b"b", Some(b"2"), 2)],
    );
    let r2 = write_and_open(
        dir.path(),
        "b.sst",
        &[(b"c", Some(b"3"), 3), (b"d", Some(b"4"), 4)],
    );

    let readers = vec![r1, r2];
    let mut iter = MergeIterator::new(&readers);
    let result = iter.collect_all().unwrap();

    assert_eq!(result.len(), 4);
    assert_eq!(result[0].0, b"a");
    assert_eq!(result[1].0, b"b");
    assert_eq!(result[2].0, b"c");
    assert_eq!(result[3].0, b"d");
}

// -------------------- Many keys --------------------

#[test]
fn merge_many_keys_across_sstables() {
    let dir = tempdir().unwrap();

    let entries1: Vec<(Vec<u8>, Option<Vec<u8>>, u64)> = (0..100u64)
        .map(|i| (format!("key{:04}", i).into_bytes(), Some(b"v1".to_vec()), i))
        .collect();
    let refs1: Vec<(&[u8], Option<&[u8]>, u64)> = entries1
        .iter()
        .map(|(k, v, s)| (k.as_slice(), v.as_deref(), *s))
        .collect();
    let r1 = write_and_open(dir.path(), "1.sst", &refs1);

    let entries2: Vec<(Vec<u8>, Option<Vec<u8>>, u64)> = (50..150u64)
        .map(|i| (format!("key{:04}", i).into_bytes(), Some(b"v2".to_vec()), i + 100))
        .collect();
    let refs2: Vec<(&[u8], Option<&[u8]>, u64)> = entries2
        .iter()
        .map(|(k, v, s)| (k.as_slice(), v.as_deref(), *s))
        .collect();
    let r2 = write_and_open(dir.path(), "2.sst", &refs2);

    let readers = vec![r1, r2];
    let mut iter = MergeIterator::new(&readers);
    let result = iter.collect_all().unwrap();

    // keys 0..150 = 150 unique keys
    assert_eq!(result.len(), 150);

    // Overlapping keys (50..100) should have seq from r2 (higher)
    for (key, entry) in &result {
        let key_str = String::from_utf8_lossy(key);
        if let Ok(num) = key_str.trim_start_matches("key").parse::<u64>() {
            if (50..100).contains(&num) {
                assert_eq!(entry.seq, num + 100, "key {num} should have seq from r2");
                assert_eq!(entry.value, b"v2".to_vec());
            }
        }
    }

    let keys: Vec<&[u8]> = result.iter().map(|(k, _)| k.as_slice()).collect();
    let mut sorted = keys.clone();
    sorted.sort();
    assert_eq!(keys, sorted);
}

// -------------------- Three-way merge --------------------

#[test]
fn merge_three_sstables_with_overlap() {
    let dir = tempdir().unwrap();
    let r1 = write_and_open(dir.path(), "1.sst", &[(b"a", Some(b"v1"), 1), (b"c", Some(b"v1"), 1)]);
    let r2 = write_and_open(dir.path(), "2.sst", &[(b"b", Some(b"v2"), 2), (b"c", Some(b"v2"), 2)]);
    let r3 = write_and_open(dir.path(), "3.sst", &[(b"c", Some(b"v3"), 3), (b"d", Some(b"v3"), 3)]);

    let readers = vec![r1, r2, r3];
    let mut iter = MergeIterator::new(&readers);
    let result = iter.collect_all().unwrap();

    // a, b, c (deduped), d
    assert_eq!(result.len(), 4);
    assert_eq!(result[0].0, b"a");
    assert_eq!(result[1].0, b"b");
    assert_eq!(result[2].0, b"c");
    assert_eq!(result[2].1.seq, 3); // highest seq wins
    assert_eq!(result[2].1.value, b"v3".to_vec());
    assert_eq!(result[3].0, b"d");
}

// -------------------- Empty inputs --------------------

#[test]
fn merge_no_readers() {
    let readers: Vec<SSTableReader> = vec![];
    let mut iter = MergeIterator::new(&readers);
    let result = iter.collect_all().unwrap();
    assert!(result.is_empty());
}

// -------------------- Sorted output --------------------

#[test]
fn merge_output_is_sorted() {
    let dir = tempdir().unwrap();
    let r1 = write_and_open(
        dir.path(),
        "1.sst",
        &[(b"z", Some(b"1"), 1), (b"m", Some(b"2"), 2), (b"a", Some(b"3"), 3)],
    );
    let r2 = write_and_open(dir.path(), "2.sst", &[(b"x", Some(b"4"), 4), (b"b", Some(b"5"), 5)]);

    let readers = vec![r1, r2];
    let mut iter = MergeIterator::new(&readers);
    let result = iter.collect_all().unwrap();

    let keys: Vec<&[u8]> = result.iter().map(|(k, _)| k.as_slice()).collect();
    let mut sorted = keys.clone();
    sorted.sort();
    assert_eq!(keys, sorted);
}

// -------------------- Deduplication --------------------

#[test]
fn merge_overlapping_keys_highest_seq_wins() {
    let dir = tempdir().unwrap();
    let r1 = write_and_open(dir.path(), "old.sst", &[(b"key", Some(b"old_value"), 1)]);
    let r2 = write_and_open(dir.path(), "new.sst", &[(b"key", Some(b"new_value"), 5)]);

    let readers = vec![r1, r2];
    let mut iter = MergeIterator::new(&readers);
    let result = iter.collect_all().unwrap();

    assert_eq!(result.len(), 1);
    assert_eq!(result[0].0, b"key");
    assert_eq!(result[0].1.seq, 5);
    assert_eq!(result[0].1.value, b"new_value".to_vec());
}

#[test]
fn merge_tombstone_wins_over_older_value() {
    let dir = tempdir().unwrap();
    let r1 = write_and_open(dir.path(), "old.sst", &[(b"key", Some(b"alive"), 1)]);
    let r2 = write_and_open(dir.path(), "new.sst", &[(b"key", None, 5)]);

    let readers = vec![r1, r2];
    let mut iter = MergeIterator::new(&readers);
    let result = iter.collect_all().unwrap();

    assert_eq!(result.len(), 1);
    assert_eq!(result[0].1.seq, 5);
    assert!(result[0].1.is_tombstone());
}
