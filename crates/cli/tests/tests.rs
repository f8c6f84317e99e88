//! Memtable stress tests exercised from the CLI crate's test binary.
//!
//! WAL replay and recovery correctness are covered in depth by the `wal`
//! crate's own tests and `engine::recovery`'s test module; these are
//! load-shaped checks that don't belong inside either of those crates.
#[cfg(test)]
mod load_test {
    use memtable::Memtable;

    #[test]
    fn write_load_test() {
        let mut mem = Memtable::new();
        let mut seq = 0;

        for i in 0..1_000_000 {
            seq += 1;
            let key = format!("key{}", i % 10_000).into_bytes();
            let val = vec![b'x'; 100];
            mem.put(key, val, seq, -1);
        }

        assert!(mem.len() <= 10_000);
    }

    #[test]
    fn delete_heavy_workload() {
        let mut mem = Memtable::new();
        let mut seq = 0;

        for _i in 0..100_000 {
            seq += 1;
            mem.put(b"k".to_vec(), b"v".to_vec(), seq, -1);
            seq += 1;
            mem.delete(b"k".to_vec(), seq);
        }

        assert!(mem.get(b"k").is_none());
        assert_eq!(mem.len(), 1);
    }
}
