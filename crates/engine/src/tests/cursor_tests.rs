use crate::*;
use tempfile::tempdir;

fn open_db(dir: &std::path::Path) -> Database {
    let db = Database::open(DbConfig::new(dir.to_str().unwrap(), false)).unwrap();
    db.create_column_family("default", 1 << 20, 5, 0.1, false)
        .unwrap();
    db
}

#[test]
fn cursor_over_empty_column_family_is_immediately_at_both_ends() {
    let dir = tempdir().unwrap();
    let db = open_db(dir.path());
    let cursor = db.cursor("default").unwrap();
    assert!(matches!(cursor.get(), Err(EngineError::AtStartOfCursor)));
}

#[test]
fn cursor_against_unknown_column_family_fails() {
    let dir = tempdir().unwrap();
    let db = open_db(dir.path());
    assert!(matches!(
        db.cursor("nope"),
        Err(EngineError::CfNotFound(_))
    ));
}

#[test]
fn cursor_walks_memtable_entries_in_key_order() {
    let dir = tempdir().unwrap();
    let db = open_db(dir.path());
    db.put("default", b"c".to_vec(), b"3".to_vec(), -1).unwrap();
    db.put("default", b"a".to_vec(), b"1".to_vec(), -1).unwrap();
    db.put("default", b"b".to_vec(), b"2".to_vec(), -1).unwrap();

    let mut cursor = db.cursor("default").unwrap();
    let mut seen = Vec::new();
    cursor.next().unwrap();
    loop {
        let (k, v) = cursor.get().unwrap();
        seen.push((k, v));
        if cursor.next().is_err() {
            break;
        }
    }

    assert_eq!(
        seen,
        vec![
            (b"a".to_vec(), b"1".to_vec()),
            (b"b".to_vec(), b"2".to_vec()),
            (b"c".to_vec(), b"3".to_vec()),
        ]
    );
}

#[test]
fn prev_before_any_next_fails_at_start() {
    let dir = tempdir().unwrap();
    let db = open_db(dir.path());
    db.put("default", b"a".to_vec(), b"1".to_vec(), -1).unwrap();
    let mut cursor = db.cursor("default").unwrap();
    assert!(matches!(cursor.prev(), Err(EngineError::AtStartOfCursor)));
}

#[test]
fn next_past_the_last_entry_fails_at_end() {
    let dir = tempdir().unwrap();
    let db = open_db(dir.path());
    db.put("default", b"a".to_vec(), b"1".to_vec(), -1).unwrap();
    let mut cursor = db.cursor("default").unwrap();
    cursor.next().unwrap();
    assert_eq!(cursor.get().unwrap(), (b"a".to_vec(), b"1".to_vec()));
    assert!(matches!(cursor.next(), Err(EngineError::AtEndOfCursor)));
}

#[test]
fn cursor_can_walk_backward_after_reaching_the_end() {
    let dir = tempdir().unwrap();
    let db = open_db(dir.path());
    db.put("default", b"a".to_vec(), b"1".to_vec(), -1).unwrap();
    db.put("default", b"b".to_vec(), b"2".to_vec(), -1).unwrap();

    let mut cursor = db.cursor("default").unwrap();
    cursor.next().unwrap();
    cursor.next().unwrap();
    assert_eq!(cursor.get().unwrap(), (b"b".to_vec(), b"2".to_vec()));
    cursor.prev().unwrap();
    assert_eq!(cursor.get().unwrap(), (b"a".to_vec(), b"1".to_vec()));
}

#[test]
fn cursor_visits_newest_sstable_before_older_ones() {
    let dir = tempdir().unwrap();
    let db = open_db(dir.path());
    db.put("default", b"x".to_vec(), b"old".to_vec(), -1).unwrap();
    db.force_flush("default").unwrap();
    db.put("default", b"y".to_vec(), b"new".to_vec(), -1).unwrap();
    db.force_flush("default").unwrap();

    let mut cursor = db.cursor("default").unwrap();
    cursor.next().unwrap();
    assert_eq!(cursor.get().unwrap(), (b"y".to_vec(), b"new".to_vec()));
    cursor.next().unwrap();
    assert_eq!(cursor.get().unwrap(), (b"x".to_vec(), b"old".to_vec()));
}

#[test]
fn cursor_reports_tombstoned_entries_distinctly() {
    let dir = tempdir().unwrap();
    let db = open_db(dir.path());
    db.put("default", b"x".to_vec(), b"v".to_vec(), -1).unwrap();
    db.force_flush("default").unwrap();
    db.delete("default", b"x".to_vec()).unwrap();

    let mut cursor = db.cursor("default").unwrap();
    cursor.next().unwrap();
    assert!(matches!(cursor.get(), Err(EngineError::KeyTombstoned)));
}

#[test]
fn cursor_reports_expired_entries_distinctly() {
    let dir = tempdir().unwrap();
    let db = open_db(dir.path());
    db.put("default", b"x".to_vec(), b"v".to_vec(), 1).unwrap();

    let mut cursor = db.cursor("default").unwrap();
    cursor.next().unwrap();
    assert!(matches!(cursor.get(), Err(EngineError::KeyExpired)));
}

#[test]
fn cursor_snapshot_is_unaffected_by_writes_after_binding() {
    let dir = tempdir().unwrap();
    let db = open_db(dir.path());
    db.put("default", b"a".to_vec(), b"1".to_vec(), -1).unwrap();

    let mut cursor = db.cursor("default").unwrap();
    db.put("default", b"b".to_vec(), b"2".to_vec(), -1).unwrap();

    cursor.next().unwrap();
    assert_eq!(cursor.get().unwrap(), (b"a".to_vec(), b"1".to_vec()));
    assert!(matches!(cursor.next(), Err(EngineError::AtEndOfCursor)));
}
