use super::*;
use tempfile::tempdir;

fn temp_path(name: &str) -> PathBuf {
    let dir = tempdir().unwrap();
    let path = dir.path().join(name);
    // leak the tempdir so the file survives for the test's duration
    std::mem::forget(dir);
    path
}

#[test]
fn write_then_read_roundtrips() {
    let path = temp_path("pages.dat");
    let mut pager = Pager::open(&path, false).unwrap();

    let p0 = pager.write(b"first").unwrap();
    let p1 = pager.write(b"second page payload").unwrap();

    assert_eq!(p0, 0);
    assert_eq!(p1, 1);
    assert_eq!(pager.read(p0).unwrap(), b"first");
    assert_eq!(pager.read(p1).unwrap(), b"second page payload");
    assert_eq!(pager.pages_count(), 2);
}

#[test]
fn empty_payload_is_a_valid_page() {
    let path = temp_path("empty.dat");
    let mut pager = Pager::open(&path, false).unwrap();

    let p0 = pager.write(b"").unwrap();
    assert_eq!(pager.read(p0).unwrap(), Vec::<u8>::new());
}

#[test]
fn read_out_of_range_errors() {
    let path = temp_path("oor.dat");
    let mut pager = Pager::open(&path, false).unwrap();
    pager.write(b"only page").unwrap();

    match pager.read(5) {
        Err(PagerError::OutOfRange(5, 1)) => {}
        other => panic!("expected OutOfRange(5, 1), got {other:?}"),
    }
}

#[test]
fn reopen_rebuilds_offset_index() {
    let path = temp_path("reopen.dat");
    {
        let mut pager = Pager::open(&path, false).unwrap();
        pager.write(b"alpha").unwrap();
        pager.write(b"beta").unwrap();
    }

    let mut reopened = Pager::open(&path, false).unwrap();
    assert_eq!(reopened.pages_count(), 2);
    assert_eq!(reopened.read(0).unwrap(), b"alpha");
    assert_eq!(reopened.read(1).unwrap(), b"beta");
}

#[test]
fn truncated_trailing_frame_is_treated_as_clean_eof() {
    let path = temp_path("torn.dat");
    {
        let mut pager = Pager::open(&path, false).unwrap();
        pager.write(b"complete").unwrap();
    }

    // simulate a crash mid-write: append a header claiming a payload that
    // never arrives.
    {
        use std::io::Write as _;
        let mut file = OpenOptions::new().append(true).open(&path).unwrap();
        file.write_all(&100u32.to_le_bytes()).unwrap();
        file.write_all(&0u32.to_le_bytes()).unwrap();
        file.write_all(b"short").unwrap();
    }

    let mut pager = Pager::open(&path, false).unwrap();
    assert_eq!(pager.pages_count(), 1);
    assert_eq!(pager.read(0).unwrap(), b"complete");
}

#[test]
fn corrupt_page_fails_crc_check() {
    let path = temp_path("corrupt.dat");
    {
        let mut pager = Pager::open(&path, false).unwrap();
        pager.write(b"trustworthy").unwrap();
    }

    {
        use std::io::{Seek, SeekFrom, Write as _};
        let mut file = OpenOptions::new().write(true).open(&path).unwrap();
        // corrupt a payload byte, just past the 8-byte frame header.
        file.seek(SeekFrom::Start(8)).unwrap();
        file.write_all(b"X").unwrap();
    }

    let mut pager = Pager::open(&path, false).unwrap();
    match pager.read(0) {
        Err(PagerError::Corrupt(0)) => {}
        other => panic!("expected Corrupt(0), got {other:?}"),
    }
}

#[test]
fn truncate_drops_trailing_pages() {
    let path = temp_path("truncate.dat");
    let mut pager = Pager::open(&path, false).unwrap();
    pager.write(b"one").unwrap();
    pager.write(b"two").unwrap();
    pager.write(b"three").unwrap();

    pager.truncate(1).unwrap();
    assert_eq!(pager.pages_count(), 1);
    assert_eq!(pager.read(0).unwrap(), b"one");
    assert!(matches!(pager.read(1), Err(PagerError::OutOfRange(1, 1))));

    // a subsequent write lands at the new end, not the old one.
    let p1 = pager.write(b"replacement").unwrap();
    assert_eq!(p1, 1);
    assert_eq!(pager.read(1).unwrap(), b"replacement");
}

#[test]
fn truncate_to_full_length_is_a_no_op() {
    let path = temp_path("noop_truncate.dat");
    let mut pager = Pager::open(&path, false).unwrap();
    pager.write(b"a").unwrap();
    pager.write(b"b").unwrap();

    pager.truncate(2).unwrap();
    assert_eq!(pager.pages_count(), 2);
    pager.truncate(10).unwrap();
    assert_eq!(pager.pages_count(), 2);
}

#[test]
fn cursor_walks_forward_and_backward() {
    let path = temp_path("cursor.dat");
    let mut pager = Pager::open(&path, false).unwrap();
    pager.write(b"a").unwrap();
    pager.write(b"b").unwrap();
    pager.write(b"c").unwrap();

    let mut cursor = pager.cursor_init();
    assert_eq!(cursor.current(), None);

    assert!(cursor.next());
    assert_eq!(cursor.get(&mut pager).unwrap(), Some(b"a".to_vec()));
    assert!(cursor.next());
    assert_eq!(cursor.get(&mut pager).unwrap(), Some(b"b".to_vec()));
    assert!(cursor.next());
    assert_eq!(cursor.get(&mut pager).unwrap(), Some(b"c".to_vec()));
    assert!(!cursor.next());

    // stepping back from the past-the-end sentinel lands on the last page.
    assert!(cursor.prev());
    assert_eq!(cursor.get(&mut pager).unwrap(), Some(b"c".to_vec()));
    assert!(cursor.prev());
    assert_eq!(cursor.get(&mut pager).unwrap(), Some(b"b".to_vec()));
    assert!(cursor.prev());
    assert_eq!(cursor.get(&mut pager).unwrap(), Some(b"a".to_vec()));
    assert!(!cursor.prev());
    assert_eq!(cursor.current(), None);
}

#[test]
fn open_existing_fails_on_missing_file() {
    let path = temp_path("missing.dat");
    match Pager::open_existing(&path, false) {
        Err(PagerError::Io(e)) => assert_eq!(e.kind(), io::ErrorKind::NotFound),
        other => panic!("expected NotFound io error, got {other:?}"),
    }
}

#[test]
fn open_existing_succeeds_once_file_was_created() {
    let path = temp_path("created.dat");
    {
        let mut pager = Pager::open(&path, false).unwrap();
        pager.write(b"seed").unwrap();
    }
    let mut reopened = Pager::open_existing(&path, false).unwrap();
    assert_eq!(reopened.read(0).unwrap(), b"seed");
}

#[test]
fn cursor_on_empty_pager_yields_nothing() {
    let path = temp_path("empty_cursor.dat");
    let mut pager = Pager::open(&path, false).unwrap();
    let mut cursor = pager.cursor_init();
    assert!(!cursor.next());
    assert_eq!(cursor.get(&mut pager).unwrap(), None);
}
