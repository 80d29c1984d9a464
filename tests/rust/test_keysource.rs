/// Integration tests for the key sources: file-order consumption across
/// multiple data files, error reporting, and synthetic determinism.
use aggsim_core::keysource::{
    write_key_files, FileKeySource, KeySource, KeySourceError, SyntheticKeySource,
};
use std::fs;
use tempfile::TempDir;

fn write_file(dir: &TempDir, name: &str, contents: &str) {
    fs::write(dir.path().join(name), contents).unwrap();
}

#[test]
fn test_reads_keys_in_file_order() {
    let dir = TempDir::new().unwrap();
    write_file(&dir, "data-0", "1 2 3\n4 5\n");
    write_file(&dir, "data-1", "6 7\n");

    let source = FileKeySource::open(dir.path()).unwrap();
    let keys: Vec<i64> = (0..7).map(|_| source.next_key().unwrap()).collect();
    assert_eq!(keys, vec![1, 2, 3, 4, 5, 6, 7]);
}

#[test]
fn test_exhaustion_reports_consumed_count() {
    let dir = TempDir::new().unwrap();
    write_file(&dir, "data-0", "10 11 12\n");

    let source = FileKeySource::open(dir.path()).unwrap();
    for _ in 0..3 {
        source.next_key().unwrap();
    }
    match source.next_key() {
        Err(KeySourceError::Exhausted { consumed }) => assert_eq!(consumed, 3),
        other => panic!("expected exhaustion, got {:?}", other),
    }
}

#[test]
fn test_missing_first_file_is_an_open_error() {
    let dir = TempDir::new().unwrap();
    match FileKeySource::open(dir.path()) {
        Err(KeySourceError::Open { path, .. }) => {
            assert!(path.ends_with("data-0"));
        }
        other => panic!("expected open error, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn test_negative_key_is_rejected() {
    let dir = TempDir::new().unwrap();
    write_file(&dir, "data-0", "1 -2 3\n");

    let source = FileKeySource::open(dir.path()).unwrap();
    match source.next_key() {
        Err(KeySourceError::Negative { key, .. }) => assert_eq!(key, -2),
        other => panic!("expected negative-key error, got {:?}", other),
    }
}

#[test]
fn test_malformed_token_is_rejected() {
    let dir = TempDir::new().unwrap();
    write_file(&dir, "data-0", "1 two 3\n");

    let source = FileKeySource::open(dir.path()).unwrap();
    match source.next_key() {
        Err(KeySourceError::Malformed { token, .. }) => assert_eq!(token, "two"),
        other => panic!("expected malformed-key error, got {:?}", other),
    }
}

#[test]
fn test_small_blocks_cross_file_boundaries() {
    let dir = TempDir::new().unwrap();
    write_file(&dir, "data-0", "0 1\n");
    write_file(&dir, "data-1", "2\n");
    write_file(&dir, "data-2", "3 4 5\n");

    let source = FileKeySource::with_block_size(dir.path(), 2).unwrap();
    let keys: Vec<i64> = (0..6).map(|_| source.next_key().unwrap()).collect();
    assert_eq!(keys, vec![0, 1, 2, 3, 4, 5]);
    assert!(source.next_key().is_err());
}

#[test]
fn test_gen_keys_round_trip() {
    let dir = TempDir::new().unwrap();
    let written = write_key_files(dir.path(), 1000, 50, 3, 42).unwrap();
    assert_eq!(written, 1000);
    for i in 0..3 {
        assert!(dir.path().join(format!("data-{}", i)).exists());
    }

    let source = FileKeySource::open(dir.path()).unwrap();
    for _ in 0..1000 {
        let key = source.next_key().unwrap();
        assert!((0..50).contains(&key));
    }
    assert!(matches!(
        source.next_key(),
        Err(KeySourceError::Exhausted { consumed: 1000 })
    ));
}

#[test]
fn test_gen_keys_is_deterministic() {
    let a = TempDir::new().unwrap();
    let b = TempDir::new().unwrap();
    write_key_files(a.path(), 200, 1000, 2, 7).unwrap();
    write_key_files(b.path(), 200, 1000, 2, 7).unwrap();
    for i in 0..2 {
        let name = format!("data-{}", i);
        assert_eq!(
            fs::read_to_string(a.path().join(&name)).unwrap(),
            fs::read_to_string(b.path().join(&name)).unwrap()
        );
    }
}

#[test]
fn test_synthetic_matches_itself() {
    let a = SyntheticKeySource::new(9, 512);
    let b = SyntheticKeySource::new(9, 512);
    for _ in 0..256 {
        let key = a.next_key().unwrap();
        assert_eq!(key, b.next_key().unwrap());
        assert!((0..512).contains(&key));
    }
}
