use hashcheck::cache::{CacheError, CacheList};
use hashcheck::scanner::{Hasher, HASH_LEN};
use std::fs;
use std::path::Path;
use tempfile::tempdir;

fn zero_hex() -> String {
    "0".repeat(HASH_LEN * 2)
}

fn load(content: &str) -> Result<CacheList, CacheError> {
    let dir = tempdir().unwrap();
    let cache_path = dir.path().join("cache.txt");
    fs::write(&cache_path, content).unwrap();
    CacheList::from_persisted_file(dir.path(), &cache_path)
}

fn expect_format_error(content: &str) -> (String, String) {
    match load(content) {
        Err(CacheError::Format { line, reason }) => (line, reason),
        other => panic!("expected a format error for {:?}, got {:?}", content, other),
    }
}

#[test]
fn test_two_field_line_is_rejected() {
    let (line, _) = expect_format_error("a.txt\t123\n");
    assert_eq!(line, "a.txt\t123");
}

#[test]
fn test_four_field_line_is_rejected() {
    let content = format!("a.txt\t1\t{}\textra\n", zero_hex());
    let (line, reason) = expect_format_error(&content);
    assert!(line.ends_with("\textra"));
    assert!(reason.contains('4'), "reason was {reason}");
}

#[test]
fn test_bad_ticks_are_rejected() {
    let (_, reason) = expect_format_error(&format!("a.txt\tyesterday\t{}\n", zero_hex()));
    assert!(!reason.is_empty());
}

#[test]
fn test_bad_hex_is_rejected() {
    expect_format_error("a.txt\t1\tZZ\n");
    expect_format_error("a.txt\t1\tABC\n");
    expect_format_error("a.txt\t1\t\n");
}

#[test]
fn test_wrong_digest_length_is_rejected() {
    let (_, reason) = expect_format_error("a.txt\t1\tABCD\n");
    assert!(reason.contains("32"), "reason was {reason}");
}

#[test]
fn test_escaping_names_are_rejected() {
    expect_format_error(&format!("../etc/passwd\t1\t{}\n", zero_hex()));
    expect_format_error(&format!("/etc/passwd\t1\t{}\n", zero_hex()));
    expect_format_error(&format!("\t1\t{}\n", zero_hex()));
}

#[test]
fn test_first_bad_line_stops_loading() {
    let content = format!(
        "a.txt\t1\t{hex}\nbroken\nc.txt\t3\t{hex}\n",
        hex = zero_hex()
    );
    let (line, _) = expect_format_error(&content);
    assert_eq!(line, "broken");
}

#[test]
fn test_duplicate_name_is_rejected() {
    let content = format!("a.txt\t1\t{hex}\na.txt\t2\t{hex}\n", hex = zero_hex());
    let (line, reason) = expect_format_error(&content);
    assert!(line.starts_with("a.txt\t2"));
    assert!(reason.contains("duplicate"));
}

#[test]
fn test_crlf_and_blank_lines_are_tolerated() {
    let content = format!("a.txt\t1\t{hex}\r\n\r\n   \nb.txt\t2\t{hex}\r\n", hex = zero_hex());
    let list = load(&content).unwrap();
    let names: Vec<&str> = list.iter().map(|e| e.name()).collect();
    assert_eq!(names, vec!["a.txt", "b.txt"]);
}

#[test]
fn test_lowercase_and_prefixed_hex_are_accepted() {
    let lower = format!("a.txt\t1\t{}\n", "ab".repeat(HASH_LEN));
    let prefixed = format!("a.txt\t1\t0x{}\n", "AB".repeat(HASH_LEN));
    let a = load(&lower).unwrap();
    let b = load(&prefixed).unwrap();
    assert_eq!(a.get("a.txt").unwrap().hash(), b.get("a.txt").unwrap().hash());
}

#[test]
fn test_invalid_utf8_is_a_format_error() {
    let dir = tempdir().unwrap();
    let cache_path = dir.path().join("cache.txt");
    fs::write(&cache_path, b"a\xff.txt\t1\t00\n").unwrap();

    match CacheList::from_persisted_file(dir.path(), &cache_path) {
        Err(CacheError::Format { line, reason }) => {
            assert_eq!(line, "a\u{FFFD}.txt\t1\t00");
            assert!(reason.contains("UTF-8"));
        }
        other => panic!("expected format error, got {:?}", other),
    }
}

#[test]
fn test_missing_cache_file() {
    let dir = tempdir().unwrap();
    let err = CacheList::from_persisted_file(dir.path(), &dir.path().join("nope.txt")).unwrap_err();
    assert!(matches!(err, CacheError::NotFound(_)));
}

#[test]
fn test_loaded_cache_for_missing_root_reports_everything_missing() {
    let dir = tempdir().unwrap();
    let cache_path = dir.path().join("cache.txt");
    fs::write(&cache_path, format!("a.txt\t1\t{}\n", zero_hex())).unwrap();

    let root = Path::new("/definitely/not/a/real/directory");
    let mut list = CacheList::from_persisted_file(root, &cache_path).unwrap();
    let changed = list.changed_entries(&Hasher::new()).unwrap();
    assert_eq!(changed.len(), 1);
}
