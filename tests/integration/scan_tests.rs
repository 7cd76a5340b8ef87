use hashcheck::cache::{CacheError, CacheList, ScanOptions};
use hashcheck::progress::ProgressCallback;
use hashcheck::scanner::{HashError, Hasher, WalkerConfig};
use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use tempfile::tempdir;

#[derive(Default)]
struct CountingProgress {
    files: AtomicUsize,
    bytes: AtomicUsize,
    phases: AtomicUsize,
}

impl ProgressCallback for CountingProgress {
    fn on_phase_start(&self, _phase: &str, _total: usize) {
        self.phases.fetch_add(1, Ordering::SeqCst);
    }

    fn on_progress(&self, _current: usize, _path: &str) {
        self.files.fetch_add(1, Ordering::SeqCst);
    }

    fn on_item_completed(&self, bytes: u64) {
        self.bytes.fetch_add(bytes as usize, Ordering::SeqCst);
    }

    fn on_phase_end(&self, _phase: &str) {}
}

fn names(list: &CacheList) -> Vec<String> {
    let mut names: Vec<String> = list.iter().map(|e| e.name().to_string()).collect();
    names.sort();
    names
}

#[test]
fn test_scan_ignores_subdirectories() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("top.txt"), "x").unwrap();
    fs::create_dir(dir.path().join("nested")).unwrap();
    fs::write(dir.path().join("nested").join("inner.txt"), "y").unwrap();

    let list = CacheList::from_directory(dir.path(), &Hasher::new()).unwrap();
    assert_eq!(names(&list), vec!["top.txt"]);
}

#[test]
fn test_scan_of_missing_directory() {
    let dir = tempdir().unwrap();
    let err = CacheList::from_directory(&dir.path().join("missing"), &Hasher::new()).unwrap_err();
    assert!(matches!(err, CacheError::NotFound(_)));
}

#[test]
fn test_scan_of_file_is_an_error() {
    let dir = tempdir().unwrap();
    let file = dir.path().join("file.txt");
    fs::write(&file, "x").unwrap();

    let err = CacheList::from_directory(&file, &Hasher::new()).unwrap_err();
    assert!(matches!(err, CacheError::Scan(_)));
}

#[test]
fn test_scan_with_walker_options() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("keep.txt"), "x").unwrap();
    fs::write(dir.path().join("skip.tmp"), "y").unwrap();
    fs::write(dir.path().join(".hidden"), "z").unwrap();
    fs::write(dir.path().join("hashlist.txt"), "").unwrap();

    let options = ScanOptions {
        walker: WalkerConfig::new(false, true, vec!["*.tmp".to_string()])
            .excluding(dir.path().join("hashlist.txt")),
        io_threads: 1,
    };
    let list = CacheList::from_directory_with(dir.path(), &Hasher::new(), &options, None).unwrap();
    assert_eq!(names(&list), vec!["keep.txt"]);
}

#[test]
fn test_parallel_scan_reports_every_file() {
    let dir = tempdir().unwrap();
    for i in 0..32 {
        fs::write(dir.path().join(format!("f{:02}.dat", i)), vec![b'a'; i]).unwrap();
    }

    let progress = CountingProgress::default();
    let options = ScanOptions {
        io_threads: 4,
        ..Default::default()
    };
    let parallel =
        CacheList::from_directory_with(dir.path(), &Hasher::new(), &options, Some(&progress))
            .unwrap();
    let sequential = CacheList::from_directory(dir.path(), &Hasher::new()).unwrap();

    assert_eq!(parallel, sequential);
    assert_eq!(progress.phases.load(Ordering::SeqCst), 1);
    assert_eq!(progress.files.load(Ordering::SeqCst), 32);
    assert_eq!(progress.bytes.load(Ordering::SeqCst), (0..32).sum::<usize>());
}

#[test]
fn test_small_buffer_gives_same_hashes() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("big.bin"), vec![7u8; 100_000]).unwrap();

    let default = CacheList::from_directory(dir.path(), &Hasher::new()).unwrap();
    let tiny = CacheList::from_directory(dir.path(), &Hasher::with_buffer_size(17)).unwrap();
    assert_eq!(default, tiny);
    assert_eq!(
        default.get("big.bin").unwrap().hash(),
        blake3::hash(&vec![7u8; 100_000]).as_bytes()
    );
}

#[cfg(unix)]
#[test]
fn test_unreadable_file_fails_the_scan() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempdir().unwrap();
    let locked = dir.path().join("locked.txt");
    fs::write(&locked, "secret").unwrap();
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

    // Root can read anything, in which case there is nothing to test
    if fs::read(&locked).is_ok() {
        return;
    }

    let err = CacheList::from_directory(dir.path(), &Hasher::new()).unwrap_err();
    assert!(matches!(err, CacheError::Hash(_)));
}

/// Deletes a file once listing is done and hashing is about to start.
struct DeletingProgress {
    victim: PathBuf,
    hashed: AtomicUsize,
}

impl ProgressCallback for DeletingProgress {
    fn on_phase_start(&self, _phase: &str, _total: usize) {
        fs::remove_file(&self.victim).unwrap();
    }

    fn on_progress(&self, _current: usize, _path: &str) {
        self.hashed.fetch_add(1, Ordering::SeqCst);
    }

    fn on_phase_end(&self, _phase: &str) {}
}

#[test]
fn test_file_deleted_after_listing_fails_the_scan() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("gone.txt"), "x").unwrap();
    let progress = DeletingProgress {
        victim: dir.path().join("gone.txt"),
        hashed: AtomicUsize::new(0),
    };

    let result = CacheList::from_directory_with(
        dir.path(),
        &Hasher::new(),
        &ScanOptions::default(),
        Some(&progress),
    );

    match result {
        Err(CacheError::Hash(HashError::NotFound(path))) => assert!(path.ends_with("gone.txt")),
        other => panic!("expected a missing-file error, got {:?}", other),
    }
    assert_eq!(progress.hashed.load(Ordering::SeqCst), 0);
}
