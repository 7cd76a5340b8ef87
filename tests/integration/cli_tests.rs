use clap::Parser;
use hashcheck::cache::CacheList;
use hashcheck::cli::Cli;
use hashcheck::error::ExitCode;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, UNIX_EPOCH};
use tempfile::{tempdir, TempDir};

use crate::ENV_MUTEX;

struct Fixture {
    data: TempDir,
    config: TempDir,
}

impl Fixture {
    fn new() -> Self {
        let fixture = Self {
            data: tempdir().unwrap(),
            config: tempdir().unwrap(),
        };
        fixture.write("a.txt", b"x", 0);
        fixture.write("b.txt", b"y", 0);
        fixture
    }

    fn dir(&self) -> &Path {
        self.data.path()
    }

    fn cache_path(&self) -> PathBuf {
        self.dir().join("hashlist.txt")
    }

    fn write(&self, name: &str, content: &[u8], offset_secs: u64) {
        let path = self.dir().join(name);
        fs::write(&path, content).unwrap();
        let time = UNIX_EPOCH + Duration::from_secs(1_600_000_000 + offset_secs);
        filetime::set_file_mtime(&path, filetime::FileTime::from_system_time(time)).unwrap();
    }

    /// Run the CLI quietly with an isolated (empty) configuration file.
    fn run(&self, args: &[&str]) -> anyhow::Result<ExitCode> {
        let config = self.config.path().join("config.toml");
        let dir = self.dir().to_str().unwrap().to_string();
        let mut argv = vec![
            "hashcheck".to_string(),
            "-q".to_string(),
            "--config".to_string(),
            config.to_str().unwrap().to_string(),
        ];
        for arg in args {
            argv.push(arg.replace("{dir}", &dir));
        }
        hashcheck::run_app(Cli::try_parse_from(argv).unwrap())
    }

    fn cached_names(&self) -> Vec<String> {
        let list = CacheList::from_persisted_file(self.dir(), &self.cache_path()).unwrap();
        list.iter().map(|e| e.name().to_string()).collect()
    }
}

fn sorted(mut names: Vec<String>) -> Vec<String> {
    names.sort();
    names
}

#[test]
fn test_scan_then_clean_check() {
    let _lock = ENV_MUTEX.lock().unwrap();
    let fixture = Fixture::new();

    assert_eq!(fixture.run(&["scan", "{dir}"]).unwrap(), ExitCode::Success);
    assert!(fixture.cache_path().exists());
    assert_eq!(sorted(fixture.cached_names()), vec!["a.txt", "b.txt"]);

    // The cache file never lists itself
    assert_eq!(fixture.run(&["scan", "{dir}"]).unwrap(), ExitCode::Success);
    assert_eq!(sorted(fixture.cached_names()), vec!["a.txt", "b.txt"]);

    assert_eq!(fixture.run(&["check", "{dir}"]).unwrap(), ExitCode::Success);
}

#[test]
fn test_check_reports_changes_until_committed() {
    let _lock = ENV_MUTEX.lock().unwrap();
    let fixture = Fixture::new();
    fixture.run(&["scan", "{dir}"]).unwrap();

    fixture.write("a.txt", b"changed", 60);
    assert_eq!(
        fixture.run(&["check", "{dir}"]).unwrap(),
        ExitCode::ChangesDetected
    );
    // Checking alone leaves the cache untouched
    assert_eq!(
        fixture.run(&["check", "{dir}", "-o", "json"]).unwrap(),
        ExitCode::ChangesDetected
    );

    assert_eq!(
        fixture.run(&["check", "{dir}", "--commit"]).unwrap(),
        ExitCode::ChangesDetected
    );
    assert_eq!(fixture.run(&["check", "{dir}"]).unwrap(), ExitCode::Success);
}

#[test]
fn test_check_commit_drops_deleted_files() {
    let _lock = ENV_MUTEX.lock().unwrap();
    let fixture = Fixture::new();
    fixture.run(&["scan", "{dir}"]).unwrap();

    fs::remove_file(fixture.dir().join("b.txt")).unwrap();
    assert_eq!(
        fixture.run(&["check", "{dir}", "--commit"]).unwrap(),
        ExitCode::ChangesDetected
    );
    assert_eq!(fixture.cached_names(), vec!["a.txt"]);
}

#[test]
fn test_update_prune_and_add_new() {
    let _lock = ENV_MUTEX.lock().unwrap();
    let fixture = Fixture::new();
    fixture.run(&["scan", "{dir}"]).unwrap();

    fs::remove_file(fixture.dir().join("a.txt")).unwrap();
    fixture.write("c.txt", b"z", 0);

    let err = fixture.run(&["update", "{dir}"]).unwrap_err();
    assert!(err.to_string().contains("--prune"));

    assert_eq!(
        fixture.run(&["update", "{dir}", "--prune", "--add-new"]).unwrap(),
        ExitCode::Success
    );
    assert_eq!(fixture.cached_names(), vec!["b.txt", "c.txt"]);
    assert_eq!(fixture.run(&["check", "{dir}"]).unwrap(), ExitCode::Success);
}

#[test]
fn test_custom_cache_location() {
    let _lock = ENV_MUTEX.lock().unwrap();
    let fixture = Fixture::new();
    let elsewhere = tempdir().unwrap();
    let cache = elsewhere.path().join("custom.txt");
    let cache = cache.to_str().unwrap();

    fixture.run(&["scan", "{dir}", "--cache", cache]).unwrap();
    assert!(!fixture.cache_path().exists());
    assert_eq!(
        fixture.run(&["check", "{dir}", "--cache", cache]).unwrap(),
        ExitCode::Success
    );
}

#[test]
fn test_check_without_cache_fails() {
    let _lock = ENV_MUTEX.lock().unwrap();
    let fixture = Fixture::new();

    let err = fixture.run(&["check", "{dir}"]).unwrap_err();
    assert!(format!("{:#}", err).contains("hashcheck scan"));
}

#[test]
fn test_corrupt_cache_fails_check() {
    let _lock = ENV_MUTEX.lock().unwrap();
    let fixture = Fixture::new();
    fs::write(fixture.cache_path(), "a.txt\t1\n").unwrap();

    let err = fixture.run(&["check", "{dir}"]).unwrap_err();
    assert!(format!("{:#}", err).contains("Malformed cache line"));
}
