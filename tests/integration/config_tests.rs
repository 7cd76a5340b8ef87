use clap::Parser;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use hashcheck::cli::{Cli, Commands, OutputFormat};
use hashcheck::config::Config;
use std::fs;
use std::path::PathBuf;
use tempfile::tempdir;

use crate::ENV_MUTEX;

/// Clear all HASHCHECK_* environment variables to avoid interference.
fn clear_env() {
    for (key, _) in std::env::vars() {
        if key.starts_with("HASHCHECK_") {
            std::env::remove_var(key);
        }
    }
}

#[test]
fn test_config_load_defaults() {
    let figment = Figment::from(Serialized::defaults(Config::default()));
    let config: Config = figment.extract().unwrap();
    assert_eq!(config, Config::default());
    assert_eq!(config.cache_file, PathBuf::from("hashlist.txt"));
    assert_eq!(config.io_threads, 1);
}

#[test]
fn test_config_load_from_toml() {
    let _lock = ENV_MUTEX.lock().unwrap();
    clear_env();
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("config.toml");

    let toml_content = r#"
cache_file = ".hashes"
io_threads = 4
buffer_size = 4096
skip_hidden = true
ignore_patterns = ["*.tmp", "Thumbs.db"]
output = "json"
"#;
    fs::write(&config_path, toml_content).unwrap();

    let config = Config::load_from_path(&config_path);
    assert_eq!(config.cache_file, PathBuf::from(".hashes"));
    assert_eq!(config.io_threads, 4);
    assert_eq!(config.buffer_size, 4096);
    assert!(config.skip_hidden);
    assert!(!config.follow_symlinks);
    assert_eq!(config.ignore_patterns, vec!["*.tmp", "Thumbs.db"]);
    assert_eq!(config.output, OutputFormat::Json);
    assert_eq!(config.hasher().buffer_size(), 4096);
}

#[test]
fn test_config_missing_file_uses_defaults() {
    let _lock = ENV_MUTEX.lock().unwrap();
    clear_env();
    let temp_dir = tempdir().unwrap();

    let config = Config::load_from_path(temp_dir.path().join("nonexistent.toml"));
    assert_eq!(config, Config::default());
}

#[test]
fn test_config_invalid_toml() {
    let _lock = ENV_MUTEX.lock().unwrap();
    clear_env();
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("config.toml");
    fs::write(&config_path, "io_threads = \"many\"").unwrap();

    assert!(Config::try_load_from_path(&config_path).is_err());
    assert_eq!(Config::load_from_path(&config_path), Config::default());
}

#[test]
fn test_env_overrides_file() {
    let _lock = ENV_MUTEX.lock().unwrap();
    clear_env();
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("config.toml");
    fs::write(&config_path, "io_threads = 2\ncache_file = \"from-file.txt\"\n").unwrap();

    std::env::set_var("HASHCHECK_IO_THREADS", "6");
    std::env::set_var("HASHCHECK_OUTPUT", "json");
    let config = Config::load_from_path(&config_path);
    clear_env();

    assert_eq!(config.io_threads, 6);
    assert_eq!(config.output, OutputFormat::Json);
    assert_eq!(config.cache_file, PathBuf::from("from-file.txt"));
}

#[test]
fn test_env_layer_directly() {
    let _lock = ENV_MUTEX.lock().unwrap();
    clear_env();
    std::env::set_var("HASHCHECK_SKIP_HIDDEN", "true");

    let figment =
        Figment::from(Serialized::defaults(Config::default())).merge(Env::prefixed("HASHCHECK_"));
    let config: Config = figment.extract().unwrap();
    clear_env();

    assert!(config.skip_hidden);
}

#[test]
fn test_hierarchy_file_env_cli() {
    let _lock = ENV_MUTEX.lock().unwrap();
    clear_env();
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("config.toml");
    fs::write(&config_path, "io_threads = 2\ncache_file = \"file.txt\"\n").unwrap();
    std::env::set_var("HASHCHECK_CACHE_FILE", "env.txt");

    let mut config = Config::load_from_path(&config_path);
    clear_env();
    assert_eq!(config.cache_file, PathBuf::from("env.txt"));

    let cli = Cli::try_parse_from([
        "hashcheck",
        "scan",
        "/data",
        "--cache",
        "cli.txt",
        "--io-threads",
        "3",
    ])
    .unwrap();
    if let Commands::Scan(args) = &cli.command {
        config.merge_cache_args(&args.cache);
        config.merge_walk_args(&args.walk);
    }

    assert_eq!(config.cache_file, PathBuf::from("cli.txt"));
    assert_eq!(config.io_threads, 3);
    assert_eq!(
        config.cache_path(std::path::Path::new("/data")),
        PathBuf::from("/data/cli.txt")
    );
}

#[test]
fn test_config_serializes_to_toml() {
    let config = Config {
        io_threads: 2,
        ignore_patterns: vec!["*.bak".to_string()],
        ..Default::default()
    };
    let content = toml::to_string_pretty(&config).unwrap();
    assert!(content.contains("io_threads = 2"));
    assert!(content.contains("output = \"text\""));

    let figment = Figment::from(Serialized::defaults(Config::default())).merge(Toml::string(&content));
    let reloaded: Config = figment.extract().unwrap();
    assert_eq!(reloaded, config);
}
