// ABOUTME: Integration tests for config file loading and discovery.
// ABOUTME: Validates YAML parsing, defaults, file discovery order, and validation errors.

use dockwright::config::{BackoffConfig, CONFIG_FILENAME, CONFIG_FILENAME_DIR, Config};
use dockwright::error::Error;
use dockwright::retry::Backoff;
use std::fs;
use std::time::Duration;
use tempfile::TempDir;

const FULL_CONFIG: &str = r#"
lifecycle:
  install_shutdown_hook: true
  cleanup_on_shutdown: false
  stop_timeout: 15s
  shutdown_stop_timeout: 1s

retry:
  max_attempts: 5
  backoff:
    kind: exponential
    initial: 250ms
    multiplier: 1.5
    max: 5s
"#;

#[test]
fn parses_full_config() {
    let config = Config::from_yaml(FULL_CONFIG).unwrap();

    assert!(config.lifecycle.install_shutdown_hook);
    assert!(!config.lifecycle.cleanup_on_shutdown);
    assert_eq!(config.lifecycle.stop_timeout, Duration::from_secs(15));
    assert_eq!(config.lifecycle.shutdown_stop_timeout, Duration::from_secs(1));

    let policy = config.retry.to_policy().unwrap();
    assert_eq!(policy.max_attempts(), 5);
    assert_eq!(
        policy.backoff(),
        Backoff::exponential(Duration::from_millis(250), 1.5, Duration::from_secs(5))
    );
}

#[test]
fn fixed_backoff() {
    let config = Config::from_yaml("retry:\n  backoff:\n    kind: fixed\n    delay: 2s\n").unwrap();
    assert_eq!(
        config.retry.backoff,
        BackoffConfig::Fixed {
            delay: Duration::from_secs(2)
        }
    );
    assert_eq!(config.retry.max_attempts, 3);
}

#[test]
fn zero_attempts_is_invalid() {
    let err = Config::from_yaml("retry:\n  max_attempts: 0\n").unwrap_err();
    assert!(matches!(err, Error::InvalidConfig(_)));
}

#[test]
fn shutdown_grace_above_limit_is_invalid() {
    let err = Config::from_yaml("lifecycle:\n  shutdown_stop_timeout: 30s\n").unwrap_err();
    assert!(err.to_string().contains("shutdown_stop_timeout"));
}

#[test]
fn unknown_backoff_kind_is_invalid() {
    let err = Config::from_yaml("retry:\n  backoff:\n    kind: random\n").unwrap_err();
    assert!(matches!(err, Error::InvalidConfig(_)));
}

#[test]
fn discover_finds_nothing_in_empty_dir() {
    let dir = TempDir::new().unwrap();
    assert!(Config::discover(dir.path()).unwrap().is_none());
}

#[test]
fn discover_prefers_top_level_file() {
    let dir = TempDir::new().unwrap();
    fs::create_dir_all(dir.path().join(".dockwright")).unwrap();
    fs::write(
        dir.path().join(CONFIG_FILENAME_DIR),
        "lifecycle:\n  stop_timeout: 1s\n",
    )
    .unwrap();
    fs::write(
        dir.path().join(CONFIG_FILENAME),
        "lifecycle:\n  stop_timeout: 7s\n",
    )
    .unwrap();

    let config = Config::discover(dir.path()).unwrap().unwrap();
    assert_eq!(config.lifecycle.stop_timeout, Duration::from_secs(7));
}

#[test]
fn discover_falls_back_to_config_dir() {
    let dir = TempDir::new().unwrap();
    fs::create_dir_all(dir.path().join(".dockwright")).unwrap();
    fs::write(
        dir.path().join(CONFIG_FILENAME_DIR),
        "lifecycle:\n  stop_timeout: 1s\n",
    )
    .unwrap();

    let config = Config::discover(dir.path()).unwrap().unwrap();
    assert_eq!(config.lifecycle.stop_timeout, Duration::from_secs(1));
}

#[test]
fn load_error_names_the_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("broken.yml");
    fs::write(&path, "lifecycle: [").unwrap();

    let err = Config::load(&path).unwrap_err();
    assert!(err.to_string().contains("broken.yml"));
}

#[test]
fn load_of_missing_file_is_io_error() {
    let dir = TempDir::new().unwrap();
    let err = Config::load(&dir.path().join("absent.yml")).unwrap_err();
    assert!(matches!(err, Error::Io(_)));
}
