//! Integration tests for layered configuration loading

use super::test_utils::with_env;
use replicate::config::{ConfigLoader, ReplicateConfig};
use replicate::error::ConfigError;
use std::fs;
use tempfile::TempDir;

fn write_config(dir: &TempDir, body: &str) -> std::path::PathBuf {
    let path = dir.path().join("replicate.toml");
    fs::write(&path, body).unwrap();
    path
}

#[test]
fn test_explicit_file_overrides_defaults() {
    let temp = TempDir::new().unwrap();
    let path = write_config(
        &temp,
        r#"
[sync]
guard_missing_source = true
chunk_size = 4096

[logging]
format = "json"
"#,
    );

    let config = with_env(&[], || ConfigLoader::load(Some(&path))).unwrap();
    assert!(config.sync.guard_missing_source);
    assert_eq!(config.sync.chunk_size, 4096);
    assert_eq!(config.logging.format, "json");
    assert_eq!(config.logging.level, "info");
}

#[test]
fn test_environment_overrides_file() {
    let temp = TempDir::new().unwrap();
    let path = write_config(&temp, "[sync]\nchunk_size = 4096\n");

    let config = with_env(
        &[
            ("REPLICATE_SYNC__CHUNK_SIZE", "8192"),
            ("REPLICATE_SYNC__FINGERPRINT_CACHE", "true"),
        ],
        || ConfigLoader::load(Some(&path)),
    )
    .unwrap();

    assert_eq!(config.sync.chunk_size, 8192);
    assert!(config.sync.fingerprint_cache);
}

#[test]
fn test_invalid_environment_value_is_a_config_error() {
    let temp = TempDir::new().unwrap();
    let path = write_config(&temp, "");

    let err = with_env(&[("REPLICATE_SYNC__CHUNK_SIZE", "0")], || {
        ConfigLoader::load(Some(&path))
    })
    .unwrap_err();
    assert!(matches!(err, ConfigError::InvalidValue { .. }));
}

#[test]
fn test_interval_from_environment_is_rejected() {
    let temp = TempDir::new().unwrap();
    let path = write_config(&temp, "");

    let err = with_env(&[("REPLICATE_SYNC__INTERVAL", "2h")], || {
        ConfigLoader::load(Some(&path))
    })
    .unwrap_err();
    assert!(matches!(err, ConfigError::Load(_)));
}

#[test]
fn test_missing_explicit_file_is_rejected() {
    let temp = TempDir::new().unwrap();
    let err = ConfigLoader::load(Some(&temp.path().join("absent.toml"))).unwrap_err();
    assert!(matches!(err, ConfigError::Load(_)));
}

#[cfg(target_os = "linux")]
#[test]
fn test_global_file_sits_below_explicit_file() {
    let temp = TempDir::new().unwrap();
    let global_dir = temp.path().join("xdg").join("replicate");
    fs::create_dir_all(&global_dir).unwrap();
    fs::write(
        global_dir.join("config.toml"),
        "[sync]\nchunk_size = 1024\npreserve_mtime = false\n",
    )
    .unwrap();
    let explicit = write_config(&temp, "[sync]\nchunk_size = 2048\n");
    let xdg = temp.path().join("xdg");

    let (global_only, layered) = with_env(&[("XDG_CONFIG_HOME", xdg.to_str().unwrap())], || {
        (
            ConfigLoader::load(None).unwrap(),
            ConfigLoader::load(Some(&explicit)).unwrap(),
        )
    });

    assert_eq!(global_only.sync.chunk_size, 1024);
    assert!(!global_only.sync.preserve_mtime);
    assert_eq!(layered.sync.chunk_size, 2048);
    assert!(!layered.sync.preserve_mtime);
}

#[test]
fn test_config_serializes_round_trip_through_json() {
    let config = ReplicateConfig::default();
    let json = serde_json::to_string(&config).unwrap();
    let parsed: ReplicateConfig = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed.sync.chunk_size, config.sync.chunk_size);
    assert_eq!(parsed.logging.level, config.logging.level);
}
