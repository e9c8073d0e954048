//! Configuration files and manager construction.

use crate::*;
use std::io::Write;
use tempfile::NamedTempFile;

fn write_config(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("Failed to create temp file");
    file.write_all(contents.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

#[test]
fn test_manager_from_local_config_file() {
    let file = write_config(
        r#"
        [backend]
        type = "local"

        [default_specs]
        max_size = 500
        time_to_live_minutes = 5

        [specs.device-by-id]
        max_size = 1000
        time_to_live_minutes = 10
        stats_enabled = true
        "#,
    );
    let manager = CacheManager::from_file(file.path()).unwrap();
    assert!(!manager.is_remote());
    assert_eq!(manager.config().specs_for("device-by-id").max_size, 1000);
    assert_eq!(manager.config().specs_for("other").max_size, 500);

    let devices: Cache<String, Device> = manager.build_cache("device-by-id").unwrap();
    devices.get(&key("dev-1")).unwrap();
    assert_eq!(devices.stats().misses, 1);
}

#[test]
fn test_manager_from_remote_config_file() {
    let file = write_config(
        r#"
        [backend]
        type = "remote"
        url = "redis://127.0.0.1:1/"
        codec = "msgpack"
        "#,
    );
    let manager = CacheManager::from_file(file.path()).unwrap();
    assert!(manager.is_remote());
    // Building opens no connection
    let _devices: Cache<String, Device> = manager.build_cache("device-by-id").unwrap();
    assert_eq!(manager.idle_connections(), 0);
}

#[test]
fn test_unreachable_remote_surfaces_error() {
    let manager = CacheManager::new(CacheConfig::remote("redis://127.0.0.1:1/")).unwrap();
    let devices: Cache<String, Device> = manager.build_cache("device-by-id").unwrap();
    let err = devices.get(&key("dev-1")).unwrap_err();
    assert!(err.is_remote());
}

#[test]
fn test_malformed_config_file() {
    let file = write_config("[backend\ntype = ");
    assert!(matches!(
        CacheManager::from_file(file.path()),
        Err(CacheError::Config(_))
    ));
}

#[test]
fn test_missing_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let result = CacheManager::from_file(dir.path().join("absent.toml"));
    assert!(matches!(result, Err(CacheError::Io(_))));
}

#[test]
fn test_zero_evict_ttl_rejected() {
    let file = write_config(
        r#"
        [backend]
        type = "remote"
        url = "redis://127.0.0.1/"
        evict_ttl_ms = 0
        "#,
    );
    assert!(CacheManager::from_file(file.path()).is_err());
}
