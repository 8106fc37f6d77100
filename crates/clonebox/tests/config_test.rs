//! Tests for configuration loading and validation.

use clonebox::{Clonebox, CloneboxConfig, CloneboxErrorKind, DEFAULT_MAX_UPLOAD_BYTES};
use std::path::PathBuf;
use tempfile::TempDir;

fn config_key(err: &clonebox::CloneboxError) -> Option<String> {
    match err.kind() {
        CloneboxErrorKind::Config(e) => e.key.clone(),
        _ => None,
    }
}

#[test]
fn bundled_defaults_match_code_defaults() {
    let bundled = CloneboxConfig::bundled().unwrap();
    assert_eq!(bundled, CloneboxConfig::default());

    assert_eq!(bundled.links.identifier_bytes, 3);
    assert_eq!(bundled.links.max_attempts, 64);
    assert_eq!(bundled.links.latest_limit, 5);
    assert_eq!(bundled.files.max_upload_bytes, Some(DEFAULT_MAX_UPLOAD_BYTES));
    assert_eq!(bundled.files.storage_root, PathBuf::from("/clonebox/uploads"));
    assert!(bundled.database.url.is_none());
    assert_eq!(bundled.logging.level, "info");
}

#[test]
fn file_overrides_layer_over_defaults() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("clonebox.toml");
    std::fs::write(
        &path,
        r#"
[links]
identifier_bytes = 4

[files]
storage_root = "/srv/clonebox"

[database]
url = "postgres://localhost/clonebox_test"
"#,
    )
    .unwrap();

    let config = CloneboxConfig::from_file(&path).unwrap();
    assert_eq!(config.links.identifier_bytes, 4);
    assert_eq!(config.links.max_attempts, 64);
    assert_eq!(config.files.storage_root, PathBuf::from("/srv/clonebox"));
    assert_eq!(
        config.database.resolved_url().unwrap(),
        "postgres://localhost/clonebox_test"
    );
}

#[test]
fn out_of_range_identifier_bytes_is_rejected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("clonebox.toml");
    std::fs::write(&path, "[links]\nidentifier_bytes = 33\n").unwrap();

    let err = CloneboxConfig::from_file(&path).unwrap_err();
    assert_eq!(config_key(&err).as_deref(), Some("links.identifier_bytes"));
}

#[test]
fn zero_max_attempts_is_rejected() {
    let mut config = CloneboxConfig::default();
    config.links.max_attempts = 0;

    let err = config.validate().unwrap_err();
    assert_eq!(config_key(&err).as_deref(), Some("links.max_attempts"));
}

#[test]
fn missing_file_is_an_error() {
    let dir = TempDir::new().unwrap();
    let err = CloneboxConfig::from_file(dir.path().join("absent.toml")).unwrap_err();
    assert!(matches!(err.kind(), CloneboxErrorKind::Config(_)));
}

#[tokio::test]
async fn identifier_length_follows_configuration() {
    let mut config = CloneboxConfig::default();
    config.links.identifier_bytes = 5;
    let app = Clonebox::in_memory(config).unwrap();

    let shortened = app.links().shorten_link("https://example.com").await.unwrap();
    assert_eq!(shortened.identifier().as_str().len(), 10);
    assert!(shortened.identifier().as_str().starts_with("100680"));
}

#[test]
fn invalid_configuration_blocks_assembly() {
    let mut config = CloneboxConfig::default();
    config.links.identifier_bytes = 0;
    assert!(Clonebox::in_memory(config).is_err());
}
