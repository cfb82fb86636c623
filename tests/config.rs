use std::fs;

use assert_matches::assert_matches;

use appstash::config::{Config, ConfigLoader, default_strip_fields};
use appstash::error::StashError;

#[test]
fn parse_config_from_json() {
    let config: Config = serde_json::from_str(
        r#"{
            "locales": ["us", "fr"],
            "workers": 2,
            "media_root": "/srv/icons"
        }"#,
    )
    .unwrap();

    let resolved = ConfigLoader::resolve_config(config).unwrap();
    assert_eq!(resolved.locales.len(), 2);
    assert_eq!(resolved.locales[1].as_str(), "fr");
    assert_eq!(resolved.workers, 2);
    assert_eq!(resolved.strip_fields, default_strip_fields());
    assert_eq!(resolved.data_root, None);
    assert_eq!(
        resolved.media_root.as_ref().map(|path| path.as_str()),
        Some("/srv/icons")
    );
}

#[test]
fn resolve_without_file_uses_defaults() {
    let resolved = ConfigLoader::resolve(None).unwrap();
    assert_eq!(resolved.locales[0].as_str(), "us");
    assert_eq!(resolved.locales[1].as_str(), "de");
    assert_eq!(resolved.workers, 4);
}

#[test]
fn resolve_explicit_missing_file_fails() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("nope.json");
    let err = ConfigLoader::resolve(path.to_str()).unwrap_err();
    assert_matches!(err, StashError::ConfigRead(_));
}

#[test]
fn resolve_rejects_malformed_json() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("appstash.json");
    fs::write(&path, b"{ locales: oops").unwrap();
    let err = ConfigLoader::resolve(path.to_str()).unwrap_err();
    assert_matches!(err, StashError::ConfigParse(_));
}

#[test]
fn resolve_reads_explicit_file() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("custom.json");
    fs::write(&path, br#"{"locales": ["jp"], "strip_fields": []}"#).unwrap();

    let resolved = ConfigLoader::resolve(path.to_str()).unwrap();
    assert_eq!(resolved.locales.len(), 1);
    assert_eq!(resolved.locales[0].as_str(), "jp");
    assert!(resolved.strip_fields.is_empty());
}
