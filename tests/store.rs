use std::fs;

use assert_matches::assert_matches;
use camino::Utf8PathBuf;
use serde_json::json;

use appstash::document::MetadataDocument;
use appstash::domain::{BundleId, Locale};
use appstash::error::StashError;
use appstash::store::Store;

fn test_store(temp: &tempfile::TempDir) -> Store {
    Store::new_with_paths(
        Utf8PathBuf::from_path_buf(temp.path().join("data")).unwrap(),
        Utf8PathBuf::from_path_buf(temp.path().join("out")).unwrap(),
    )
}

fn document(name: &str) -> MetadataDocument {
    MetadataDocument::from_result(json!({
        "trackCensoredName": name,
        "artworkUrl100": "https://cdn.example/icon.png",
    }))
    .unwrap()
}

#[test]
fn layout_paths() {
    let store = test_store(&tempfile::tempdir().unwrap());
    let id: BundleId = "com.example.App".parse().unwrap();
    let locale: Locale = "de".parse().unwrap();

    assert!(
        store
            .document_path(&id, &locale)
            .ends_with("apps/com.example.App/info_de.json")
    );
    assert!(store.icon_path(&id).ends_with("app/com.example.App/icon.png"));
}

#[test]
fn document_round_trip_leaves_no_temp_files() {
    let temp = tempfile::tempdir().unwrap();
    let store = test_store(&temp);
    let id: BundleId = "com.example.App".parse().unwrap();
    let locale: Locale = "us".parse().unwrap();

    assert!(!store.document_exists(&id, &locale));
    store.write_document(&id, &locale, &document("Example App")).unwrap();
    assert!(store.document_exists(&id, &locale));

    let back = store.read_document(&id, &locale).unwrap();
    assert_eq!(back.display_name(), Some("Example App"));

    let entries: Vec<_> = fs::read_dir(store.app_dir(&id).as_std_path())
        .unwrap()
        .map(|entry| entry.unwrap().file_name().into_string().unwrap())
        .collect();
    assert_eq!(entries, vec!["info_us.json"]);
}

#[test]
fn write_document_overwrites() {
    let temp = tempfile::tempdir().unwrap();
    let store = test_store(&temp);
    let id: BundleId = "com.example.App".parse().unwrap();
    let locale: Locale = "us".parse().unwrap();

    store.write_document(&id, &locale, &document("v1")).unwrap();
    store.write_document(&id, &locale, &document("v2")).unwrap();

    let back = store.read_document(&id, &locale).unwrap();
    assert_eq!(back.display_name(), Some("v2"));
}

#[test]
fn icon_round_trip() {
    let temp = tempfile::tempdir().unwrap();
    let store = test_store(&temp);
    let id: BundleId = "com.example.App".parse().unwrap();

    assert!(!store.icon_exists(&id));
    store.write_icon(&id, b"first").unwrap();
    assert!(store.icon_exists(&id));
    store.write_icon(&id, b"second").unwrap();
    assert_eq!(
        fs::read(store.icon_path(&id).as_std_path()).unwrap(),
        b"second"
    );
}

#[test]
fn read_missing_document_is_not_found() {
    let temp = tempfile::tempdir().unwrap();
    let store = test_store(&temp);
    let id: BundleId = "com.example.App".parse().unwrap();
    let locale: Locale = "us".parse().unwrap();

    let err = store.read_document(&id, &locale).unwrap_err();
    assert_matches!(err, StashError::DocumentNotFound { .. });
}

#[test]
fn read_corrupt_document_is_a_filesystem_error() {
    let temp = tempfile::tempdir().unwrap();
    let store = test_store(&temp);
    let id: BundleId = "com.example.App".parse().unwrap();
    let locale: Locale = "us".parse().unwrap();

    let path = store.document_path(&id, &locale);
    fs::create_dir_all(path.parent().unwrap().as_std_path()).unwrap();
    fs::write(path.as_std_path(), b"{ not json").unwrap();

    let err = store.read_document(&id, &locale).unwrap_err();
    assert_matches!(err, StashError::Filesystem(_));
}

#[test]
fn list_known_ids_requires_documents() {
    let temp = tempfile::tempdir().unwrap();
    let store = test_store(&temp);
    assert!(store.list_known_ids().unwrap().is_empty());

    let zebra: BundleId = "org.zzz.Tool".parse().unwrap();
    let alpha: BundleId = "com.aaa.App".parse().unwrap();
    let us: Locale = "us".parse().unwrap();
    let de: Locale = "de".parse().unwrap();
    store.write_document(&zebra, &us, &document("Zebra")).unwrap();
    store.write_document(&alpha, &de, &document("Alpha")).unwrap();

    let empty: BundleId = "com.empty.App".parse().unwrap();
    fs::create_dir_all(store.app_dir(&empty).as_std_path()).unwrap();
    fs::create_dir_all(store.data_root().join("apps").join("junkname").as_std_path()).unwrap();

    let ids = store.list_known_ids().unwrap();
    assert_eq!(ids, vec![alpha, zebra]);
}

#[test]
fn cached_locales_preserves_order() {
    let temp = tempfile::tempdir().unwrap();
    let store = test_store(&temp);
    let id: BundleId = "com.example.App".parse().unwrap();
    let us: Locale = "us".parse().unwrap();
    let de: Locale = "de".parse().unwrap();
    store.write_document(&id, &de, &document("Beispiel")).unwrap();

    let locales = store.cached_locales(&id, &[us.clone(), de.clone()]);
    assert_eq!(locales, vec![de.clone()]);

    store.write_document(&id, &us, &document("Example")).unwrap();
    let locales = store.cached_locales(&id, &[us.clone(), de.clone()]);
    assert_eq!(locales, vec![us, de]);
}
