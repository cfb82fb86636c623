use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::catalog::CatalogClient;
use crate::config::ResolvedConfig;
use crate::document::MetadataDocument;
use crate::domain::{BundleId, Locale, Selection};
use crate::error::StashError;
use crate::store::Store;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    Skipped,
    Fetched { created: bool },
    Failed(FailureKind),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    NotFound,
    Transport(String),
    Timeout,
    Schema(String),
    MissingMetadata,
    Storage(String),
}

impl FailureKind {
    fn from_error(err: StashError) -> Self {
        match err {
            StashError::CatalogTimeout(_) => FailureKind::Timeout,
            StashError::CatalogSchema(message) => FailureKind::Schema(message),
            StashError::CatalogHttp(message) => FailureKind::Transport(message),
            StashError::CatalogStatus { status, message } => {
                FailureKind::Transport(format!("status {status}: {message}"))
            }
            StashError::Filesystem(message) => FailureKind::Storage(message),
            other => FailureKind::Transport(other.to_string()),
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::NotFound => write!(f, "no catalog entry"),
            FailureKind::Transport(message) => write!(f, "transport: {message}"),
            FailureKind::Timeout => write!(f, "timed out"),
            FailureKind::Schema(message) => write!(f, "schema: {message}"),
            FailureKind::MissingMetadata => write!(f, "no cached metadata for icon URL"),
            FailureKind::Storage(message) => write!(f, "storage: {message}"),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchOutcome {
    pub processed: usize,
    pub newly_created: BTreeSet<BundleId>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ListResult {
    pub apps: Vec<ListEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ListEntry {
    pub id: String,
    pub locales: Vec<String>,
    pub icon: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct InfoResult {
    pub id: String,
    pub locales: Vec<String>,
    pub icon: bool,
    pub names: BTreeMap<String, String>,
    pub genres: Vec<(String, String)>,
}

#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub message: String,
    pub elapsed: Option<Duration>,
}

pub trait ProgressSink: Send + Sync {
    fn event(&self, event: ProgressEvent);
}

#[derive(Clone)]
pub struct App<C: CatalogClient> {
    store: Store,
    catalog: C,
    config: ResolvedConfig,
}

impl<C: CatalogClient> App<C> {
    pub fn new(store: Store, catalog: C, config: ResolvedConfig) -> Self {
        Self {
            store,
            catalog,
            config,
        }
    }

    pub fn process_one(&self, raw_id: &str, force: bool, sink: &dyn ProgressSink) -> bool {
        let id = match raw_id.parse::<BundleId>() {
            Ok(id) => id,
            Err(err) => {
                tracing::warn!(source = "catalog-fetch", id = raw_id, error = %err, "skipping invalid bundle id");
                sink.event(ProgressEvent {
                    message: format!("{raw_id} => invalid id"),
                    elapsed: None,
                });
                return false;
            }
        };

        if !force && self.store.icon_exists(&id) {
            sink.event(ProgressEvent {
                message: format!("{id} => cached"),
                elapsed: None,
            });
            return false;
        }

        let mut line = format!("{id} =>");
        for locale in &self.config.locales {
            let outcome = self.fetch_metadata(&id, locale, force);
            match &outcome {
                FetchOutcome::Failed(FailureKind::NotFound) => {
                    tracing::debug!(source = "catalog-fetch", id = %id, locale = %locale, "no catalog entry for locale");
                }
                FetchOutcome::Failed(kind) => {
                    tracing::warn!(source = "catalog-fetch", id = %id, locale = %locale, error = %kind, "metadata fetch failed");
                }
                _ => {}
            }
            line.push_str(&format!(" {locale}[{}]", marker(&outcome)));
        }

        let outcome = self.fetch_icon(&id, force);
        if let FetchOutcome::Failed(kind) = &outcome {
            tracing::warn!(source = "icon-fetch", id = %id, error = %kind, "icon fetch failed");
        }
        line.push_str(&format!(" icon[{}]", marker(&outcome)));

        sink.event(ProgressEvent {
            message: line,
            elapsed: None,
        });
        matches!(outcome, FetchOutcome::Fetched { created: true })
    }

    pub fn fetch_metadata(&self, id: &BundleId, locale: &Locale, force: bool) -> FetchOutcome {
        if !force && self.store.document_exists(id, locale) {
            return FetchOutcome::Skipped;
        }

        let reply = match self.catalog.lookup(id, locale) {
            Ok(reply) => reply,
            Err(err) => return FetchOutcome::Failed(FailureKind::from_error(err)),
        };
        let Some(result) = reply.results.into_iter().next() else {
            return FetchOutcome::Failed(FailureKind::NotFound);
        };
        let mut document = match MetadataDocument::from_result(result) {
            Ok(document) => document,
            Err(err) => return FetchOutcome::Failed(FailureKind::from_error(err)),
        };
        document.prune(&self.config.strip_fields);

        let created = !self.store.document_exists(id, locale);
        if let Err(err) = self.store.write_document(id, locale, &document) {
            return FetchOutcome::Failed(FailureKind::from_error(err));
        }
        FetchOutcome::Fetched { created }
    }

    pub fn fetch_icon(&self, id: &BundleId, force: bool) -> FetchOutcome {
        if !force && self.store.icon_exists(id) {
            return FetchOutcome::Skipped;
        }

        let Some(document) = self.first_cached_document(id) else {
            return FetchOutcome::Failed(FailureKind::MissingMetadata);
        };
        let Some(url) = document.icon_url() else {
            return FetchOutcome::Failed(FailureKind::Schema(
                "artworkUrl100 missing from cached document".to_string(),
            ));
        };
        let content = match self.catalog.download_asset(url) {
            Ok(content) => content,
            Err(err) => return FetchOutcome::Failed(FailureKind::from_error(err)),
        };

        let created = !self.store.icon_exists(id);
        if let Err(err) = self.store.write_icon(id, &content) {
            return FetchOutcome::Failed(FailureKind::from_error(err));
        }
        FetchOutcome::Fetched { created }
    }

    pub fn process_many(
        &self,
        selection: &Selection,
        force: bool,
        sink: &dyn ProgressSink,
    ) -> Result<BatchOutcome, StashError> {
        let ids: Vec<String> = match selection {
            Selection::All => self
                .store
                .list_known_ids()?
                .iter()
                .map(|id| id.to_string())
                .collect(),
            Selection::Ids(ids) => ids.clone(),
        };

        let started = Instant::now();
        let workers = self.config.workers.min(ids.len()).max(1);
        sink.event(ProgressEvent {
            message: format!("fetching {} app(s) with {} worker(s)", ids.len(), workers),
            elapsed: None,
        });

        let cursor = AtomicUsize::new(0);
        let mut newly_created = BTreeSet::new();
        thread::scope(|scope| {
            let handles: Vec<_> = (0..workers)
                .map(|_| {
                    scope.spawn(|| {
                        let mut local = BTreeSet::new();
                        loop {
                            let index = cursor.fetch_add(1, Ordering::Relaxed);
                            let Some(raw_id) = ids.get(index) else { break };
                            if self.process_one(raw_id, force, sink) {
                                if let Ok(id) = raw_id.parse::<BundleId>() {
                                    local.insert(id);
                                }
                            }
                        }
                        local
                    })
                })
                .collect();
            for handle in handles {
                if let Ok(local) = handle.join() {
                    newly_created.extend(local);
                }
            }
        });

        sink.event(ProgressEvent {
            message: format!(
                "processed {} app(s), {} new icon(s)",
                ids.len(),
                newly_created.len()
            ),
            elapsed: Some(started.elapsed()),
        });

        Ok(BatchOutcome {
            processed: ids.len(),
            newly_created,
        })
    }

    pub fn download_missing_icons(&self, sink: &dyn ProgressSink) -> Result<BatchOutcome, StashError> {
        let mut processed = 0usize;
        let mut newly_created = BTreeSet::new();
        for id in self.store.list_known_ids()? {
            if self.store.icon_exists(&id) {
                continue;
            }
            processed += 1;
            let outcome = self.fetch_icon(&id, false);
            if let FetchOutcome::Failed(kind) = &outcome {
                tracing::warn!(source = "icon-fetch", id = %id, error = %kind, "icon fetch failed");
            }
            sink.event(ProgressEvent {
                message: format!("{id} => icon[{}]", marker(&outcome)),
                elapsed: None,
            });
            if matches!(outcome, FetchOutcome::Fetched { created: true }) {
                newly_created.insert(id);
            }
        }
        Ok(BatchOutcome {
            processed,
            newly_created,
        })
    }

    pub fn list(&self) -> Result<ListResult, StashError> {
        let mut apps = Vec::new();
        for id in self.store.list_known_ids()? {
            let locales = self
                .store
                .cached_locales(&id, &self.config.locales)
                .iter()
                .map(|locale| locale.to_string())
                .collect();
            apps.push(ListEntry {
                id: id.to_string(),
                locales,
                icon: self.store.icon_exists(&id),
            });
        }
        Ok(ListResult { apps })
    }

    pub fn info(&self, id: &BundleId) -> Result<InfoResult, StashError> {
        let locales = self.store.cached_locales(id, &self.config.locales);
        let icon = self.store.icon_exists(id);
        if locales.is_empty() && !icon {
            return Err(StashError::AppNotFound(id.to_string()));
        }
        Ok(InfoResult {
            id: id.to_string(),
            locales: locales.iter().map(|locale| locale.to_string()).collect(),
            icon,
            names: self
                .app_names(id)
                .into_iter()
                .map(|(locale, name)| (locale.to_string(), name))
                .collect(),
            genres: self.genres(id),
        })
    }

    pub fn app_names(&self, id: &BundleId) -> BTreeMap<Locale, String> {
        let mut names = BTreeMap::new();
        for locale in &self.config.locales {
            let Ok(document) = self.store.read_document(id, locale) else {
                continue;
            };
            if let Some(name) = document.display_name() {
                names.insert(locale.clone(), name.to_string());
            }
        }
        names
    }

    pub fn genres(&self, id: &BundleId) -> Vec<(String, String)> {
        self.first_cached_document(id)
            .map(|document| document.genres())
            .unwrap_or_default()
    }

    fn first_cached_document(&self, id: &BundleId) -> Option<MetadataDocument> {
        for locale in &self.config.locales {
            match self.store.read_document(id, locale) {
                Ok(document) => return Some(document),
                Err(StashError::DocumentNotFound { .. }) => continue,
                Err(err) => {
                    tracing::debug!(source = "icon-fetch", id = %id, locale = %locale, error = %err, "unreadable cached document, trying next locale");
                    continue;
                }
            }
        }
        None
    }
}

fn marker(outcome: &FetchOutcome) -> &'static str {
    match outcome {
        FetchOutcome::Fetched { created: true } => "new",
        FetchOutcome::Fetched { created: false } => "ok",
        FetchOutcome::Skipped => "hit",
        FetchOutcome::Failed(FailureKind::NotFound) => "none",
        FetchOutcome::Failed(_) => "err",
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use assert_matches::assert_matches;
    use camino::Utf8PathBuf;
    use serde_json::json;

    use super::*;
    use crate::catalog::LookupReply;
    use crate::config::{Config, ConfigLoader};

    #[derive(Default)]
    struct MockCatalog {
        lookups: Mutex<usize>,
    }

    impl CatalogClient for MockCatalog {
        fn lookup(&self, _id: &BundleId, _locale: &Locale) -> Result<LookupReply, StashError> {
            let mut guard = self.lookups.lock().unwrap();
            *guard += 1;
            Ok(LookupReply {
                result_count: 1,
                results: vec![json!({
                    "bundleId": "com.example.App",
                    "artworkUrl100": "https://cdn.example/icon100.png",
                })],
            })
        }

        fn download_asset(&self, _url: &str) -> Result<Vec<u8>, StashError> {
            Ok(b"png bytes".to_vec())
        }
    }

    fn test_app(temp: &tempfile::TempDir) -> App<MockCatalog> {
        let data_root = Utf8PathBuf::from_path_buf(temp.path().join("data")).unwrap();
        let media_root = Utf8PathBuf::from_path_buf(temp.path().join("out")).unwrap();
        let store = Store::new_with_paths(data_root, media_root);
        let config = ConfigLoader::resolve_config(Config::default()).unwrap();
        App::new(store, MockCatalog::default(), config)
    }

    #[test]
    fn metadata_fetch_skips_when_cached() {
        let temp = tempfile::tempdir().unwrap();
        let app = test_app(&temp);
        let id: BundleId = "com.example.App".parse().unwrap();
        let locale: Locale = "us".parse().unwrap();

        let first = app.fetch_metadata(&id, &locale, false);
        assert_matches!(first, FetchOutcome::Fetched { created: true });

        let second = app.fetch_metadata(&id, &locale, false);
        assert_matches!(second, FetchOutcome::Skipped);
        assert_eq!(*app.catalog.lookups.lock().unwrap(), 1);
    }

    #[test]
    fn icon_fetch_requires_cached_metadata() {
        let temp = tempfile::tempdir().unwrap();
        let app = test_app(&temp);
        let id: BundleId = "com.example.App".parse().unwrap();

        let outcome = app.fetch_icon(&id, false);
        assert_matches!(outcome, FetchOutcome::Failed(FailureKind::MissingMetadata));
    }
}
