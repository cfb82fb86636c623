use std::fs;

use camino::{Utf8Path, Utf8PathBuf};
use tempfile::Builder;

use crate::config::ResolvedConfig;
use crate::document::MetadataDocument;
use crate::domain::{BundleId, Locale};
use crate::error::StashError;

#[derive(Debug, Clone)]
pub struct Store {
    data_root: Utf8PathBuf,
    media_root: Utf8PathBuf,
}

impl Store {
    pub fn new() -> Result<Self, StashError> {
        let cwd = std::env::current_dir().map_err(|err| StashError::Filesystem(err.to_string()))?;
        let data_root = Utf8PathBuf::from_path_buf(cwd.join("data"))
            .map_err(|_| StashError::Filesystem("invalid data path".to_string()))?;
        let media_root = Utf8PathBuf::from_path_buf(cwd.join("out"))
            .map_err(|_| StashError::Filesystem("invalid media path".to_string()))?;

        Ok(Self {
            data_root,
            media_root,
        })
    }

    pub fn new_with_paths(data_root: Utf8PathBuf, media_root: Utf8PathBuf) -> Self {
        Self {
            data_root,
            media_root,
        }
    }

    pub fn from_config(config: &ResolvedConfig) -> Result<Self, StashError> {
        let defaults = Self::new()?;
        Ok(Self {
            data_root: config.data_root.clone().unwrap_or(defaults.data_root),
            media_root: config.media_root.clone().unwrap_or(defaults.media_root),
        })
    }

    pub fn data_root(&self) -> &Utf8Path {
        &self.data_root
    }

    pub fn media_root(&self) -> &Utf8Path {
        &self.media_root
    }

    pub fn app_dir(&self, id: &BundleId) -> Utf8PathBuf {
        self.data_root.join("apps").join(id.as_str())
    }

    pub fn document_path(&self, id: &BundleId, locale: &Locale) -> Utf8PathBuf {
        self.app_dir(id).join(format!("info_{locale}.json"))
    }

    pub fn icon_path(&self, id: &BundleId) -> Utf8PathBuf {
        self.media_root.join("app").join(id.as_str()).join("icon.png")
    }

    pub fn document_exists(&self, id: &BundleId, locale: &Locale) -> bool {
        self.document_path(id, locale).as_std_path().exists()
    }

    pub fn icon_exists(&self, id: &BundleId) -> bool {
        self.icon_path(id).as_std_path().exists()
    }

    pub fn read_document(
        &self,
        id: &BundleId,
        locale: &Locale,
    ) -> Result<MetadataDocument, StashError> {
        let path = self.document_path(id, locale);
        if !path.as_std_path().exists() {
            return Err(StashError::DocumentNotFound {
                id: id.to_string(),
                locale: locale.to_string(),
            });
        }
        let content = fs::read_to_string(path.as_std_path())
            .map_err(|err| StashError::Filesystem(err.to_string()))?;
        serde_json::from_str(&content)
            .map_err(|err| StashError::Filesystem(format!("corrupt document at {path}: {err}")))
    }

    pub fn write_document(
        &self,
        id: &BundleId,
        locale: &Locale,
        document: &MetadataDocument,
    ) -> Result<(), StashError> {
        let path = self.document_path(id, locale);
        let parent = path
            .parent()
            .ok_or_else(|| StashError::Filesystem("invalid document path".to_string()))?;
        fs::create_dir_all(parent.as_std_path())
            .map_err(|err| StashError::Filesystem(err.to_string()))?;
        let content = serde_json::to_vec_pretty(document)
            .map_err(|err| StashError::Filesystem(err.to_string()))?;
        let temp = Builder::new()
            .prefix("appstash-doc")
            .tempfile_in(parent.as_std_path())
            .map_err(|err| StashError::Filesystem(err.to_string()))?;
        fs::write(temp.path(), &content).map_err(|err| StashError::Filesystem(err.to_string()))?;
        temp.persist(path.as_std_path())
            .map_err(|err| StashError::Filesystem(err.to_string()))?;
        Ok(())
    }

    pub fn write_icon(&self, id: &BundleId, content: &[u8]) -> Result<(), StashError> {
        let path = self.icon_path(id);
        let parent = path
            .parent()
            .ok_or_else(|| StashError::Filesystem("invalid icon path".to_string()))?;
        fs::create_dir_all(parent.as_std_path())
            .map_err(|err| StashError::Filesystem(err.to_string()))?;
        let temp = Builder::new()
            .prefix("appstash-icon")
            .tempfile_in(parent.as_std_path())
            .map_err(|err| StashError::Filesystem(err.to_string()))?;
        fs::write(temp.path(), content).map_err(|err| StashError::Filesystem(err.to_string()))?;
        temp.persist(path.as_std_path())
            .map_err(|err| StashError::Filesystem(err.to_string()))?;
        Ok(())
    }

    pub fn list_known_ids(&self) -> Result<Vec<BundleId>, StashError> {
        let apps_root = self.data_root.join("apps");
        if !apps_root.as_std_path().exists() {
            return Ok(Vec::new());
        }
        let mut ids = Vec::new();
        let entries = fs::read_dir(apps_root.as_std_path())
            .map_err(|err| StashError::Filesystem(err.to_string()))?;
        for entry in entries {
            let entry = entry.map_err(|err| StashError::Filesystem(err.to_string()))?;
            if !entry.path().is_dir() {
                continue;
            }
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            let Ok(id) = name.parse::<BundleId>() else {
                continue;
            };
            if self.has_any_document(&id) {
                ids.push(id);
            }
        }
        ids.sort();
        Ok(ids)
    }

    pub fn cached_locales(&self, id: &BundleId, locales: &[Locale]) -> Vec<Locale> {
        locales
            .iter()
            .filter(|locale| self.document_exists(id, locale))
            .cloned()
            .collect()
    }

    fn has_any_document(&self, id: &BundleId) -> bool {
        let Ok(entries) = fs::read_dir(self.app_dir(id).as_std_path()) else {
            return false;
        };
        entries.flatten().any(|entry| {
            entry
                .file_name()
                .to_str()
                .map(|name| name.starts_with("info_") && name.ends_with(".json"))
                .unwrap_or(false)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_paths() {
        let store = Store::new_with_paths(
            Utf8PathBuf::from("/srv/stash/data"),
            Utf8PathBuf::from("/srv/stash/out"),
        );
        let id: BundleId = "com.example.App".parse().unwrap();
        let locale: Locale = "us".parse().unwrap();

        let document_path = store.document_path(&id, &locale);
        assert!(document_path.ends_with("apps/com.example.App/info_us.json"));

        let icon_path = store.icon_path(&id);
        assert!(icon_path.ends_with("app/com.example.App/icon.png"));
    }
}
