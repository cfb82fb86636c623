use std::fs;
use std::path::PathBuf;

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

use crate::domain::Locale;
use crate::error::StashError;

pub const DEFAULT_CONFIG_FILE: &str = "appstash.json";

const DEFAULT_LOCALES: [&str; 2] = ["us", "de"];
const DEFAULT_WORKERS: usize = 4;

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub locales: Option<Vec<String>>,
    #[serde(default)]
    pub strip_fields: Option<Vec<String>>,
    #[serde(default)]
    pub workers: Option<usize>,
    #[serde(default)]
    pub data_root: Option<String>,
    #[serde(default)]
    pub media_root: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub locales: Vec<Locale>,
    pub strip_fields: Vec<String>,
    pub workers: usize,
    pub data_root: Option<Utf8PathBuf>,
    pub media_root: Option<Utf8PathBuf>,
}

pub struct ConfigLoader;

impl ConfigLoader {
    pub fn resolve(path: Option<&str>) -> Result<ResolvedConfig, StashError> {
        let config_path = match path {
            Some(path) => PathBuf::from(path),
            None => PathBuf::from(DEFAULT_CONFIG_FILE),
        };

        if path.is_none() && !config_path.exists() {
            return Self::resolve_config(Config::default());
        }

        let content = fs::read_to_string(&config_path)
            .map_err(|_| StashError::ConfigRead(config_path.clone()))?;
        let config: Config = serde_json::from_str(&content)
            .map_err(|err| StashError::ConfigParse(err.to_string()))?;

        Self::resolve_config(config)
    }

    pub fn resolve_config(config: Config) -> Result<ResolvedConfig, StashError> {
        let locale_values = config
            .locales
            .unwrap_or_else(|| DEFAULT_LOCALES.iter().map(|value| value.to_string()).collect());
        if locale_values.is_empty() {
            return Err(StashError::ConfigParse(
                "locales must name at least one storefront".to_string(),
            ));
        }
        let locales = locale_values
            .iter()
            .map(|value| value.parse::<Locale>())
            .collect::<Result<Vec<_>, StashError>>()?;

        let strip_fields = config.strip_fields.unwrap_or_else(default_strip_fields);
        let workers = config.workers.unwrap_or(DEFAULT_WORKERS).max(1);

        Ok(ResolvedConfig {
            locales,
            strip_fields,
            workers,
            data_root: config.data_root.map(Utf8PathBuf::from),
            media_root: config.media_root.map(Utf8PathBuf::from),
        })
    }
}

pub fn default_strip_fields() -> Vec<String> {
    vec![
        "supportedDevices".to_string(),
        "releaseNotes".to_string(),
        "description".to_string(),
        "screenshotUrls".to_string(),
        "ipadScreenshotUrls".to_string(),
    ]
}
