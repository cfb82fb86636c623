use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum StashError {
    #[error("invalid bundle id: {0}")]
    InvalidBundleId(String),

    #[error("invalid locale: {0}")]
    InvalidLocale(String),

    #[error("invalid selection: {0}")]
    InvalidSelection(String),

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("catalog request failed: {0}")]
    CatalogHttp(String),

    #[error("catalog request timed out: {0}")]
    CatalogTimeout(String),

    #[error("catalog returned status {status}: {message}")]
    CatalogStatus { status: u16, message: String },

    #[error("catalog reply missing expected shape: {0}")]
    CatalogSchema(String),

    #[error("no cached document for {id} in locale {locale}")]
    DocumentNotFound { id: String, locale: String },

    #[error("no cached data for {0}")]
    AppNotFound(String),

    #[error("filesystem error: {0}")]
    Filesystem(String),
}
