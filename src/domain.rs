use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::StashError;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BundleId(String);

impl BundleId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BundleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for BundleId {
    type Err = StashError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_string();
        let segments = normalized.split('.').collect::<Vec<_>>();
        let is_valid = normalized.len() <= 255
            && segments.len() >= 2
            && segments.iter().all(|segment| {
                !segment.is_empty()
                    && segment
                        .chars()
                        .all(|ch| ch.is_ascii_alphanumeric() || ch == '-' || ch == '_')
            });
        if !is_valid {
            return Err(StashError::InvalidBundleId(value.to_string()));
        }
        Ok(Self(normalized))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Locale(String);

impl Locale {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn country_code(&self) -> String {
        self.0.to_uppercase()
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Locale {
    type Err = StashError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_lowercase();
        let is_valid =
            normalized.len() == 2 && normalized.chars().all(|ch| ch.is_ascii_lowercase());
        if !is_valid {
            return Err(StashError::InvalidLocale(value.to_string()));
        }
        Ok(Self(normalized))
    }
}

pub const WILDCARD: &str = "*";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    All,
    Ids(Vec<String>),
}

impl Selection {
    pub fn from_args(args: &[String]) -> Result<Self, StashError> {
        if args.is_empty() {
            return Err(StashError::InvalidSelection(
                "no application ids given".to_string(),
            ));
        }
        if args.iter().any(|arg| arg == WILDCARD) {
            if args.len() > 1 {
                return Err(StashError::InvalidSelection(
                    "the wildcard cannot be combined with explicit ids".to_string(),
                ));
            }
            return Ok(Selection::All);
        }
        Ok(Selection::Ids(args.to_vec()))
    }
}
