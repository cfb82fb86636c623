use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::StashError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MetadataDocument {
    fields: Map<String, Value>,
}

impl MetadataDocument {
    pub fn from_result(value: Value) -> Result<Self, StashError> {
        match value {
            Value::Object(fields) => Ok(Self { fields }),
            _ => Err(StashError::CatalogSchema(
                "lookup result is not a JSON object".to_string(),
            )),
        }
    }

    pub fn prune(&mut self, strip_fields: &[String]) {
        for field in strip_fields {
            self.fields.remove(field);
        }
    }

    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    pub fn display_name(&self) -> Option<&str> {
        self.fields.get("trackCensoredName").and_then(Value::as_str)
    }

    pub fn icon_url(&self) -> Option<&str> {
        self.fields.get("artworkUrl100").and_then(Value::as_str)
    }

    pub fn genres(&self) -> Vec<(String, String)> {
        let ids = self.fields.get("genreIds").and_then(Value::as_array);
        let labels = self.fields.get("genres").and_then(Value::as_array);
        match (ids, labels) {
            (Some(ids), Some(labels)) => ids
                .iter()
                .zip(labels.iter())
                .filter_map(|(id, label)| Some((scalar_to_string(id)?, scalar_to_string(label)?)))
                .collect(),
            _ => Vec::new(),
        }
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}
