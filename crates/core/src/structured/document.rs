//! The flat `{key: string}` rendition of a structured document's content.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use super::vocabulary::Vocabulary;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StructuredError {
    #[error("content is not valid JSON: {0}")]
    Syntax(String),
    #[error("content must be a JSON object")]
    NotAnObject,
    #[error("field {0:?} holds a nested value")]
    NestedValue(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StructuredDocument {
    fields: BTreeMap<String, String>,
}

impl StructuredDocument {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse stored content. Blank content is an empty document; scalar
    /// values other than strings are kept as their JSON text and `null`
    /// becomes the empty string.
    pub fn parse(content: &str) -> Result<Self, StructuredError> {
        if content.trim().is_empty() {
            return Ok(Self::new());
        }
        let value: Value =
            serde_json::from_str(content).map_err(|e| StructuredError::Syntax(e.to_string()))?;
        let Value::Object(map) = value else {
            return Err(StructuredError::NotAnObject);
        };

        let mut fields = BTreeMap::new();
        for (key, value) in map {
            let text = match value {
                Value::String(s) => s,
                Value::Null => String::new(),
                Value::Bool(_) | Value::Number(_) => value.to_string(),
                Value::Array(_) | Value::Object(_) => return Err(StructuredError::NestedValue(key)),
            };
            fields.insert(key, text);
        }
        Ok(Self { fields })
    }

    pub fn to_json(&self) -> String {
        // A string-to-string map always serializes.
        serde_json::to_string(&self.fields).unwrap_or_else(|_| "{}".to_string())
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.fields.insert(key.into(), value.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.fields.remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn as_map(&self) -> &BTreeMap<String, String> {
        &self.fields
    }

    pub fn into_map(self) -> BTreeMap<String, String> {
        self.fields
    }

    /// Group keys by the widget that owns them.
    pub fn sections(&self, vocab: &Vocabulary) -> Sections {
        let mut sections = Sections::default();
        for (key, value) in &self.fields {
            let bucket = if vocab.is_special(key) {
                &mut sections.special
            } else if vocab.is_domain(key) {
                &mut sections.domain
            } else {
                &mut sections.cards
            };
            bucket.insert(key.clone(), value.clone());
        }
        sections
    }
}

impl From<BTreeMap<String, String>> for StructuredDocument {
    fn from(fields: BTreeMap<String, String>) -> Self {
        Self { fields }
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for StructuredDocument {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self {
            fields: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

/// A structured document split by rendering slot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Sections {
    /// title / subtitle / notes / footnotes
    pub special: BTreeMap<String, String>,
    /// Fixed vocabulary sections.
    pub domain: BTreeMap<String, String>,
    /// Free-form cards.
    pub cards: BTreeMap<String, String>,
}
