// src/core/json/mod.rs

//! A JSON payload kept as text and addressed by path.
//!
//! There is no parse cache: every read parses the stored text, every write
//! parses, builds an updated tree and re-serializes it. A write that fails for
//! any reason leaves the stored text exactly as it was.

pub mod extract;
pub mod navigate;
pub mod path;

pub use extract::{JsonBlock, clean_json_response, extract_balanced_braces};
pub use path::{JsonScalar, PathSegment, parse_path};

use crate::core::errors::HttpMuxError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::fs;
use std::path::Path;
use tracing::debug;

/// The JSON kinds a typed `get` can ask for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonKind {
    Null,
    Bool,
    Number,
    String,
    Array,
    Object,
}

impl JsonKind {
    pub fn of(value: &Value) -> Self {
        match value {
            Value::Null => JsonKind::Null,
            Value::Bool(_) => JsonKind::Bool,
            Value::Number(_) => JsonKind::Number,
            Value::String(_) => JsonKind::String,
            Value::Array(_) => JsonKind::Array,
            Value::Object(_) => JsonKind::Object,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            JsonKind::Null => "null",
            JsonKind::Bool => "boolean",
            JsonKind::Number => "number",
            JsonKind::String => "string",
            JsonKind::Array => "array",
            JsonKind::Object => "object",
        }
    }
}

/// A serialized JSON document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JsonDocument {
    body: String,
}

impl JsonDocument {
    pub fn new() -> Self {
        Self::from_string("{}")
    }

    /// Wraps text without validating it. Check [`is_valid`](Self::is_valid).
    pub fn from_string(text: impl Into<String>) -> Self {
        Self { body: text.into() }
    }

    pub fn from_value(value: &Value) -> Self {
        Self {
            body: value.to_string(),
        }
    }

    /// Reads a whole file as the document text.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, HttpMuxError> {
        Ok(Self::from_string(fs::read_to_string(path)?))
    }

    pub fn as_str(&self) -> &str {
        &self.body
    }

    pub fn into_string(self) -> String {
        self.body
    }

    /// True if the text parses as JSON.
    pub fn is_valid(&self) -> bool {
        self.parse().is_ok()
    }

    pub fn parse(&self) -> Result<Value, HttpMuxError> {
        Ok(serde_json::from_str(&self.body)?)
    }

    /// Returns the value at `path`, whatever its kind.
    pub fn get_value(&self, path: &str) -> Result<Value, HttpMuxError> {
        let root = self.parse()?;
        let segments = parse_path(path)?;
        navigate::resolve(&root, &segments).cloned()
    }

    /// Returns the value at `path`, which must be of `kind`.
    pub fn get(&self, path: &str, kind: JsonKind) -> Result<Value, HttpMuxError> {
        let value = self.get_value(path)?;
        let found = JsonKind::of(&value);
        if found != kind {
            debug!(
                "JSON path '{}' holds a {}, not a {}",
                path,
                found.name(),
                kind.name()
            );
            return Err(HttpMuxError::WrongKind {
                expected: kind.name(),
                found: found.name(),
            });
        }
        Ok(value)
    }

    pub fn get_string(&self, path: &str) -> Result<String, HttpMuxError> {
        match self.get(path, JsonKind::String)? {
            Value::String(s) => Ok(s),
            other => Err(unexpected(JsonKind::String, &other)),
        }
    }

    pub fn get_number(&self, path: &str) -> Result<f64, HttpMuxError> {
        let value = self.get(path, JsonKind::Number)?;
        value
            .as_f64()
            .ok_or_else(|| unexpected(JsonKind::Number, &value))
    }

    pub fn get_bool(&self, path: &str) -> Result<bool, HttpMuxError> {
        let value = self.get(path, JsonKind::Bool)?;
        value
            .as_bool()
            .ok_or_else(|| unexpected(JsonKind::Bool, &value))
    }

    /// Writes a scalar at `path`. Missing intermediate objects are created;
    /// an index or predicate terminal replaces the matched array element.
    pub fn set(&mut self, path: &str, value: impl Into<JsonScalar>) -> Result<(), HttpMuxError> {
        let new_value = value.into().to_value()?;
        self.update(path, |root, segments| {
            navigate::with_value_set(root, segments, new_value)
        })
    }

    pub fn set_string(&mut self, path: &str, value: impl Into<String>) -> Result<(), HttpMuxError> {
        self.set(path, JsonScalar::String(value.into()))
    }

    pub fn set_number(&mut self, path: &str, value: f64) -> Result<(), HttpMuxError> {
        self.set(path, JsonScalar::Number(value))
    }

    pub fn set_bool(&mut self, path: &str, value: bool) -> Result<(), HttpMuxError> {
        self.set(path, JsonScalar::Bool(value))
    }

    /// Appends a scalar to the array at `path`, creating the array if the
    /// terminal field is absent.
    pub fn add_array_item(
        &mut self,
        path: &str,
        item: impl Into<JsonScalar>,
    ) -> Result<(), HttpMuxError> {
        let item = item.into().to_value()?;
        self.update(path, |root, segments| {
            navigate::with_item_appended(root, segments, item)
        })
    }

    /// Appends another document (parsed) to the array at `path`.
    pub fn add_array_document(
        &mut self,
        path: &str,
        item: &JsonDocument,
    ) -> Result<(), HttpMuxError> {
        let item = item.parse()?;
        self.update(path, |root, segments| {
            navigate::with_item_appended(root, segments, item)
        })
    }

    /// Parses, applies `op` to get a new tree and stores it. The stored text
    /// is only replaced once every step has succeeded.
    fn update<F>(&mut self, path: &str, op: F) -> Result<(), HttpMuxError>
    where
        F: FnOnce(&Value, &[PathSegment]) -> Result<Value, HttpMuxError>,
    {
        let root = self.parse()?;
        let segments = parse_path(path)?;
        let updated = op(&root, &segments).inspect_err(|e| {
            debug!("JSON update at '{}' failed: {}", path, e);
        })?;
        self.body = serde_json::to_string(&updated)?;
        Ok(())
    }
}

fn unexpected(expected: JsonKind, value: &Value) -> HttpMuxError {
    HttpMuxError::WrongKind {
        expected: expected.name(),
        found: JsonKind::of(value).name(),
    }
}

impl fmt::Display for JsonDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.body)
    }
}

impl From<String> for JsonDocument {
    fn from(body: String) -> Self {
        Self { body }
    }
}

impl From<&str> for JsonDocument {
    fn from(body: &str) -> Self {
        Self::from_string(body)
    }
}
