//! JSON structured-edit processor

use super::keypath::{self, EditOp};
use super::{load_json, save_json, LoadProcessor, ProcessError, Processor};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Edits a JSON document at a dotted key path
///
/// `op` is one of `create`, `append`, `replace` (write `value` as a string),
/// `set` (parse `value` as raw JSON and write it) or `delete`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonProcessor {
    #[serde(default)]
    pub path: String,

    pub op: String,

    #[serde(rename = "json_path")]
    pub key_path: String,

    #[serde(default)]
    pub value: String,

    #[serde(default)]
    pub author: String,

    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl JsonProcessor {
    pub fn new(op: impl Into<String>, key_path: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            path: String::new(),
            op: op.into(),
            key_path: key_path.into(),
            value: value.into(),
            author: String::new(),
            created_at: Utc::now(),
        }
    }

    pub fn create(key_path: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new("create", key_path, value)
    }

    pub fn append(key_path: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new("append", key_path, value)
    }

    pub fn replace(key_path: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new("replace", key_path, value)
    }

    /// `value` is parsed as raw JSON
    pub fn set_raw(key_path: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new("set", key_path, value)
    }

    pub fn delete(key_path: impl Into<String>) -> Self {
        Self::new("delete", key_path, "")
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = author.into();
        self
    }
}

/// Parse a JSON document, treating blank input as an empty object
pub(crate) fn parse_document(before: &[u8]) -> Result<Value, ProcessError> {
    if before.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Object(Default::default()));
    }
    serde_json::from_slice(before).map_err(ProcessError::invalid_document)
}

impl Processor for JsonProcessor {
    fn kind(&self) -> &str {
        Self::KIND
    }

    fn path(&self) -> &str {
        &self.path
    }

    fn process(&self, before: &[u8]) -> Result<Vec<u8>, ProcessError> {
        let op = EditOp::parse(&self.op)?;
        let mut doc = parse_document(before)?;
        match op {
            EditOp::SetString => {
                keypath::set(&mut doc, &self.key_path, Value::String(self.value.clone()))?
            }
            EditOp::SetRaw => {
                let raw: Value = serde_json::from_str(&self.value).map_err(|e| {
                    ProcessError::invalid_target(&self.key_path, format!("invalid raw value: {}", e))
                })?;
                keypath::set(&mut doc, &self.key_path, raw)?
            }
            EditOp::Delete => keypath::delete(&mut doc, &self.key_path)?,
        }
        serde_json::to_vec(&doc).map_err(ProcessError::serialization)
    }

    fn author(&self) -> &str {
        &self.author
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn save(&self) -> Result<Vec<u8>, ProcessError> {
        save_json(self)
    }
}

impl LoadProcessor for JsonProcessor {
    const KIND: &'static str = "json";

    fn load(data: &[u8]) -> Result<Self, ProcessError> {
        load_json(data)
    }
}
