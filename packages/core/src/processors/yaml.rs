//! YAML structured-edit processor
//!
//! Shares the key path semantics of the JSON processor. The document is
//! decoded into a JSON value model for editing, so YAML tags and non-string
//! mapping keys are not preserved.

use super::keypath::{self, EditOp};
use super::{load_json, save_json, LoadProcessor, ProcessError, Processor};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Edits a YAML document at a dotted key path
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YamlProcessor {
    #[serde(default)]
    pub path: String,

    pub op: String,

    #[serde(rename = "yaml_path")]
    pub key_path: String,

    /// String value, or a YAML fragment for the `set` operation
    #[serde(default)]
    pub value: String,

    #[serde(default)]
    pub author: String,

    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl YamlProcessor {
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
}

fn parse_document(before: &[u8]) -> Result<Value, ProcessError> {
    if before.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Object(Default::default()));
    }
    match serde_yaml::from_slice::<Value>(before) {
        // a document holding only `~` or comments
        Ok(Value::Null) => Ok(Value::Object(Default::default())),
        Ok(doc) => Ok(doc),
        Err(e) => Err(ProcessError::invalid_document(e)),
    }
}

impl Processor for YamlProcessor {
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
                let raw: Value = serde_yaml::from_str(&self.value).map_err(|e| {
                    ProcessError::invalid_target(&self.key_path, format!("invalid raw value: {}", e))
                })?;
                keypath::set(&mut doc, &self.key_path, raw)?
            }
            EditOp::Delete => keypath::delete(&mut doc, &self.key_path)?,
        }
        serde_yaml::to_string(&doc)
            .map(String::into_bytes)
            .map_err(ProcessError::serialization)
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

impl LoadProcessor for YamlProcessor {
    const KIND: &'static str = "yaml";

    fn load(data: &[u8]) -> Result<Self, ProcessError> {
        load_json(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_edits_yaml_document() {
        let template = b"unit: base\nlist:\n  - a\n";
        let mut doc = template.to_vec();
        for op in [
            YamlProcessor::create("owner.name", "river"),
            YamlProcessor::set_raw("list.-1", "b"),
            YamlProcessor::set_raw("limits", "{cpu: 2, mem: 4}"),
            YamlProcessor::delete("unit"),
        ] {
            doc = op.process(&doc).unwrap();
        }

        let parsed: Value = serde_yaml::from_slice(&doc).unwrap();
        assert_eq!(
            parsed,
            json!({
                "list": ["a", "b"],
                "owner": {"name": "river"},
                "limits": {"cpu": 2, "mem": 4}
            })
        );
    }

    #[test]
    fn test_blank_document_starts_empty() {
        let out = YamlProcessor::create("unit", "test").process(b"").unwrap();
        let parsed: Value = serde_yaml::from_slice(&out).unwrap();
        assert_eq!(parsed, json!({"unit": "test"}));
    }

    #[test]
    fn test_unknown_op_fails() {
        let err = YamlProcessor::new("merge", "a", "").process(b"a: 1").unwrap_err();
        assert!(matches!(err, ProcessError::UnknownOperation(_)));
    }

    #[test]
    fn test_malformed_document_fails() {
        let err = YamlProcessor::create("a", "b")
            .process(b"key: [unclosed")
            .unwrap_err();
        assert!(matches!(err, ProcessError::InvalidDocument(_)));
    }
}
