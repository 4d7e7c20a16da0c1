//! Rule file loading
//!
//! A rules file is a JSON list of records:
//!
//! ```json
//! [
//!   {"path": "/", "processors": [{"type": "json", "data": {"op": "create", "json_path": "name", "value": "root"}}]},
//!   {"path": "/a/b", "processors": []}
//! ]
//! ```
//!
//! Each processor entry uses the same envelope as the modem wire format.

use crate::config::EngineConfig;
use crate::driver::{ModemError, ProcessorEnvelope, ProcessorRegistry};
use crate::forest::{builder, TreeBuilder};
use crate::rule::Rule;
use crate::tree::{RealizeMode, Tree};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("failed to read rules file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed rules: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("rule '{path}' has an invalid processor: {source}")]
    InvalidProcessor {
        path: String,
        #[source]
        source: ModemError,
    },
}

/// One record of a rules file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleRecord {
    pub path: String,
    #[serde(default)]
    pub processors: Vec<ProcessorEnvelope>,
}

/// Decode rule records, rebuilding processors through `registry`
///
/// Processors of an unregistered type are skipped with a warning.
pub fn load_rules(data: &[u8], registry: &ProcessorRegistry) -> Result<Vec<Rule>, LoadError> {
    let records: Vec<RuleRecord> = serde_json::from_slice(data)?;
    records
        .into_iter()
        .map(|record| to_rule(record, registry))
        .collect()
}

pub fn load_rules_file(path: impl AsRef<Path>, registry: &ProcessorRegistry) -> Result<Vec<Rule>, LoadError> {
    let path = path.as_ref();
    let data = std::fs::read(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    load_rules(&data, registry)
}

fn to_rule(record: RuleRecord, registry: &ProcessorRegistry) -> Result<Rule, LoadError> {
    let mut processors = Vec::with_capacity(record.processors.len());
    for envelope in &record.processors {
        if !registry.contains(&envelope.kind) {
            tracing::warn!(
                "Skipping unknown processor type '{}' in rule '{}'",
                envelope.kind,
                record.path
            );
            continue;
        }
        let processor = registry
            .load_envelope(envelope)
            .map_err(|source| LoadError::InvalidProcessor {
                path: record.path.clone(),
                source,
            })?;
        processors.push(processor);
    }
    Ok(Rule::new(record.path, processors))
}

/// Builder for the JSON tree described by `config`
///
/// The rules file is read again on every call, so a refreshing forest picks
/// up edits to it.
pub fn default_builder(config: EngineConfig, registry: Arc<ProcessorRegistry>) -> TreeBuilder {
    builder(move || {
        let rules = load_rules_file(&config.rules_file, &registry)?;
        tracing::debug!(
            "Loaded {} rule(s) from {}",
            rules.len(),
            config.rules_file.display()
        );
        let tree = Tree::json(
            RealizeMode::Eager,
            config.tree_name.as_str(),
            config.template.as_str(),
            rules,
        )
        .with_context(|| format!("failed to build tree '{}'", config.tree_name))?;
        Ok(tree)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processors::Processor;

    #[test]
    fn test_records_without_processors() {
        let rules = load_rules(br#"[{"path":"/a"},{"path":"/b","processors":[]}]"#, &ProcessorRegistry::standard())
            .unwrap();
        assert_eq!(rules.len(), 2);
        assert_eq!(rules[0].path(), "/a");
        assert!(rules[0].processors().is_empty());
    }

    #[test]
    fn test_unknown_processor_type_is_skipped() {
        let data = br#"[{"path":"/","processors":[
            {"type":"lua","data":{"script":"x"}},
            {"type":"tile","data":{"content":"hello"}}
        ]}]"#;
        let rules = load_rules(data, &ProcessorRegistry::standard()).unwrap();
        assert_eq!(rules[0].processors().len(), 1);
        assert_eq!(rules[0].processors()[0].kind(), "tile");
    }

    #[test]
    fn test_invalid_processor_names_rule() {
        let data = br#"[{"path":"/a/b","processors":[{"type":"json","data":{"op":1}}]}]"#;
        let err = load_rules(data, &ProcessorRegistry::standard()).unwrap_err();
        assert!(matches!(err, LoadError::InvalidProcessor { ref path, .. } if path == "/a/b"));
        assert!(err.to_string().contains("/a/b"));
    }

    #[test]
    fn test_malformed_file() {
        let err = load_rules(b"{not json", &ProcessorRegistry::standard()).unwrap_err();
        assert!(matches!(err, LoadError::Malformed(_)));
    }
}
