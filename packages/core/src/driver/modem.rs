//! Processor list (de)serialization
//!
//! Processor lists travel as a sequence of envelopes, each naming the
//! processor type and carrying that processor's own saved form:
//!
//! ```json
//! [{"type": "json", "data": {"op": "create", "json_path": "name", "value": "root"}}]
//! ```
//!
//! Decoding looks the type up in a [`ProcessorRegistry`] and hands the data
//! to that processor's [`LoadProcessor::load`].

use crate::processors::{LoadProcessor, ProcessError, ProcessorRef};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

/// Modem failures
#[derive(Error, Debug)]
pub enum ModemError {
    #[error("marshal fail: {0}")]
    Encode(String),

    #[error("unmarshal fail: {0}")]
    Decode(String),

    /// No loader is registered under this processor type
    #[error("unknown processor type: {0}")]
    UnknownProcessorType(String),

    /// The processor itself failed to save or load
    #[error("processor '{kind}' fail: {source}")]
    Processor {
        kind: String,
        #[source]
        source: ProcessError,
    },
}

/// Serializes processor lists for transport and storage
pub trait Modem: Send + Sync {
    fn marshal(&self, processors: &[ProcessorRef]) -> Result<Vec<u8>, ModemError>;
    fn unmarshal(&self, data: &[u8]) -> Result<Vec<ProcessorRef>, ModemError>;
}

/// One serialized processor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessorEnvelope {
    #[serde(rename = "type")]
    pub kind: String,
    pub data: Value,
}

type LoadFn = fn(&[u8]) -> Result<ProcessorRef, ProcessError>;

fn load_shared<P: LoadProcessor>(data: &[u8]) -> Result<ProcessorRef, ProcessError> {
    P::load(data).map(|p| Arc::new(p) as ProcessorRef)
}

/// Maps processor type names to loaders
#[derive(Clone, Default)]
pub struct ProcessorRegistry {
    loaders: HashMap<String, LoadFn>,
}

impl ProcessorRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every built-in serializable processor
    pub fn standard() -> Self {
        use crate::processors::{CurlProcessor, JsonProcessor, TileProcessor, YamlProcessor};

        let mut registry = Self::new();
        registry
            .register::<JsonProcessor>()
            .register::<YamlProcessor>()
            .register::<TileProcessor>()
            .register::<CurlProcessor>();
        registry
    }

    pub fn register<P: LoadProcessor>(&mut self) -> &mut Self {
        self.loaders.insert(P::KIND.to_string(), load_shared::<P>);
        self
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.loaders.contains_key(kind)
    }

    /// Registered type names, sorted
    pub fn kinds(&self) -> Vec<&str> {
        let mut kinds: Vec<&str> = self.loaders.keys().map(String::as_str).collect();
        kinds.sort_unstable();
        kinds
    }

    /// Rebuild one processor from its saved form
    pub fn load(&self, kind: &str, data: &[u8]) -> Result<ProcessorRef, ModemError> {
        let loader = self
            .loaders
            .get(kind)
            .ok_or_else(|| ModemError::UnknownProcessorType(kind.to_string()))?;
        loader(data).map_err(|source| ModemError::Processor {
            kind: kind.to_string(),
            source,
        })
    }

    /// Rebuild one processor from an envelope
    pub fn load_envelope(&self, envelope: &ProcessorEnvelope) -> Result<ProcessorRef, ModemError> {
        let data = serde_json::to_vec(&envelope.data).map_err(|e| ModemError::Decode(e.to_string()))?;
        self.load(&envelope.kind, &data)
    }
}

impl std::fmt::Debug for ProcessorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessorRegistry")
            .field("kinds", &self.kinds())
            .finish()
    }
}

/// Wrap a processor's saved form in an envelope
pub fn envelope(processor: &ProcessorRef) -> Result<ProcessorEnvelope, ModemError> {
    let kind = processor.kind().to_string();
    let saved = processor.save().map_err(|source| ModemError::Processor {
        kind: kind.clone(),
        source,
    })?;
    let data = serde_json::from_slice(&saved).map_err(|e| ModemError::Encode(e.to_string()))?;
    Ok(ProcessorEnvelope { kind, data })
}

/// Outer encoding of an envelope list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Json,
    Yaml,
}

/// Envelope-based modem backed by a processor registry
#[derive(Debug, Clone)]
pub struct GeneralModem {
    encoding: Encoding,
    registry: Arc<ProcessorRegistry>,
}

impl GeneralModem {
    pub fn new(encoding: Encoding, registry: Arc<ProcessorRegistry>) -> Self {
        Self { encoding, registry }
    }

    pub fn json(registry: Arc<ProcessorRegistry>) -> Self {
        Self::new(Encoding::Json, registry)
    }

    pub fn yaml(registry: Arc<ProcessorRegistry>) -> Self {
        Self::new(Encoding::Yaml, registry)
    }

    pub fn registry(&self) -> &ProcessorRegistry {
        &self.registry
    }
}

impl Modem for GeneralModem {
    fn marshal(&self, processors: &[ProcessorRef]) -> Result<Vec<u8>, ModemError> {
        let envelopes = processors
            .iter()
            .map(envelope)
            .collect::<Result<Vec<_>, _>>()?;
        match self.encoding {
            Encoding::Json => {
                serde_json::to_vec(&envelopes).map_err(|e| ModemError::Encode(e.to_string()))
            }
            Encoding::Yaml => serde_yaml::to_string(&envelopes)
                .map(String::into_bytes)
                .map_err(|e| ModemError::Encode(e.to_string())),
        }
    }

    fn unmarshal(&self, data: &[u8]) -> Result<Vec<ProcessorRef>, ModemError> {
        let envelopes: Vec<ProcessorEnvelope> = match self.encoding {
            Encoding::Json => {
                serde_json::from_slice(data).map_err(|e| ModemError::Decode(e.to_string()))?
            }
            Encoding::Yaml => {
                serde_yaml::from_slice(data).map_err(|e| ModemError::Decode(e.to_string()))?
            }
        };
        envelopes
            .iter()
            .map(|envelope| self.registry.load_envelope(envelope))
            .collect()
    }
}

/// Modem that stores nothing
///
/// For trees whose processors never leave the process.
#[derive(Debug, Clone, Copy, Default)]
pub struct DummyModem;

impl Modem for DummyModem {
    fn marshal(&self, _processors: &[ProcessorRef]) -> Result<Vec<u8>, ModemError> {
        Ok(Vec::new())
    }

    fn unmarshal(&self, _data: &[u8]) -> Result<Vec<ProcessorRef>, ModemError> {
        Ok(Vec::new())
    }
}
