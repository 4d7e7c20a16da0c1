//! Processors
//!
//! A processor is one document transformation step bound to a tree node.
//! Trees never look inside a processor; they only thread bytes through
//! [`Processor::process`] in order.
//!
//! Built-in processors:
//!
//! - [`JsonProcessor`] - key path edits against a JSON document
//! - [`YamlProcessor`] - the same edits against a YAML document
//! - [`TileProcessor`] - static content injection
//! - [`CurlProcessor`] - HTTP fetch whose response becomes the document
//! - [`RawProcessor`] - in-memory closure, not serializable
//!
//! Serializable processors also implement [`LoadProcessor`] so they can be
//! registered in a [`crate::driver::ProcessorRegistry`] and rebuilt from
//! their saved form.

pub mod curl;
pub mod error;
pub mod json;
pub mod keypath;
pub mod raw;
pub mod tile;
pub mod yaml;

pub use curl::CurlProcessor;
pub use error::ProcessError;
pub use json::JsonProcessor;
pub use raw::RawProcessor;
pub use tile::TileProcessor;
pub use yaml::YamlProcessor;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// Shared handle to a processor
///
/// Rules and tree nodes hold processors through this handle so a rule set can
/// be applied to many trees without copying the processors.
pub type ProcessorRef = Arc<dyn Processor>;

/// A single document transformation step
pub trait Processor: Send + Sync + fmt::Debug {
    /// Processor type name (e.g. "json", "curl"), used as the registry key
    fn kind(&self) -> &str;

    /// Target tree path this processor was written for. Advisory only.
    fn path(&self) -> &str;

    /// Transform `before` into a new document
    fn process(&self, before: &[u8]) -> Result<Vec<u8>, ProcessError>;

    /// Who wrote this processor
    fn author(&self) -> &str;

    /// When this processor was written
    fn created_at(&self) -> DateTime<Utc>;

    /// Serialize this processor into the form accepted by [`LoadProcessor::load`]
    fn save(&self) -> Result<Vec<u8>, ProcessError>;

    /// Wrap this processor in a shared handle
    fn into_ref(self) -> ProcessorRef
    where
        Self: Sized + 'static,
    {
        Arc::new(self)
    }
}

/// Processors that can be rebuilt from their saved form
pub trait LoadProcessor: Processor + Sized + 'static {
    /// Type name under which the processor is registered; equals [`Processor::kind`]
    const KIND: &'static str;

    /// Rebuild a processor from the bytes produced by [`Processor::save`]
    fn load(data: &[u8]) -> Result<Self, ProcessError>;
}

pub(crate) fn save_json<T: Serialize>(value: &T) -> Result<Vec<u8>, ProcessError> {
    serde_json::to_vec(value).map_err(ProcessError::serialization)
}

pub(crate) fn load_json<T: DeserializeOwned>(data: &[u8]) -> Result<T, ProcessError> {
    serde_json::from_slice(data).map_err(|e| ProcessError::serialization(format!("unmarshal fail: {}", e)))
}
