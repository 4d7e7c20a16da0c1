//! Processor Error Types
//!
//! Errors raised by a single processor while transforming a document or
//! while (de)serializing itself.

use thiserror::Error;

/// Errors produced by one processor step
#[derive(Error, Debug)]
pub enum ProcessError {
    /// The processor's edit operation is not one the processor understands
    #[error("unknown processor type: {0}")]
    UnknownOperation(String),

    /// The input document could not be parsed in the processor's format
    #[error("invalid document: {0}")]
    InvalidDocument(String),

    /// The key path inside the document cannot be addressed
    #[error("invalid target '{target}': {reason}")]
    InvalidTarget { target: String, reason: String },

    /// External fetch failed (transport error or non-success status)
    #[error("request {url} failed: {reason}")]
    Fetch { url: String, reason: String },

    /// The processor has no serialized representation
    #[error("serialization not supported for processor type '{0}'")]
    SerializeNotSupported(String),

    /// Encoding or decoding the processor itself failed
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl ProcessError {
    /// Create an unknown operation error
    pub fn unknown_operation(op: impl Into<String>) -> Self {
        Self::UnknownOperation(op.into())
    }

    /// Create an invalid document error
    pub fn invalid_document(msg: impl ToString) -> Self {
        Self::InvalidDocument(msg.to_string())
    }

    /// Create an invalid target error
    pub fn invalid_target(target: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidTarget {
            target: target.into(),
            reason: reason.into(),
        }
    }

    /// Create a fetch error
    pub fn fetch(url: impl Into<String>, reason: impl ToString) -> Self {
        Self::Fetch {
            url: url.into(),
            reason: reason.to_string(),
        }
    }

    /// Create a serialization error
    pub fn serialization(msg: impl ToString) -> Self {
        Self::Serialization(msg.to_string())
    }
}
