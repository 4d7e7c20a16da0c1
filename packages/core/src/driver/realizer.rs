//! Realization: threading a document through a processor list

use crate::processors::{ProcessError, ProcessorRef};
use thiserror::Error;

/// A processor failed while realizing a node
#[derive(Error, Debug)]
#[error("process fail on processor '{kind}' (path '{path}'): {source}")]
pub struct RealizeError {
    /// Type name of the failing processor
    pub kind: String,
    /// Advisory path carried by the failing processor
    pub path: String,
    pub source: ProcessError,
}

/// Applies processors to a baseline document
pub trait Realizer: Send + Sync {
    fn realize(&self, baseline: &[u8], processors: &[ProcessorRef]) -> Result<Vec<u8>, RealizeError>;
}

/// Applies processors strictly in list order, stopping at the first failure
#[derive(Debug, Clone, Copy, Default)]
pub struct StdRealizer;

impl Realizer for StdRealizer {
    fn realize(&self, baseline: &[u8], processors: &[ProcessorRef]) -> Result<Vec<u8>, RealizeError> {
        let mut document = baseline.to_vec();
        for processor in processors {
            document = processor.process(&document).map_err(|source| RealizeError {
                kind: processor.kind().to_string(),
                path: processor.path().to_string(),
                source,
            })?;
        }
        Ok(document)
    }
}
