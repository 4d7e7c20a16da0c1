//! In-memory closure processor

use super::{ProcessError, Processor};
use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::Arc;

type ProcessFn = dyn Fn(&[u8]) -> Result<Vec<u8>, ProcessError> + Send + Sync;

/// Wraps a closure as a processor
///
/// Handy for tests and programmatic composition. It has no serialized form:
/// [`Processor::save`] always fails and it cannot be registered for loading.
#[derive(Clone)]
pub struct RawProcessor {
    author: String,
    created_at: DateTime<Utc>,
    proc: Arc<ProcessFn>,
}

impl RawProcessor {
    pub fn new<F>(proc: F) -> Self
    where
        F: Fn(&[u8]) -> Result<Vec<u8>, ProcessError> + Send + Sync + 'static,
    {
        Self {
            author: String::new(),
            created_at: Utc::now(),
            proc: Arc::new(proc),
        }
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = author.into();
        self
    }
}

impl fmt::Debug for RawProcessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawProcessor")
            .field("author", &self.author)
            .field("created_at", &self.created_at)
            .finish_non_exhaustive()
    }
}

impl Processor for RawProcessor {
    fn kind(&self) -> &str {
        "raw"
    }

    fn path(&self) -> &str {
        ""
    }

    fn process(&self, before: &[u8]) -> Result<Vec<u8>, ProcessError> {
        (self.proc)(before)
    }

    fn author(&self) -> &str {
        &self.author
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn save(&self) -> Result<Vec<u8>, ProcessError> {
        Err(ProcessError::SerializeNotSupported(self.kind().to_string()))
    }
}
