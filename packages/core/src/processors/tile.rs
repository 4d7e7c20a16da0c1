//! Static content processor

use super::{load_json, save_json, LoadProcessor, ProcessError, Processor};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Replaces the document with fixed content
///
/// Tile trees use this to lay independent pieces of content on each node;
/// the inherited document is discarded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TileProcessor {
    #[serde(default)]
    pub path: String,

    pub content: String,

    #[serde(default)]
    pub author: String,

    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl TileProcessor {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            path: String::new(),
            content: content.into(),
            author: String::new(),
            created_at: Utc::now(),
        }
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }
}

impl Processor for TileProcessor {
    fn kind(&self) -> &str {
        Self::KIND
    }

    fn path(&self) -> &str {
        &self.path
    }

    fn process(&self, _before: &[u8]) -> Result<Vec<u8>, ProcessError> {
        Ok(self.content.clone().into_bytes())
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

impl LoadProcessor for TileProcessor {
    const KIND: &'static str = "tile";

    fn load(data: &[u8]) -> Result<Self, ProcessError> {
        load_json(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tile_ignores_input() {
        let tile = TileProcessor::new("<banner/>");
        assert_eq!(tile.process(b"anything").unwrap(), b"<banner/>".to_vec());
        assert_eq!(tile.process(b"").unwrap(), b"<banner/>".to_vec());
    }
}
