//! Tree and forest errors

use crate::driver::{ModemError, RealizeError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TreeError {
    /// Depth 0 deletion is always rejected
    #[error("root node can not be deleted")]
    RootDeletion,

    #[error("tree not found: {0}")]
    TreeNotFound(String),

    /// A processor failed while realizing the node at `path`
    #[error("realize fail at node '{path}': {source}")]
    Realize {
        path: String,
        #[source]
        source: RealizeError,
    },

    #[error("can not graft '{name}' (level {child_level}) under a node at level {parent_level}")]
    GraftLevelMismatch {
        name: String,
        parent_level: usize,
        child_level: usize,
    },

    /// The grafted node uses another driver or mode, or sits at another path
    #[error("can not graft '{path}': {reason}")]
    GraftIncompatible { path: String, reason: String },

    #[error(transparent)]
    Modem(#[from] ModemError),
}

impl TreeError {
    pub fn tree_not_found(name: impl Into<String>) -> Self {
        Self::TreeNotFound(name.into())
    }

    pub fn graft_incompatible(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::GraftIncompatible {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn realize(path: impl Into<String>, source: RealizeError) -> Self {
        Self::Realize {
            path: path.into(),
            source,
        }
    }
}
