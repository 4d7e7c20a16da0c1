//! Rule value type

use crate::driver::PathParser;
use crate::processors::ProcessorRef;

/// A path plus the processors to bind at that path's node
#[derive(Clone, Debug)]
pub struct Rule {
    path: String,
    processors: Vec<ProcessorRef>,
}

impl Rule {
    pub fn new(path: impl Into<String>, processors: Vec<ProcessorRef>) -> Self {
        Self {
            path: path.into(),
            processors,
        }
    }

    /// Rule that only creates the node
    pub fn empty(path: impl Into<String>) -> Self {
        Self::new(path, Vec::new())
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn processors(&self) -> &[ProcessorRef] {
        &self.processors
    }
}

/// Stable sort by ascending path depth, shallow rules first
pub fn sort_by_level(parser: &dyn PathParser, rules: &mut [Rule]) {
    rules.sort_by_key(|rule| parser.level(rule.path()));
}
