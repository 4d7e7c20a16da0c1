//! Path parsing
//!
//! A path parser turns tree paths such as `/a/b/c` into a depth and the
//! segment name at each depth. Depth 0 is the root; segments are 1-based.

/// Splits tree paths into levels
pub trait PathParser: Send + Sync {
    /// Number of non-empty segments in `path`; 0 for the root
    fn level(&self, path: &str) -> usize;

    /// Segment at 1-based `level`, or `""` when out of range
    fn name_by_level<'p>(&self, path: &'p str, level: usize) -> &'p str;

    /// Path of the child `name` under `parent`
    fn append_path(&self, parent: &str, name: &str) -> String;

    /// Path of the root node
    fn root_path(&self) -> String;
}

/// Path parser over a fixed delimiter
///
/// Surrounding whitespace and delimiters are ignored, as are empty segments,
/// so `a/b`, `/a/b/` and `/a//b` all address the same node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DelimiterPathParser {
    delimiter: String,
}

impl DelimiterPathParser {
    pub fn new(delimiter: impl Into<String>) -> Self {
        Self {
            delimiter: delimiter.into(),
        }
    }

    /// `/`-delimited paths
    pub fn slash() -> Self {
        Self::new("/")
    }

    pub fn delimiter(&self) -> &str {
        &self.delimiter
    }

    fn segments<'p>(&self, path: &'p str) -> Vec<&'p str> {
        let delimiter = self.delimiter.as_str();
        let path = path.trim();
        if delimiter.is_empty() {
            return if path.is_empty() { Vec::new() } else { vec![path] };
        }
        path.trim_start_matches(delimiter)
            .trim_end_matches(delimiter)
            .split(delimiter)
            .filter(|s| !s.is_empty())
            .collect()
    }
}

impl Default for DelimiterPathParser {
    fn default() -> Self {
        Self::slash()
    }
}

impl PathParser for DelimiterPathParser {
    fn level(&self, path: &str) -> usize {
        self.segments(path).len()
    }

    fn name_by_level<'p>(&self, path: &'p str, level: usize) -> &'p str {
        if level == 0 {
            return "";
        }
        self.segments(path).get(level - 1).copied().unwrap_or("")
    }

    fn append_path(&self, parent: &str, name: &str) -> String {
        let parent = parent.trim_end_matches(self.delimiter.as_str());
        format!("{}{}{}", parent, self.delimiter, name)
    }

    fn root_path(&self) -> String {
        self.delimiter.clone()
    }
}
