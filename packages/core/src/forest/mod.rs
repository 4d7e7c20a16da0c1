//! Forest: a named registry of rule trees
//!
//! Trees are produced by [`TreeBuilder`] functions. A successful build
//! installs the tree under its own name and binds the builder to that name,
//! so the tree can later be rebuilt on its own with [`Forest::refresh_tree`].
//!
//! Builders are contained: one that returns an error or panics is logged and
//! skipped, and the rest of the forest keeps working.

mod refresh;

pub use refresh::RefreshHandle;

use crate::locks::{read, write};
use crate::tree::{Tree, TreeError};
use std::any::Any;
use std::backtrace::Backtrace;
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, RwLock};
use std::time::Duration;

/// Produces a fully built tree
pub type TreeBuilder = Arc<dyn Fn() -> anyhow::Result<Arc<Tree>> + Send + Sync>;

/// Wrap a closure as a [`TreeBuilder`]
pub fn builder<F>(build: F) -> TreeBuilder
where
    F: Fn() -> anyhow::Result<Arc<Tree>> + Send + Sync + 'static,
{
    Arc::new(build)
}

/// Shortest period between two refresh rebuilds
pub const MIN_REFRESH_INTERVAL: Duration = Duration::from_millis(1);

pub(crate) fn clamp_interval(interval: Duration) -> Duration {
    interval.max(MIN_REFRESH_INTERVAL)
}

#[derive(Default)]
pub struct Forest {
    trees: RwLock<HashMap<String, Arc<Tree>>>,
    builders: RwLock<Vec<TreeBuilder>>,
    bound: RwLock<HashMap<String, TreeBuilder>>,
}

impl Forest {
    /// Register `builders` and build every tree once
    pub fn new(builders: impl IntoIterator<Item = TreeBuilder>) -> Self {
        let forest = Self::default();
        forest.register(builders);
        forest.build();
        forest
    }

    /// Queue builders for the next [`Forest::build`]; builds nothing
    pub fn register(&self, builders: impl IntoIterator<Item = TreeBuilder>) {
        write(&self.builders).extend(builders);
    }

    /// Register `builders` and build only those
    pub fn append(&self, builders: impl IntoIterator<Item = TreeBuilder>) -> &Self {
        let builders: Vec<TreeBuilder> = builders.into_iter().collect();
        self.register(builders.iter().cloned());
        for builder in &builders {
            self.install(builder);
        }
        self
    }

    /// Run every registered builder, replacing trees by name
    pub fn build(&self) -> &Self {
        let builders = read(&self.builders).clone();
        let built = builders
            .iter()
            .filter(|builder| self.install(builder))
            .count();
        tracing::info!(
            "Forest built {}/{} tree(s): {:?}",
            built,
            builders.len(),
            self.names()
        );
        self
    }

    /// Build once, or with an interval rebuild on every tick forever
    ///
    /// The interval form blocks the calling thread and never returns; use
    /// [`Forest::spawn_refresh`] for a loop that can be stopped. A zero
    /// interval is raised to [`MIN_REFRESH_INTERVAL`].
    pub fn refresh(&self, interval: Option<Duration>) {
        let Some(interval) = interval else {
            self.build();
            return;
        };
        let interval = clamp_interval(interval);
        loop {
            std::thread::sleep(interval);
            self.build();
        }
    }

    /// Rebuild the single tree bound to `name`
    ///
    /// Returns whether a new tree was installed. Unbound names are a no-op.
    pub fn refresh_tree(&self, name: &str) -> bool {
        let Some(builder) = read(&self.bound).get(name).cloned() else {
            tracing::debug!("No builder bound to tree '{}'", name);
            return false;
        };
        match run_builder(&builder) {
            Some(tree) => {
                self.set(tree);
                true
            }
            None => false,
        }
    }

    /// Bind `builder` to `name` for [`Forest::refresh_tree`]
    pub fn bind(&self, name: impl Into<String>, builder: TreeBuilder) {
        write(&self.bound).insert(name.into(), builder);
    }

    pub fn get(&self, name: &str) -> Option<Arc<Tree>> {
        read(&self.trees).get(name).cloned()
    }

    /// Install `tree` under its own name, bypassing builders
    pub fn set(&self, tree: Arc<Tree>) {
        write(&self.trees).insert(tree.name().to_string(), tree);
    }

    /// Realized document at `path` in tree `name`
    pub fn get_val(&self, name: &str, path: &str) -> Result<Vec<u8>, TreeError> {
        self.get(name)
            .ok_or_else(|| TreeError::tree_not_found(name))?
            .get(path)
    }

    /// Installed tree names, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = read(&self.trees).keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        read(&self.trees).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Tree count and names, for diagnostics
    pub fn info(&self) -> String {
        let names = self.names();
        format!("forest got {} tree(s): [{}]", names.len(), names.join(", "))
    }

    /// Run `builder` and install its tree; false when it failed
    fn install(&self, builder: &TreeBuilder) -> bool {
        let Some(tree) = run_builder(builder) else {
            return false;
        };
        self.bind(tree.name(), Arc::clone(builder));
        self.set(tree);
        true
    }
}

impl std::fmt::Debug for Forest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Forest")
            .field("trees", &self.names())
            .field("builders", &read(&self.builders).len())
            .finish()
    }
}

/// Run a builder, containing errors and panics
fn run_builder(builder: &TreeBuilder) -> Option<Arc<Tree>> {
    match panic::catch_unwind(AssertUnwindSafe(|| builder())) {
        Ok(Ok(tree)) => Some(tree),
        Ok(Err(e)) => {
            tracing::error!("Tree builder failed: {:#}", e);
            None
        }
        Err(payload) => {
            tracing::error!(
                "Tree builder panicked: {}\nstack:\n{}",
                panic_message(payload.as_ref()),
                Backtrace::force_capture()
            );
            None
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg
    } else {
        "non-string panic payload"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::RealizeMode;

    fn named(name: &'static str) -> TreeBuilder {
        builder(move || Ok(Tree::json(RealizeMode::Eager, name, "{}", vec![])?))
    }

    #[test]
    fn test_register_does_not_build() {
        let forest = Forest::default();
        forest.register([named("a")]);
        assert!(forest.is_empty());

        forest.build();
        assert_eq!(forest.names(), vec!["a"]);
    }

    #[test]
    fn test_append_builds_only_given() {
        let forest = Forest::default();
        forest.register([named("queued")]);
        forest.append([named("appended")]);
        assert_eq!(forest.names(), vec!["appended"]);

        forest.build();
        assert_eq!(forest.names(), vec!["appended", "queued"]);
    }

    #[test]
    fn test_panic_message() {
        let payload = panic::catch_unwind(|| panic!("boom {}", 1)).unwrap_err();
        assert_eq!(panic_message(payload.as_ref()), "boom 1");
        let payload = panic::catch_unwind(|| panic!("static")).unwrap_err();
        assert_eq!(panic_message(payload.as_ref()), "static");
    }

    #[test]
    fn test_refresh_interval_is_clamped() {
        assert_eq!(clamp_interval(Duration::ZERO), MIN_REFRESH_INTERVAL);
        assert_eq!(clamp_interval(Duration::from_secs(5)), Duration::from_secs(5));
    }

    #[test]
    fn test_set_replaces_by_name() {
        let forest = Forest::default();
        let first = Tree::json(RealizeMode::Eager, "t", "{}", vec![]).unwrap();
        let second = Tree::json(RealizeMode::Eager, "t", r#"{"v":2}"#, vec![]).unwrap();
        forest.set(first);
        forest.set(second);
        assert_eq!(forest.len(), 1);
        assert_eq!(forest.get_val("t", "/").unwrap(), br#"{"v":2}"#.to_vec());
    }
}
