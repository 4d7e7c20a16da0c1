//! Rule trees
//!
//! A [`Tree`] indexes nodes by path segment. Each node holds the processors
//! bound to its exact path and the document realized from them, on top of
//! the content inherited from its parent. Querying a path walks root-first
//! and answers with the deepest existing node's document.
//!
//! Three realize modes are available:
//!
//! - [`RealizeMode::Eager`] - a node is realized as soon as a rule is set on it
//! - [`RealizeMode::Lazy`] - realized on the first `get` that visits it, then memoized
//! - [`RealizeMode::LazyInstant`] - realized again on every visit from the
//!   parent's current content
//!
//! Nodes never point back at their parent. Lazy realization receives the
//! parent's content as a traversal argument instead.
//!
//! # Locking
//!
//! Every node guards its children map and its content state with separate
//! `RwLock`s. A lock is only held for one map or field access and never
//! across a call into a child node.

pub mod error;

pub use error::TreeError;

use crate::driver::{Driver, RealizeError};
use crate::locks::{read, write};
use crate::processors::ProcessorRef;
use crate::rule::{sort_by_level, Rule};
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};

/// When a node's processors are applied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RealizeMode {
    /// Realize on `set`
    #[default]
    Eager,
    /// Realize on first visit, then memoize
    Lazy,
    /// Realize on every visit
    LazyInstant,
}

impl RealizeMode {
    pub fn is_lazy(self) -> bool {
        !matches!(self, RealizeMode::Eager)
    }
}

/// Mutable per-node state, guarded as one unit
struct NodeState {
    /// Document the node's processors apply to when nothing is inherited
    baseline: Vec<u8>,
    content: Vec<u8>,
    processors: Vec<ProcessorRef>,
    realized: bool,
}

/// A node of a rule tree, and the root of its own subtree
pub struct Tree {
    name: String,
    path: String,
    level: usize,
    mode: RealizeMode,
    driver: Arc<Driver>,
    children: RwLock<HashMap<String, Arc<Tree>>>,
    state: RwLock<NodeState>,
}

impl Tree {
    /// Build a tree named `name` from `template` and `rules`
    ///
    /// Rules are applied shallow first, so in eager mode every node is
    /// realized on top of a settled parent.
    pub fn build(
        driver: Driver,
        mode: RealizeMode,
        name: impl Into<String>,
        template: impl Into<Vec<u8>>,
        mut rules: Vec<Rule>,
    ) -> Result<Arc<Tree>, TreeError> {
        let tree = Self::root(Arc::new(driver), mode, name.into(), template.into());
        sort_by_level(tree.driver.parser(), &mut rules);
        for rule in &rules {
            tree.set(rule)?;
        }
        tracing::debug!("Built tree '{}' from {} rule(s)", tree.name, rules.len());
        Ok(Arc::new(tree))
    }

    pub fn new(
        driver: Driver,
        name: impl Into<String>,
        template: impl Into<Vec<u8>>,
        rules: Vec<Rule>,
    ) -> Result<Arc<Tree>, TreeError> {
        Self::build(driver, RealizeMode::Eager, name, template, rules)
    }

    pub fn new_lazy(
        driver: Driver,
        name: impl Into<String>,
        template: impl Into<Vec<u8>>,
        rules: Vec<Rule>,
    ) -> Result<Arc<Tree>, TreeError> {
        Self::build(driver, RealizeMode::Lazy, name, template, rules)
    }

    pub fn new_lazy_instant(
        driver: Driver,
        name: impl Into<String>,
        template: impl Into<Vec<u8>>,
        rules: Vec<Rule>,
    ) -> Result<Arc<Tree>, TreeError> {
        Self::build(driver, RealizeMode::LazyInstant, name, template, rules)
    }

    /// Tree over JSON documents
    pub fn json(
        mode: RealizeMode,
        name: impl Into<String>,
        template: impl Into<Vec<u8>>,
        rules: Vec<Rule>,
    ) -> Result<Arc<Tree>, TreeError> {
        Self::build(Driver::json(), mode, name, template, rules)
    }

    /// Tree over YAML documents
    pub fn yaml(
        mode: RealizeMode,
        name: impl Into<String>,
        template: impl Into<Vec<u8>>,
        rules: Vec<Rule>,
    ) -> Result<Arc<Tree>, TreeError> {
        Self::build(Driver::yaml(), mode, name, template, rules)
    }

    /// Tree over static tile content
    pub fn tile(
        mode: RealizeMode,
        name: impl Into<String>,
        template: impl Into<Vec<u8>>,
        rules: Vec<Rule>,
    ) -> Result<Arc<Tree>, TreeError> {
        Self::build(Driver::tile(), mode, name, template, rules)
    }

    fn root(driver: Arc<Driver>, mode: RealizeMode, name: String, template: Vec<u8>) -> Self {
        let path = driver.parser().root_path();
        Self {
            name,
            path,
            level: 0,
            mode,
            driver,
            children: RwLock::new(HashMap::new()),
            state: RwLock::new(NodeState {
                baseline: template.clone(),
                content: template,
                processors: Vec::new(),
                realized: !mode.is_lazy(),
            }),
        }
    }

    /// New child node seeded with this node's current content
    fn sprout(&self, name: &str) -> Self {
        let content = read(&self.state).content.clone();
        Self {
            name: name.to_string(),
            path: self.driver.append_path(&self.path, name),
            level: self.level + 1,
            mode: self.mode,
            driver: Arc::clone(&self.driver),
            children: RwLock::new(HashMap::new()),
            state: RwLock::new(NodeState {
                baseline: content.clone(),
                content,
                processors: Vec::new(),
                realized: !self.mode.is_lazy(),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn level(&self) -> usize {
        self.level
    }

    pub fn mode(&self) -> RealizeMode {
        self.mode
    }

    pub fn driver(&self) -> &Driver {
        &self.driver
    }

    /// Processors bound to this exact node
    pub fn processors(&self) -> Vec<ProcessorRef> {
        read(&self.state).processors.clone()
    }

    /// Whether this node's content reflects its processors
    ///
    /// Always true in eager mode; lazy nodes flip on their first visit.
    pub fn is_realized(&self) -> bool {
        read(&self.state).realized
    }

    /// Serialize this node's processors with the driver's modem
    pub fn marshal_processors(&self) -> Result<Vec<u8>, TreeError> {
        let processors = self.processors();
        Ok(self.driver.marshal(&processors)?)
    }

    /// Bind `rule` to the node at its path, creating intermediate nodes
    ///
    /// Setting the same path again replaces that node's processors. Rules
    /// shallower than this node are ignored. On a realize failure the node
    /// keeps its previous content and processors.
    pub fn set(&self, rule: &Rule) -> Result<(), TreeError> {
        let target = self.driver.level(rule.path());
        match target.cmp(&self.level) {
            Ordering::Equal => self.update(rule.processors()),
            Ordering::Less => {
                tracing::debug!(
                    "Ignoring rule '{}' above node '{}'",
                    rule.path(),
                    self.path
                );
                Ok(())
            }
            Ordering::Greater => {
                let name = self.driver.name_by_level(rule.path(), self.level + 1);
                self.grow(name).set(rule)
            }
        }
    }

    fn update(&self, processors: &[ProcessorRef]) -> Result<(), TreeError> {
        if self.mode.is_lazy() {
            let mut state = write(&self.state);
            state.processors = processors.to_vec();
            state.realized = false;
            tracing::debug!("Deferred {} processor(s) at '{}'", processors.len(), self.path);
            return Ok(());
        }

        let baseline = read(&self.state).baseline.clone();
        let content = self
            .driver
            .realize(&baseline, processors)
            .map_err(|e| self.realize_error(e))?;

        let mut state = write(&self.state);
        state.content = content;
        state.processors = processors.to_vec();
        state.realized = true;
        tracing::debug!("Realized {} processor(s) at '{}'", processors.len(), self.path);
        Ok(())
    }

    /// Realized document for `path`
    ///
    /// Paths past the deepest existing node answer with that node's document.
    pub fn get(&self, path: &str) -> Result<Vec<u8>, TreeError> {
        self.lookup(path, None)
    }

    /// [`Tree::get`] decoded as UTF-8, lossily
    pub fn get_string(&self, path: &str) -> Result<String, TreeError> {
        self.get(path)
            .map(|content| String::from_utf8_lossy(&content).into_owned())
    }

    fn lookup(&self, path: &str, inherited: Option<&[u8]>) -> Result<Vec<u8>, TreeError> {
        let content = self.realize(inherited)?;
        match self.child(self.driver.name_by_level(path, self.level + 1)) {
            Some(child) => child.lookup(path, Some(&content)),
            None => Ok(content),
        }
    }

    fn realize(&self, inherited: Option<&[u8]>) -> Result<Vec<u8>, TreeError> {
        match self.mode {
            RealizeMode::Eager => Ok(read(&self.state).content.clone()),
            RealizeMode::Lazy => {
                {
                    let state = read(&self.state);
                    if state.realized {
                        return Ok(state.content.clone());
                    }
                }

                // Realize under the write lock so concurrent first visits run it once
                let mut state = write(&self.state);
                if state.realized {
                    return Ok(state.content.clone());
                }
                let baseline = inherited.unwrap_or(state.baseline.as_slice());
                let content = self
                    .driver
                    .realize(baseline, &state.processors)
                    .map_err(|e| self.realize_error(e))?;
                state.content = content.clone();
                state.realized = true;
                tracing::debug!("Lazily realized '{}'", self.path);
                Ok(content)
            }
            RealizeMode::LazyInstant => {
                let (baseline, processors) = {
                    let state = read(&self.state);
                    let baseline = inherited.map_or_else(|| state.baseline.clone(), <[u8]>::to_vec);
                    (baseline, state.processors.clone())
                };
                let content = self
                    .driver
                    .realize(&baseline, &processors)
                    .map_err(|e| self.realize_error(e))?;

                let mut state = write(&self.state);
                state.content = content.clone();
                state.realized = true;
                Ok(content)
            }
        }
    }

    fn realize_error(&self, source: RealizeError) -> TreeError {
        TreeError::realize(self.path.clone(), source)
    }

    /// Whether the node addressed by `path` exists. Never creates nodes.
    pub fn has(&self, path: &str) -> bool {
        let level = self.driver.level(path);
        match level.cmp(&self.level) {
            Ordering::Less => false,
            Ordering::Equal => level == 0 || self.name == self.driver.name_by_level(path, level),
            Ordering::Greater => self
                .child(self.driver.name_by_level(path, self.level + 1))
                .is_some_and(|child| child.has(path)),
        }
    }

    /// Remove the node at `path` with its whole subtree
    ///
    /// Missing paths are a no-op; the root can not be deleted.
    pub fn del(&self, path: &str) -> Result<(), TreeError> {
        let level = self.driver.level(path);
        if level == 0 {
            return Err(TreeError::RootDeletion);
        }
        if level <= self.level {
            return Ok(());
        }

        let name = self.driver.name_by_level(path, self.level + 1);
        if level == self.level + 1 {
            if write(&self.children).remove(name).is_some() {
                tracing::debug!("Deleted node '{}'", path);
            }
            return Ok(());
        }

        match self.child(name) {
            Some(child) => child.del(path),
            None => Ok(()),
        }
    }

    /// Attach `child` under its own name, replacing any node of that name
    ///
    /// Returns the replaced node, if any. The child must sit exactly one
    /// level below this node, at the path this node would give it, and share
    /// this tree's driver and realize mode.
    pub fn graft(&self, child: Arc<Tree>) -> Result<Option<Arc<Tree>>, TreeError> {
        if child.level != self.level + 1 {
            return Err(TreeError::GraftLevelMismatch {
                name: child.name.clone(),
                parent_level: self.level,
                child_level: child.level,
            });
        }
        let expected = self.driver.append_path(&self.path, &child.name);
        if child.path != expected {
            return Err(TreeError::graft_incompatible(
                &child.path,
                format!("expected path '{}'", expected),
            ));
        }
        if child.driver.name() != self.driver.name() {
            return Err(TreeError::graft_incompatible(
                &child.path,
                format!(
                    "driver '{}' differs from '{}'",
                    child.driver.name(),
                    self.driver.name()
                ),
            ));
        }
        if child.mode != self.mode {
            return Err(TreeError::graft_incompatible(
                &child.path,
                format!("mode {:?} differs from {:?}", child.mode, self.mode),
            ));
        }
        Ok(write(&self.children).insert(child.name.clone(), child))
    }

    /// Existing node at `path`, without creating anything
    pub fn node(self: &Arc<Self>, path: &str) -> Option<Arc<Tree>> {
        let level = self.driver.level(path);
        if level < self.level {
            return None;
        }
        if level == self.level {
            let matches = level == 0 || self.name == self.driver.name_by_level(path, level);
            return matches.then(|| Arc::clone(self));
        }

        let mut current = self.child(self.driver.name_by_level(path, self.level + 1))?;
        while current.level < level {
            let next = current.child(self.driver.name_by_level(path, current.level + 1))?;
            current = next;
        }
        Some(current)
    }

    /// Nested map of child names, leaves as empty objects
    pub fn show_struct(&self) -> Value {
        let mut shape = Map::new();
        for child in self.sorted_children() {
            shape.insert(child.name.clone(), child.show_struct());
        }
        Value::Object(shape)
    }

    fn child(&self, name: &str) -> Option<Arc<Tree>> {
        read(&self.children).get(name).cloned()
    }

    fn sorted_children(&self) -> Vec<Arc<Tree>> {
        let mut children: Vec<Arc<Tree>> = read(&self.children).values().cloned().collect();
        children.sort_by(|a, b| a.name.cmp(&b.name));
        children
    }

    /// Existing child `name`, or a freshly sprouted one
    fn grow(&self, name: &str) -> Arc<Tree> {
        if let Some(child) = self.child(name) {
            return child;
        }
        let sprout = Arc::new(self.sprout(name));
        let mut children = write(&self.children);
        Arc::clone(children.entry(name.to_string()).or_insert(sprout))
    }
}

impl fmt::Debug for Tree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tree")
            .field("name", &self.name)
            .field("path", &self.path)
            .field("level", &self.level)
            .field("mode", &self.mode)
            .field("driver", &self.driver.name())
            .finish_non_exhaustive()
    }
}
