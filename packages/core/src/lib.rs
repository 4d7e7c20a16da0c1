//! RuleForest Core
//!
//! This crate provides a hierarchical rule overlay engine: rules bind ordered
//! document processors to paths such as `/a/b/c`, and querying a path returns
//! the document produced by applying every ancestor's processors root-first
//! to a shared template.
//!
//! # Architecture
//!
//! - **Trees**: path-indexed nodes, realized eagerly or lazily on first visit
//! - **Drivers**: pluggable path parsing, realization and processor serialization
//! - **Forests**: named trees rebuilt on demand from builder functions
//! - **In-memory only**: every tree is rebuilt from its rule source, nothing is persisted
//!
//! # Modules
//!
//! - [`processors`] - Document transformation steps (json, yaml, tile, curl, raw)
//! - [`driver`] - Path parser, realizer and modem contracts plus the built-in drivers
//! - [`rule`] - Rule value type
//! - [`tree`] - Rule trees
//! - [`forest`] - Tree registry and refresh loop
//! - [`loader`] - Rules file decoding
//! - [`config`] - Engine configuration

pub mod config;
pub mod driver;
pub mod forest;
pub mod loader;
mod locks;
pub mod processors;
pub mod rule;
pub mod tree;

// Re-export commonly used types
pub use config::{ConfigError, EngineConfig};
pub use driver::{Driver, ModemError, ProcessorRegistry, RealizeError};
pub use forest::{builder, Forest, RefreshHandle, TreeBuilder};
pub use loader::{default_builder, load_rules, load_rules_file, LoadError};
pub use processors::{
    CurlProcessor, JsonProcessor, ProcessError, Processor, ProcessorRef, RawProcessor,
    TileProcessor, YamlProcessor,
};
pub use rule::Rule;
pub use tree::{RealizeMode, Tree, TreeError};
