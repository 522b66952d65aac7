//! Result handler rule configurations.
//!
//! This crate provides:
//! - YAML configuration schema with serde deserialization
//! - Grok patterns for extracting metadata from result file paths
//! - A shared, name-keyed configuration registry
//! - Filesystem loader with a `notify` watcher feeding the registry

pub mod grok;
pub mod loader;
pub mod registry;
pub mod schema;

pub use loader::{ConfigLoader, ConfigWatcher, LoadResult, LoadStatus, RuleError};
pub use registry::ConfigRegistry;
pub use schema::{PluginBinding, RuleConfiguration, TargetKeys, Trigger};
