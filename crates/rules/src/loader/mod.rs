//! Filesystem rule configuration loader with a `notify` watcher.
//!
//! Watches the config directory recursively for newly created YAML files,
//! parses each into a [`RuleConfiguration`](crate::schema::RuleConfiguration)
//! and stores it in the shared [`ConfigRegistry`](crate::registry::ConfigRegistry)
//! under its base filename. Files already present at startup are fed through
//! the same handler once.

mod core;
mod error;
mod watcher;

#[cfg(test)]
mod tests;

pub use self::core::{ConfigLoader, ConfigWatcher};
pub use self::error::{LoadResult, LoadStatus, Result, RuleError};
pub use self::watcher::is_rule_file;
