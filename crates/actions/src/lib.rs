//! Action plugins for fired triggers.
//!
//! This crate provides:
//! - `ActionPlugin` trait and the `FiredRecord` batches plugins consume
//! - A closed `PluginRegistry` mapping plugin kinds to constructors
//! - Webhook and file-copy plugin implementations
//! - Minijinja template rendering with query filters bound to the live context

pub mod copy_file;
pub mod registry;
pub mod templating;
pub mod traits;
pub mod webhook;

pub use registry::PluginRegistry;
pub use traits::{ActionPlugin, FiredRecord, PluginError};
