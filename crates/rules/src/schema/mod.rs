//! YAML rule configuration schema with serde deserialization.
//!
//! Defines the type hierarchy of a result handler configuration:
//! - `RuleConfiguration`: one YAML file, keyed by its base filename
//! - `TargetKeys`: aliases under which enrichment fields land in the evaluation document
//! - `Trigger`: a titled path expression naming the plugins it fires
//! - `PluginBinding`: a plugin kind plus its kind-specific settings

mod binding;
mod configuration;
mod target_keys;
mod trigger;

pub use binding::*;
pub use configuration::*;
pub use target_keys::*;
pub use trigger::*;

#[cfg(test)]
mod tests;
