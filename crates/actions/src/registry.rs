//! Closed registry of action plugin kinds.
//!
//! Every kind the process can run is registered when the registry is built;
//! configurations only select among them by `class_name`.

use std::collections::BTreeMap;

use serde_json::Value;
use tlsreact_rules::PluginBinding;

use crate::copy_file::CopyFileReactor;
use crate::traits::{ActionPlugin, PluginError};
use crate::webhook::WebhookReactor;

/// Builds a plugin from the settings of a binding.
pub type PluginConstructor = fn(&Value) -> Result<Box<dyn ActionPlugin>, PluginError>;

/// Kind identifier → constructor.
#[derive(Clone)]
pub struct PluginRegistry {
    constructors: BTreeMap<String, PluginConstructor>,
}

impl PluginRegistry {
    /// Registry holding no kinds.
    pub fn empty() -> Self {
        Self {
            constructors: BTreeMap::new(),
        }
    }

    /// Registry holding the built-in kinds under both their class-style and
    /// short names.
    pub fn builtin() -> Self {
        Self::empty()
            .with("CopyFileReactor", copy_file)
            .with("copy_file", copy_file)
            .with("SlackReactor", webhook)
            .with("webhook", webhook)
    }

    /// Register `constructor` under `kind`, replacing any previous entry.
    pub fn with(mut self, kind: &str, constructor: PluginConstructor) -> Self {
        self.constructors.insert(kind.to_string(), constructor);
        self
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.constructors.contains_key(kind)
    }

    /// Registered kinds, sorted.
    pub fn kinds(&self) -> Vec<&str> {
        self.constructors.keys().map(String::as_str).collect()
    }

    /// Construct the plugin a binding selects.
    ///
    /// # Errors
    ///
    /// [`PluginError::UnknownKind`] if `class_name` is not registered, or the
    /// constructor's error if the settings are rejected.
    pub fn create(&self, binding: &PluginBinding) -> Result<Box<dyn ActionPlugin>, PluginError> {
        let constructor = self
            .constructors
            .get(&binding.class_name)
            .ok_or_else(|| PluginError::UnknownKind(binding.class_name.clone()))?;
        constructor(&binding.settings_value())
    }
}

impl Default for PluginRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl std::fmt::Debug for PluginRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginRegistry")
            .field("kinds", &self.kinds())
            .finish()
    }
}

fn copy_file(settings: &Value) -> Result<Box<dyn ActionPlugin>, PluginError> {
    Ok(Box::new(CopyFileReactor::from_settings(settings)?))
}

fn webhook(settings: &Value) -> Result<Box<dyn ActionPlugin>, PluginError> {
    Ok(Box::new(WebhookReactor::from_settings(settings)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn binding(yaml: &str) -> PluginBinding {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn builtin_accepts_both_spellings() {
        let registry = PluginRegistry::builtin();
        for kind in ["CopyFileReactor", "copy_file", "SlackReactor", "webhook"] {
            assert!(registry.contains(kind), "missing {kind}");
        }
        assert_eq!(registry.kinds().len(), 4);
    }

    #[test]
    fn creates_plugin_from_binding_settings() {
        let registry = PluginRegistry::builtin();
        let plugin = registry
            .create(&binding(
                "class_name: SlackReactor\nwebhook_url: https://example.com/hook\ntemplate: '{}'\n",
            ))
            .unwrap();
        assert_eq!(plugin.kind(), "webhook");

        let plugin = registry
            .create(&binding("kind: copy_file\nfrom: /a\nto: /b\n"))
            .unwrap();
        assert_eq!(plugin.kind(), "copy_file");
    }

    #[test]
    fn unknown_kind_is_explicit_error() {
        let err = PluginRegistry::builtin()
            .create(&binding("class_name: PagerReactor\n"))
            .err().unwrap();
        assert!(matches!(err, PluginError::UnknownKind(kind) if kind == "PagerReactor"));
    }

    #[test]
    fn bad_settings_surface_constructor_error() {
        let err = PluginRegistry::builtin()
            .create(&binding("class_name: webhook\ntemplate: '{}'\n"))
            .err().unwrap();
        assert!(matches!(err, PluginError::Config(_)));
    }

    #[test]
    fn empty_registry_knows_nothing() {
        let registry = PluginRegistry::empty();
        assert!(registry.kinds().is_empty());
        assert!(matches!(
            registry.create(&binding("class_name: webhook\n")),
            Err(PluginError::UnknownKind(_))
        ));
    }
}
