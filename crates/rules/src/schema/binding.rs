//! Action plugin bindings.

use serde::{Deserialize, Serialize};

/// A named action plugin as configured under `reactor_engines`.
///
/// `class_name` selects the implementation; every other key is handed to
/// the implementation as its settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PluginBinding {
    #[serde(alias = "kind")]
    pub class_name: String,
    #[serde(flatten)]
    pub settings: serde_json::Map<String, serde_json::Value>,
}

impl PluginBinding {
    /// Settings as a JSON object for typed deserialization by the plugin.
    pub fn settings_value(&self) -> serde_json::Value {
        serde_json::Value::Object(self.settings.clone())
    }
}
