//! Top-level rule configuration document.

use std::collections::HashMap;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::{PluginBinding, TargetKeys, Trigger};

/// `evaluation_doc_config` block.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct EvaluationDocConfig {
    #[serde(default)]
    pub target_keys: TargetKeys,
}

/// One result handler configuration file.
///
/// Immutable once loaded. A later file with the same base name replaces it
/// wholesale in the registry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RuleConfiguration {
    /// Registry key: the base filename this configuration was loaded from.
    #[serde(skip)]
    pub name: String,
    #[serde(default)]
    pub evaluation_doc_config: EvaluationDocConfig,
    /// Grok pattern applied to the absolute result file path.
    #[serde(default)]
    pub path_properties_grok: Option<String>,
    /// Extra grok sub-patterns referenced by `path_properties_grok`.
    #[serde(default)]
    pub custom_groks: HashMap<String, String>,
    /// Expression locating the certificate expiry timestamp.
    pub cert_expires_objectpath: String,
    /// Triggers in file order.
    #[serde(default)]
    pub trigger_on: IndexMap<String, Trigger>,
    /// Action plugin bindings by name.
    #[serde(default, alias = "reactors")]
    pub reactor_engines: HashMap<String, PluginBinding>,
}

impl RuleConfiguration {
    /// Parse a YAML configuration and stamp it with its registry name.
    pub fn from_yaml(name: &str, contents: &str) -> Result<Self, serde_yaml::Error> {
        let mut config: RuleConfiguration = serde_yaml::from_str(contents)?;
        config.name = name.to_string();
        Ok(config)
    }

    pub fn target_keys(&self) -> &TargetKeys {
        &self.evaluation_doc_config.target_keys
    }

    /// Look up a plugin binding referenced by a trigger.
    pub fn binding(&self, plugin_name: &str) -> Option<&PluginBinding> {
        self.reactor_engines.get(plugin_name)
    }
}
