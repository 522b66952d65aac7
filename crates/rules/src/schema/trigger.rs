//! Trigger definitions.

use serde::{Deserialize, Serialize};

/// A named rule under `trigger_on`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Trigger {
    pub title: String,
    /// Path expression evaluated with any-match semantics.
    #[serde(alias = "expression")]
    pub objectpath: String,
    /// Names of `reactor_engines` entries that receive this trigger's matches.
    #[serde(default, alias = "plugins")]
    pub reactors: Vec<String>,
}
