//! Shared registry of loaded rule configurations.
//!
//! Written only by the config loader worker, read by every result
//! processing task. Entries are replaced whole under the write lock, and
//! readers iterate over a [`snapshot`](ConfigRegistry::snapshot) so a
//! concurrent insert never invalidates an in-flight evaluation.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::schema::RuleConfiguration;

/// Name → configuration map behind a single-writer/many-reader lock.
#[derive(Debug, Clone, Default)]
pub struct ConfigRegistry {
    inner: Arc<RwLock<HashMap<String, Arc<RuleConfiguration>>>>,
}

impl ConfigRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the configuration stored under `config.name`.
    ///
    /// Returns the previous entry, if any.
    pub fn insert(&self, config: RuleConfiguration) -> Option<Arc<RuleConfiguration>> {
        let name = config.name.clone();
        self.inner
            .write()
            .expect("config registry lock poisoned")
            .insert(name, Arc::new(config))
    }

    pub fn get(&self, name: &str) -> Option<Arc<RuleConfiguration>> {
        self.inner
            .read()
            .expect("config registry lock poisoned")
            .get(name)
            .cloned()
    }

    /// Point-in-time copy of every entry, sorted by name.
    pub fn snapshot(&self) -> Vec<Arc<RuleConfiguration>> {
        let mut configs: Vec<Arc<RuleConfiguration>> = self
            .inner
            .read()
            .expect("config registry lock poisoned")
            .values()
            .cloned()
            .collect();
        configs.sort_by(|a, b| a.name.cmp(&b.name));
        configs
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .inner
            .read()
            .expect("config registry lock poisoned")
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.inner.read().expect("config registry lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
