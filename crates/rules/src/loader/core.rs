//! Core [`ConfigLoader`]: filesystem-backed configuration loading with a
//! single-worker hot-reload watcher.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::thread::JoinHandle;

use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use tracing::{debug, error, info, warn};
use walkdir::WalkDir;

use crate::registry::ConfigRegistry;
use crate::schema::RuleConfiguration;

use super::error::{LoadResult, LoadStatus, Result};
use super::watcher::{created_rule_files, is_rule_file};

/// Loads rule configuration files into a [`ConfigRegistry`].
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    /// Root directory containing configuration YAML files.
    config_dir: PathBuf,
    registry: ConfigRegistry,
}

impl ConfigLoader {
    /// Create a new loader for the given directory.
    ///
    /// Creates the directory (and parents) if it does not exist.
    pub fn new(config_dir: PathBuf, registry: ConfigRegistry) -> Self {
        if !config_dir.exists() {
            if let Err(e) = fs::create_dir_all(&config_dir) {
                warn!(path = %config_dir.display(), error = %e, "failed to create config directory");
            }
        }
        Self {
            config_dir,
            registry,
        }
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    pub fn registry(&self) -> &ConfigRegistry {
        &self.registry
    }

    /// Parse a single configuration file, named after its base filename.
    pub fn load_file(&self, path: &Path) -> Result<RuleConfiguration> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let contents = fs::read_to_string(path)?;
        Ok(RuleConfiguration::from_yaml(&name, &contents)?)
    }

    /// Handle the creation of `path`.
    ///
    /// On success the configuration replaces any entry of the same name. On
    /// failure the registry is left untouched.
    pub fn handle_created(&self, path: &Path) -> LoadResult {
        let status = if path.is_dir() {
            LoadStatus::Skipped {
                reason: "directory".to_string(),
            }
        } else if !is_rule_file(path) {
            LoadStatus::Skipped {
                reason: "not a YAML rule file".to_string(),
            }
        } else {
            info!(path = %path.display(), "responding to creation of result handler config file");
            match self.load_file(path) {
                Ok(config) => {
                    let name = config.name.clone();
                    info!(
                        config = %name,
                        triggers = config.trigger_on.len(),
                        plugins = config.reactor_engines.len(),
                        "loaded result handler config"
                    );
                    if self.registry.insert(config).is_some() {
                        debug!(config = %name, "replaced previous config of the same name");
                    }
                    LoadStatus::Loaded { name }
                }
                Err(e) => {
                    error!(
                        path = %path.display(),
                        error = %e,
                        "failed to load result handler config, keeping previous version"
                    );
                    LoadStatus::Failed {
                        error: e.to_string(),
                    }
                }
            }
        };

        LoadResult {
            path: path.to_path_buf(),
            status,
        }
    }

    /// Feed every file already under the config directory through
    /// [`handle_created`](Self::handle_created) once.
    pub fn load_existing(&self) -> Vec<LoadResult> {
        existing_files(&self.config_dir)
            .iter()
            .map(|path| self.handle_created(path))
            .collect()
    }

    /// Start watching the config directory recursively.
    ///
    /// The notify callback only forwards created rule file paths; parsing
    /// happens on a single dedicated worker thread, so registry writes are
    /// serialized.
    pub fn watch(&self) -> Result<ConfigWatcher> {
        let (tx, rx) = mpsc::channel::<PathBuf>();
        let queue = tx.clone();

        let mut watcher = notify::recommended_watcher(
            move |res: std::result::Result<notify::Event, notify::Error>| match res {
                Ok(event) => {
                    for path in created_rule_files(&event) {
                        if tx.send(path).is_err() {
                            return;
                        }
                    }
                }
                Err(e) => warn!(error = %e, "config watcher error"),
            },
        )?;
        watcher.watch(&self.config_dir, RecursiveMode::Recursive)?;

        let loader = self.clone();
        let worker = std::thread::Builder::new()
            .name("config-loader".to_string())
            .spawn(move || {
                for path in rx {
                    loader.handle_created(&path);
                }
                debug!("config loader worker exiting");
            })?;

        info!(path = %self.config_dir.display(), "monitoring for new result handler config YAML files");
        Ok(ConfigWatcher {
            config_dir: self.config_dir.clone(),
            watcher: Some(watcher),
            queue: Some(queue),
            worker: Some(worker),
        })
    }
}

fn existing_files(dir: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1) {
        match entry {
            Ok(entry) if entry.file_type().is_file() => files.push(entry.into_path()),
            Ok(_) => {}
            Err(e) => warn!(error = %e, "failed to read config directory entry"),
        }
    }
    files
}

/// Running config watcher. Dropping it stops the watcher without waiting.
pub struct ConfigWatcher {
    config_dir: PathBuf,
    watcher: Option<RecommendedWatcher>,
    queue: Option<mpsc::Sender<PathBuf>>,
    worker: Option<JoinHandle<()>>,
}

impl ConfigWatcher {
    /// Queue every file already under the config directory on the loader
    /// worker, behind any events received so far. Returns the number queued.
    pub fn queue_existing(&self) -> usize {
        let Some(queue) = &self.queue else {
            return 0;
        };
        let mut queued = 0;
        for path in existing_files(&self.config_dir) {
            if queue.send(path).is_err() {
                warn!("config loader worker gone, not queueing existing configs");
                break;
            }
            queued += 1;
        }
        queued
    }

    /// Stop accepting events and wait for the worker to drain.
    pub fn stop(mut self) {
        // The worker exits once the watcher callback's sender and ours are gone.
        self.watcher.take();
        self.queue.take();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                error!("config loader worker panicked");
            }
        }
    }
}
