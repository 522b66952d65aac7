//! Error types and load result structures for the config loader.

use std::path::PathBuf;

/// Errors that can occur while loading rule configurations.
#[derive(Debug, thiserror::Error)]
pub enum RuleError {
    /// Filesystem I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parse/deserialization error.
    #[error("YAML parse error: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// Filesystem watcher error.
    #[error("Notify watcher error: {0}")]
    Notify(#[from] notify::Error),
}

/// Result alias for loader operations.
pub type Result<T> = std::result::Result<T, RuleError>;

/// Outcome of handling a single config file.
#[derive(Debug)]
pub struct LoadResult {
    pub path: PathBuf,
    pub status: LoadStatus,
}

/// Status of a single file load attempt.
#[derive(Debug, PartialEq)]
pub enum LoadStatus {
    /// Configuration parsed and stored under `name`.
    Loaded { name: String },
    /// File was skipped (directory, dotfile, non-YAML).
    Skipped { reason: String },
    /// Read or parse error; any previous entry of the same name is kept.
    Failed { error: String },
}
