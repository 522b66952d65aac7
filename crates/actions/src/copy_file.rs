//! File-copy plugin.
//!
//! Copies the scanned result file (or anything a template can name) to a
//! destination rendered per fired record, after an optional retention pass
//! over an archive root.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::Deserialize;
use serde_json::Value;
use tlsreact_query::QueryContext;
use tracing::{debug, error, info, warn};
use walkdir::WalkDir;

use crate::templating::TemplateRenderer;
use crate::traits::{ActionPlugin, FiredRecord, PluginError};

const SECS_PER_DAY: u64 = 24 * 60 * 60;

/// Settings accepted by a file-copy binding.
#[derive(Debug, Clone, Deserialize)]
pub struct CopyFileSettings {
    /// Source path template, rendered against each fired record.
    #[serde(alias = "from")]
    pub copy_from: String,
    /// Destination path template, rendered against each fired record.
    #[serde(alias = "to")]
    pub copy_to: String,
    #[serde(default)]
    pub retention: Option<RetentionPolicy>,
}

/// Subdirectories of `root` older than `max_age_days` are removed before
/// any copy.
#[derive(Debug, Clone, Deserialize)]
pub struct RetentionPolicy {
    pub root: PathBuf,
    pub max_age_days: u64,
}

impl RetentionPolicy {
    pub fn max_age(&self) -> Duration {
        Duration::from_secs(self.max_age_days.saturating_mul(SECS_PER_DAY))
    }
}

#[derive(Debug)]
pub struct CopyFileReactor {
    settings: CopyFileSettings,
}

enum CopyOutcome {
    Copied { from: PathBuf, to: PathBuf },
    MissingSource(PathBuf),
}

impl CopyFileReactor {
    pub fn from_settings(settings: &Value) -> Result<Self, PluginError> {
        let settings: CopyFileSettings = serde_json::from_value(settings.clone())
            .map_err(|e| PluginError::Config(format!("invalid copy settings: {e}")))?;
        TemplateRenderer::validate(&settings.copy_from)
            .and_then(|_| TemplateRenderer::validate(&settings.copy_to))
            .map_err(|e| PluginError::Config(format!("invalid path template: {e}")))?;
        Ok(Self { settings })
    }

    async fn apply_retention(&self, policy: &RetentionPolicy) {
        let root = policy.root.clone();
        let max_age = policy.max_age();
        match tokio::task::spawn_blocking(move || purge_expired(&root, max_age, SystemTime::now()))
            .await
        {
            Ok(removed) => {
                info!(
                    root = %policy.root.display(),
                    max_age_days = policy.max_age_days,
                    removed = removed.len(),
                    "retention pass complete"
                );
            }
            Err(e) => error!(root = %policy.root.display(), error = %e, "retention pass panicked"),
        }
    }

    async fn copy_record(
        &self,
        renderer: &TemplateRenderer,
        record: &FiredRecord,
    ) -> Result<CopyOutcome, PluginError> {
        let from = PathBuf::from(renderer.render(&self.settings.copy_from, record)?);
        let to = PathBuf::from(renderer.render(&self.settings.copy_to, record)?);

        let is_file = tokio::fs::metadata(&from)
            .await
            .map(|m| m.is_file())
            .unwrap_or(false);
        if !is_file {
            return Ok(CopyOutcome::MissingSource(from));
        }

        if let Some(parent) = to.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::copy(&from, &to).await?;
        Ok(CopyOutcome::Copied { from, to })
    }
}

#[async_trait::async_trait]
impl ActionPlugin for CopyFileReactor {
    async fn handle(&self, fired: &[FiredRecord], ctx: Arc<QueryContext>) -> Result<(), PluginError> {
        if let Some(policy) = &self.settings.retention {
            self.apply_retention(policy).await;
        }

        let renderer = TemplateRenderer::new(ctx);
        for record in fired {
            match self.copy_record(&renderer, record).await {
                Ok(CopyOutcome::Copied { from, to }) => {
                    info!(
                        trigger = %record.tag,
                        from = %from.display(),
                        to = %to.display(),
                        "copied result file"
                    );
                }
                Ok(CopyOutcome::MissingSource(from)) => {
                    error!(
                        trigger = %record.tag,
                        from = %from.display(),
                        "copy source is not a file, skipping"
                    );
                }
                Err(e) => {
                    error!(trigger = %record.tag, error = %e, "copy failed");
                }
            }
        }
        Ok(())
    }

    fn kind(&self) -> &str {
        "copy_file"
    }
}

/// Remove every directory below `root` whose modification time is strictly
/// older than `now - max_age`. Removed directories are not descended into.
///
/// Returns the removed paths. Entries that cannot be inspected or removed
/// are logged and left in place.
pub fn purge_expired(root: &Path, max_age: Duration, now: SystemTime) -> Vec<PathBuf> {
    let cutoff = now.checked_sub(max_age).unwrap_or(UNIX_EPOCH);
    let mut removed = Vec::new();

    let mut walker = WalkDir::new(root).min_depth(1).into_iter();
    while let Some(entry) = walker.next() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!(root = %root.display(), error = %e, "failed to read retention entry");
                continue;
            }
        };
        if !entry.file_type().is_dir() {
            continue;
        }

        let modified = match entry.metadata().map(|m| m.modified()) {
            Ok(Ok(modified)) => modified,
            Ok(Err(e)) => {
                warn!(path = %entry.path().display(), error = %e, "no modification time");
                continue;
            }
            Err(e) => {
                warn!(path = %entry.path().display(), error = %e, "failed to stat directory");
                continue;
            }
        };
        if modified >= cutoff {
            continue;
        }

        match std::fs::remove_dir_all(entry.path()) {
            Ok(()) => {
                debug!(path = %entry.path().display(), "removed expired directory");
                removed.push(entry.path().to_path_buf());
                walker.skip_current_dir();
            }
            Err(e) => {
                warn!(path = %entry.path().display(), error = %e, "failed to remove expired directory");
            }
        }
    }

    removed
}
