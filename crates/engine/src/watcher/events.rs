//! Bridge from `notify` to the watcher task.

use std::path::{Path, PathBuf};

use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::error::Result;

/// Watch `dir` recursively, forwarding the paths of creation and
/// modification events.
///
/// Dropping the returned watcher closes the channel.
pub fn watch_directory(dir: &Path) -> Result<(RecommendedWatcher, mpsc::UnboundedReceiver<PathBuf>)> {
    let (tx, rx) = mpsc::unbounded_channel();

    let mut watcher = notify::recommended_watcher(
        move |res: std::result::Result<notify::Event, notify::Error>| match res {
            Ok(event) if matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_)) => {
                for path in event.paths {
                    if tx.send(path).is_err() {
                        return;
                    }
                }
            }
            Ok(_) => {}
            Err(e) => warn!(error = %e, "input watcher error"),
        },
    )?;
    watcher.watch(dir, RecursiveMode::Recursive)?;

    info!(path = %dir.display(), "monitoring for new scan result files");
    Ok((watcher, rx))
}
