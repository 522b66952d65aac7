//! Filesystem event filtering for the config watcher.

use std::path::{Path, PathBuf};

use notify::event::{ModifyKind, RenameMode};
use notify::{Event, EventKind};

/// Whether `path` names a rule configuration file.
///
/// The name must contain a YAML extension and must not be a dotfile.
pub fn is_rule_file(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    if name.starts_with('.') {
        return false;
    }
    name.contains(".yaml") || name.contains(".yml")
}

/// Paths of rule files created by `event`.
///
/// A rename onto a rule file name counts as creation of that name. Plain
/// modifications and removals are ignored.
pub(super) fn created_rule_files(event: &Event) -> Vec<PathBuf> {
    let paths: &[PathBuf] = match event.kind {
        EventKind::Create(_) => &event.paths,
        EventKind::Modify(ModifyKind::Name(RenameMode::To)) => &event.paths,
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => {
            event.paths.get(1..).unwrap_or_default()
        }
        _ => return Vec::new(),
    };
    paths.iter().filter(|p| is_rule_file(p)).cloned().collect()
}
