//! States and rejections of the per-path state machine.

use std::fmt;

/// Furthest state a path reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathState {
    Discovered,
    /// Path matched the filename filter and is not a directory.
    Filtered,
    /// A settle timer is running for the path.
    Debounced,
    /// Contents are non-empty JSON.
    Validated,
    /// Path was not in the dedup cache and has been added to it.
    Deduplicated,
    /// Path was handed to the worker pool.
    Submitted,
}

/// Why a path left the state machine early.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    FilteredOut,
    Directory,
    AlreadySettling,
    Unreadable(String),
    Empty,
    /// Not parseable yet; typically still being written.
    NotJson,
    Duplicate,
    QueueClosed,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::FilteredOut => write!(f, "does not match filename filter"),
            Rejection::Directory => write!(f, "is a directory"),
            Rejection::AlreadySettling => write!(f, "already waiting to settle"),
            Rejection::Unreadable(e) => write!(f, "unreadable: {e}"),
            Rejection::Empty => write!(f, "empty file"),
            Rejection::NotJson => write!(f, "not valid JSON yet"),
            Rejection::Duplicate => write!(f, "already processed"),
            Rejection::QueueClosed => write!(f, "worker queue closed"),
        }
    }
}

/// Result of driving a path through one or more states.
pub type Transition = Result<PathState, Rejection>;
