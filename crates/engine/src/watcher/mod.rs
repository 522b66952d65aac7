//! Result file watcher.
//!
//! Turns raw filesystem events into settled, validated, deduplicated
//! submissions for the worker pool.
//!
//! Each observed path walks an explicit state machine:
//!
//! ```text
//! Discovered -> Filtered -> Debounced -> Validated -> Deduplicated -> Submitted
//! ```
//!
//! A path can leave the machine at any step with a [`Rejection`]. Rejections
//! before `Deduplicated` never mark the path as processed, so a later event
//! for the same path gets another chance.

mod core;
mod events;
mod probe;
mod state;

#[cfg(test)]
mod tests;

pub use self::core::{ResultWatcher, WatcherOptions};
pub use events::watch_directory;
pub use probe::{FileProbe, LocalFileProbe};
pub use state::{PathState, Rejection, Transition};
