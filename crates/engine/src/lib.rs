//! Result processing pipeline.
//!
//! This crate provides:
//! - `ResultProcessor`: evaluates one scan result file against every loaded
//!   rule configuration and dispatches fired records to action plugins
//! - `ResultWatcher`: per-path state machine that turns filesystem events
//!   into settled, validated, deduplicated submissions
//! - `WorkerPool`: fixed set of tokio tasks draining the submission queue

pub mod dedup;
pub mod document;
pub mod error;
pub mod expiry;
pub mod pool;
pub mod processor;
pub mod watcher;

pub use dedup::DedupCache;
pub use error::{ProcessError, Result};
pub use pool::{SubmissionHandler, WorkerPool};
pub use processor::{
    ConfigReport, Invocation, InvocationOutcome, ProcessReport, ProcessorOptions, ResultProcessor,
};
pub use watcher::{
    watch_directory, FileProbe, LocalFileProbe, PathState, Rejection, ResultWatcher,
    WatcherOptions,
};
