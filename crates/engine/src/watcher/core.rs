//! Core [`ResultWatcher`]: owns the per-path state machine, the settle
//! timers and the dedup cache.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use regex::{Regex, RegexBuilder};
use tlsreact_core::Settings;
use tokio::sync::mpsc;
use tracing::{debug, error, info, trace, warn};

use crate::dedup::{DedupCache, DEFAULT_DEDUP_CAPACITY};
use crate::error::Result;

use super::probe::{FileProbe, LocalFileProbe};
use super::state::{PathState, Rejection, Transition};

#[derive(Debug, Clone)]
pub struct WatcherOptions {
    /// Matched case-insensitively anywhere in the path.
    pub filename_filter: String,
    /// Quiet period between an event and validation.
    pub settle_delay: Duration,
    pub dedup_capacity: usize,
}

impl WatcherOptions {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            filename_filter: settings.input_filename_filter.clone(),
            settle_delay: settings.settle_delay,
            dedup_capacity: DEFAULT_DEDUP_CAPACITY,
        }
    }
}

/// Single-owner driver of the result file state machine.
///
/// Every transition runs on the task that owns the watcher, so the dedup
/// check and insert in [`settle`](Self::settle) cannot interleave with
/// another event for the same path.
pub struct ResultWatcher<P: FileProbe = LocalFileProbe> {
    filter: Regex,
    settle_delay: Duration,
    probe: P,
    dedup: DedupCache,
    /// Paths with a running settle timer.
    settling: HashSet<PathBuf>,
    submit: mpsc::UnboundedSender<PathBuf>,
    settled_tx: mpsc::UnboundedSender<PathBuf>,
    settled_rx: Option<mpsc::UnboundedReceiver<PathBuf>>,
}

impl ResultWatcher<LocalFileProbe> {
    pub fn new(options: &WatcherOptions, submit: mpsc::UnboundedSender<PathBuf>) -> Result<Self> {
        Self::with_probe(options, LocalFileProbe, submit)
    }
}

impl<P: FileProbe> ResultWatcher<P> {
    pub fn with_probe(
        options: &WatcherOptions,
        probe: P,
        submit: mpsc::UnboundedSender<PathBuf>,
    ) -> Result<Self> {
        let filter = RegexBuilder::new(&options.filename_filter)
            .case_insensitive(true)
            .build()?;
        let (settled_tx, settled_rx) = mpsc::unbounded_channel();
        Ok(Self {
            filter,
            settle_delay: options.settle_delay,
            probe,
            dedup: DedupCache::new(options.dedup_capacity),
            settling: HashSet::new(),
            submit,
            settled_tx,
            settled_rx: Some(settled_rx),
        })
    }

    pub fn dedup(&self) -> &DedupCache {
        &self.dedup
    }

    pub fn is_settling(&self, path: &Path) -> bool {
        self.settling.contains(path)
    }

    /// Discovered → Filtered → Debounced.
    ///
    /// On success a settle timer is running; when it fires the path comes
    /// back through [`settle`](Self::settle).
    pub async fn observe(&mut self, path: PathBuf) -> Transition {
        if !self.filter.is_match(&path.to_string_lossy()) {
            trace!(path = %path.display(), "ignoring path not matching filename filter");
            return Err(Rejection::FilteredOut);
        }
        if self.probe.is_dir(&path).await {
            return Err(Rejection::Directory);
        }
        if self.dedup.contains(&path) {
            trace!(path = %path.display(), "result file already processed, not settling again");
            return Err(Rejection::Duplicate);
        }

        if !self.settling.insert(path.clone()) {
            trace!(path = %path.display(), "result file already settling");
            return Err(Rejection::AlreadySettling);
        }

        debug!(
            path = %path.display(),
            delay = ?self.settle_delay,
            "waiting for result file to settle"
        );
        let tx = self.settled_tx.clone();
        let delay = self.settle_delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(path);
        });
        Ok(PathState::Debounced)
    }

    /// Validated → Deduplicated → Submitted, once the settle timer fired.
    pub async fn settle(&mut self, path: PathBuf) -> Transition {
        self.settling.remove(&path);

        let bytes = match self.probe.read(&path).await {
            Ok(bytes) => bytes,
            Err(e) => {
                debug!(path = %path.display(), error = %e, "result file unreadable after settling");
                return Err(Rejection::Unreadable(e.to_string()));
            }
        };
        if bytes.iter().all(u8::is_ascii_whitespace) {
            debug!(path = %path.display(), "result file empty after settling");
            return Err(Rejection::Empty);
        }
        if serde_json::from_slice::<serde::de::IgnoredAny>(&bytes).is_err() {
            debug!(
                path = %path.display(),
                "result file is not valid JSON yet, waiting for the next event"
            );
            return Err(Rejection::NotJson);
        }

        if !self.dedup.insert(path.clone()) {
            debug!(path = %path.display(), "result file already processed, ignoring");
            return Err(Rejection::Duplicate);
        }

        if self.submit.send(path.clone()).is_err() {
            warn!(path = %path.display(), "worker queue closed, dropping result file");
            return Err(Rejection::QueueClosed);
        }
        info!(path = %path.display(), "submitted result file for processing");
        Ok(PathState::Submitted)
    }

    /// Drive the state machine until `events` closes.
    ///
    /// Settle timers still running at that point are abandoned.
    pub async fn run(mut self, mut events: mpsc::UnboundedReceiver<PathBuf>) {
        let Some(mut settled) = self.settled_rx.take() else {
            error!("result watcher is already running");
            return;
        };

        loop {
            tokio::select! {
                event = events.recv() => match event {
                    Some(path) => {
                        let _ = self.observe(path).await;
                    }
                    None => break,
                },
                Some(path) = settled.recv() => {
                    let _ = self.settle(path).await;
                }
            }
        }

        info!(
            settling = self.settling.len(),
            processed = self.dedup.len(),
            "result watcher stopped"
        );
    }
}
