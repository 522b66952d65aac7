//! Tests for the result file watcher.

use std::collections::{HashMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc;

use super::*;

const SETTLE: Duration = Duration::from_secs(300);

/// In-memory filesystem shared between the test and the watcher.
#[derive(Clone, Default)]
struct FakeProbe {
    files: Arc<Mutex<HashMap<PathBuf, Vec<u8>>>>,
    dirs: Arc<Mutex<HashSet<PathBuf>>>,
}

impl FakeProbe {
    fn write(&self, path: &str, contents: &str) {
        self.files
            .lock()
            .unwrap()
            .insert(PathBuf::from(path), contents.as_bytes().to_vec());
    }

    fn mkdir(&self, path: &str) {
        self.dirs.lock().unwrap().insert(PathBuf::from(path));
    }
}

#[async_trait::async_trait]
impl FileProbe for FakeProbe {
    async fn is_dir(&self, path: &Path) -> bool {
        self.dirs.lock().unwrap().contains(path)
    }

    async fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        self.files
            .lock()
            .unwrap()
            .get(path)
            .cloned()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no such file"))
    }
}

fn options() -> WatcherOptions {
    WatcherOptions {
        filename_filter: ".*testssloutput.+.json".to_string(),
        settle_delay: SETTLE,
        dedup_capacity: 400,
    }
}

fn watcher(probe: &FakeProbe) -> (ResultWatcher<FakeProbe>, mpsc::UnboundedReceiver<PathBuf>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let watcher = ResultWatcher::with_probe(&options(), probe.clone(), tx).unwrap();
    (watcher, rx)
}

fn drain(rx: &mut mpsc::UnboundedReceiver<PathBuf>) -> Vec<PathBuf> {
    let mut out = Vec::new();
    while let Ok(path) = rx.try_recv() {
        out.push(path);
    }
    out
}

const VALID: &str = r#"{"scanResult": [{"id": "x"}]}"#;
const FILE: &str = "/in/testssloutput/host/scan.json";

#[tokio::test(start_paused = true)]
async fn filter_is_case_insensitive_and_drops_non_matches() {
    let probe = FakeProbe::default();
    let (mut w, _rx) = watcher(&probe);

    assert_eq!(
        w.observe(PathBuf::from("/in/other/scan.json")).await,
        Err(Rejection::FilteredOut)
    );
    assert_eq!(
        w.observe(PathBuf::from("/in/TestSSLOutput/h/scan.JSON")).await,
        Ok(PathState::Debounced)
    );
}

#[tokio::test(start_paused = true)]
async fn directories_are_dropped() {
    let probe = FakeProbe::default();
    probe.mkdir("/in/testssloutput/host.json");
    let (mut w, _rx) = watcher(&probe);
    assert_eq!(
        w.observe(PathBuf::from("/in/testssloutput/host.json")).await,
        Err(Rejection::Directory)
    );
}

#[tokio::test(start_paused = true)]
async fn settling_path_is_not_scheduled_twice() {
    let probe = FakeProbe::default();
    let (mut w, _rx) = watcher(&probe);
    assert_eq!(w.observe(PathBuf::from(FILE)).await, Ok(PathState::Debounced));
    assert_eq!(
        w.observe(PathBuf::from(FILE)).await,
        Err(Rejection::AlreadySettling)
    );
    assert!(w.is_settling(Path::new(FILE)));
}

#[tokio::test]
async fn partial_file_is_not_marked_processed() {
    let probe = FakeProbe::default();
    probe.write(FILE, r#"{"scanResult": [{"id""#);
    let (mut w, mut rx) = watcher(&probe);

    assert_eq!(w.settle(PathBuf::from(FILE)).await, Err(Rejection::NotJson));
    assert!(w.dedup().is_empty());

    probe.write(FILE, VALID);
    assert_eq!(w.settle(PathBuf::from(FILE)).await, Ok(PathState::Submitted));
    assert_eq!(drain(&mut rx), vec![PathBuf::from(FILE)]);
}

#[tokio::test]
async fn empty_and_missing_files_are_dropped() {
    let probe = FakeProbe::default();
    probe.write(FILE, "  \n");
    let (mut w, mut rx) = watcher(&probe);

    assert_eq!(w.settle(PathBuf::from(FILE)).await, Err(Rejection::Empty));
    assert!(matches!(
        w.settle(PathBuf::from("/in/testssloutput/gone.json")).await,
        Err(Rejection::Unreadable(_))
    ));
    assert!(drain(&mut rx).is_empty());
    assert!(w.dedup().is_empty());
}

#[tokio::test]
async fn second_settle_of_same_path_is_duplicate() {
    let probe = FakeProbe::default();
    probe.write(FILE, VALID);
    let (mut w, mut rx) = watcher(&probe);

    assert_eq!(w.settle(PathBuf::from(FILE)).await, Ok(PathState::Submitted));
    assert_eq!(w.settle(PathBuf::from(FILE)).await, Err(Rejection::Duplicate));
    assert_eq!(drain(&mut rx).len(), 1);
}

#[tokio::test(start_paused = true)]
async fn processed_path_does_not_start_another_settle() {
    let probe = FakeProbe::default();
    probe.write(FILE, VALID);
    let (mut w, _rx) = watcher(&probe);

    assert_eq!(w.settle(PathBuf::from(FILE)).await, Ok(PathState::Submitted));
    assert_eq!(w.observe(PathBuf::from(FILE)).await, Err(Rejection::Duplicate));
    assert!(!w.is_settling(Path::new(FILE)));
}

#[tokio::test]
async fn closed_queue_is_reported() {
    let probe = FakeProbe::default();
    probe.write(FILE, VALID);
    let (mut w, rx) = watcher(&probe);
    drop(rx);
    assert_eq!(w.settle(PathBuf::from(FILE)).await, Err(Rejection::QueueClosed));
}

#[tokio::test(start_paused = true)]
async fn run_submits_once_after_settle_delay() {
    let probe = FakeProbe::default();
    probe.write(FILE, VALID);
    let (w, mut submitted) = watcher(&probe);
    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let task = tokio::spawn(w.run(events_rx));

    // Create followed by a burst of modifications.
    for _ in 0..3 {
        events_tx.send(PathBuf::from(FILE)).unwrap();
    }

    tokio::time::sleep(SETTLE - Duration::from_secs(1)).await;
    assert!(drain(&mut submitted).is_empty());

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(drain(&mut submitted), vec![PathBuf::from(FILE)]);

    // A late modification is dropped without a new settle timer.
    events_tx.send(PathBuf::from(FILE)).unwrap();
    tokio::time::sleep(SETTLE + Duration::from_secs(1)).await;
    assert!(drain(&mut submitted).is_empty());

    drop(events_tx);
    task.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn run_retries_file_completed_after_first_settle() {
    let probe = FakeProbe::default();
    probe.write(FILE, "{");
    let (w, mut submitted) = watcher(&probe);
    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let task = tokio::spawn(w.run(events_rx));

    events_tx.send(PathBuf::from(FILE)).unwrap();
    tokio::time::sleep(SETTLE + Duration::from_secs(1)).await;
    assert!(drain(&mut submitted).is_empty());

    probe.write(FILE, VALID);
    events_tx.send(PathBuf::from(FILE)).unwrap();
    tokio::time::sleep(SETTLE + Duration::from_secs(1)).await;
    assert_eq!(drain(&mut submitted), vec![PathBuf::from(FILE)]);

    drop(events_tx);
    task.await.unwrap();
}

#[tokio::test]
async fn invalid_filter_is_rejected() {
    let (tx, _rx) = mpsc::unbounded_channel();
    let mut opts = options();
    opts.filename_filter = "([unclosed".to_string();
    assert!(ResultWatcher::with_probe(&opts, FakeProbe::default(), tx).is_err());
}
