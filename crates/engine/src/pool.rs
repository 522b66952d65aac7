//! Fixed-size pool of tokio worker tasks draining the submission queue.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::processor::ResultProcessor;

/// Work performed for each submitted result file.
#[async_trait::async_trait]
pub trait SubmissionHandler: Send + Sync + 'static {
    async fn handle(&self, path: PathBuf);
}

#[async_trait::async_trait]
impl SubmissionHandler for ResultProcessor {
    async fn handle(&self, path: PathBuf) {
        self.process(&path).await;
    }
}

/// N workers sharing one unbounded queue.
///
/// The queue closes once every sender is dropped; workers finish what is
/// queued and exit.
pub struct WorkerPool {
    sender: Option<mpsc::UnboundedSender<PathBuf>>,
    workers: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    pub fn spawn<H: SubmissionHandler>(size: usize, handler: H) -> Self {
        let size = size.max(1);
        let (sender, receiver) = mpsc::unbounded_channel::<PathBuf>();
        let queue = Arc::new(Mutex::new(receiver));
        let handler = Arc::new(handler);

        let workers = (0..size)
            .map(|id| {
                let queue = Arc::clone(&queue);
                let handler = Arc::clone(&handler);
                tokio::spawn(async move {
                    loop {
                        let next = queue.lock().await.recv().await;
                        let Some(path) = next else { break };
                        debug!(worker = id, path = %path.display(), "worker picked up result file");
                        let handler = Arc::clone(&handler);
                        let shown = path.display().to_string();
                        let task = tokio::spawn(async move { handler.handle(path).await });
                        if let Err(e) = task.await {
                            error!(worker = id, path = %shown, error = %e, "result handler panicked");
                        }
                    }
                    debug!(worker = id, "worker exiting");
                })
            })
            .collect();

        info!(workers = size, "result worker pool started");
        Self {
            sender: Some(sender),
            workers,
        }
    }

    /// A sender feeding this pool.
    pub fn sender(&self) -> Option<mpsc::UnboundedSender<PathBuf>> {
        self.sender.clone()
    }

    pub fn size(&self) -> usize {
        self.workers.len()
    }

    /// Drop the pool's own sender and wait for every worker to exit.
    ///
    /// Returns once all other senders are gone too and the queue is drained.
    pub async fn join(mut self) {
        self.sender.take();
        for worker in self.workers.drain(..) {
            if let Err(e) = worker.await {
                error!(error = %e, "result worker panicked");
            }
        }
        info!("result worker pool stopped");
    }
}
