//! Asynchronous persistence pipeline.
//!
//! A single background worker drains a FIFO queue of [`WriteTask`]s and
//! performs the durable file appends, so the monitoring loop never blocks on
//! disk I/O. Tasks are processed strictly in enqueue order; a failed task is
//! logged and dropped, never stopping the worker. Shutdown closes the queue,
//! waits for the backlog to drain and joins the worker with a bounded
//! timeout.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

/// One durable file write. Immutable once enqueued.
#[derive(Clone, Debug)]
pub struct WriteTask {
    pub path: PathBuf,
    pub content: String,
    /// Append to the target (the JSONL logs) or replace it (payload files).
    pub append: bool,
}

impl WriteTask {
    pub fn append(path: impl Into<PathBuf>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
            append: true,
        }
    }

    pub fn replace(path: impl Into<PathBuf>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
            append: false,
        }
    }
}

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("write queue is closed")]
    QueueClosed,
}

/// Shutdown limits for the pipeline.
#[derive(Clone, Debug)]
pub struct PersistConfig {
    /// How long to wait for the backlog to drain after closing the queue.
    pub drain_timeout: Duration,
    /// How long to wait for the worker itself to terminate afterwards.
    pub join_timeout: Duration,
}

impl Default for PersistConfig {
    fn default() -> Self {
        Self {
            drain_timeout: Duration::from_secs(30),
            join_timeout: Duration::from_secs(5),
        }
    }
}

/// Counters reported by the worker when it terminates.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SinkStats {
    pub completed: u64,
    pub failed: u64,
}

/// Cloneable producer side of the write queue.
#[derive(Clone)]
pub struct FileSink {
    tx: mpsc::UnboundedSender<WriteTask>,
}

impl FileSink {
    /// Spawn the worker and hand back the producer plus its lifecycle handle.
    pub fn spawn(config: PersistConfig) -> (Self, SinkHandle) {
        let (tx, rx) = mpsc::unbounded_channel();
        let worker = tokio::spawn(run_worker(rx));
        debug!("write queue worker started");
        (
            Self { tx },
            SinkHandle {
                config,
                worker: Some(worker),
            },
        )
    }

    /// Queue one write. Never blocks; fails only once the pipeline has shut
    /// down.
    pub fn enqueue(&self, task: WriteTask) -> Result<(), PersistError> {
        self.tx.send(task).map_err(|_| PersistError::QueueClosed)
    }
}

/// Lifecycle handle for the worker task.
///
/// Dropping the handle aborts the worker; prefer [`SinkHandle::shutdown`],
/// which drains the backlog first.
pub struct SinkHandle {
    config: PersistConfig,
    worker: Option<JoinHandle<SinkStats>>,
}

impl SinkHandle {
    /// Close-and-drain shutdown.
    ///
    /// The caller must have dropped (or be about to drop) every [`FileSink`]
    /// clone; the worker exits once all producers are gone and the backlog is
    /// empty. Producers that are still alive may keep enqueueing during the
    /// drain window. A worker that misses both timeouts is logged and
    /// abandoned, not treated as fatal.
    pub async fn shutdown(mut self, sink: FileSink) -> SinkStats {
        drop(sink);
        let Some(worker) = self.worker.take() else {
            return SinkStats::default();
        };
        let total_wait = self.config.drain_timeout + self.config.join_timeout;
        match timeout(total_wait, worker).await {
            Ok(Ok(stats)) => {
                info!(
                    completed = stats.completed,
                    failed = stats.failed,
                    "write queue drained"
                );
                stats
            }
            Ok(Err(join_err)) => {
                error!(%join_err, "write queue worker panicked");
                SinkStats::default()
            }
            Err(_) => {
                warn!(
                    timeout_secs = total_wait.as_secs(),
                    "write queue worker did not terminate in time"
                );
                SinkStats::default()
            }
        }
    }
}

impl Drop for SinkHandle {
    fn drop(&mut self) {
        if let Some(worker) = self.worker.take() {
            worker.abort();
        }
    }
}

async fn run_worker(mut rx: mpsc::UnboundedReceiver<WriteTask>) -> SinkStats {
    let mut stats = SinkStats::default();
    while let Some(task) = rx.recv().await {
        match execute(&task).await {
            Ok(()) => {
                stats.completed += 1;
                debug!(
                    path = %task.path.display(),
                    bytes = task.content.len(),
                    "write task completed"
                );
            }
            Err(err) => {
                // The task's data is lost but the pipeline survives.
                stats.failed += 1;
                error!(path = %task.path.display(), %err, "write task failed");
            }
        }
    }
    stats
}

async fn execute(task: &WriteTask) -> std::io::Result<()> {
    if let Some(parent) = task.path.parent() {
        fs::create_dir_all(parent).await?;
    }
    let mut options = OpenOptions::new();
    options.create(true);
    if task.append {
        options.append(true);
    } else {
        options.write(true).truncate(true);
    }
    let mut file = options.open(&task.path).await?;
    file.write_all(task.content.as_bytes()).await?;
    file.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn worker_reports_stats() {
        let dir = tempfile::tempdir().unwrap();
        let (sink, handle) = FileSink::spawn(PersistConfig::default());
        sink.enqueue(WriteTask::append(dir.path().join("a.log"), "one\n"))
            .unwrap();
        sink.enqueue(WriteTask::append(dir.path().join("a.log"), "two\n"))
            .unwrap();
        let stats = handle.shutdown(sink).await;
        assert_eq!(stats.completed, 2);
        assert_eq!(stats.failed, 0);
    }
}
