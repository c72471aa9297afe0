//! Background work queue.
//!
//! Jobs are boxed futures. In [`QueueMode::Background`] there are two lanes:
//! ordered jobs run one at a time in submission order, and concurrent jobs
//! run on spawned tasks up to the worker limit. In [`QueueMode::Immediate`]
//! every job runs inline on the caller, which keeps tests deterministic.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use tokio::sync::{Semaphore, mpsc, watch};
use vela_core::{Error, QueueConfig, Result};

/// A unit of queued work.
pub type Job = BoxFuture<'static, Result<()>>;

/// How queued jobs are executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueMode {
    /// Run each job to completion inside `enqueue`.
    Immediate,
    /// Run jobs on spawned tasks.
    Background {
        /// Maximum concurrently running jobs on the concurrent lane.
        workers: usize,
        /// Jobs buffered per lane before `enqueue` waits.
        capacity: usize,
    },
}

impl QueueMode {
    /// Mode described by the queue configuration.
    pub fn from_config(config: &QueueConfig) -> Self {
        if config.immediate {
            Self::Immediate
        } else {
            Self::Background {
                workers: config.workers,
                capacity: config.capacity,
            }
        }
    }
}

/// Decrements the pending count when a job finishes, even on panic.
struct PendingGuard(Arc<watch::Sender<usize>>);

impl Drop for PendingGuard {
    fn drop(&mut self) {
        self.0.send_modify(|pending| *pending = pending.saturating_sub(1));
    }
}

struct Lanes {
    ordered: mpsc::Sender<Job>,
    concurrent: mpsc::Sender<Job>,
}

/// Logical work queue shared by all callers of one orchestrator.
pub struct IndexingQueue {
    mode: QueueMode,
    lanes: Option<Lanes>,
    pending: Arc<watch::Sender<usize>>,
}

impl IndexingQueue {
    /// Create a queue. Background mode must be created inside a Tokio
    /// runtime; it spawns one task per lane.
    pub fn new(mode: QueueMode) -> Self {
        let (pending, _rx) = watch::channel(0usize);
        let pending = Arc::new(pending);

        let lanes = match mode {
            QueueMode::Immediate => None,
            QueueMode::Background { workers, capacity } => {
                let (ordered, ordered_rx) = mpsc::channel(capacity.max(1));
                let (concurrent, concurrent_rx) = mpsc::channel(capacity.max(1));
                tokio::spawn(run_in_order(ordered_rx));
                tokio::spawn(dispatch(concurrent_rx, workers.max(1)));
                Some(Lanes {
                    ordered,
                    concurrent,
                })
            }
        };

        Self {
            mode,
            lanes,
            pending,
        }
    }

    /// Execution mode.
    pub fn mode(&self) -> QueueMode {
        self.mode
    }

    /// Submit a job that may run alongside other concurrent jobs.
    ///
    /// Immediate mode returns the job's own result. Background mode returns
    /// once the job is accepted; failures are logged by the worker.
    pub async fn enqueue(&self, job: Job) -> Result<()> {
        self.submit(job, |lanes| &lanes.concurrent).await
    }

    /// Submit a job that starts only after every earlier ordered job has
    /// finished.
    pub async fn enqueue_ordered(&self, job: Job) -> Result<()> {
        self.submit(job, |lanes| &lanes.ordered).await
    }

    async fn submit<F>(&self, job: Job, lane: F) -> Result<()>
    where
        F: FnOnce(&Lanes) -> &mpsc::Sender<Job>,
    {
        self.pending.send_modify(|pending| *pending += 1);
        let guard = PendingGuard(self.pending.clone());

        let Some(lanes) = &self.lanes else {
            let result = job.await;
            drop(guard);
            return result;
        };

        let job: Job = Box::pin(async move {
            let _guard = guard;
            job.await
        });
        lane(lanes)
            .send(job)
            .await
            .map_err(|_| Error::operation("indexing queue is shut down"))
    }

    /// Jobs accepted but not yet finished.
    pub fn pending(&self) -> usize {
        *self.pending.borrow()
    }

    /// Wait until no job is pending, or fail after `timeout`.
    pub async fn wait_idle(&self, timeout: Duration) -> Result<()> {
        let mut rx = self.pending.subscribe();
        let deadline = tokio::time::sleep(timeout);
        tokio::pin!(deadline);

        if *rx.borrow_and_update() == 0 {
            return Ok(());
        }

        loop {
            tokio::select! {
                _ = &mut deadline => {
                    return Err(Error::operation(format!(
                        "indexing queue not idle after {timeout:?} ({} pending)",
                        self.pending()
                    )));
                }
                result = rx.changed() => {
                    if result.is_err() {
                        return Err(Error::operation("indexing queue channel closed"));
                    }
                    if *rx.borrow() == 0 {
                        return Ok(());
                    }
                }
            }
        }
    }
}

async fn run_in_order(mut rx: mpsc::Receiver<Job>) {
    while let Some(job) = rx.recv().await {
        // Spawned so a panicking job does not take the lane down with it.
        match tokio::spawn(job).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => log::error!("Indexing job failed: {e}"),
            Err(e) => log::error!("Indexing job aborted: {e}"),
        }
    }
    log::debug!("Ordered indexing lane stopped");
}

async fn dispatch(mut rx: mpsc::Receiver<Job>, workers: usize) {
    let permits = Arc::new(Semaphore::new(workers));
    while let Some(job) = rx.recv().await {
        let Ok(permit) = permits.clone().acquire_owned().await else {
            break;
        };
        tokio::spawn(async move {
            if let Err(e) = job.await {
                log::error!("Indexing job failed: {e}");
            }
            drop(permit);
        });
    }
    log::debug!("Indexing queue dispatcher stopped");
}

impl fmt::Debug for IndexingQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IndexingQueue")
            .field("mode", &self.mode)
            .field("pending", &self.pending())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
