//! Bounded pool for local proving work.
//!
//! A fixed number of tokio tasks pull jobs from a shared queue, so at most
//! `size` local proofs run at once. The pool is owned by one
//! [`super::PlatformAdapter`] and must be terminated before it is dropped.
//!
//! Each job carries a child of the pool's cancellation token. Dropping the
//! future returned by [`WorkerPool::execute`] (for example when a caller's
//! timeout fires) cancels the job, so its worker is free for the next one.

use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use parking_lot::Mutex;
use proofplane_kernel::error::{ProofError, ProofResult};
use proofplane_kernel::operation::Venue;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

type Job = BoxFuture<'static, ()>;

/// Pool size for a host: `min(host, configured)`, at least one.
pub fn pool_size(host_concurrency: u32, configured_max: u32) -> usize {
    host_concurrency.min(configured_max).max(1) as usize
}

pub struct WorkerPool {
    size: usize,
    tx: Mutex<Option<mpsc::Sender<Job>>>,
    workers: Mutex<JoinSet<()>>,
    cancel: CancellationToken,
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("size", &self.size)
            .field("running", &self.running())
            .finish()
    }
}

impl WorkerPool {
    /// Spawn `size` workers on the current tokio runtime.
    pub fn start(size: usize) -> Self {
        let size = size.max(1);
        let (tx, rx) = mpsc::channel::<Job>(size * 4);
        let rx = Arc::new(tokio::sync::Mutex::new(rx));
        let cancel = CancellationToken::new();

        let mut workers = JoinSet::new();
        for worker_id in 0..size {
            let rx = rx.clone();
            let cancel = cancel.clone();
            workers.spawn(async move {
                loop {
                    let job = tokio::select! {
                        _ = cancel.cancelled() => break,
                        job = async { rx.lock().await.recv().await } => job,
                    };
                    match job {
                        Some(job) => job.await,
                        None => break,
                    }
                }
                debug!(worker_id, "Worker stopped");
            });
        }

        info!(size, "Started local worker pool");
        Self {
            size,
            tx: Mutex::new(Some(tx)),
            workers: Mutex::new(workers),
            cancel,
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Workers that have not exited yet.
    pub fn running(&self) -> usize {
        self.workers.lock().len()
    }

    pub fn is_terminated(&self) -> bool {
        self.tx.lock().is_none()
    }

    /// Run `job` on a pool worker and wait for its output.
    pub async fn execute<F, T>(&self, job: F) -> ProofResult<T>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let sender = self.tx.lock().clone().ok_or_else(terminated)?;

        let token = self.cancel.child_token();
        // cancels the job if this future is dropped before it finishes
        let _guard = token.clone().drop_guard();
        let (done_tx, done_rx) = oneshot::channel();
        let job: Job = Box::pin(async move {
            tokio::select! {
                _ = token.cancelled() => debug!("Abandoned local job cancelled"),
                output = job => {
                    let _ = done_tx.send(output);
                }
            }
        });

        sender.send(job).await.map_err(|_| terminated())?;
        done_rx.await.map_err(|_| {
            ProofError::deployment(Venue::Local, "Local worker stopped before finishing the job")
        })
    }

    /// Stop accepting jobs and stop every worker.
    pub async fn terminate(&self) {
        self.tx.lock().take();
        self.cancel.cancel();

        let mut workers = std::mem::take(&mut *self.workers.lock());
        workers.shutdown().await;
        info!(size = self.size, "Terminated local worker pool");
    }
}

fn terminated() -> ProofError {
    ProofError::deployment(Venue::Local, "Local worker pool has been terminated")
}
