//! Tracked background tasks.
//!
//! Fire-and-forget work (telemetry, platform tuning) is spawned here instead
//! of detached, so shutdown can wait for it and panics are counted.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use serde::Serialize;
use tokio::task::JoinSet;
use tracing::{debug, warn};

/// Outcome of joining the tracked tasks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct JoinReport {
    pub joined: usize,
    pub failed: usize,
}

#[derive(Debug, Default)]
pub struct BackgroundTasks {
    set: Mutex<JoinSet<()>>,
    failed: AtomicU64,
}

impl BackgroundTasks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn a tracked task. Finished tasks are reaped on the way.
    ///
    /// Without a tokio runtime the task is dropped with a warning.
    pub fn spawn<F>(&self, name: &'static str, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        if tokio::runtime::Handle::try_current().is_err() {
            warn!(task = name, "No async runtime, dropping background task");
            return;
        }

        let mut set = self.set.lock();
        while let Some(result) = set.try_join_next() {
            self.note(result);
        }
        set.spawn(task);
    }

    /// Tasks spawned but not yet joined.
    pub fn pending(&self) -> usize {
        self.set.lock().len()
    }

    /// Tasks that panicked or were cancelled, over the lifetime of the set.
    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::SeqCst)
    }

    /// Wait for every task spawned so far.
    pub async fn join_all(&self) -> JoinReport {
        let mut set = std::mem::take(&mut *self.set.lock());
        let mut report = JoinReport::default();
        while let Some(result) = set.join_next().await {
            report.joined += 1;
            if !self.note(result) {
                report.failed += 1;
            }
        }
        debug!(joined = report.joined, failed = report.failed, "Joined background tasks");
        report
    }

    fn note(&self, result: Result<(), tokio::task::JoinError>) -> bool {
        match result {
            Ok(()) => true,
            Err(e) => {
                self.failed.fetch_add(1, Ordering::SeqCst);
                warn!(error = %e, "Background task failed");
                false
            }
        }
    }
}
