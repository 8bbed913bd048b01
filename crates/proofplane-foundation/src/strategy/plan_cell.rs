//! Single-indirection cell holding the active [`ExecutionPlan`].
//!
//! Readers take an `Arc` snapshot and keep it for the whole operation;
//! writers publish a complete new plan. Nothing edits a plan in place.

use std::sync::Arc;

use proofplane_kernel::strategy::ExecutionPlan;
use tokio::sync::watch;
use tracing::info;

#[derive(Debug)]
pub struct PlanCell {
    tx: watch::Sender<Arc<ExecutionPlan>>,
}

impl PlanCell {
    pub fn new(mut initial: ExecutionPlan) -> Self {
        initial.revision = 1;
        let (tx, _rx) = watch::channel(Arc::new(initial));
        Self { tx }
    }

    /// The current plan.
    pub fn snapshot(&self) -> Arc<ExecutionPlan> {
        self.tx.borrow().clone()
    }

    /// Replace the plan. The published copy carries the next revision.
    pub fn publish(&self, plan: ExecutionPlan) -> Arc<ExecutionPlan> {
        self.publish_if(plan, |_| true)
            .unwrap_or_else(|| self.snapshot())
    }

    /// Replace the plan only if `should_replace(current)` holds, checked
    /// under the same lock as the swap.
    pub fn publish_if<F>(&self, plan: ExecutionPlan, should_replace: F) -> Option<Arc<ExecutionPlan>>
    where
        F: FnOnce(&ExecutionPlan) -> bool,
    {
        let mut published = None;
        self.tx.send_if_modified(|current| {
            if !should_replace(&**current) {
                return false;
            }
            let mut next = plan;
            next.revision = current.revision + 1;
            let next = Arc::new(next);
            info!(
                revision = next.revision,
                from = %current.strategy_type(),
                to = %next.strategy_type(),
                "Published execution plan"
            );
            *current = next.clone();
            published = Some(next);
            true
        });
        published
    }

    /// Observe every future publish.
    pub fn subscribe(&self) -> watch::Receiver<Arc<ExecutionPlan>> {
        self.tx.subscribe()
    }

    pub fn revision(&self) -> u64 {
        self.tx.borrow().revision
    }
}
