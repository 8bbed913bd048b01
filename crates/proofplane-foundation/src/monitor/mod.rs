//! Resource monitor.
//!
//! Samples resource pressure on a fixed interval, scores it, and when the
//! score crosses the adaptation threshold asks the selector to re-resolve
//! the plan under the current preference. Only automatic preferences
//! follow pressure; forced venues and named strategies keep their plan.
//! A new plan is published only when the strategy class actually changes,
//! so repeated identical readings do not cause churn. The loop runs
//! independently of in-flight operations.

pub mod sampler;

pub use sampler::{ResourceSampler, SystemResourceSampler};

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::RwLock;
use proofplane_kernel::error::{ProofError, ProofResult};
use proofplane_kernel::profile::FeatureProfile;
use proofplane_kernel::strategy::{ExecutionPlan, ResourceConstraints};
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::strategy::{PlanCell, StrategySelector};

/// Profile shared between the plane and the monitor; replaced on reset.
pub type SharedProfile = Arc<RwLock<Option<FeatureProfile>>>;

/// Weight of each constraint flag in the severity score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeverityWeights {
    pub cpu: f64,
    pub memory: f64,
    pub network: f64,
    pub storage: f64,
    pub battery: f64,
}

impl Default for SeverityWeights {
    fn default() -> Self {
        Self {
            cpu: 0.0,
            memory: 0.3,
            network: 0.3,
            storage: 0.0,
            battery: 0.4,
        }
    }
}

impl SeverityWeights {
    /// Weighted sum of the active flags, capped at 1.0.
    pub fn severity(&self, c: &ResourceConstraints) -> f64 {
        let score = [
            (c.cpu, self.cpu),
            (c.memory, self.memory),
            (c.network, self.network),
            (c.storage, self.storage),
            (c.battery, self.battery),
        ]
        .iter()
        .filter(|(active, _)| *active)
        .map(|(_, weight)| weight)
        .sum::<f64>();
        score.min(1.0)
    }

    pub fn validate(&self) -> ProofResult<()> {
        let weights = [self.cpu, self.memory, self.network, self.storage, self.battery];
        if weights.iter().any(|w| !(0.0..=1.0).contains(w)) {
            return Err(ProofError::Configuration(
                "severity weights must be within [0, 1]".into(),
            ));
        }
        Ok(())
    }
}

pub struct ResourceMonitor {
    sampler: Arc<dyn ResourceSampler>,
    selector: Arc<StrategySelector>,
    plan: Arc<PlanCell>,
    profile: SharedProfile,
    weights: SeverityWeights,
    interval: Duration,
    switches: AtomicU64,
    last: RwLock<Option<ResourceConstraints>>,
}

impl ResourceMonitor {
    pub fn new(
        sampler: Arc<dyn ResourceSampler>,
        selector: Arc<StrategySelector>,
        plan: Arc<PlanCell>,
        profile: SharedProfile,
        weights: SeverityWeights,
        interval: Duration,
    ) -> Self {
        Self {
            sampler,
            selector,
            plan,
            profile,
            weights,
            interval,
            switches: AtomicU64::new(0),
            last: RwLock::new(None),
        }
    }

    /// Number of strategy switches published so far.
    pub fn switch_count(&self) -> u64 {
        self.switches.load(Ordering::SeqCst)
    }

    /// The most recent scored sample.
    pub fn last_constraints(&self) -> Option<ResourceConstraints> {
        *self.last.read()
    }

    /// Sample once and adapt. Returns the new plan when one was published.
    pub async fn tick(&self) -> Option<Arc<ExecutionPlan>> {
        let mut constraints = match self.sampler.sample().await {
            Ok(c) => c,
            Err(e) => {
                warn!(error = %e, "Resource sampling failed, skipping adaptation");
                return None;
            }
        };
        constraints.severity = self.weights.severity(&constraints);
        *self.last.write() = Some(constraints);
        debug!(severity = constraints.severity, "Sampled resource pressure");

        if self.selector.adapt(&constraints).is_none() {
            return None;
        }
        let current = self.plan.snapshot();

        // forced venues and named strategies outrank pressure
        let profile = self.profile.read().clone();
        let next = match self
            .selector
            .resolve(profile.as_ref(), current.preference, &constraints)
        {
            Ok(plan) => plan,
            Err(e) => {
                warn!(error = %e, "Adapted strategy unavailable");
                return None;
            }
        };
        let target = next.strategy_type();
        if current.strategy_type() == target {
            debug!(%target, mode = ?current.preference.mode, "Active strategy already fits");
            return None;
        }

        let published = self
            .plan
            .publish_if(next, |active| active.strategy_type() != target)?;
        self.switches.fetch_add(1, Ordering::SeqCst);
        info!(
            severity = constraints.severity,
            from = %current.strategy_type(),
            to = %target,
            "Adapted execution strategy to resource pressure"
        );
        Some(published)
    }

    /// Run `tick` every interval until `cancel` fires.
    pub fn spawn(self: Arc<Self>, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            // the first tick fires immediately
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        self.tick().await;
                    }
                }
            }
            debug!("Resource monitor stopped");
        })
    }
}
