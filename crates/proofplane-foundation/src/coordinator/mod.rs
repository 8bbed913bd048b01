//! Execution coordinator.
//!
//! Runs one operation at a time per call (many calls may be in flight):
//!
//! ```text
//! Selecting -> Executing(venue) -> Success
//!                               -> Failed -> Executing(other venue) -> Success | Failed-Final
//!                               -> Failed-Final
//! ```
//!
//! The hop to the other venue happens at most once, only when the
//! preference allows it, the attempt is not already a retry, and the error
//! is fallback-eligible (never a rate limit).

pub mod progress;
pub mod stats;
pub mod telemetry;

pub use progress::{ProgressReporter, fallback_status, milestones};
pub use stats::{OperationStats, StatsSnapshot};
pub use telemetry::TelemetryDispatcher;

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use proofplane_kernel::error::{ProofError, ProofResult};
use proofplane_kernel::operation::{
    Complexity, ExecutionResult, Operation, OperationKind, Venue,
};
use proofplane_kernel::prover::{RemoteProver, VerifyRequest};
use proofplane_kernel::strategy::{ExecutionPlan, StrategyType};
use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};
use serde_json::json;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use crate::platform::PlatformAdapter;
use crate::strategy::PlanCell;

use progress::LEADING_STEPS;

/// Verification cache entries allowed per MiB of the plan's memory limit.
const CACHE_ENTRIES_PER_MB: usize = 1;
const MIN_CACHE_ENTRIES: usize = 16;

/// Local concurrency permits for the newest plan seen so far.
struct LocalSlots {
    revision: u64,
    permits: Arc<Semaphore>,
}

pub struct ExecutionCoordinator {
    plan: Arc<PlanCell>,
    adapter: Arc<PlatformAdapter>,
    remote: Arc<dyn RemoteProver>,
    telemetry: TelemetryDispatcher,
    stats: Arc<OperationStats>,
    rng: Mutex<Box<dyn RngCore + Send>>,
    local_slots: Mutex<Option<LocalSlots>>,
}

impl ExecutionCoordinator {
    pub fn new(
        plan: Arc<PlanCell>,
        adapter: Arc<PlatformAdapter>,
        remote: Arc<dyn RemoteProver>,
        telemetry: TelemetryDispatcher,
    ) -> Self {
        Self {
            plan,
            adapter,
            remote,
            telemetry,
            stats: Arc::new(OperationStats::new()),
            rng: Mutex::new(Box::new(StdRng::from_entropy())),
            local_slots: Mutex::new(None),
        }
    }

    /// Replace the offload RNG.
    pub fn with_rng<R>(self, rng: R) -> Self
    where
        R: RngCore + Send + 'static,
    {
        *self.rng.lock() = Box::new(rng);
        self
    }

    /// Deterministic offload draws.
    pub fn with_seed(self, seed: u64) -> Self {
        self.with_rng(StdRng::seed_from_u64(seed))
    }

    pub fn stats(&self) -> Arc<OperationStats> {
        self.stats.clone()
    }

    pub fn telemetry(&self) -> &TelemetryDispatcher {
        &self.telemetry
    }

    /// Where `operation` runs first under `plan`.
    pub fn decide_venue(&self, operation: &Operation, plan: &ExecutionPlan) -> Venue {
        let options = &operation.options;
        if options.force_server || plan.preference.forces_server() {
            return Venue::Server;
        }
        if options.force_local || plan.preference.forces_local() {
            return Venue::Local;
        }

        let strategy = &plan.strategy;
        if strategy.is_server_only() {
            return Venue::Server;
        }
        if strategy.is_local_only() {
            return Venue::Local;
        }

        if strategy.strategy_type == StrategyType::Hybrid {
            match operation.complexity {
                Some(Complexity::Low) => return Venue::Local,
                Some(Complexity::High) => return Venue::Server,
                _ => {}
            }
        }

        let draw: u8 = self.rng.lock().gen_range(0..100);
        if draw < strategy.server_offload_percentage {
            Venue::Server
        } else {
            Venue::Local
        }
    }

    /// Run an operation against the current plan.
    pub async fn execute(&self, operation: Operation) -> ProofResult<ExecutionResult> {
        let plan = self.plan.snapshot();
        let started = Instant::now();
        let mut reporter = ProgressReporter::new(operation.options.progress.clone());
        self.stats.record_started();

        let venue = self.decide_venue(&operation, &plan);
        debug!(
            operation = %operation.name,
            id = %operation.id,
            %venue,
            strategy = %plan.strategy_type(),
            revision = plan.revision,
            "Selected venue"
        );

        let first = self.attempt(&operation, venue, &plan, &mut reporter).await;
        let error = match first {
            Ok(payload) => {
                return Ok(self.succeed(&operation, venue, payload, started, false, reporter));
            }
            Err(error) => error,
        };

        self.telemetry.record_error(&operation.name, &error.to_string());

        if !self.may_fall_back(&operation, &plan, &error) {
            return Err(self.fail(&operation, venue, error, started));
        }

        let target = venue.other();
        warn!(
            operation = %operation.name,
            from = %venue,
            to = %target,
            error = %error,
            "Falling back to the other venue"
        );
        self.stats.record_fallback();
        reporter.emit(reporter.current(), fallback_status(target, operation.kind));

        let retry = operation.as_retry();
        match self.attempt(&retry, target, &plan, &mut reporter).await {
            Ok(payload) => Ok(self.succeed(&operation, target, payload, started, true, reporter)),
            Err(error) => {
                self.telemetry.record_error(&operation.name, &error.to_string());
                Err(self.fail(&operation, target, error, started))
            }
        }
    }

    fn may_fall_back(&self, operation: &Operation, plan: &ExecutionPlan, error: &ProofError) -> bool {
        if !plan.preference.allow_fallback {
            debug!(operation = %operation.name, "Fallback disabled by preference");
            return false;
        }
        if operation.options.is_retry {
            return false;
        }
        if error.is_rate_limited() {
            info!(operation = %operation.name, "Rate limited, not retrying on the other venue");
            return false;
        }
        error.is_fallback_eligible()
    }

    fn succeed(
        &self,
        operation: &Operation,
        venue: Venue,
        payload: serde_json::Value,
        started: Instant,
        fallback_used: bool,
        reporter: ProgressReporter,
    ) -> ExecutionResult {
        let duration = started.elapsed();
        self.stats.record_outcome(true);
        self.telemetry
            .record_operation(&operation.name, duration.as_millis() as u64, venue);
        info!(
            operation = %operation.name,
            %venue,
            fallback_used,
            duration_ms = duration.as_millis() as u64,
            "Operation completed"
        );

        ExecutionResult {
            operation_id: operation.id,
            success: true,
            payload,
            venue,
            duration,
            fallback_used,
            progress: reporter.into_events(),
        }
    }

    fn fail(&self, operation: &Operation, venue: Venue, error: ProofError, started: Instant) -> ProofError {
        let duration_ms = started.elapsed().as_millis() as u64;
        self.stats.record_outcome(false);
        self.telemetry
            .record_operation(&operation.name, duration_ms, venue);
        warn!(operation = %operation.name, %venue, error = %error, "Operation failed");
        error
    }

    /// One venue attempt, bounded by the operation timeout.
    async fn attempt(
        &self,
        operation: &Operation,
        venue: Venue,
        plan: &ExecutionPlan,
        reporter: &mut ProgressReporter,
    ) -> ProofResult<serde_json::Value> {
        self.stats.record_attempt(venue);
        let steps = milestones(venue, operation.kind);
        reporter.emit_steps(&steps[..LEADING_STEPS]);

        let limit = operation.options.timeout.unwrap_or(match operation.kind {
            OperationKind::Prove => plan.timeouts.proof_generation,
            OperationKind::Verify => plan.timeouts.verification,
        });

        let call = async {
            match venue {
                Venue::Local => self.run_local(operation, plan).await,
                Venue::Server => self.run_remote(operation).await,
            }
        };

        let result = match tokio::time::timeout(limit, call).await {
            Ok(result) => result,
            Err(_) => Err(ProofError::Timeout {
                venue,
                duration_ms: duration_ms(limit),
            }),
        };

        match result {
            Ok(payload) => {
                reporter.emit_steps(&steps[LEADING_STEPS..]);
                Ok(payload)
            }
            Err(error) => {
                self.stats.record_attempt_error(&error);
                Err(error)
            }
        }
    }

    /// Permits bounding concurrent local work to the plan's thread count.
    ///
    /// A newer plan replaces the semaphore; work already holding a permit
    /// from the old one finishes under the old limit.
    fn local_permits(&self, plan: &ExecutionPlan) -> Arc<Semaphore> {
        let mut slots = self.local_slots.lock();
        match slots.as_ref() {
            Some(current) if current.revision >= plan.revision => current.permits.clone(),
            _ => {
                let size = plan.strategy.worker_thread_count.max(1) as usize;
                debug!(revision = plan.revision, size, "Sized local concurrency for plan");
                let permits = Arc::new(Semaphore::new(size));
                *slots = Some(LocalSlots {
                    revision: plan.revision,
                    permits: permits.clone(),
                });
                permits
            }
        }
    }

    async fn run_local(&self, operation: &Operation, plan: &ExecutionPlan) -> ProofResult<serde_json::Value> {
        let prover = self.adapter.local_prover()?;
        let _permit = self
            .local_permits(plan)
            .acquire_owned()
            .await
            .map_err(|_| ProofError::deployment(Venue::Local, "Local concurrency limiter closed"))?;

        let strategy = &plan.strategy;
        let cache = strategy
            .use_local_cache
            .then(|| self.adapter.local_cache())
            .flatten();
        if let Some(cache) = &cache {
            cache.set_capacity(cache_capacity(strategy.memory_limit_mb));
        }

        let payload = match operation.kind {
            OperationKind::Prove => {
                let inputs = operation.input.clone();
                let job = async move { prover.prove(&inputs).await };
                let output = if strategy.use_worker_threads {
                    self.adapter.spawn_worker(job).await??
                } else {
                    job.await?
                };
                serde_json::to_value(output)?
            }
            OperationKind::Verify => {
                let request: VerifyRequest = serde_json::from_value(operation.input.clone())?;
                let key = verification_cache_key(&request)?;
                if let Some(hit) = cache.as_ref().and_then(|c| c.get(&key)) {
                    debug!(operation = %operation.name, "Verification served from local cache");
                    hit
                } else {
                    let job = async move {
                        prover
                            .verify(&request.verification_key, &request.public_signals, &request.proof)
                            .await
                    };
                    let verified = if strategy.use_worker_threads {
                        self.adapter.spawn_worker(job).await??
                    } else {
                        job.await?
                    };
                    let payload = json!({ "verified": verified });
                    if let Some(cache) = &cache {
                        cache.insert(key, payload.clone());
                    }
                    payload
                }
            }
        };

        if strategy.aggressive_cleanup {
            if let Some(cache) = &cache {
                cache.clear();
            }
        }
        Ok(payload)
    }

    async fn run_remote(&self, operation: &Operation) -> ProofResult<serde_json::Value> {
        match operation.kind {
            OperationKind::Prove => {
                let response = self.remote.full_prove(&operation.input).await?;
                debug!(
                    operation = %operation.name,
                    remote_operation = %response.operation_id,
                    execution_time_ms = response.execution_time_ms,
                    "Remote proof received"
                );
                Ok(serde_json::to_value(response.into_output())?)
            }
            OperationKind::Verify => {
                let request: VerifyRequest = serde_json::from_value(operation.input.clone())?;
                let response = self.remote.verify(&request).await?;
                Ok(json!({ "verified": response.verified }))
            }
        }
    }
}

fn duration_ms(duration: Duration) -> u64 {
    duration.as_millis() as u64
}

/// Verification cache bound derived from a plan's memory limit.
pub fn cache_capacity(memory_limit_mb: u64) -> usize {
    (memory_limit_mb as usize)
        .saturating_mul(CACHE_ENTRIES_PER_MB)
        .max(MIN_CACHE_ENTRIES)
}

fn verification_cache_key(request: &VerifyRequest) -> ProofResult<String> {
    Ok(format!("verify:{}", serde_json::to_string(request)?))
}
