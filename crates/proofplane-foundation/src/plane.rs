//! The proof plane registry.
//!
//! [`ProofPlane`] is built once at process start and passed around by
//! reference. It owns every component and wires them together:
//!
//! ```text
//! probe -> detector -> profile -> selector -> plan cell -> coordinator
//!                                     ^                        |
//!                                     +---- resource monitor <-+
//! ```
//!
//! All collaborators come in through [`PlaneDeps`], so tests can swap any of
//! them for an isolated instance.

use std::sync::Arc;

use error_stack::{Report, ResultExt};
use parking_lot::{Mutex, RwLock};
use proofplane_kernel::error::{KernelError, KernelResult, ProofError, ProofResult};
use proofplane_kernel::operation::{ExecutionResult, Operation, Venue};
use proofplane_kernel::probe::HostProbe;
use proofplane_kernel::profile::{EnvironmentKind, FeatureProfile};
use proofplane_kernel::prover::{LocalProver, RemoteProver, RemoteStatus, VerifyRequest};
use proofplane_kernel::strategy::{
    ExecutionMode, ExecutionPlan, ExecutionPreference, ResourceConstraints,
};
use proofplane_kernel::telemetry::{NoopTelemetry, Telemetry};
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::PlaneConfig;
use crate::coordinator::{ExecutionCoordinator, StatsSnapshot, TelemetryDispatcher};
use crate::detection::CapabilityDetector;
use crate::monitor::{ResourceMonitor, ResourceSampler, SharedProfile, SystemResourceSampler};
use crate::platform::{Capability, PROVER, PlatformAdapter, PlatformCapabilities};
use crate::remote::HttpRemoteProver;
use crate::strategy::{PlanCell, StrategySelector};
use crate::tasks::{BackgroundTasks, JoinReport};

/// Collaborators injected into [`ProofPlane::bootstrap`]. Anything left
/// unset gets the production default.
#[derive(Default)]
pub struct PlaneDeps {
    /// Replaces the environment's capability record
    pub probe: Option<Arc<dyn HostProbe>>,
    pub local_prover: Option<Arc<dyn LocalProver>>,
    /// Defaults to [`HttpRemoteProver`] on the configured endpoint
    pub remote: Option<Arc<dyn RemoteProver>>,
    /// Defaults to [`NoopTelemetry`]
    pub telemetry: Option<Arc<dyn Telemetry>>,
    /// Defaults to [`SystemResourceSampler`]
    pub sampler: Option<Arc<dyn ResourceSampler>>,
    /// Offload RNG; overrides `offload_seed`
    pub rng: Option<Box<dyn RngCore + Send>>,
}

impl PlaneDeps {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_probe(mut self, probe: Arc<dyn HostProbe>) -> Self {
        self.probe = Some(probe);
        self
    }

    pub fn with_local_prover(mut self, prover: Arc<dyn LocalProver>) -> Self {
        self.local_prover = Some(prover);
        self
    }

    pub fn with_remote(mut self, remote: Arc<dyn RemoteProver>) -> Self {
        self.remote = Some(remote);
        self
    }

    pub fn with_telemetry(mut self, telemetry: Arc<dyn Telemetry>) -> Self {
        self.telemetry = Some(telemetry);
        self
    }

    pub fn with_sampler(mut self, sampler: Arc<dyn ResourceSampler>) -> Self {
        self.sampler = Some(sampler);
        self
    }

    pub fn with_rng<R>(mut self, rng: R) -> Self
    where
        R: RngCore + Send + 'static,
    {
        self.rng = Some(Box::new(rng));
        self
    }
}

pub struct ProofPlane {
    config: PlaneConfig,
    adapter: Arc<PlatformAdapter>,
    detector: CapabilityDetector,
    profile: SharedProfile,
    selector: Arc<StrategySelector>,
    plan: Arc<PlanCell>,
    coordinator: ExecutionCoordinator,
    monitor: Arc<ResourceMonitor>,
    remote: Arc<dyn RemoteProver>,
    tasks: Arc<BackgroundTasks>,
    cancel: CancellationToken,
    monitor_handle: Mutex<Option<JoinHandle<()>>>,
}

impl ProofPlane {
    /// Detect the host, resolve the first plan and start the monitor.
    pub async fn bootstrap(config: PlaneConfig, deps: PlaneDeps) -> KernelResult<Self> {
        config
            .validate()
            .map_err(KernelError::from)
            .map_err(Report::new)
            .attach("validating proof plane configuration")?;

        let environment = match &config.environment {
            Some(name) => name
                .parse::<EnvironmentKind>()
                .map_err(KernelError::from)
                .map_err(Report::new)
                .attach(format!("selecting platform adapter for '{name}'"))?,
            None => EnvironmentKind::detect(),
        };

        let adapter = Arc::new(match &deps.probe {
            Some(probe) => PlatformAdapter::with_capabilities(
                environment,
                PlatformCapabilities::from_probe(probe.clone()),
                config.max_worker_threads,
            ),
            None => PlatformAdapter::for_environment(environment, config.max_worker_threads),
        });
        adapter.initialize();
        if let Some(prover) = deps.local_prover {
            adapter.register_implementation(PROVER, Capability::Prover(prover));
        }

        let detector = CapabilityDetector::new(environment, adapter.probe());
        let detected = detector.detect();
        info!(
            environment = %environment,
            tier = %detected.tier,
            cpu_cores = detected.cpu_cores,
            memory_mb = detected.memory_mb,
            "Detected device profile"
        );

        let selector = Arc::new(StrategySelector::from_config(&config));
        let initial = selector
            .resolve(Some(&detected), config.preference, &ResourceConstraints::default())
            .map_err(KernelError::from)
            .map_err(Report::new)
            .attach("resolving the initial execution plan")?;
        let profile: SharedProfile = Arc::new(RwLock::new(Some(detected)));
        let plan = Arc::new(PlanCell::new(initial));

        let remote: Arc<dyn RemoteProver> = match deps.remote {
            Some(remote) => remote,
            None => Arc::new(
                HttpRemoteProver::new(config.remote_endpoint.clone())
                    .map_err(KernelError::from)
                    .map_err(Report::new)?,
            ),
        };

        let tasks = Arc::new(BackgroundTasks::new());
        let telemetry = TelemetryDispatcher::new(
            deps.telemetry.unwrap_or_else(|| Arc::new(NoopTelemetry)),
            tasks.clone(),
        );

        let rng: Box<dyn RngCore + Send> = match (deps.rng, config.offload_seed) {
            (Some(rng), _) => rng,
            (None, Some(seed)) => Box::new(StdRng::seed_from_u64(seed)),
            (None, None) => match adapter.secure_rng().map(|rng| rng.next_u64()) {
                Some(Ok(seed)) => Box::new(StdRng::seed_from_u64(seed)),
                _ => Box::new(StdRng::from_entropy()),
            },
        };
        let coordinator =
            ExecutionCoordinator::new(plan.clone(), adapter.clone(), remote.clone(), telemetry)
                .with_rng(rng);

        let sampler = deps
            .sampler
            .unwrap_or_else(|| Arc::new(SystemResourceSampler::new(adapter.probe())));
        let interval = config
            .monitor_interval()
            .unwrap_or(std::time::Duration::from_secs(30));
        let monitor = Arc::new(ResourceMonitor::new(
            sampler,
            selector.clone(),
            plan.clone(),
            profile.clone(),
            config.severity_weights,
            interval,
        ));

        let cancel = CancellationToken::new();
        let monitor_handle = config
            .monitor_interval()
            .map(|_| monitor.clone().spawn(cancel.child_token()));

        let plane = Self {
            config,
            adapter,
            detector,
            profile,
            selector,
            plan,
            coordinator,
            monitor,
            remote,
            tasks,
            cancel,
            monitor_handle: Mutex::new(monitor_handle),
        };
        plane.optimize_in_background();
        Ok(plane)
    }

    /// Run an operation through the coordinator.
    pub async fn execute(&self, operation: Operation) -> ProofResult<ExecutionResult> {
        self.coordinator.execute(operation).await
    }

    pub async fn prove(
        &self,
        name: impl Into<String>,
        inputs: serde_json::Value,
    ) -> ProofResult<ExecutionResult> {
        self.execute(Operation::prove(name, inputs)).await
    }

    pub async fn verify(
        &self,
        name: impl Into<String>,
        request: &VerifyRequest,
    ) -> ProofResult<ExecutionResult> {
        self.execute(Operation::verify(name, request)).await
    }

    /// Change the execution mode. Applies to the next operation.
    pub fn set_execution_mode(&self, mode: ExecutionMode) -> ProofResult<Arc<ExecutionPlan>> {
        let preference = ExecutionPreference {
            mode,
            ..self.plan.snapshot().preference
        };
        self.set_preference(preference)
    }

    /// Replace the whole preference. Applies to the next operation.
    pub fn set_preference(&self, preference: ExecutionPreference) -> ProofResult<Arc<ExecutionPlan>> {
        let profile = self.profile.read().clone();
        let plan = self
            .selector
            .resolve(profile.as_ref(), preference, &ResourceConstraints::default())?;
        let published = self.plan.publish(plan);
        debug!(mode = ?preference.mode, revision = published.revision, "Execution preference changed");
        self.optimize_in_background();
        Ok(published)
    }

    /// Re-detect the host and re-resolve the plan with the current preference.
    pub fn reset(&self) -> ProofResult<Arc<ExecutionPlan>> {
        let detected = self.detector.detect();
        info!(tier = %detected.tier, "Re-detected device profile");
        let preference = self.plan.snapshot().preference;
        let plan = self
            .selector
            .resolve(Some(&detected), preference, &ResourceConstraints::default())?;
        *self.profile.write() = Some(detected);
        let published = self.plan.publish(plan);
        self.optimize_in_background();
        Ok(published)
    }

    /// `GET {endpoint}/status`, bounded by the status timeout.
    pub async fn remote_status(&self) -> ProofResult<RemoteStatus> {
        let limit = self.plan.snapshot().timeouts.status;
        match tokio::time::timeout(limit, self.remote.status()).await {
            Ok(result) => result,
            Err(_) => Err(ProofError::Timeout {
                venue: Venue::Server,
                duration_ms: limit.as_millis() as u64,
            }),
        }
    }

    pub fn plan(&self) -> Arc<ExecutionPlan> {
        self.plan.snapshot()
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<ExecutionPlan>> {
        self.plan.subscribe()
    }

    pub fn profile(&self) -> Option<FeatureProfile> {
        self.profile.read().clone()
    }

    pub fn environment(&self) -> EnvironmentKind {
        self.adapter.kind()
    }

    pub fn config(&self) -> &PlaneConfig {
        &self.config
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.coordinator.stats().snapshot()
    }

    pub fn adapter(&self) -> &Arc<PlatformAdapter> {
        &self.adapter
    }

    pub fn monitor(&self) -> &Arc<ResourceMonitor> {
        &self.monitor
    }

    pub fn coordinator(&self) -> &ExecutionCoordinator {
        &self.coordinator
    }

    /// Wait for background telemetry and tuning tasks spawned so far.
    pub async fn flush(&self) -> JoinReport {
        self.tasks.join_all().await
    }

    /// Stop the monitor, join background tasks and release the adapter.
    pub async fn shutdown(&self) -> JoinReport {
        self.cancel.cancel();
        let handle = self.monitor_handle.lock().take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                warn!(error = %e, "Resource monitor task ended abnormally");
            }
        }
        let report = self.tasks.join_all().await;
        self.adapter.cleanup().await;
        info!(joined = report.joined, failed = report.failed, "Proof plane shut down");
        report
    }

    fn optimize_in_background(&self) {
        let adapter = self.adapter.clone();
        let strategy = self.plan.snapshot().strategy.clone();
        self.tasks.spawn("platform.optimize", async move {
            adapter.optimize_for_platform(&strategy);
        });
    }
}
