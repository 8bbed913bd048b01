//! Platform adapter.
//!
//! One adapter type for every environment. The environment kind selects a
//! [`PlatformCapabilities`] record; the adapter adds the shared contract on
//! top: idempotent initialization, a registry of named implementations
//! (`"prover"`, `"cache"`, `"rng"`), best-effort platform tuning and cleanup
//! of the worker pool it owns.

pub mod cache;
pub mod capabilities;
pub mod worker_pool;

pub use cache::{LocalCache, SecureRng};
pub use capabilities::{PlatformCapabilities, capabilities_for};
pub use worker_pool::{WorkerPool, pool_size};

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use dashmap::DashMap;
use parking_lot::Mutex;
use proofplane_kernel::error::{ProofError, ProofResult};
use proofplane_kernel::operation::Venue;
use proofplane_kernel::probe::{HostProbe, Primitive};
use proofplane_kernel::profile::EnvironmentKind;
use proofplane_kernel::prover::LocalProver;
use proofplane_kernel::strategy::ExecutionStrategy;
use serde::Serialize;
use tracing::{debug, info, warn};

/// Registry name of the local prover.
pub const PROVER: &str = "prover";
/// Registry name of the local cache.
pub const CACHE: &str = "cache";
/// Registry name of the secure random source.
pub const RNG: &str = "rng";

/// A named implementation held by the adapter.
#[derive(Clone)]
pub enum Capability {
    Prover(Arc<dyn LocalProver>),
    Cache(Arc<LocalCache>),
    Rng(SecureRng),
}

impl Capability {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Prover(_) => "prover",
            Self::Cache(_) => "cache",
            Self::Rng(_) => "rng",
        }
    }
}

impl fmt::Debug for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Capability::{}", self.kind_name())
    }
}

/// What `optimize_for_platform` managed to do.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OptimizationReport {
    pub applied: Vec<String>,
    pub failed: Vec<String>,
}

pub struct PlatformAdapter {
    kind: EnvironmentKind,
    capabilities: PlatformCapabilities,
    max_workers: u32,
    initialized: AtomicBool,
    pool: Mutex<Option<Arc<WorkerPool>>>,
    implementations: DashMap<String, Capability>,
}

impl fmt::Debug for PlatformAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlatformAdapter")
            .field("kind", &self.kind)
            .field("initialized", &self.is_initialized())
            .field("max_workers", &self.max_workers)
            .finish()
    }
}

impl PlatformAdapter {
    /// Adapter for an environment kind, using its table entry.
    pub fn for_environment(kind: EnvironmentKind, max_workers: u32) -> Self {
        Self::with_capabilities(kind, capabilities_for(kind), max_workers)
    }

    /// Adapter for an environment name such as `"browser"` or `"react-native"`.
    pub fn for_environment_name(name: &str, max_workers: u32) -> ProofResult<Self> {
        let kind: EnvironmentKind = name.parse()?;
        Ok(Self::for_environment(kind, max_workers))
    }

    pub fn with_capabilities(
        kind: EnvironmentKind,
        capabilities: PlatformCapabilities,
        max_workers: u32,
    ) -> Self {
        Self {
            kind,
            capabilities,
            max_workers,
            initialized: AtomicBool::new(false),
            pool: Mutex::new(None),
            implementations: DashMap::new(),
        }
    }

    pub fn kind(&self) -> EnvironmentKind {
        self.kind
    }

    /// The capability record as a host probe.
    pub fn probe(&self) -> Arc<dyn HostProbe> {
        Arc::new(self.capabilities.clone())
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }

    /// Register default implementations and start the worker pool.
    ///
    /// Safe to call repeatedly; later calls return `true` without doing
    /// anything.
    pub fn initialize(&self) -> bool {
        if self.initialized.swap(true, Ordering::SeqCst) {
            return true;
        }

        self.implementations
            .entry(CACHE.to_string())
            .or_insert_with(|| Capability::Cache(Arc::new(LocalCache::new())));
        if self.probe_supports(Primitive::Crypto) {
            self.implementations
                .entry(RNG.to_string())
                .or_insert(Capability::Rng(SecureRng));
        }

        if self.probe_supports(Primitive::WorkerThreads) {
            match tokio::runtime::Handle::try_current() {
                Ok(_) => {
                    let host = self.capabilities.cpu_cores().unwrap_or(1);
                    let size = pool_size(host, self.max_workers);
                    *self.pool.lock() = Some(Arc::new(WorkerPool::start(size)));
                }
                Err(_) => warn!(
                    environment = %self.kind,
                    "No async runtime available, running local proofs without a worker pool"
                ),
            }
        }

        info!(environment = %self.kind, "Platform adapter initialized");
        true
    }

    /// Whether a primitive (by name) or a registered implementation exists.
    pub fn supports_feature(&self, name: &str) -> bool {
        if self.implementations.contains_key(name) {
            return true;
        }
        Primitive::from_name(name).is_some_and(|p| self.probe_supports(p))
    }

    pub fn get_implementation(&self, name: &str) -> ProofResult<Capability> {
        self.implementations
            .get(name)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| {
                ProofError::NotFound(format!("'{name}' on {} platform", self.kind))
            })
    }

    pub fn register_implementation(&self, name: impl Into<String>, capability: Capability) {
        let name = name.into();
        debug!(name = %name, kind = capability.kind_name(), "Registered implementation");
        self.implementations.insert(name, capability);
    }

    /// The registered local prover, looked up as `"prover"` then `"crypto"`.
    ///
    /// A missing prover is a local execution failure, so it can fall back.
    pub fn local_prover(&self) -> ProofResult<Arc<dyn LocalProver>> {
        for name in [PROVER, "crypto"] {
            if let Ok(Capability::Prover(prover)) = self.get_implementation(name) {
                return Ok(prover);
            }
        }
        Err(ProofError::deployment(
            Venue::Local,
            format!("No local prover registered on {} platform", self.kind),
        ))
    }

    pub fn local_cache(&self) -> Option<Arc<LocalCache>> {
        match self.get_implementation(CACHE) {
            Ok(Capability::Cache(cache)) => Some(cache),
            _ => None,
        }
    }

    pub fn secure_rng(&self) -> Option<SecureRng> {
        match self.get_implementation(RNG) {
            Ok(Capability::Rng(rng)) => Some(rng),
            _ => None,
        }
    }

    pub fn worker_pool(&self) -> Option<Arc<WorkerPool>> {
        self.pool.lock().clone()
    }

    /// Run local work on the worker pool, or inline when there is none.
    pub async fn spawn_worker<F, T>(&self, job: F) -> ProofResult<T>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        match self.worker_pool() {
            Some(pool) => pool.execute(job).await,
            None => Ok(job.await),
        }
    }

    /// Apply platform tuning for a strategy. Never fails; problems are
    /// logged and listed in the report.
    pub fn optimize_for_platform(&self, strategy: &ExecutionStrategy) -> OptimizationReport {
        let mut report = OptimizationReport::default();

        if strategy.use_worker_threads {
            match self.worker_pool() {
                Some(pool) if !pool.is_terminated() => {
                    report.applied.push(format!("worker pool ({} workers)", pool.size()))
                }
                _ => report.failed.push("worker pool unavailable".to_string()),
            }
        }

        if strategy.aggressive_cleanup {
            if let Some(cache) = self.local_cache() {
                cache.clear();
                report.applied.push("cleared local cache".to_string());
            }
        }

        match (self.capabilities.optimize)(strategy) {
            Ok(()) => report.applied.push(format!("{} tuning", self.kind)),
            Err(reason) => report.failed.push(reason),
        }

        for failure in &report.failed {
            warn!(environment = %self.kind, reason = %failure, "Platform optimization step failed");
        }
        debug!(environment = %self.kind, applied = ?report.applied, "Platform optimization finished");
        report
    }

    /// Terminate the worker pool and drop registered implementations.
    /// Never fails.
    pub async fn cleanup(&self) {
        let pool = self.pool.lock().take();
        if let Some(pool) = pool {
            pool.terminate().await;
        }
        self.implementations.clear();
        self.initialized.store(false, Ordering::SeqCst);
        info!(environment = %self.kind, "Platform adapter cleaned up");
    }

    fn probe_supports(&self, primitive: Primitive) -> bool {
        self.capabilities.supports(primitive).unwrap_or_else(|e| {
            warn!(environment = %self.kind, error = %e, "Capability query failed");
            false
        })
    }
}
