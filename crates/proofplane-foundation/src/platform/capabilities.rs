//! Per-environment capability records.
//!
//! Each environment kind is a record of closures rather than a subtype.
//! [`capabilities_for`] picks the record from a table keyed by
//! [`EnvironmentKind`]; tests replace single closures with the `with_*`
//! methods.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use proofplane_kernel::probe::{BatteryStatus, HostProbe, Primitive, ProbeError};
use proofplane_kernel::profile::EnvironmentKind;
use proofplane_kernel::strategy::ExecutionStrategy;
use sysinfo::{MemoryRefreshKind, RefreshKind, System};

use crate::detection::SystemProbe;
use crate::detection::system::{
    has_network_interface, host_concurrency, os_rng_available, total_memory_mb,
};

type Query<T> = Arc<dyn Fn() -> Result<T, ProbeError> + Send + Sync>;
type SupportsFn = Arc<dyn Fn(Primitive) -> Result<bool, ProbeError> + Send + Sync>;
type OptimizeFn = Arc<dyn Fn(&ExecutionStrategy) -> Result<(), String> + Send + Sync>;

/// Browsers round device memory down and cap it at 8 GiB.
const BROWSER_MEMORY_CAP_MB: u64 = 8192;

#[derive(Clone)]
pub struct PlatformCapabilities {
    pub cpu_cores: Query<u32>,
    pub memory_mb: Query<u64>,
    pub network_online: Query<bool>,
    pub battery_status: Query<Option<BatteryStatus>>,
    pub supports: SupportsFn,
    /// Environment-specific tuning step run by `optimize_for_platform`
    pub optimize: OptimizeFn,
}

impl fmt::Debug for PlatformCapabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlatformCapabilities").finish_non_exhaustive()
    }
}

fn shared_system() -> Arc<Mutex<System>> {
    Arc::new(Mutex::new(System::new_with_specifics(
        RefreshKind::new().with_memory(MemoryRefreshKind::everything()),
    )))
}

fn no_battery() -> Query<Option<BatteryStatus>> {
    Arc::new(|| Ok(None))
}

fn no_optimization() -> OptimizeFn {
    Arc::new(|_| Ok(()))
}

impl PlatformCapabilities {
    /// Native desktop or server process, read through [`SystemProbe`].
    pub fn desktop() -> Self {
        Self::from_probe(Arc::new(SystemProbe::new()))
    }

    /// Browser main thread.
    pub fn browser() -> Self {
        let system = shared_system();
        Self {
            cpu_cores: Arc::new(host_concurrency),
            memory_mb: Arc::new(move || {
                total_memory_mb(&system).map(|mb| mb.min(BROWSER_MEMORY_CAP_MB))
            }),
            network_online: Arc::new(|| Ok(true)),
            battery_status: no_battery(),
            supports: Arc::new(|primitive| {
                Ok(match primitive {
                    // needs cross-origin isolation
                    Primitive::SharedMemory => false,
                    Primitive::Crypto => os_rng_available(),
                    _ => true,
                })
            }),
            optimize: Arc::new(|strategy| {
                if strategy.use_worker_threads && !strategy.optimizations.yield_main_thread {
                    return Err("worker threads without main-thread yielding".into());
                }
                Ok(())
            }),
        }
    }

    /// Mobile application runtime.
    pub fn mobile() -> Self {
        let system = shared_system();
        Self {
            cpu_cores: Arc::new(host_concurrency),
            memory_mb: Arc::new(move || total_memory_mb(&system)),
            network_online: Arc::new(has_network_interface),
            battery_status: no_battery(),
            supports: Arc::new(|primitive| {
                Ok(match primitive {
                    Primitive::SharedMemory => false,
                    Primitive::Crypto => os_rng_available(),
                    _ => true,
                })
            }),
            optimize: Arc::new(|strategy| {
                if strategy.optimizations.battery_saver && strategy.worker_thread_count > 2 {
                    return Err(format!(
                        "{} worker threads requested while battery saver is on",
                        strategy.worker_thread_count
                    ));
                }
                Ok(())
            }),
        }
    }

    /// Isolated worker: no nested workers, no persistent storage.
    pub fn worker() -> Self {
        let system = shared_system();
        Self {
            cpu_cores: Arc::new(host_concurrency),
            memory_mb: Arc::new(move || total_memory_mb(&system)),
            network_online: Arc::new(|| Ok(true)),
            battery_status: no_battery(),
            supports: Arc::new(|primitive| {
                Ok(match primitive {
                    Primitive::Wasm => true,
                    Primitive::Crypto => os_rng_available(),
                    Primitive::WorkerThreads
                    | Primitive::PersistentStorage
                    | Primitive::SharedMemory => false,
                })
            }),
            optimize: no_optimization(),
        }
    }

    /// Anything unrecognised. Reports nothing the prover needs.
    pub fn unknown() -> Self {
        Self {
            cpu_cores: Arc::new(|| Ok(1)),
            memory_mb: Arc::new(|| Err(ProbeError::new("memory", "unknown environment"))),
            network_online: Arc::new(|| Ok(false)),
            battery_status: no_battery(),
            supports: Arc::new(|primitive| Ok(matches!(primitive, Primitive::Crypto))),
            optimize: Arc::new(|_| Err("no platform optimizations for unknown environments".into())),
        }
    }

    /// Wrap an arbitrary probe.
    pub fn from_probe(probe: Arc<dyn HostProbe>) -> Self {
        let (p1, p2, p3, p4, p5) = (
            probe.clone(),
            probe.clone(),
            probe.clone(),
            probe.clone(),
            probe,
        );
        Self {
            cpu_cores: Arc::new(move || p1.cpu_cores()),
            memory_mb: Arc::new(move || p2.memory_mb()),
            network_online: Arc::new(move || p3.network_online()),
            battery_status: Arc::new(move || p4.battery_status()),
            supports: Arc::new(move |primitive| p5.supports(primitive)),
            optimize: no_optimization(),
        }
    }

    pub fn with_cpu_cores<F>(mut self, f: F) -> Self
    where
        F: Fn() -> Result<u32, ProbeError> + Send + Sync + 'static,
    {
        self.cpu_cores = Arc::new(f);
        self
    }

    pub fn with_memory_mb<F>(mut self, f: F) -> Self
    where
        F: Fn() -> Result<u64, ProbeError> + Send + Sync + 'static,
    {
        self.memory_mb = Arc::new(f);
        self
    }

    pub fn with_battery_status<F>(mut self, f: F) -> Self
    where
        F: Fn() -> Result<Option<BatteryStatus>, ProbeError> + Send + Sync + 'static,
    {
        self.battery_status = Arc::new(f);
        self
    }

    pub fn with_supports<F>(mut self, f: F) -> Self
    where
        F: Fn(Primitive) -> Result<bool, ProbeError> + Send + Sync + 'static,
    {
        self.supports = Arc::new(f);
        self
    }

    pub fn with_optimize<F>(mut self, f: F) -> Self
    where
        F: Fn(&ExecutionStrategy) -> Result<(), String> + Send + Sync + 'static,
    {
        self.optimize = Arc::new(f);
        self
    }
}

impl HostProbe for PlatformCapabilities {
    fn cpu_cores(&self) -> Result<u32, ProbeError> {
        (self.cpu_cores)()
    }

    fn memory_mb(&self) -> Result<u64, ProbeError> {
        (self.memory_mb)()
    }

    fn network_online(&self) -> Result<bool, ProbeError> {
        (self.network_online)()
    }

    fn battery_status(&self) -> Result<Option<BatteryStatus>, ProbeError> {
        (self.battery_status)()
    }

    fn supports(&self, primitive: Primitive) -> Result<bool, ProbeError> {
        (self.supports)(primitive)
    }
}

type Builder = fn() -> PlatformCapabilities;

const ADAPTERS: [(EnvironmentKind, Builder); 5] = [
    (EnvironmentKind::Desktop, PlatformCapabilities::desktop),
    (EnvironmentKind::Browser, PlatformCapabilities::browser),
    (EnvironmentKind::Mobile, PlatformCapabilities::mobile),
    (EnvironmentKind::Worker, PlatformCapabilities::worker),
    (EnvironmentKind::Unknown, PlatformCapabilities::unknown),
];

/// Capability record for an environment kind.
pub fn capabilities_for(kind: EnvironmentKind) -> PlatformCapabilities {
    ADAPTERS
        .iter()
        .find(|(k, _)| *k == kind)
        .map(|(_, build)| build())
        .unwrap_or_else(PlatformCapabilities::unknown)
}
