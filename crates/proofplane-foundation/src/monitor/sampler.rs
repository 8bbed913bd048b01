//! Resource samplers.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use proofplane_kernel::error::{ProofError, ProofResult};
use proofplane_kernel::operation::Venue;
use proofplane_kernel::probe::HostProbe;
use proofplane_kernel::strategy::ResourceConstraints;
use sysinfo::{Disks, System};
use tracing::warn;

/// Memory use above this share of total counts as pressure.
const MEMORY_PRESSURE_RATIO: f64 = 0.85;
/// Global CPU use above this percentage counts as pressure.
const CPU_PRESSURE_PERCENT: f32 = 90.0;
/// Less free disk than this counts as pressure.
const MIN_FREE_DISK_BYTES: u64 = 1024 * 1024 * 1024;

/// Produces constraint flags. Severity is computed by the monitor.
#[async_trait]
pub trait ResourceSampler: Send + Sync {
    async fn sample(&self) -> ProofResult<ResourceConstraints>;
}

/// Samples the native host with `sysinfo`; network and battery come from
/// the platform probe.
pub struct SystemResourceSampler {
    probe: Arc<dyn HostProbe>,
    system: Arc<Mutex<System>>,
}

impl SystemResourceSampler {
    pub fn new(probe: Arc<dyn HostProbe>) -> Self {
        Self {
            probe,
            system: Arc::new(Mutex::new(System::new())),
        }
    }
}

#[async_trait]
impl ResourceSampler for SystemResourceSampler {
    async fn sample(&self) -> ProofResult<ResourceConstraints> {
        let system = self.system.clone();

        // CPU usage is the delta since the previous refresh, so the first
        // sample after start reads as idle.
        let (cpu, memory, storage) = tokio::task::spawn_blocking(move || {
            let mut sys = system.lock();
            sys.refresh_memory();
            sys.refresh_cpu_usage();

            let total = sys.total_memory();
            let memory = total > 0 && (sys.used_memory() as f64 / total as f64) > MEMORY_PRESSURE_RATIO;
            let cpu = sys.global_cpu_usage() > CPU_PRESSURE_PERCENT;

            let disks = Disks::new_with_refreshed_list();
            let free: u64 = disks.list().iter().map(|d| d.available_space()).sum();
            let storage = !disks.list().is_empty() && free < MIN_FREE_DISK_BYTES;

            (cpu, memory, storage)
        })
        .await
        .map_err(|e| ProofError::deployment(Venue::Local, format!("resource sampling failed: {e}")))?;

        let network = match self.probe.network_online() {
            Ok(online) => !online,
            Err(e) => {
                warn!(error = %e, "Network probe failed during sampling");
                false
            }
        };
        let battery = match self.probe.battery_status() {
            Ok(status) => status.is_some_and(|b| b.is_low()),
            Err(e) => {
                warn!(error = %e, "Battery probe failed during sampling");
                false
            }
        };

        Ok(ResourceConstraints {
            cpu,
            memory,
            network,
            storage,
            battery,
            severity: 0.0,
        })
    }
}
