//! Capability detection.
//!
//! Turns raw [`HostProbe`] readings into a normalized [`FeatureProfile`].
//! Detection never fails: a probe that errors is logged and replaced by the
//! most conservative value for that reading.

pub(crate) mod system;

pub use system::SystemProbe;

use std::sync::Arc;

use chrono::Utc;
use proofplane_kernel::probe::{HostProbe, Primitive};
use proofplane_kernel::profile::{CapabilityFlags, DeviceTier, EnvironmentKind, FeatureProfile};
use tracing::{debug, warn};

/// Builds feature profiles from a host probe.
#[derive(Clone)]
pub struct CapabilityDetector {
    environment: EnvironmentKind,
    probe: Arc<dyn HostProbe>,
}

impl CapabilityDetector {
    pub fn new(environment: EnvironmentKind, probe: Arc<dyn HostProbe>) -> Self {
        Self { environment, probe }
    }

    pub fn environment(&self) -> EnvironmentKind {
        self.environment
    }

    /// Query the probe and classify the host.
    pub fn detect(&self) -> FeatureProfile {
        let cpu_cores = self
            .probe
            .cpu_cores()
            .unwrap_or_else(|e| {
                warn!(error = %e, "CPU core probe failed, assuming a single core");
                1
            })
            .max(1);

        let memory_mb = self.probe.memory_mb().unwrap_or_else(|e| {
            warn!(error = %e, "Memory probe failed, assuming no memory");
            0
        });

        let network_online = self.probe.network_online().unwrap_or_else(|e| {
            warn!(error = %e, "Network probe failed, assuming offline");
            false
        });

        let battery = self.probe.battery_status().unwrap_or_else(|e| {
            warn!(error = %e, "Battery probe failed, ignoring battery state");
            None
        });

        let flags = CapabilityFlags {
            worker_threads: self.supports(Primitive::WorkerThreads),
            wasm: self.supports(Primitive::Wasm),
            secure_rng: self.supports(Primitive::Crypto),
            persistent_storage: self.supports(Primitive::PersistentStorage),
            shared_memory: self.supports(Primitive::SharedMemory),
        };

        let tier = classify_tier(cpu_cores, memory_mb, &flags);
        debug!(
            environment = %self.environment,
            cpu_cores,
            memory_mb,
            network_online,
            %tier,
            "Detected host capabilities"
        );

        FeatureProfile {
            environment: self.environment,
            flags,
            cpu_cores,
            memory_mb,
            network_online,
            battery,
            tier,
            detected_at: Utc::now(),
        }
    }

    fn supports(&self, primitive: Primitive) -> bool {
        self.probe.supports(primitive).unwrap_or_else(|e| {
            warn!(primitive = primitive.as_str(), error = %e, "Primitive probe failed");
            false
        })
    }
}

/// Device tier from core count, memory and the proving primitives.
///
/// A host without WASM or a secure random source cannot run the prover at all,
/// whatever its size.
pub fn classify_tier(cpu_cores: u32, memory_mb: u64, flags: &CapabilityFlags) -> DeviceTier {
    if !flags.wasm || !flags.secure_rng {
        return DeviceTier::Incompatible;
    }
    if cpu_cores >= 4 && memory_mb >= 4096 {
        DeviceTier::High
    } else if cpu_cores >= 2 && memory_mb >= 2048 {
        DeviceTier::Medium
    } else {
        DeviceTier::Low
    }
}
