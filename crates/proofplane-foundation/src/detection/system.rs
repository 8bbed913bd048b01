use std::sync::Arc;

use parking_lot::Mutex;
use proofplane_kernel::probe::{BatteryStatus, HostProbe, Primitive, ProbeError};
use rand::RngCore;
use sysinfo::{Disks, MemoryRefreshKind, Networks, RefreshKind, System};

/// Probe for the native host, backed by `sysinfo`.
///
/// `sysinfo` exposes no battery information, so `battery_status` always
/// reports no battery.
#[derive(Clone)]
pub struct SystemProbe {
    system: Arc<Mutex<System>>,
}

impl Default for SystemProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemProbe {
    pub fn new() -> Self {
        let system = System::new_with_specifics(
            RefreshKind::new().with_memory(MemoryRefreshKind::everything()),
        );
        Self {
            system: Arc::new(Mutex::new(system)),
        }
    }
}

/// Logical cores available to this process.
pub(crate) fn host_concurrency() -> Result<u32, ProbeError> {
    std::thread::available_parallelism()
        .map(|n| n.get() as u32)
        .map_err(|e| ProbeError::new("cpu-cores", e.to_string()))
}

/// Total physical memory in MiB.
pub(crate) fn total_memory_mb(system: &Mutex<System>) -> Result<u64, ProbeError> {
    let mut sys = system.lock();
    sys.refresh_memory();
    match sys.total_memory() {
        0 => Err(ProbeError::new("memory", "host reported zero memory")),
        bytes => Ok(bytes / (1024 * 1024)),
    }
}

/// Whether any non-loopback interface exists.
pub(crate) fn has_network_interface() -> Result<bool, ProbeError> {
    let networks = Networks::new_with_refreshed_list();
    Ok(networks
        .list()
        .keys()
        .any(|name| !name.starts_with("lo")))
}

/// Whether the OS random source can be read.
pub(crate) fn os_rng_available() -> bool {
    let mut buf = [0u8; 8];
    rand::rngs::OsRng.try_fill_bytes(&mut buf).is_ok()
}

impl HostProbe for SystemProbe {
    fn cpu_cores(&self) -> Result<u32, ProbeError> {
        host_concurrency()
    }

    fn memory_mb(&self) -> Result<u64, ProbeError> {
        total_memory_mb(&self.system)
    }

    fn network_online(&self) -> Result<bool, ProbeError> {
        has_network_interface()
    }

    fn battery_status(&self) -> Result<Option<BatteryStatus>, ProbeError> {
        Ok(None)
    }

    fn supports(&self, primitive: Primitive) -> Result<bool, ProbeError> {
        Ok(match primitive {
            Primitive::WorkerThreads | Primitive::SharedMemory => true,
            // the native runtime hosts the WASM prover build
            Primitive::Wasm => true,
            Primitive::Crypto => os_rng_available(),
            Primitive::PersistentStorage => !Disks::new_with_refreshed_list().list().is_empty(),
        })
    }
}
