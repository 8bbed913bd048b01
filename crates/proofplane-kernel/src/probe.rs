//! Host capability probing contract.
//!
//! A [`HostProbe`] answers raw questions about the machine it runs on. Every
//! query may fail; the capability detector is responsible for turning
//! failures into conservative defaults.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A single probe query failed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("probe '{probe}' failed: {reason}")]
pub struct ProbeError {
    pub probe: String,
    pub reason: String,
}

impl ProbeError {
    pub fn new(probe: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            probe: probe.into(),
            reason: reason.into(),
        }
    }
}

/// Runtime primitives a proving backend may rely on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Primitive {
    WorkerThreads,
    Wasm,
    /// A cryptographically secure random source
    Crypto,
    PersistentStorage,
    SharedMemory,
}

impl Primitive {
    pub const ALL: [Primitive; 5] = [
        Primitive::WorkerThreads,
        Primitive::Wasm,
        Primitive::Crypto,
        Primitive::PersistentStorage,
        Primitive::SharedMemory,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::WorkerThreads => "worker-threads",
            Self::Wasm => "wasm",
            Self::Crypto => "crypto",
            Self::PersistentStorage => "persistent-storage",
            Self::SharedMemory => "shared-memory",
        }
    }

    /// Parse a feature name. Accepts a few common aliases.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "worker-threads" | "workers" | "threads" | "web-workers" => Some(Self::WorkerThreads),
            "wasm" | "webassembly" => Some(Self::Wasm),
            "crypto" | "secure-rng" | "rng" => Some(Self::Crypto),
            "persistent-storage" | "storage" | "indexeddb" => Some(Self::PersistentStorage),
            "shared-memory" | "shared-array-buffer" => Some(Self::SharedMemory),
            _ => None,
        }
    }
}

/// Battery reading.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BatteryStatus {
    /// Charge level, 0.0-1.0
    pub level: f32,
    pub charging: bool,
}

impl BatteryStatus {
    /// Low and draining.
    pub fn is_low(&self) -> bool {
        self.level < 0.2 && !self.charging
    }
}

/// Raw per-environment capability queries.
pub trait HostProbe: Send + Sync {
    fn cpu_cores(&self) -> Result<u32, ProbeError>;

    fn memory_mb(&self) -> Result<u64, ProbeError>;

    fn network_online(&self) -> Result<bool, ProbeError>;

    /// `Ok(None)` when the host has no battery (or does not expose one).
    fn battery_status(&self) -> Result<Option<BatteryStatus>, ProbeError>;

    fn supports(&self, primitive: Primitive) -> Result<bool, ProbeError>;
}
