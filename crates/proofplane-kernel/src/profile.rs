//! Normalized host capability snapshot.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ProofError;
use crate::probe::BatteryStatus;

/// Environment class an adapter is built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnvironmentKind {
    /// Native desktop or server process
    Desktop,
    Browser,
    Mobile,
    /// An isolated worker (no direct host access)
    Worker,
    Unknown,
}

impl EnvironmentKind {
    pub const ALL: [EnvironmentKind; 5] = [
        EnvironmentKind::Desktop,
        EnvironmentKind::Browser,
        EnvironmentKind::Mobile,
        EnvironmentKind::Worker,
        EnvironmentKind::Unknown,
    ];

    /// Environment implied by the compilation target.
    pub fn detect() -> Self {
        if cfg!(target_arch = "wasm32") {
            Self::Browser
        } else if cfg!(any(target_os = "android", target_os = "ios")) {
            Self::Mobile
        } else if cfg!(any(
            target_os = "linux",
            target_os = "macos",
            target_os = "windows",
            target_os = "freebsd"
        )) {
            Self::Desktop
        } else {
            Self::Unknown
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Desktop => "desktop",
            Self::Browser => "browser",
            Self::Mobile => "mobile",
            Self::Worker => "worker",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for EnvironmentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EnvironmentKind {
    type Err = ProofError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "desktop" | "server" | "node" | "native" => Ok(Self::Desktop),
            "browser" | "web" => Ok(Self::Browser),
            "mobile" | "react-native" | "android" | "ios" => Ok(Self::Mobile),
            "worker" | "web-worker" | "isolate" => Ok(Self::Worker),
            "unknown" => Ok(Self::Unknown),
            other => Err(ProofError::EnvironmentCompatibility {
                environment: other.to_string(),
            }),
        }
    }
}

/// Coarse device classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceTier {
    High,
    Medium,
    Low,
    /// Cannot run the local prover at all
    Incompatible,
}

impl DeviceTier {
    /// Whether proofs may be generated on this device.
    pub fn can_prove_locally(self) -> bool {
        !matches!(self, Self::Incompatible)
    }
}

impl fmt::Display for DeviceTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::High => write!(f, "high"),
            Self::Medium => write!(f, "medium"),
            Self::Low => write!(f, "low"),
            Self::Incompatible => write!(f, "incompatible"),
        }
    }
}

/// Boolean capability flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilityFlags {
    pub worker_threads: bool,
    pub wasm: bool,
    pub secure_rng: bool,
    pub persistent_storage: bool,
    pub shared_memory: bool,
}

/// Snapshot of host capabilities. Created at initialization, refreshed on reset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureProfile {
    pub environment: EnvironmentKind,
    pub flags: CapabilityFlags,
    pub cpu_cores: u32,
    pub memory_mb: u64,
    pub network_online: bool,
    pub battery: Option<BatteryStatus>,
    pub tier: DeviceTier,
    pub detected_at: DateTime<Utc>,
}
