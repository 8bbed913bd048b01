//! Strategy and plan types.
//!
//! An [`ExecutionStrategy`] is a concrete parameter tuple taken from the
//! strategy catalog. An [`ExecutionPlan`] bundles the active strategy with
//! the endpoint, timeouts and caller preference resolved for it; plans are
//! shared behind an `Arc` and replaced wholesale, never edited in place.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Named strategy classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyType {
    FullLocal,
    Hybrid,
    ServerSide,
    LowResource,
    HighPerformance,
    /// Resolved against the feature profile at selection time
    Automatic,
}

impl StrategyType {
    pub const CONCRETE: [StrategyType; 5] = [
        StrategyType::FullLocal,
        StrategyType::Hybrid,
        StrategyType::ServerSide,
        StrategyType::LowResource,
        StrategyType::HighPerformance,
    ];

    /// Strategies that never touch the remote venue by default.
    pub fn prefers_local(self) -> bool {
        matches!(self, Self::FullLocal | Self::HighPerformance)
    }

    /// Strategies that may run the local prover at all.
    pub fn uses_local_prover(self) -> bool {
        !matches!(self, Self::ServerSide)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::FullLocal => "full_local",
            Self::Hybrid => "hybrid",
            Self::ServerSide => "server_side",
            Self::LowResource => "low_resource",
            Self::HighPerformance => "high_performance",
            Self::Automatic => "automatic",
        }
    }
}

impl fmt::Display for StrategyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Platform-specific tuning switches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformOptimizations {
    /// Throttle local work while on battery (mobile)
    pub battery_saver: bool,
    /// Yield between proving stages so the UI thread stays responsive (browser)
    pub yield_main_thread: bool,
    /// Keep prover state inside the worker that owns it
    pub isolated_worker: bool,
    /// Use OS threads rather than runtime-emulated workers (desktop/server)
    pub native_threads: bool,
}

/// Concrete execution parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionStrategy {
    pub strategy_type: StrategyType,
    pub use_worker_threads: bool,
    pub worker_thread_count: u32,
    pub use_wasm: bool,
    pub use_local_cache: bool,
    pub offload_to_server: bool,
    /// Probability (0-100) that an operation is routed to the server
    pub server_offload_percentage: u8,
    pub memory_limit_mb: u64,
    pub enable_compression: bool,
    pub aggressive_cleanup: bool,
    pub optimizations: PlatformOptimizations,
}

impl ExecutionStrategy {
    /// Copy with a different offload percentage, clamped to 100.
    pub fn with_offload_percentage(mut self, percentage: u8) -> Self {
        self.server_offload_percentage = percentage.min(100);
        self.offload_to_server = self.server_offload_percentage > 0;
        self
    }

    /// Every operation goes to the server.
    pub fn is_server_only(&self) -> bool {
        self.server_offload_percentage >= 100
    }

    /// Every operation stays local.
    pub fn is_local_only(&self) -> bool {
        self.server_offload_percentage == 0
    }
}

/// How the caller wants venues chosen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "strategy", rename_all = "snake_case")]
pub enum ExecutionMode {
    /// Let the selector pick from the feature profile
    #[default]
    Automatic,
    /// Use a named catalog strategy
    Strategy(StrategyType),
    /// Always run on this host
    ForceLocal,
    /// Always run on the remote service
    ForceServer,
}

/// Caller preference carried into every plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionPreference {
    pub mode: ExecutionMode,
    /// Permit one hop to the other venue on failure
    pub allow_fallback: bool,
}

impl Default for ExecutionPreference {
    fn default() -> Self {
        Self {
            mode: ExecutionMode::Automatic,
            allow_fallback: true,
        }
    }
}

impl ExecutionPreference {
    pub fn new(mode: ExecutionMode) -> Self {
        Self {
            mode,
            ..Default::default()
        }
    }

    pub fn without_fallback(mut self) -> Self {
        self.allow_fallback = false;
        self
    }

    pub fn forces_server(&self) -> bool {
        matches!(self.mode, ExecutionMode::ForceServer)
    }

    pub fn forces_local(&self) -> bool {
        matches!(self.mode, ExecutionMode::ForceLocal)
    }
}

/// Per-attempt deadlines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanTimeouts {
    pub proof_generation: Duration,
    pub verification: Duration,
    pub status: Duration,
}

impl Default for PlanTimeouts {
    fn default() -> Self {
        Self {
            proof_generation: Duration::from_secs(60),
            verification: Duration::from_secs(30),
            status: Duration::from_secs(5),
        }
    }
}

/// The active, immutable plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionPlan {
    /// Incremented on every publish
    pub revision: u64,
    pub strategy: ExecutionStrategy,
    pub preference: ExecutionPreference,
    /// Base URL of the remote proof service
    pub remote_endpoint: String,
    pub timeouts: PlanTimeouts,
    pub created_at: DateTime<Utc>,
}

impl ExecutionPlan {
    pub fn strategy_type(&self) -> StrategyType {
        self.strategy.strategy_type
    }
}

/// Sampled resource pressure.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceConstraints {
    pub cpu: bool,
    pub memory: bool,
    pub network: bool,
    pub storage: bool,
    pub battery: bool,
    /// Weighted aggregate of the flags above, 0.0-1.0
    pub severity: f64,
}

impl ResourceConstraints {
    pub fn any(&self) -> bool {
        self.cpu || self.memory || self.network || self.storage || self.battery
    }
}
