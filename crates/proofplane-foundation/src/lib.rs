//! ProofPlane foundation.
//!
//! Implementations of the kernel contracts: capability detection, strategy
//! selection, the platform adapter, resource monitoring and the execution
//! coordinator with its single fallback hop.

// config module
pub mod config;

// coordinator module - venue decision, fallback and progress
pub mod coordinator;

// detection module
pub mod detection;

// logging module
pub mod logging;

// monitor module - resource pressure and adaptation
pub mod monitor;

// plane module - component registry
pub mod plane;

// platform module
pub mod platform;

// remote module - HTTP proof service client
pub mod remote;

// strategy module
pub mod strategy;

// tasks module
pub mod tasks;

pub use config::PlaneConfig;
pub use coordinator::{ExecutionCoordinator, OperationStats, StatsSnapshot, TelemetryDispatcher};
pub use detection::{CapabilityDetector, SystemProbe, classify_tier};
pub use monitor::{
    ResourceMonitor, ResourceSampler, SeverityWeights, SharedProfile, SystemResourceSampler,
};
pub use plane::{PlaneDeps, ProofPlane};
pub use platform::{
    Capability, LocalCache, OptimizationReport, PlatformAdapter, PlatformCapabilities, SecureRng,
    WorkerPool,
};
pub use remote::HttpRemoteProver;
pub use strategy::{AdaptationThresholds, PlanCell, StrategyCatalog, StrategySelector};
pub use tasks::{BackgroundTasks, JoinReport};
