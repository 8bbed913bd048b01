//! ProofPlane kernel.
//!
//! Contracts shared by every part of the proof plane: the data model for
//! profiles, strategies, plans and operations, the collaborator traits
//! (host probe, local/remote prover, telemetry) and the error taxonomy.
//! Implementations live in `proofplane-foundation`.

// error module
pub mod error;

// operation module
pub mod operation;

// probe module
pub mod probe;

// profile module
pub mod profile;

// strategy module
pub mod strategy;

// prover module
pub mod prover;

// telemetry module
pub mod telemetry;

// config module
#[cfg(feature = "config")]
pub mod config;

pub use error::{KernelError, KernelResult, ProofError, ProofResult, RateLimitWindow};
pub use operation::{
    Complexity, ExecutionResult, Operation, OperationKind, OperationOptions, ProgressCallback,
    ProgressEvent, Venue,
};
pub use probe::{BatteryStatus, HostProbe, Primitive, ProbeError};
pub use profile::{CapabilityFlags, DeviceTier, EnvironmentKind, FeatureProfile};
pub use prover::{
    LocalProver, ProofOutput, RemoteProofResponse, RemoteProver, RemoteStatus,
    RemoteVerifyResponse, VerifyRequest,
};
pub use strategy::{
    ExecutionMode, ExecutionPlan, ExecutionPreference, ExecutionStrategy, PlanTimeouts,
    PlatformOptimizations, ResourceConstraints, StrategyType,
};
pub use telemetry::{NoopTelemetry, Telemetry};
