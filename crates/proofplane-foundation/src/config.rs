//! Proof plane configuration.

use std::time::Duration;

use error_stack::{Report, ResultExt};
use proofplane_kernel::config::{self as loader, FileFormat};
use proofplane_kernel::error::{KernelError, KernelResult, ProofError, ProofResult};
use proofplane_kernel::strategy::{ExecutionPreference, PlanTimeouts};
use serde::{Deserialize, Serialize};

use crate::monitor::SeverityWeights;
use crate::strategy::AdaptationThresholds;

/// Settings for a [`crate::ProofPlane`].
///
/// Every field has a default, so a config file only needs the keys it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaneConfig {
    /// Base URL of the remote proof service
    pub remote_endpoint: String,
    /// Per-attempt deadline for proof generation
    pub proof_generation_timeout_ms: u64,
    /// Per-attempt deadline for verification
    pub verification_timeout_ms: u64,
    /// Deadline for `GET /status`
    pub status_timeout_ms: u64,
    /// Upper bound for the local worker pool
    pub max_worker_threads: u32,
    /// Resource sampling period; `0` disables the background monitor
    pub monitor_interval_secs: u64,
    pub severity_weights: SeverityWeights,
    /// Severity above which the monitor re-selects a strategy
    pub adaptation_threshold: f64,
    /// Severity above which the monitor goes straight to server-side
    pub server_side_threshold: f64,
    pub preference: ExecutionPreference,
    /// Environment name override (`desktop`, `browser`, `mobile`, `worker`)
    pub environment: Option<String>,
    /// Seed for the offload draw; entropy-seeded when unset
    pub offload_seed: Option<u64>,
}

impl Default for PlaneConfig {
    fn default() -> Self {
        Self {
            remote_endpoint: "http://localhost:3000/api/zk".to_string(),
            proof_generation_timeout_ms: 60_000,
            verification_timeout_ms: 30_000,
            status_timeout_ms: 5_000,
            max_worker_threads: 4,
            monitor_interval_secs: 30,
            severity_weights: SeverityWeights::default(),
            adaptation_threshold: 0.5,
            server_side_threshold: 0.7,
            preference: ExecutionPreference::default(),
            environment: None,
            offload_seed: None,
        }
    }
}

impl PlaneConfig {
    /// Load from a config file (format picked from the extension).
    pub fn load(path: &str) -> KernelResult<Self> {
        loader::load_config::<Self>(path)
            .map_err(KernelError::from)
            .map_err(Report::new)
            .attach(format!("loading proof plane config from {path}"))
    }

    pub fn from_toml_str(content: &str) -> KernelResult<Self> {
        loader::from_str::<Self>(content, FileFormat::Toml)
            .map_err(KernelError::from)
            .map_err(Report::new)
    }

    pub fn with_remote_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.remote_endpoint = endpoint.into();
        self
    }

    pub fn with_preference(mut self, preference: ExecutionPreference) -> Self {
        self.preference = preference;
        self
    }

    pub fn with_environment(mut self, environment: impl Into<String>) -> Self {
        self.environment = Some(environment.into());
        self
    }

    pub fn with_offload_seed(mut self, seed: u64) -> Self {
        self.offload_seed = Some(seed);
        self
    }

    pub fn with_monitor_interval_secs(mut self, secs: u64) -> Self {
        self.monitor_interval_secs = secs;
        self
    }

    pub fn with_proof_generation_timeout(mut self, timeout: Duration) -> Self {
        self.proof_generation_timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn timeouts(&self) -> PlanTimeouts {
        PlanTimeouts {
            proof_generation: Duration::from_millis(self.proof_generation_timeout_ms),
            verification: Duration::from_millis(self.verification_timeout_ms),
            status: Duration::from_millis(self.status_timeout_ms),
        }
    }

    pub fn thresholds(&self) -> AdaptationThresholds {
        AdaptationThresholds {
            adaptation: self.adaptation_threshold,
            server_side: self.server_side_threshold,
        }
    }

    pub fn monitor_interval(&self) -> Option<Duration> {
        (self.monitor_interval_secs > 0).then(|| Duration::from_secs(self.monitor_interval_secs))
    }

    /// Reject settings the plane cannot run with.
    pub fn validate(&self) -> ProofResult<()> {
        if self.remote_endpoint.trim().is_empty() {
            return Err(ProofError::Configuration(
                "remote_endpoint must not be empty".into(),
            ));
        }
        if self.proof_generation_timeout_ms == 0
            || self.verification_timeout_ms == 0
            || self.status_timeout_ms == 0
        {
            return Err(ProofError::Configuration(
                "timeouts must be greater than zero".into(),
            ));
        }
        if self.max_worker_threads == 0 {
            return Err(ProofError::Configuration(
                "max_worker_threads must be at least 1".into(),
            ));
        }
        self.severity_weights.validate()?;

        let unit = 0.0..=1.0;
        if !unit.contains(&self.adaptation_threshold) || !unit.contains(&self.server_side_threshold)
        {
            return Err(ProofError::Configuration(
                "severity thresholds must be within [0, 1]".into(),
            ));
        }
        if self.server_side_threshold < self.adaptation_threshold {
            return Err(ProofError::Configuration(format!(
                "server_side_threshold ({}) is below adaptation_threshold ({})",
                self.server_side_threshold, self.adaptation_threshold
            )));
        }
        Ok(())
    }
}
