//! Operation request/response types.
//!
//! These define the contract callers use with the execution coordinator,
//! regardless of whether the proof ends up being produced on this host or by
//! the remote proof service.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Where an operation executes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Venue {
    /// On this host, through the local prover
    Local,
    /// On the remote proof service
    Server,
}

impl Venue {
    /// The venue a fallback hop goes to.
    pub fn other(self) -> Self {
        match self {
            Self::Local => Self::Server,
            Self::Server => Self::Local,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Server => "server",
        }
    }
}

impl fmt::Display for Venue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the operation asks the prover to do.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    /// Generate a proof from circuit inputs
    #[default]
    Prove,
    /// Check a proof against a verification key
    Verify,
}

/// Caller-declared cost of an operation. Used for routing under Hybrid plans.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Complexity {
    Low,
    Medium,
    High,
}

/// One entry of the progress stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressEvent {
    /// Completion percentage, 0-100
    pub progress: u8,
    /// Human-readable status line
    pub status: String,
    pub timestamp: DateTime<Utc>,
}

impl ProgressEvent {
    pub fn new(progress: u8, status: impl Into<String>) -> Self {
        Self {
            progress: progress.min(100),
            status: status.into(),
            timestamp: Utc::now(),
        }
    }
}

/// User progress callback.
pub type ProgressCallback = Arc<dyn Fn(&ProgressEvent) + Send + Sync>;

/// Per-call options.
#[derive(Clone, Default)]
pub struct OperationOptions {
    /// Run on this host regardless of the plan
    pub force_local: bool,
    /// Run on the remote service regardless of the plan
    pub force_server: bool,
    /// This attempt is already a fallback hop
    pub is_retry: bool,
    /// Overrides the plan's per-attempt timeout
    pub timeout: Option<Duration>,
    /// Receives every progress event as it is emitted
    pub progress: Option<ProgressCallback>,
}

impl fmt::Debug for OperationOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperationOptions")
            .field("force_local", &self.force_local)
            .field("force_server", &self.force_server)
            .field("is_retry", &self.is_retry)
            .field("timeout", &self.timeout)
            .field("progress", &self.progress.as_ref().map(|_| "<callback>"))
            .finish()
    }
}

/// A single proof request.
#[derive(Debug, Clone)]
pub struct Operation {
    pub id: Uuid,
    /// Name used for telemetry and logs (e.g. the circuit name)
    pub name: String,
    pub kind: OperationKind,
    /// Circuit inputs for `Prove`, a [`crate::prover::VerifyRequest`] for `Verify`
    pub input: serde_json::Value,
    pub complexity: Option<Complexity>,
    pub options: OperationOptions,
}

impl Operation {
    /// Create a proof-generation operation.
    pub fn prove(name: impl Into<String>, input: serde_json::Value) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            kind: OperationKind::Prove,
            input,
            complexity: None,
            options: OperationOptions::default(),
        }
    }

    /// Create a verification operation.
    pub fn verify(name: impl Into<String>, request: &crate::prover::VerifyRequest) -> Self {
        Self {
            kind: OperationKind::Verify,
            input: serde_json::to_value(request).unwrap_or(serde_json::Value::Null),
            ..Self::prove(name, serde_json::Value::Null)
        }
    }

    pub fn with_complexity(mut self, complexity: Complexity) -> Self {
        self.complexity = Some(complexity);
        self
    }

    pub fn with_options(mut self, options: OperationOptions) -> Self {
        self.options = options;
        self
    }

    pub fn force_local(mut self) -> Self {
        self.options.force_local = true;
        self
    }

    pub fn force_server(mut self) -> Self {
        self.options.force_server = true;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.options.timeout = Some(timeout);
        self
    }

    pub fn on_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(&ProgressEvent) + Send + Sync + 'static,
    {
        self.options.progress = Some(Arc::new(callback));
        self
    }

    /// A copy of this operation marked as the fallback attempt.
    pub fn as_retry(&self) -> Self {
        let mut retry = self.clone();
        retry.options.is_retry = true;
        retry
    }
}

/// Outcome of a finished operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub operation_id: Uuid,
    pub success: bool,
    /// Prover output (`{proof, publicSignals}` or `{verified}`)
    pub payload: serde_json::Value,
    /// The venue that actually produced the payload
    pub venue: Venue,
    pub duration: Duration,
    /// Whether a fallback hop was needed
    pub fallback_used: bool,
    /// Every progress event emitted for this operation
    pub progress: Vec<ProgressEvent>,
}
