//! Error types for `proofplane-kernel`.
//!
//! Two layers, following the split used across the workspace:
//!
//! - [`ProofError`] is the execution-path taxonomy. It is cheap to clone,
//!   carries the venue that failed, and decides whether a failure may hop
//!   to the other venue.
//! - [`KernelError`] wraps setup-time failures (config, IO) and is carried
//!   inside an [`error_stack::Report`] through [`KernelResult`] so context
//!   can be attached while it propagates.
//!
//! # Usage
//!
//! ```rust,ignore
//! use proofplane_kernel::error::{KernelError, KernelResult};
//! use error_stack::ResultExt;
//!
//! fn read_plan_file() -> KernelResult<String> {
//!     std::fs::read_to_string("plane.toml")
//!         .map_err(KernelError::from)
//!         .map_err(error_stack::Report::new)
//!         .attach("reading plane.toml")
//! }
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::operation::Venue;

/// Limit-window metadata attached to a rate-limit rejection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RateLimitWindow {
    /// Maximum requests allowed in one window
    pub max_requests: Option<u64>,
    /// Window length in milliseconds
    pub window_ms: Option<u64>,
    /// Requests left in the current window
    pub remaining: Option<u64>,
}

/// Execution-path error taxonomy.
///
/// `DeploymentProcess` and `RateLimit` display their message verbatim so
/// callers can match on the text produced by the venue that failed.
#[derive(Debug, Clone, Error, PartialEq)]
#[non_exhaustive]
pub enum ProofError {
    /// Bad or missing setup. Surfaced immediately, never retried elsewhere.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// No adapter exists for the requested environment.
    #[error("No platform adapter available for environment '{environment}'")]
    EnvironmentCompatibility { environment: String },

    /// A venue failed while executing an operation.
    #[error("{message}")]
    DeploymentProcess { venue: Venue, message: String },

    /// A venue attempt exceeded its deadline.
    #[error("{venue} proof operation timed out after {duration_ms}ms")]
    Timeout { venue: Venue, duration_ms: u64 },

    /// The remote venue throttled the request.
    #[error("{message}")]
    RateLimit {
        message: String,
        retry_after_secs: Option<u64>,
        limits: Option<RateLimitWindow>,
    },

    /// A capability was requested that nobody registered.
    #[error("Implementation not found: {0}")]
    NotFound(String),

    /// A payload could not be (de)serialized.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl ProofError {
    /// Shorthand for a venue execution failure.
    pub fn deployment(venue: Venue, message: impl Into<String>) -> Self {
        Self::DeploymentProcess {
            venue,
            message: message.into(),
        }
    }

    /// Shorthand for a rate-limit rejection without metadata.
    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::RateLimit {
            message: message.into(),
            retry_after_secs: None,
            limits: None,
        }
    }

    /// The venue this error originated from, when known.
    pub fn venue(&self) -> Option<Venue> {
        match self {
            Self::DeploymentProcess { venue, .. } | Self::Timeout { venue, .. } => Some(*venue),
            Self::RateLimit { .. } => Some(Venue::Server),
            _ => None,
        }
    }

    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimit { .. })
    }

    /// Timeouts are a kind of deployment failure.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// Whether this failure may be retried once on the other venue.
    ///
    /// Rate limits are excluded so an already throttled path is not hit
    /// again through the back door; configuration problems are excluded
    /// because they fail identically everywhere.
    pub fn is_fallback_eligible(&self) -> bool {
        matches!(
            self,
            Self::DeploymentProcess { .. } | Self::Timeout { .. }
        )
    }
}

impl From<serde_json::Error> for ProofError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Convenience alias for the execution path.
pub type ProofResult<T> = Result<T, ProofError>;

/// Setup-time error for the kernel.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum KernelError {
    /// An execution-path error raised during setup.
    #[error("Proof error: {0}")]
    Proof(#[from] ProofError),

    /// A configuration loading error (requires the `config` feature).
    #[cfg(feature = "config")]
    #[error("Config error: {0}")]
    Config(#[from] crate::config::ConfigError),

    /// A low-level I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A JSON (de)serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// An untyped error described by a message string.
    #[error("{0}")]
    Internal(String),
}

/// Result alias carrying an [`error_stack::Report`].
pub type KernelResult<T> = Result<T, error_stack::Report<KernelError>>;
