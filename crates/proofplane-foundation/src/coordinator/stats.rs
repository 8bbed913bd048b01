//! Operation counters.
//!
//! Updated concurrently by every in-flight operation.

use std::sync::atomic::{AtomicU64, Ordering};

use proofplane_kernel::error::ProofError;
use proofplane_kernel::operation::Venue;
use serde::{Deserialize, Serialize};

#[derive(Debug, Default)]
pub struct OperationStats {
    /// Operations started
    total: AtomicU64,
    /// Operations that ended successfully
    succeeded: AtomicU64,
    /// Operations that ended with an error
    failed: AtomicU64,
    /// Attempts on this host (first try or fallback)
    local_attempts: AtomicU64,
    /// Attempts on the remote service (first try or fallback)
    server_attempts: AtomicU64,
    /// Fallback hops taken
    fallbacks: AtomicU64,
    /// Attempts rejected by the remote rate limiter
    rate_limited: AtomicU64,
    /// Attempts that ran out of time
    timeouts: AtomicU64,
}

/// Point-in-time copy of [`OperationStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub total: u64,
    pub succeeded: u64,
    pub failed: u64,
    pub local_attempts: u64,
    pub server_attempts: u64,
    pub fallbacks: u64,
    pub rate_limited: u64,
    pub timeouts: u64,
}

impl OperationStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_started(&self) {
        self.total.fetch_add(1, Ordering::SeqCst);
    }

    pub fn record_attempt(&self, venue: Venue) {
        match venue {
            Venue::Local => self.local_attempts.fetch_add(1, Ordering::SeqCst),
            Venue::Server => self.server_attempts.fetch_add(1, Ordering::SeqCst),
        };
    }

    pub fn record_attempt_error(&self, error: &ProofError) {
        if error.is_rate_limited() {
            self.rate_limited.fetch_add(1, Ordering::SeqCst);
        }
        if error.is_timeout() {
            self.timeouts.fetch_add(1, Ordering::SeqCst);
        }
    }

    pub fn record_fallback(&self) {
        self.fallbacks.fetch_add(1, Ordering::SeqCst);
    }

    pub fn record_outcome(&self, success: bool) {
        if success {
            self.succeeded.fetch_add(1, Ordering::SeqCst);
        } else {
            self.failed.fetch_add(1, Ordering::SeqCst);
        }
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            total: self.total.load(Ordering::SeqCst),
            succeeded: self.succeeded.load(Ordering::SeqCst),
            failed: self.failed.load(Ordering::SeqCst),
            local_attempts: self.local_attempts.load(Ordering::SeqCst),
            server_attempts: self.server_attempts.load(Ordering::SeqCst),
            fallbacks: self.fallbacks.load(Ordering::SeqCst),
            rate_limited: self.rate_limited.load(Ordering::SeqCst),
            timeouts: self.timeouts.load(Ordering::SeqCst),
        }
    }

    /// Zero every counter.
    pub fn reset(&self) {
        for counter in [
            &self.total,
            &self.succeeded,
            &self.failed,
            &self.local_attempts,
            &self.server_attempts,
            &self.fallbacks,
            &self.rate_limited,
            &self.timeouts,
        ] {
            counter.store(0, Ordering::SeqCst);
        }
    }
}
