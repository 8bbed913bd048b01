//! Telemetry sink contract.
//!
//! Both methods are fire-and-forget from the coordinator's point of view:
//! the foundation crate dispatches them onto tracked background tasks, so an
//! implementation may take its time but must not panic.

use async_trait::async_trait;

use crate::operation::Venue;

#[async_trait]
pub trait Telemetry: Send + Sync {
    /// A terminal outcome (success or final failure).
    async fn record_operation(&self, name: &str, duration_ms: u64, venue: Venue);

    /// A failure, keyed by the operation name it happened in.
    async fn record_error(&self, context: &str, message: &str);
}

/// Drops everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopTelemetry;

#[async_trait]
impl Telemetry for NoopTelemetry {
    async fn record_operation(&self, _name: &str, _duration_ms: u64, _venue: Venue) {}

    async fn record_error(&self, _context: &str, _message: &str) {}
}
