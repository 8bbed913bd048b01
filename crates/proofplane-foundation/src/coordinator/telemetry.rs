use std::sync::Arc;

use proofplane_kernel::operation::Venue;
use proofplane_kernel::telemetry::Telemetry;

use crate::tasks::{BackgroundTasks, JoinReport};

/// Sends telemetry on tracked background tasks so the coordinator never
/// waits on the sink.
#[derive(Clone)]
pub struct TelemetryDispatcher {
    sink: Arc<dyn Telemetry>,
    tasks: Arc<BackgroundTasks>,
}

impl TelemetryDispatcher {
    pub fn new(sink: Arc<dyn Telemetry>, tasks: Arc<BackgroundTasks>) -> Self {
        Self { sink, tasks }
    }

    pub fn record_operation(&self, name: &str, duration_ms: u64, venue: Venue) {
        let sink = self.sink.clone();
        let name = name.to_string();
        self.tasks.spawn("telemetry.record_operation", async move {
            sink.record_operation(&name, duration_ms, venue).await;
        });
    }

    pub fn record_error(&self, context: &str, message: &str) {
        let sink = self.sink.clone();
        let context = context.to_string();
        let message = message.to_string();
        self.tasks.spawn("telemetry.record_error", async move {
            sink.record_error(&context, &message).await;
        });
    }

    /// Wait for every telemetry call dispatched so far.
    pub async fn flush(&self) -> JoinReport {
        self.tasks.join_all().await
    }
}
