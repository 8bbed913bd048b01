//! Progress stream shared by both venues.
//!
//! Each venue reports the same milestones (same count, same percentages),
//! so callers cannot tell from the stream where a proof ran. The reporter
//! keeps values non-decreasing across a fallback hop.

use proofplane_kernel::operation::{OperationKind, ProgressCallback, ProgressEvent, Venue};

/// Milestones emitted before the venue call returns.
pub const LEADING_STEPS: usize = 4;

const LOCAL_PROVE: [(u8, &str); 6] = [
    (0, "Preparing local proof generation"),
    (10, "Loading circuit artifacts"),
    (30, "Computing witness"),
    (60, "Generating proof"),
    (90, "Finalizing proof"),
    (100, "Proof generated locally"),
];

const REMOTE_PROVE: [(u8, &str); 6] = [
    (0, "Preparing server-side proof request"),
    (10, "Connecting to proof service"),
    (30, "Uploading circuit inputs"),
    (60, "Generating proof on server"),
    (90, "Processing server response"),
    (100, "Proof generated on server"),
];

const LOCAL_VERIFY: [(u8, &str); 6] = [
    (0, "Preparing local verification"),
    (10, "Loading verification key"),
    (30, "Checking public signals"),
    (60, "Verifying proof"),
    (90, "Finalizing verification"),
    (100, "Proof verified locally"),
];

const REMOTE_VERIFY: [(u8, &str); 6] = [
    (0, "Preparing server-side verification"),
    (10, "Connecting to proof service"),
    (30, "Uploading proof"),
    (60, "Verifying proof on server"),
    (90, "Processing server response"),
    (100, "Proof verified on server"),
];

pub fn milestones(venue: Venue, kind: OperationKind) -> &'static [(u8, &'static str)] {
    match (venue, kind) {
        (Venue::Local, OperationKind::Prove) => &LOCAL_PROVE,
        (Venue::Server, OperationKind::Prove) => &REMOTE_PROVE,
        (Venue::Local, OperationKind::Verify) => &LOCAL_VERIFY,
        (Venue::Server, OperationKind::Verify) => &REMOTE_VERIFY,
    }
}

/// Status line announcing a fallback hop to `target`.
pub fn fallback_status(target: Venue, kind: OperationKind) -> &'static str {
    match (target, kind) {
        (Venue::Server, OperationKind::Prove) => "Falling back to server-side proof generation",
        (Venue::Local, OperationKind::Prove) => "Falling back to client-side proof generation",
        (Venue::Server, OperationKind::Verify) => "Falling back to server-side verification",
        (Venue::Local, OperationKind::Verify) => "Falling back to client-side verification",
    }
}

/// Records events for one operation and forwards them to the caller.
pub struct ProgressReporter {
    callback: Option<ProgressCallback>,
    events: Vec<ProgressEvent>,
}

impl ProgressReporter {
    pub fn new(callback: Option<ProgressCallback>) -> Self {
        Self {
            callback,
            events: Vec::new(),
        }
    }

    /// Last reported value, `0` before anything was emitted.
    pub fn current(&self) -> u8 {
        self.events.last().map(|e| e.progress).unwrap_or(0)
    }

    /// Emit an event, raised to the current value if it would go backwards.
    pub fn emit(&mut self, progress: u8, status: impl Into<String>) {
        let event = ProgressEvent::new(progress.max(self.current()), status);
        if let Some(callback) = &self.callback {
            callback(&event);
        }
        self.events.push(event);
    }

    pub fn emit_steps(&mut self, steps: &[(u8, &str)]) {
        for (progress, status) in steps {
            self.emit(*progress, *status);
        }
    }

    pub fn into_events(self) -> Vec<ProgressEvent> {
        self.events
    }
}
