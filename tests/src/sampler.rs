use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use proofplane_foundation::ResourceSampler;
use proofplane_kernel::error::{ProofError, ProofResult};
use proofplane_kernel::operation::Venue;
use proofplane_kernel::strategy::ResourceConstraints;

/// Plays back a fixed sequence of readings, then repeats the last one.
#[derive(Default)]
pub struct ScriptedSampler {
    script: Mutex<VecDeque<ProofResult<ResourceConstraints>>>,
    last: Mutex<ResourceConstraints>,
    samples: AtomicUsize,
}

impl ScriptedSampler {
    pub fn new<I>(readings: I) -> Self
    where
        I: IntoIterator<Item = ResourceConstraints>,
    {
        Self {
            script: Mutex::new(readings.into_iter().map(Ok).collect()),
            ..Default::default()
        }
    }

    /// The same reading forever.
    pub fn constant(reading: ResourceConstraints) -> Self {
        Self::new([reading])
    }

    /// Queue a sampling failure.
    pub fn push_failure(&self, message: &str) {
        self.script.lock().push_back(Err(ProofError::deployment(
            Venue::Local,
            message.to_string(),
        )));
    }

    pub fn sample_count(&self) -> usize {
        self.samples.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ResourceSampler for ScriptedSampler {
    async fn sample(&self) -> ProofResult<ResourceConstraints> {
        self.samples.fetch_add(1, Ordering::SeqCst);
        let next = self.script.lock().pop_front();
        match next {
            Some(Ok(reading)) => {
                *self.last.lock() = reading;
                Ok(reading)
            }
            Some(Err(e)) => Err(e),
            None => Ok(*self.last.lock()),
        }
    }
}
