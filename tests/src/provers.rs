use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use proofplane_kernel::error::{ProofError, ProofResult, RateLimitWindow};
use proofplane_kernel::operation::Venue;
use proofplane_kernel::prover::{
    LocalProver, ProofOutput, RemoteProofResponse, RemoteProver, RemoteStatus,
    RemoteVerifyResponse, VerifyRequest,
};
use serde_json::{Value, json};
use tokio::sync::RwLock;

/// How a mock venue answers the next call.
#[derive(Debug, Clone, PartialEq)]
pub enum Stub {
    Succeed,
    /// Fail with this message, verbatim
    Fail(String),
    /// Fail with this exact error
    Error(ProofError),
    /// Sleep, then succeed
    Delay(Duration),
    /// Reject as throttled (remote only)
    RateLimited {
        message: String,
        retry_after_secs: Option<u64>,
    },
}

impl Stub {
    pub fn fail(message: &str) -> Self {
        Self::Fail(message.to_string())
    }

    async fn resolve(&self, venue: Venue) -> ProofResult<()> {
        match self {
            Self::Succeed => Ok(()),
            Self::Fail(message) => Err(ProofError::deployment(venue, message.clone())),
            Self::Error(error) => Err(error.clone()),
            Self::Delay(duration) => {
                tokio::time::sleep(*duration).await;
                Ok(())
            }
            Self::RateLimited {
                message,
                retry_after_secs,
            } => Err(ProofError::RateLimit {
                message: message.clone(),
                retry_after_secs: *retry_after_secs,
                limits: Some(RateLimitWindow {
                    max_requests: Some(10),
                    window_ms: Some(60_000),
                    remaining: Some(0),
                }),
            }),
        }
    }
}

/// Counts a call as running until dropped.
struct InFlight(Arc<AtomicUsize>);

impl InFlight {
    fn enter(running: &Arc<AtomicUsize>, peak: &AtomicUsize) -> Self {
        let now = running.fetch_add(1, Ordering::SeqCst) + 1;
        peak.fetch_max(now, Ordering::SeqCst);
        Self(running.clone())
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// A local prover with a stubbed outcome and a call history.
#[derive(Clone)]
pub struct MockLocalProver {
    pub stub: Arc<RwLock<Stub>>,
    /// Circuit inputs (prove) or proofs (verify) passed in, in call order
    pub call_history: Arc<RwLock<Vec<Value>>>,
    pub verified: bool,
    running: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
}

impl Default for MockLocalProver {
    fn default() -> Self {
        Self::new()
    }
}

impl MockLocalProver {
    pub fn new() -> Self {
        Self::with_stub(Stub::Succeed)
    }

    pub fn with_stub(stub: Stub) -> Self {
        Self {
            stub: Arc::new(RwLock::new(stub)),
            call_history: Arc::new(RwLock::new(Vec::new())),
            verified: true,
            running: Arc::new(AtomicUsize::new(0)),
            peak: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self::with_stub(Stub::fail(message))
    }

    pub async fn set_stub(&self, stub: Stub) {
        *self.stub.write().await = stub;
    }

    pub async fn history(&self) -> Vec<Value> {
        self.call_history.read().await.clone()
    }

    pub async fn call_count(&self) -> usize {
        self.call_history.read().await.len()
    }

    /// Most calls ever running at the same time.
    pub fn peak_concurrency(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub fn label(&self) -> &'static str {
        "local prover"
    }
}

#[async_trait]
impl LocalProver for MockLocalProver {
    async fn prove(&self, circuit_inputs: &Value) -> ProofResult<ProofOutput> {
        let _running = InFlight::enter(&self.running, &self.peak);
        self.call_history.write().await.push(circuit_inputs.clone());
        let stub = self.stub.read().await.clone();
        stub.resolve(Venue::Local).await?;
        Ok(ProofOutput {
            proof: json!({"pi_a": ["1", "2"], "protocol": "groth16", "origin": "local"}),
            public_signals: vec!["1".to_string()],
        })
    }

    async fn verify(
        &self,
        _verification_key: &Value,
        _public_signals: &[String],
        proof: &Value,
    ) -> ProofResult<bool> {
        let _running = InFlight::enter(&self.running, &self.peak);
        self.call_history.write().await.push(proof.clone());
        let stub = self.stub.read().await.clone();
        stub.resolve(Venue::Local).await?;
        Ok(self.verified)
    }
}

/// A remote proof service with a stubbed outcome and a call history.
#[derive(Clone)]
pub struct MockRemoteProver {
    pub stub: Arc<RwLock<Stub>>,
    pub call_history: Arc<RwLock<Vec<Value>>>,
    pub status_calls: Arc<RwLock<usize>>,
    /// Reported by `status`
    pub available: bool,
}

impl Default for MockRemoteProver {
    fn default() -> Self {
        Self::new()
    }
}

impl MockRemoteProver {
    pub fn new() -> Self {
        Self::with_stub(Stub::Succeed)
    }

    pub fn with_stub(stub: Stub) -> Self {
        Self {
            stub: Arc::new(RwLock::new(stub)),
            call_history: Arc::new(RwLock::new(Vec::new())),
            status_calls: Arc::new(RwLock::new(0)),
            available: true,
        }
    }

    pub fn failing(message: &str) -> Self {
        Self::with_stub(Stub::fail(message))
    }

    pub fn rate_limited(message: &str, retry_after_secs: u64) -> Self {
        Self::with_stub(Stub::RateLimited {
            message: message.to_string(),
            retry_after_secs: Some(retry_after_secs),
        })
    }

    pub async fn set_stub(&self, stub: Stub) {
        *self.stub.write().await = stub;
    }

    pub async fn history(&self) -> Vec<Value> {
        self.call_history.read().await.clone()
    }

    /// `fullProve` and `verify` calls; status checks are counted apart.
    pub async fn call_count(&self) -> usize {
        self.call_history.read().await.len()
    }

    pub fn label(&self) -> &'static str {
        "remote prover"
    }
}

#[async_trait]
impl RemoteProver for MockRemoteProver {
    async fn status(&self) -> ProofResult<RemoteStatus> {
        *self.status_calls.write().await += 1;
        let stub = self.stub.read().await.clone();
        if let Stub::Delay(duration) = stub {
            tokio::time::sleep(duration).await;
        }
        Ok(RemoteStatus {
            available: self.available,
            version: "mock-1.0".to_string(),
            features: vec!["groth16".to_string()],
        })
    }

    async fn full_prove(&self, inputs: &Value) -> ProofResult<RemoteProofResponse> {
        self.call_history.write().await.push(inputs.clone());
        let stub = self.stub.read().await.clone();
        stub.resolve(Venue::Server).await?;
        let count = self.call_history.read().await.len();
        Ok(RemoteProofResponse {
            proof: json!({"pi_a": ["3", "4"], "protocol": "groth16", "origin": "server"}),
            public_signals: vec!["1".to_string()],
            execution_time_ms: 12,
            operation_id: format!("remote-{count}"),
        })
    }

    async fn verify(&self, request: &VerifyRequest) -> ProofResult<RemoteVerifyResponse> {
        self.call_history.write().await.push(request.proof.clone());
        let stub = self.stub.read().await.clone();
        stub.resolve(Venue::Server).await?;
        Ok(RemoteVerifyResponse {
            verified: true,
            execution_time_ms: 4,
            operation_id: "remote-verify".to_string(),
        })
    }
}
