//! Prover collaborators.
//!
//! The proof system itself is opaque here. [`LocalProver`] is whatever the
//! platform adapter registers under `"prover"`; [`RemoteProver`] speaks to the
//! remote proof service (`/status`, `/fullProve`, `/verify`).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ProofResult;

/// A proof and its public signals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProofOutput {
    pub proof: serde_json::Value,
    pub public_signals: Vec<String>,
}

/// Input of a verification operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyRequest {
    pub verification_key: serde_json::Value,
    pub public_signals: Vec<String>,
    pub proof: serde_json::Value,
}

/// `GET {endpoint}/status`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteStatus {
    pub available: bool,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub features: Vec<String>,
}

/// Successful `POST {endpoint}/fullProve`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteProofResponse {
    pub proof: serde_json::Value,
    pub public_signals: Vec<String>,
    #[serde(default)]
    pub execution_time_ms: u64,
    #[serde(default)]
    pub operation_id: String,
}

impl RemoteProofResponse {
    pub fn into_output(self) -> ProofOutput {
        ProofOutput {
            proof: self.proof,
            public_signals: self.public_signals,
        }
    }
}

/// Successful `POST {endpoint}/verify`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteVerifyResponse {
    pub verified: bool,
    #[serde(default)]
    pub execution_time_ms: u64,
    #[serde(default)]
    pub operation_id: String,
}

/// The prover running on this host.
#[async_trait]
pub trait LocalProver: Send + Sync {
    /// Generate a proof from circuit inputs.
    async fn prove(&self, circuit_inputs: &serde_json::Value) -> ProofResult<ProofOutput>;

    /// Check a proof.
    async fn verify(
        &self,
        verification_key: &serde_json::Value,
        public_signals: &[String],
        proof: &serde_json::Value,
    ) -> ProofResult<bool>;
}

/// Client for the remote proof service.
#[async_trait]
pub trait RemoteProver: Send + Sync {
    async fn status(&self) -> ProofResult<RemoteStatus>;

    async fn full_prove(&self, inputs: &serde_json::Value) -> ProofResult<RemoteProofResponse>;

    async fn verify(&self, request: &VerifyRequest) -> ProofResult<RemoteVerifyResponse>;
}
