//! HTTP client for the remote proof service.
//!
//! [`HttpRemoteProver`] talks to `{endpoint}/status`, `{endpoint}/fullProve`
//! and `{endpoint}/verify`. Non-2xx responses carry a JSON body
//! `{error, message, retryAfter?, limits?}`; a 429 becomes
//! [`ProofError::RateLimit`], anything else a server-side deployment failure.

use async_trait::async_trait;
use proofplane_kernel::error::{ProofError, ProofResult, RateLimitWindow};
use proofplane_kernel::operation::Venue;
use proofplane_kernel::prover::{
    RemoteProofResponse, RemoteProver, RemoteStatus, RemoteVerifyResponse, VerifyRequest,
};
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument, warn};

/// Error body returned by the proof service.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct ErrorBody {
    error: Option<String>,
    message: Option<String>,
    retry_after: Option<u64>,
    limits: Option<RateLimitWindow>,
}

impl ErrorBody {
    fn describe(&self) -> Option<String> {
        self.message.clone().or_else(|| self.error.clone())
    }
}

pub struct HttpRemoteProver {
    endpoint: String,
    client: Client,
}

impl HttpRemoteProver {
    /// Client for `endpoint` (e.g. `http://localhost:3000/api/zk`).
    ///
    /// Deadlines are applied per attempt by the coordinator, not here.
    pub fn new(endpoint: impl Into<String>) -> ProofResult<Self> {
        let client = Client::builder()
            .build()
            .map_err(|e| ProofError::Configuration(format!("failed to build HTTP client: {e}")))?;
        Ok(Self::with_client(endpoint, client))
    }

    pub fn with_client(endpoint: impl Into<String>, client: Client) -> Self {
        Self {
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            client,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.endpoint, path)
    }

    async fn decode<T: DeserializeOwned>(&self, response: Response, action: &str) -> ProofResult<T> {
        let status = response.status();
        if status.is_success() {
            return response.json::<T>().await.map_err(|e| {
                ProofError::deployment(
                    Venue::Server,
                    format!("Server-side {action} returned an unreadable response: {e}"),
                )
            });
        }

        let header_retry_after = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok());
        let body: ErrorBody = response.json().await.unwrap_or_default();

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after_secs = body.retry_after.or(header_retry_after);
            warn!(%status, ?retry_after_secs, "Remote proof service rate limited the request");
            let detail = body.describe().unwrap_or_else(|| "too many requests".to_string());
            return Err(ProofError::RateLimit {
                message: format!("Rate limit exceeded: {detail}"),
                retry_after_secs,
                limits: body.limits,
            });
        }

        let detail = body
            .describe()
            .unwrap_or_else(|| status.canonical_reason().unwrap_or("unknown error").to_string());
        Err(ProofError::deployment(
            Venue::Server,
            format!("Server-side {action} failed ({}): {detail}", status.as_u16()),
        ))
    }

    fn network_error(action: &str, error: reqwest::Error) -> ProofError {
        ProofError::deployment(
            Venue::Server,
            format!("Server-side {action} failed: {error}"),
        )
    }
}

#[async_trait]
impl RemoteProver for HttpRemoteProver {
    #[instrument(skip(self), fields(endpoint = %self.endpoint))]
    async fn status(&self) -> ProofResult<RemoteStatus> {
        let response = self
            .client
            .get(self.url("status"))
            .send()
            .await
            .map_err(|e| Self::network_error("status check", e))?;
        self.decode(response, "status check").await
    }

    #[instrument(skip(self, inputs), fields(endpoint = %self.endpoint))]
    async fn full_prove(&self, inputs: &serde_json::Value) -> ProofResult<RemoteProofResponse> {
        debug!("Requesting server-side proof");
        let response = self
            .client
            .post(self.url("fullProve"))
            .json(inputs)
            .send()
            .await
            .map_err(|e| Self::network_error("proof generation", e))?;
        self.decode(response, "proof generation").await
    }

    #[instrument(skip(self, request), fields(endpoint = %self.endpoint))]
    async fn verify(&self, request: &VerifyRequest) -> ProofResult<RemoteVerifyResponse> {
        let response = self
            .client
            .post(self.url("verify"))
            .json(request)
            .send()
            .await
            .map_err(|e| Self::network_error("verification", e))?;
        self.decode(response, "verification").await
    }
}
