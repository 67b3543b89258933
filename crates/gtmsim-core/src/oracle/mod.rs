//! The oracle boundary.
//!
//! Everything non-deterministic in the engine funnels through the
//! [`Oracle`] trait: one structured prompt/response exchange per call.
//! Production backends live in [`http`]; tests inject the deterministic
//! [`script::ScriptedOracle`] behind the same trait.

pub mod http;
pub mod script;

use std::time::Duration;

use async_trait::async_trait;
use tracing::warn;

use crate::domain::error::OracleError;

/// One prompt/response exchange with the inference backend.
#[derive(Debug, Clone, PartialEq)]
pub struct OracleRequest {
    /// System/persona prompt framing the role.
    pub system: String,
    /// Decision prompt for this cycle.
    pub prompt: String,
    /// Sampling temperature.
    pub temperature: f64,
    /// Response token cap.
    pub max_tokens: u32,
}

impl OracleRequest {
    pub fn new(system: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            prompt: prompt.into(),
            temperature: 0.7,
            max_tokens: 1024,
        }
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }
}

/// Raw oracle reply. Parsing into typed payloads happens in the evaluator,
/// never here — the client is agnostic to what the text means.
#[derive(Debug, Clone, PartialEq)]
pub struct OracleResponse {
    pub text: String,
    /// Model identifier the backend reported, when available.
    pub model: Option<String>,
}

/// Capability interface to the external inference service.
///
/// Implementations hold provider credentials/configuration for their
/// lifetime but are otherwise stateless across invocations. Test doubles
/// implement this trait deterministically, so aggregation is fully
/// reproducible without a real backend.
#[async_trait]
pub trait Oracle: Send + Sync {
    /// Issue a single exchange. Must apply its own bounded timeout.
    async fn invoke(&self, request: &OracleRequest) -> Result<OracleResponse, OracleError>;
}

/// Base delay for the doubling retry backoff.
const RETRY_BASE_DELAY_MS: u64 = 250;

/// Invoke with bounded retries on transient failures.
///
/// Content-class failures (a reply that arrived but is unusable) return
/// immediately: retrying them burns quota for the same answer. Total
/// attempts = 1 + `retries`.
pub async fn invoke_with_retry(
    oracle: &dyn Oracle,
    request: &OracleRequest,
    retries: u32,
) -> Result<OracleResponse, OracleError> {
    let mut attempt = 0;
    loop {
        match oracle.invoke(request).await {
            Ok(response) => return Ok(response),
            Err(err) if err.is_transient() && attempt < retries => {
                let delay = Duration::from_millis(RETRY_BASE_DELAY_MS << attempt);
                warn!(
                    attempt = attempt + 1,
                    retries, error = %err, "transient oracle failure, backing off"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(err) if err.is_transient() => {
                return Err(OracleError::RetriesExhausted {
                    attempts: attempt + 1,
                    last: err.to_string(),
                });
            }
            Err(err) => return Err(err),
        }
    }
}
