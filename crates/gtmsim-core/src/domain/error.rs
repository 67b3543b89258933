//! Domain-level error taxonomy for the simulation engine.

/// Errors produced at the oracle boundary.
///
/// Transport-class failures are retried with backoff; content-class failures
/// (a reply that arrived but could not be used) never are.
#[derive(Debug, thiserror::Error)]
pub enum OracleError {
    #[error("transport failure: {0}")]
    Transport(String),

    #[error("request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    #[error("rate limited by provider")]
    RateLimited,

    #[error("provider returned HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },

    #[error("malformed provider response: {0}")]
    MalformedResponse(String),

    #[error("no API key configured for provider {provider}")]
    MissingCredentials { provider: String },

    #[error("retries exhausted after {attempts} attempts: {last}")]
    RetriesExhausted { attempts: u32, last: String },
}

impl OracleError {
    /// Whether a retry with backoff is worth attempting.
    ///
    /// Only transport-class failures qualify. A response that parsed but
    /// failed validation is a content problem and retrying would just burn
    /// quota on the same answer.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            OracleError::Transport(_) | OracleError::Timeout { .. } | OracleError::RateLimited
        )
    }
}

/// Simulation-level errors.
///
/// Only fatal conditions live here; per-agent failures degrade into invalid
/// decisions instead of surfacing as errors.
#[derive(Debug, thiserror::Error)]
pub enum SimError {
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("run aborted: {0}")]
    Aborted(String),

    #[error("result not found: {0}")]
    ResultNotFound(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for simulation engine operations.
pub type Result<T> = std::result::Result<T, SimError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(OracleError::Transport("connection reset".to_string()).is_transient());
        assert!(OracleError::Timeout { timeout_secs: 30 }.is_transient());
        assert!(OracleError::RateLimited.is_transient());

        assert!(!OracleError::MalformedResponse("not json".to_string()).is_transient());
        assert!(!OracleError::HttpStatus {
            status: 401,
            body: "unauthorized".to_string()
        }
        .is_transient());
        assert!(!OracleError::MissingCredentials {
            provider: "anthropic".to_string()
        }
        .is_transient());
    }

    #[test]
    fn test_sim_error_display() {
        let err = SimError::InvalidConfig("cycles must be at least 1".to_string());
        assert!(err.to_string().contains("invalid config"));

        let err = SimError::Aborted("cancelled by caller".to_string());
        assert!(err.to_string().contains("run aborted"));
    }
}
