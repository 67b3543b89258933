//! Deterministic oracle double for tests and offline runs.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::domain::error::OracleError;
use crate::oracle::{Oracle, OracleRequest, OracleResponse};

/// An [`Oracle`] that replays a scripted sequence of replies.
///
/// Each invocation pops the next scripted outcome; when the script runs
/// dry the fallback reply is repeated forever.
pub struct ScriptedOracle {
    script: Mutex<VecDeque<Result<String, OracleError>>>,
    fallback: String,
    invocations: AtomicUsize,
}

impl ScriptedOracle {
    pub fn new(script: Vec<Result<String, OracleError>>) -> Self {
        Self {
            script: Mutex::new(script.into_iter().collect()),
            fallback: default_reply(),
            invocations: AtomicUsize::new(0),
        }
    }

    /// An oracle that answers every call with the same reply.
    pub fn always(reply: impl Into<String>) -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            fallback: reply.into(),
            invocations: AtomicUsize::new(0),
        }
    }

    /// Override the reply used once the script is exhausted.
    pub fn with_fallback(mut self, reply: impl Into<String>) -> Self {
        self.fallback = reply.into();
        self
    }

    /// Number of invocations seen so far.
    pub fn invocations(&self) -> usize {
        self.invocations.load(Ordering::SeqCst)
    }
}

/// Neutral buyer-shaped reply used when nothing better is scripted.
fn default_reply() -> String {
    r#"{"decision": "PASS", "confidence": 0.5, "objections": []}"#.to_string()
}

#[async_trait]
impl Oracle for ScriptedOracle {
    async fn invoke(&self, _request: &OracleRequest) -> Result<OracleResponse, OracleError> {
        self.invocations.fetch_add(1, Ordering::SeqCst);
        let next = self
            .script
            .lock()
            .expect("script mutex poisoned")
            .pop_front();
        match next {
            Some(Ok(text)) => Ok(OracleResponse {
                text,
                model: Some("scripted".to_string()),
            }),
            Some(Err(err)) => Err(err),
            None => Ok(OracleResponse {
                text: self.fallback.clone(),
                model: Some("scripted".to_string()),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_script_replays_in_order_then_falls_back() {
        let oracle = ScriptedOracle::new(vec![Ok("first".to_string()), Ok("second".to_string())])
            .with_fallback("rest");
        let request = OracleRequest::new("s", "p");

        assert_eq!(oracle.invoke(&request).await.unwrap().text, "first");
        assert_eq!(oracle.invoke(&request).await.unwrap().text, "second");
        assert_eq!(oracle.invoke(&request).await.unwrap().text, "rest");
        assert_eq!(oracle.invoke(&request).await.unwrap().text, "rest");
        assert_eq!(oracle.invocations(), 4);
    }

    #[tokio::test]
    async fn test_scripted_error_surfaces() {
        let oracle = ScriptedOracle::new(vec![Err(OracleError::RateLimited)]);
        let request = OracleRequest::new("s", "p");
        assert!(matches!(
            oracle.invoke(&request).await,
            Err(OracleError::RateLimited)
        ));
    }
}
