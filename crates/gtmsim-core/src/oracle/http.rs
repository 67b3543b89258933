//! HTTP oracle backends.
//!
//! One [`HttpOracle`] speaks to either an Anthropic-style messages API or
//! an OpenAI-style chat-completions API, selected by [`Provider`]. The
//! engine treats both uniformly through the [`Oracle`] trait.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::error::OracleError;
use crate::oracle::{Oracle, OracleRequest, OracleResponse};

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_API_VERSION: &str = "2023-06-01";
const OPENAI_API_URL: &str = "https://api.openai.com/v1/chat/completions";

/// Supported inference providers.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Provider {
    Anthropic,
    Openai,
}

impl Provider {
    fn default_model(&self) -> &'static str {
        match self {
            Provider::Anthropic => "claude-sonnet-4-20250514",
            Provider::Openai => "gpt-4o",
        }
    }

    fn api_key_env(&self) -> &'static str {
        match self {
            Provider::Anthropic => "ANTHROPIC_API_KEY",
            Provider::Openai => "OPENAI_API_KEY",
        }
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Provider::Anthropic => f.write_str("anthropic"),
            Provider::Openai => f.write_str("openai"),
        }
    }
}

/// Connection configuration for an HTTP oracle.
#[derive(Debug, Clone)]
pub struct HttpOracleConfig {
    pub provider: Provider,
    /// Model identifier; provider default when `None`.
    pub model: Option<String>,
    /// API key; read from the provider's environment variable when `None`.
    pub api_key: Option<String>,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl HttpOracleConfig {
    pub fn new(provider: Provider) -> Self {
        Self {
            provider,
            model: None,
            api_key: None,
            timeout_secs: 30,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    /// Pick a provider based on which API key is present in the
    /// environment. `None` when neither is configured.
    pub fn from_env() -> Option<Self> {
        for provider in [Provider::Anthropic, Provider::Openai] {
            if std::env::var(provider.api_key_env()).is_ok_and(|k| !k.is_empty()) {
                return Some(Self::new(provider));
            }
        }
        None
    }
}

/// [`Oracle`] implementation over HTTPS.
#[derive(Debug)]
pub struct HttpOracle {
    config: HttpOracleConfig,
    api_key: String,
    client: reqwest::Client,
}

impl HttpOracle {
    pub fn new(config: HttpOracleConfig) -> Result<Self, OracleError> {
        let api_key = match &config.api_key {
            Some(key) => key.clone(),
            None => std::env::var(config.provider.api_key_env()).map_err(|_| {
                OracleError::MissingCredentials {
                    provider: config.provider.to_string(),
                }
            })?,
        };
        if api_key.is_empty() {
            return Err(OracleError::MissingCredentials {
                provider: config.provider.to_string(),
            });
        }

        let client = reqwest::Client::builder()
            .user_agent(concat!("gtmsim/", env!("CARGO_PKG_VERSION")))
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| OracleError::Transport(e.to_string()))?;

        Ok(Self {
            config,
            api_key,
            client,
        })
    }

    fn model(&self) -> &str {
        self.config
            .model
            .as_deref()
            .unwrap_or_else(|| self.config.provider.default_model())
    }

    async fn invoke_anthropic(
        &self,
        request: &OracleRequest,
    ) -> Result<OracleResponse, OracleError> {
        #[derive(Serialize)]
        struct Message<'a> {
            role: &'a str,
            content: &'a str,
        }
        #[derive(Serialize)]
        struct Body<'a> {
            model: &'a str,
            max_tokens: u32,
            temperature: f64,
            system: &'a str,
            messages: Vec<Message<'a>>,
        }
        #[derive(Deserialize)]
        struct ContentBlock {
            text: Option<String>,
        }
        #[derive(Deserialize)]
        struct Reply {
            content: Vec<ContentBlock>,
            model: Option<String>,
        }

        let body = Body {
            model: self.model(),
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            system: &request.system,
            messages: vec![Message {
                role: "user",
                content: &request.prompt,
            }],
        };

        let response = self
            .client
            .post(ANTHROPIC_API_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_API_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(map_send_error(self.config.timeout_secs))?;

        let reply: Reply = check_status(response).await?;
        let text = reply
            .content
            .into_iter()
            .filter_map(|block| block.text)
            .collect::<Vec<_>>()
            .join("");
        if text.is_empty() {
            return Err(OracleError::MalformedResponse(
                "empty content blocks".to_string(),
            ));
        }
        Ok(OracleResponse {
            text,
            model: reply.model,
        })
    }

    async fn invoke_openai(&self, request: &OracleRequest) -> Result<OracleResponse, OracleError> {
        #[derive(Serialize)]
        struct Message<'a> {
            role: &'a str,
            content: &'a str,
        }
        #[derive(Serialize)]
        struct Body<'a> {
            model: &'a str,
            max_tokens: u32,
            temperature: f64,
            messages: Vec<Message<'a>>,
        }
        #[derive(Deserialize)]
        struct ChoiceMessage {
            content: Option<String>,
        }
        #[derive(Deserialize)]
        struct Choice {
            message: ChoiceMessage,
        }
        #[derive(Deserialize)]
        struct Reply {
            choices: Vec<Choice>,
            model: Option<String>,
        }

        let body = Body {
            model: self.model(),
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            messages: vec![
                Message {
                    role: "system",
                    content: &request.system,
                },
                Message {
                    role: "user",
                    content: &request.prompt,
                },
            ],
        };

        let response = self
            .client
            .post(OPENAI_API_URL)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(map_send_error(self.config.timeout_secs))?;

        let reply: Reply = check_status(response).await?;
        let text = reply
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| OracleError::MalformedResponse("no choices in reply".to_string()))?;
        Ok(OracleResponse {
            text,
            model: reply.model,
        })
    }
}

/// Map a reqwest send error into the transport taxonomy.
fn map_send_error(timeout_secs: u64) -> impl Fn(reqwest::Error) -> OracleError {
    move |e| {
        if e.is_timeout() {
            OracleError::Timeout { timeout_secs }
        } else {
            OracleError::Transport(e.to_string())
        }
    }
}

/// Map non-success statuses into the taxonomy, then deserialize the body.
async fn check_status<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, OracleError> {
    let status = response.status();
    if status.as_u16() == 429 {
        return Err(OracleError::RateLimited);
    }
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(OracleError::HttpStatus {
            status: status.as_u16(),
            body: truncate(&body, 200),
        });
    }
    response
        .json::<T>()
        .await
        .map_err(|e| OracleError::MalformedResponse(e.to_string()))
}

fn truncate(s: &str, max: usize) -> String {
    if s.len() <= max {
        s.to_string()
    } else {
        let mut end = max;
        while !s.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}…", &s[..end])
    }
}

#[async_trait]
impl Oracle for HttpOracle {
    async fn invoke(&self, request: &OracleRequest) -> Result<OracleResponse, OracleError> {
        debug!(provider = %self.config.provider, model = self.model(), "oracle call");
        match self.config.provider {
            Provider::Anthropic => self.invoke_anthropic(request).await,
            Provider::Openai => self.invoke_openai(request).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_key_is_credentials_error() {
        let config = HttpOracleConfig {
            provider: Provider::Anthropic,
            model: None,
            api_key: Some(String::new()),
            timeout_secs: 30,
        };
        let err = HttpOracle::new(config).expect_err("empty key must fail");
        assert!(matches!(err, OracleError::MissingCredentials { .. }));
    }

    #[test]
    fn test_explicit_key_accepted() {
        let config = HttpOracleConfig::new(Provider::Openai).with_model("gpt-4o-mini");
        let config = HttpOracleConfig {
            api_key: Some("test-key".to_string()),
            ..config
        };
        let oracle = HttpOracle::new(config).expect("key provided");
        assert_eq!(oracle.model(), "gpt-4o-mini");
    }

    #[test]
    fn test_default_models() {
        assert_eq!(Provider::Anthropic.default_model(), "claude-sonnet-4-20250514");
        assert_eq!(Provider::Openai.default_model(), "gpt-4o");
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        let s = "héllo wörld";
        let t = truncate(s, 3);
        assert!(t.starts_with("h"));
        assert!(t.ends_with('…'));
        assert_eq!(truncate("short", 200), "short");
    }
}
