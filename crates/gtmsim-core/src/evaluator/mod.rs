//! Role-played agent evaluation.
//!
//! An [`AgentEvaluator`] turns one role context into one [`AgentDecision`]:
//! build the role prompt, call the oracle with bounded retries, parse the
//! reply strictly. Every failure mode ends in an invalid decision with a
//! recorded reason — a single agent can never abort a cycle.

pub mod parse;
pub mod prompts;

use std::sync::Arc;

use tracing::{debug, warn};

use crate::domain::config::{ChannelConfig, CompetitorConfig, PersonaConfig, SimConfig};
use crate::domain::decision::{AgentDecision, AgentRole, DecisionPayload};
use crate::oracle::{invoke_with_retry, Oracle, OracleRequest};

/// The subject an evaluator call represents, with its role-specific
/// configuration. One evaluation strategy per role, selected by variant.
#[derive(Debug, Clone)]
pub enum RoleContext {
    Buyer(PersonaConfig),
    Competitor(CompetitorConfig),
    Channel(ChannelConfig),
}

impl RoleContext {
    pub fn role(&self) -> AgentRole {
        match self {
            RoleContext::Buyer(_) => AgentRole::Buyer,
            RoleContext::Competitor(_) => AgentRole::Competitor,
            RoleContext::Channel(_) => AgentRole::Channel,
        }
    }

    /// Persona/competitor/channel name this context represents.
    pub fn subject(&self) -> &str {
        match self {
            RoleContext::Buyer(p) => &p.name,
            RoleContext::Competitor(c) => &c.name,
            RoleContext::Channel(c) => &c.name,
        }
    }
}

/// Evaluates one role context per call against the oracle.
pub struct AgentEvaluator {
    oracle: Arc<dyn Oracle>,
    config: Arc<SimConfig>,
}

impl AgentEvaluator {
    pub fn new(oracle: Arc<dyn Oracle>, config: Arc<SimConfig>) -> Self {
        Self { oracle, config }
    }

    /// Evaluate one agent for one cycle.
    ///
    /// Structural validity is the only guarantee: the payload numbers are
    /// oracle-driven and vary run to run.
    pub async fn evaluate(&self, context: &RoleContext, cycle: u32) -> AgentDecision {
        let role = context.role();
        let subject = context.subject().to_string();
        let (system, prompt) = self.build_prompt(context, cycle);
        let request = OracleRequest::new(system, prompt);

        debug!(%role, subject = %subject, cycle, "evaluating agent");

        let retries = self.config.simulation.oracle_retries;
        match invoke_with_retry(self.oracle.as_ref(), &request, retries).await {
            Ok(response) => match self.parse_payload(context, &response.text) {
                Ok(payload) => AgentDecision::valid(role, subject, payload, response.text),
                Err(reason) => {
                    warn!(%role, subject = %subject, cycle, %reason, "reply failed validation");
                    AgentDecision::invalid(role, subject, reason, Some(response.text))
                }
            },
            Err(err) => {
                warn!(%role, subject = %subject, cycle, error = %err, "oracle call failed");
                AgentDecision::invalid(role, subject, err.to_string(), None)
            }
        }
    }

    fn build_prompt(&self, context: &RoleContext, cycle: u32) -> (String, String) {
        match context {
            RoleContext::Buyer(persona) => prompts::buyer(&self.config, persona, cycle),
            RoleContext::Competitor(profile) => prompts::competitor(&self.config, profile, cycle),
            RoleContext::Channel(profile) => prompts::channel(&self.config, profile, cycle),
        }
    }

    fn parse_payload(&self, context: &RoleContext, text: &str) -> Result<DecisionPayload, String> {
        match context {
            RoleContext::Buyer(_) => parse::parse_buyer(text),
            RoleContext::Competitor(_) => parse::parse_competitor(text),
            RoleContext::Channel(_) => parse::parse_channel(text),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::config::minimal_config;
    use crate::domain::error::OracleError;
    use crate::oracle::script::ScriptedOracle;

    fn evaluator(oracle: ScriptedOracle) -> AgentEvaluator {
        AgentEvaluator::new(Arc::new(oracle), Arc::new(minimal_config()))
    }

    #[tokio::test]
    async fn test_valid_buyer_reply_produces_valid_decision() {
        let oracle = ScriptedOracle::always(
            r#"{"decision": "BUY", "confidence": 0.9, "objections": []}"#,
        );
        let evaluator = evaluator(oracle);
        let config = minimal_config();
        let context = RoleContext::Buyer(config.personas[0].clone());

        let decision = evaluator.evaluate(&context, 0).await;
        assert!(decision.valid);
        assert_eq!(decision.role, AgentRole::Buyer);
        assert_eq!(decision.subject, "Founder");
        assert!(decision.raw_response.is_some());
    }

    #[tokio::test]
    async fn test_oracle_error_becomes_invalid_decision() {
        let oracle = ScriptedOracle::new(vec![Err(OracleError::MalformedResponse(
            "garbage".to_string(),
        ))]);
        let evaluator = evaluator(oracle);
        let config = minimal_config();
        let context = RoleContext::Channel(config.channels[0].clone());

        let decision = evaluator.evaluate(&context, 0).await;
        assert!(!decision.valid);
        assert!(decision
            .failure_reason
            .as_deref()
            .is_some_and(|r| r.contains("garbage")));
    }

    #[tokio::test]
    async fn test_out_of_schema_reply_becomes_invalid_with_provenance() {
        let raw = r#"{"decision": "BUY", "confidence": 7.0}"#;
        let oracle = ScriptedOracle::always(raw);
        let evaluator = evaluator(oracle);
        let config = minimal_config();
        let context = RoleContext::Buyer(config.personas[0].clone());

        let decision = evaluator.evaluate(&context, 0).await;
        assert!(!decision.valid);
        // Raw reply is kept for debugging even when validation fails.
        assert_eq!(decision.raw_response.as_deref(), Some(raw));
    }

    #[tokio::test]
    async fn test_transient_failure_retried_then_valid() {
        let oracle = ScriptedOracle::new(vec![
            Err(OracleError::RateLimited),
            Ok(r#"{"decision": "PASS", "confidence": 0.4}"#.to_string()),
        ]);
        let evaluator = evaluator(oracle);
        let config = minimal_config();
        let context = RoleContext::Buyer(config.personas[0].clone());

        let decision = evaluator.evaluate(&context, 1).await;
        assert!(decision.valid);
    }
}
