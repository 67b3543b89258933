//! Agent decision records.
//!
//! One [`AgentDecision`] is produced per evaluator call per cycle. The
//! payload is a tagged variant per role rather than a trait hierarchy — one
//! evaluation strategy per role, selected by configuration.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The role an agent plays in the simulation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AgentRole {
    Buyer,
    Competitor,
    Channel,
    Advisor,
}

impl std::fmt::Display for AgentRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            AgentRole::Buyer => "buyer",
            AgentRole::Competitor => "competitor",
            AgentRole::Channel => "channel",
            AgentRole::Advisor => "advisor",
        };
        f.write_str(s)
    }
}

/// A buyer's verdict on the pitch.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum BuyerVerdict {
    Buy,
    Pass,
    Object,
}

/// A competitor's predicted reaction to the market entry.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum CompetitorReaction {
    Ignore,
    Monitor,
    Counter,
    Aggressive,
}

/// Buyer willingness-to-pay range in dollars per month.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct WillingnessToPay {
    pub min: f64,
    pub max: f64,
    pub ideal: f64,
}

/// Role-specific decision payload.
///
/// Numeric fields are validated against believable ranges at parse time;
/// a payload is only ever constructed from a reply that passed those checks.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum DecisionPayload {
    Buyer {
        verdict: BuyerVerdict,
        /// Free-form objections raised, empty unless the buyer objected
        /// or volunteered concerns.
        objections: Vec<String>,
        /// 0.0–1.0 self-reported confidence in the verdict.
        confidence: f64,
        willingness_to_pay: Option<WillingnessToPay>,
        /// 1–10 perceived value score.
        perceived_value: Option<u8>,
    },
    Competitor {
        reaction: CompetitorReaction,
        /// 1–10 threat the entrant poses to this competitor's position.
        threat_level: u8,
        confidence: f64,
        /// Predicted counter-moves, most likely first.
        counter_moves: Vec<String>,
    },
    Channel {
        /// Estimated customer acquisition cost in dollars. Always > 0.
        cac: f64,
        /// Estimated monthly reach in potential customers.
        reach: u64,
        /// Channel-level conversion rate in [0, 1].
        conversion_rate: f64,
        /// Return-on-spend multiplier, ≥ 0.
        roi: f64,
        confidence: f64,
    },
}

impl DecisionPayload {
    pub fn role(&self) -> AgentRole {
        match self {
            DecisionPayload::Buyer { .. } => AgentRole::Buyer,
            DecisionPayload::Competitor { .. } => AgentRole::Competitor,
            DecisionPayload::Channel { .. } => AgentRole::Channel,
        }
    }
}

/// Result of one evaluator call for one cycle.
///
/// Immutable after creation. Owned by the cycle runner that produced it
/// until handed to the aggregator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentDecision {
    /// Unique id for this evaluator call.
    pub call_id: Uuid,

    /// Role that produced the decision.
    pub role: AgentRole,

    /// Persona, competitor, or channel name the evaluator represents.
    pub subject: String,

    /// Typed payload; `None` when the decision is invalid.
    pub payload: Option<DecisionPayload>,

    /// Raw oracle reply kept for debugging. Never parsed downstream.
    pub raw_response: Option<String>,

    /// Whether the payload passed parsing and range validation.
    pub valid: bool,

    /// Why the decision is invalid (oracle error or validation detail).
    pub failure_reason: Option<String>,

    /// When the evaluator call completed.
    pub completed_at: DateTime<Utc>,
}

impl AgentDecision {
    /// A decision that parsed and validated.
    pub fn valid(
        role: AgentRole,
        subject: impl Into<String>,
        payload: DecisionPayload,
        raw_response: String,
    ) -> Self {
        Self {
            call_id: Uuid::new_v4(),
            role,
            subject: subject.into(),
            payload: Some(payload),
            raw_response: Some(raw_response),
            valid: true,
            failure_reason: None,
            completed_at: Utc::now(),
        }
    }

    /// A decision that failed — oracle error or a reply outside the schema.
    /// Recorded, never propagated: one agent's failure must not abort the
    /// cycle.
    pub fn invalid(
        role: AgentRole,
        subject: impl Into<String>,
        reason: impl Into<String>,
        raw_response: Option<String>,
    ) -> Self {
        Self {
            call_id: Uuid::new_v4(),
            role,
            subject: subject.into(),
            payload: None,
            raw_response,
            valid: false,
            failure_reason: Some(reason.into()),
            completed_at: Utc::now(),
        }
    }
}
