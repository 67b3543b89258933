//! Scenario configuration and tuning policies.
//!
//! A [`SimConfig`] is the immutable input to a simulation run. It is
//! deserialized from a TOML/JSON scenario file by the caller and must pass
//! [`SimConfig::validate`] before any cycle runs — everything after that
//! point degrades gracefully instead of failing.

use serde::{Deserialize, Serialize};

use crate::domain::error::{Result, SimError};

/// The product being taken to market.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProductConfig {
    /// Product name.
    pub name: String,

    /// Short description used in every role prompt.
    pub description: String,

    /// Product category (e.g. "devtools", "fintech").
    #[serde(default)]
    pub category: String,

    /// Lifecycle stage (e.g. "pre-launch", "beta").
    #[serde(default)]
    pub stage: String,

    /// One-line unique value proposition.
    #[serde(default)]
    pub unique_value_prop: String,

    /// Headline features, in pitch order.
    #[serde(default)]
    pub key_features: Vec<String>,
}

/// A single pricing tier.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PricingTier {
    pub name: String,
    /// Monthly price in dollars.
    pub price: f64,
    #[serde(default)]
    pub features: Vec<String>,
}

/// Pricing model presented to buyer and channel agents.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PricingConfig {
    /// Pricing model label (e.g. "subscription", "usage-based").
    pub model: String,
    pub tiers: Vec<PricingTier>,
}

impl PricingConfig {
    /// Mean monthly price across tiers, used as the reference price when
    /// deriving time-to-breakeven observations. Zero when no tiers exist.
    pub fn average_monthly_price(&self) -> f64 {
        if self.tiers.is_empty() {
            return 0.0;
        }
        self.tiers.iter().map(|t| t.price).sum::<f64>() / self.tiers.len() as f64
    }
}

/// An ideal-customer-profile persona role-played by a buyer agent.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PersonaConfig {
    pub name: String,
    pub role: String,
    #[serde(default)]
    pub company_size: String,
    #[serde(default)]
    pub pain_points: Vec<String>,
    #[serde(default)]
    pub goals: Vec<String>,
    #[serde(default)]
    pub budget_range: String,
    #[serde(default)]
    pub objection_tendencies: Vec<String>,
}

/// A market competitor role-played by a competitor agent.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CompetitorConfig {
    pub name: String,
    #[serde(default)]
    pub positioning: String,
    #[serde(default)]
    pub pricing: String,
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(default)]
    pub weaknesses: Vec<String>,
    #[serde(default)]
    pub market_share: String,
}

/// A distribution channel evaluated by a channel agent.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChannelConfig {
    /// Channel name (e.g. "organic-social", "paid-ads"). Must be unique.
    pub name: String,
    /// Priority 1–5 as stated by the operator; informational only.
    #[serde(default = "default_priority")]
    pub priority: u8,
    #[serde(default)]
    pub budget_allocation: f64,
    #[serde(default)]
    pub existing_presence: String,
    #[serde(default)]
    pub strategy_notes: String,
}

fn default_priority() -> u8 {
    1
}

/// Weights for the channel composite score.
///
/// The composite is `roi_weight * norm(roi) + cac_weight * norm(1/cac)`,
/// with both inputs normalized to [0, 1] across the channel set at
/// finalize time. Product policy, not statistics — override freely.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ChannelWeights {
    pub roi_weight: f64,
    pub cac_weight: f64,
}

impl Default for ChannelWeights {
    fn default() -> Self {
        Self {
            roi_weight: 0.6,
            cac_weight: 0.4,
        }
    }
}

/// Thresholds mapping sample size and spread to a confidence label.
///
/// These are product policy values, not derived from statistical theory.
/// They live here as named, overridable fields rather than constants buried
/// in the aggregation code.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ConfidencePolicy {
    /// Minimum valid samples for a `high` confidence label.
    pub high_min_samples: usize,

    /// Maximum interquartile-spread / median ratio for `high`.
    pub high_max_relative_spread: f64,

    /// Minimum valid samples for a `medium` confidence label.
    pub medium_min_samples: usize,

    /// Below this many samples the band falls back to min/mean/max
    /// and confidence is pinned to `low`.
    pub percentile_min_samples: usize,

    /// Low band percentile (nearest-rank).
    pub low_percentile: f64,

    /// High band percentile (nearest-rank).
    pub high_percentile: f64,
}

impl Default for ConfidencePolicy {
    fn default() -> Self {
        Self {
            high_min_samples: 20,
            high_max_relative_spread: 0.5,
            medium_min_samples: 10,
            percentile_min_samples: 5,
            low_percentile: 10.0,
            high_percentile: 90.0,
        }
    }
}

/// Run-shape settings: how many cycles, how wide the fan-out, and the
/// failure-tolerance knobs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SimulationSettings {
    /// Number of evaluation cycles. Must be at least 1.
    pub cycles: u32,

    /// Buyer evaluations per persona per cycle.
    #[serde(default = "default_buyers_per_persona")]
    pub buyers_per_persona: u32,

    /// Maximum concurrent oracle calls within a cycle.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Per-call oracle timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub oracle_timeout_secs: u64,

    /// Retry attempts for transport failures (total tries = 1 + retries).
    #[serde(default = "default_retries")]
    pub oracle_retries: u32,

    /// A cycle whose invalid-decision fraction exceeds this ratio is
    /// marked degraded. Valid decisions still contribute.
    #[serde(default = "default_degraded_ratio")]
    pub degraded_ratio: f64,

    /// When false, skip the advisor oracle call and go straight to the
    /// deterministic rule table. A numeric-only run then needs no network.
    #[serde(default = "default_narrative")]
    pub narrative: bool,

    #[serde(default)]
    pub channel_weights: ChannelWeights,

    #[serde(default)]
    pub confidence: ConfidencePolicy,
}

fn default_buyers_per_persona() -> u32 {
    1
}

fn default_concurrency() -> usize {
    8
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_retries() -> u32 {
    2
}

fn default_degraded_ratio() -> f64 {
    0.5
}

fn default_narrative() -> bool {
    true
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            cycles: 10,
            buyers_per_persona: default_buyers_per_persona(),
            concurrency: default_concurrency(),
            oracle_timeout_secs: default_timeout_secs(),
            oracle_retries: default_retries(),
            degraded_ratio: default_degraded_ratio(),
            narrative: default_narrative(),
            channel_weights: ChannelWeights::default(),
            confidence: ConfidencePolicy::default(),
        }
    }
}

/// Complete scenario configuration — immutable for the engine's lifetime.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SimConfig {
    pub product: ProductConfig,
    pub pricing: PricingConfig,
    pub personas: Vec<PersonaConfig>,
    #[serde(default)]
    pub competitors: Vec<CompetitorConfig>,
    pub channels: Vec<ChannelConfig>,
    #[serde(default)]
    pub simulation: SimulationSettings,
}

impl SimConfig {
    /// Reject fatal misconfiguration before any cycle runs.
    ///
    /// This is the only place a simulation hard-fails; every later failure
    /// degrades into lower-confidence output instead.
    pub fn validate(&self) -> Result<()> {
        if self.simulation.cycles == 0 {
            return Err(SimError::InvalidConfig(
                "cycles must be at least 1".to_string(),
            ));
        }
        if self.personas.is_empty() {
            return Err(SimError::InvalidConfig(
                "at least one buyer persona is required".to_string(),
            ));
        }
        if self.channels.is_empty() {
            return Err(SimError::InvalidConfig(
                "at least one channel is required".to_string(),
            ));
        }
        if self.simulation.concurrency == 0 {
            return Err(SimError::InvalidConfig(
                "concurrency must be at least 1".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.simulation.degraded_ratio) {
            return Err(SimError::InvalidConfig(format!(
                "degraded_ratio {} outside [0, 1]",
                self.simulation.degraded_ratio
            )));
        }
        let mut names: Vec<&str> = self.channels.iter().map(|c| c.name.as_str()).collect();
        names.sort_unstable();
        names.dedup();
        if names.len() != self.channels.len() {
            return Err(SimError::InvalidConfig(
                "channel names must be unique".to_string(),
            ));
        }
        Ok(())
    }

    /// Total evaluator invocations per cycle.
    pub fn evaluations_per_cycle(&self) -> usize {
        self.personas.len() * self.simulation.buyers_per_persona as usize
            + self.competitors.len()
            + self.channels.len()
    }
}

/// Smallest config that passes validation. Test fixture shared across the
/// crate's unit tests.
#[cfg(test)]
pub(crate) fn minimal_config() -> SimConfig {
    SimConfig {
        product: ProductConfig {
            name: "Widget".to_string(),
            description: "A widget".to_string(),
            category: String::new(),
            stage: String::new(),
            unique_value_prop: String::new(),
            key_features: vec![],
        },
        pricing: PricingConfig {
            model: "subscription".to_string(),
            tiers: vec![PricingTier {
                name: "pro".to_string(),
                price: 50.0,
                features: vec![],
            }],
        },
        personas: vec![PersonaConfig {
            name: "Founder".to_string(),
            role: "CEO".to_string(),
            company_size: "1-10".to_string(),
            pain_points: vec![],
            goals: vec![],
            budget_range: String::new(),
            objection_tendencies: vec![],
        }],
        competitors: vec![],
        channels: vec![ChannelConfig {
            name: "organic-social".to_string(),
            priority: 1,
            budget_allocation: 0.0,
            existing_presence: String::new(),
            strategy_notes: String::new(),
        }],
        simulation: SimulationSettings::default(),
    }
}
