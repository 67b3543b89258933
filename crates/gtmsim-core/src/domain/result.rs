//! The final simulation artifact and its building blocks.
//!
//! [`SimulationResult`] is the sole contract with every downstream
//! consumer — renderers, distribution generators, and the compare engine.
//! It is created once at the end of a run, never mutated, and must
//! round-trip through JSON without loss.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::domain::config::SimConfig;
use crate::domain::error::Result;

/// Schema version stamped into every persisted result.
pub const RESULT_SCHEMA_VERSION: &str = "1.0";

/// Coarse qualitative confidence label derived from sample size and
/// spread — not a statistical p-value.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceLevel {
    Low,
    Medium,
    High,
}

/// The metrics the engine projects.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    /// Customer acquisition cost, dollars. Lower is better.
    Cac,
    /// Conversion rate in [0, 1]. Higher is better.
    ConversionRate,
    /// Months to recover acquisition cost. Lower is better.
    TimeToBreakeven,
}

impl MetricKind {
    /// Whether a decrease in this metric counts as an improvement.
    pub fn lower_is_better(&self) -> bool {
        matches!(self, MetricKind::Cac | MetricKind::TimeToBreakeven)
    }

    pub fn all() -> [MetricKind; 3] {
        [
            MetricKind::Cac,
            MetricKind::ConversionRate,
            MetricKind::TimeToBreakeven,
        ]
    }
}

impl std::fmt::Display for MetricKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            MetricKind::Cac => "cac",
            MetricKind::ConversionRate => "conversion_rate",
            MetricKind::TimeToBreakeven => "time_to_breakeven",
        };
        f.write_str(s)
    }
}

/// Low/mid/high projection band for one metric.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MetricBand {
    pub metric: MetricKind,
    pub low: f64,
    pub mid: f64,
    pub high: f64,
    pub confidence: ConfidenceLevel,
    /// Number of valid observations behind the band.
    pub samples: usize,
}

/// One normalized objection category with occurrence count and examples.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ObjectionSummary {
    /// Normalized category (e.g. "price", "trust").
    pub category: String,
    pub count: u64,
    /// Up to three example quotes.
    pub examples: Vec<String>,
}

/// Per-channel projection, recomputed from accumulated samples.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChannelRanking {
    pub channel: String,
    /// Composite of normalized ROI and inverse CAC; higher is better.
    pub score: f64,
    pub avg_cac: f64,
    pub avg_roi: f64,
    pub avg_reach: u64,
    /// Valid channel decisions that fed this ranking.
    pub samples: usize,
}

/// Failure accounting for the whole run.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct FailureStats {
    /// Evaluator calls attempted across all cycles.
    pub total_evaluations: u64,
    /// Calls that produced an invalid decision.
    pub invalid_decisions: u64,
    /// Cycles whose invalid fraction exceeded the degraded threshold.
    pub degraded_cycles: u32,
    /// Cycles that actually ran (may be short of requested on abort).
    pub completed_cycles: u32,
    /// True when the run was cancelled and finalized with partial data.
    pub aborted: bool,
}

/// Overall go/no-go label produced by the advisor.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Assessment {
    Strong,
    Promising,
    Uncertain,
    Concerning,
    Weak,
}

impl std::fmt::Display for Assessment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Assessment::Strong => "strong",
            Assessment::Promising => "promising",
            Assessment::Uncertain => "uncertain",
            Assessment::Concerning => "concerning",
            Assessment::Weak => "weak",
        };
        f.write_str(s)
    }
}

/// Final immutable snapshot of a simulation run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SimulationResult {
    pub schema_version: String,

    /// Stable hash of config + start time; see [`simulation_digest`].
    pub sim_id: String,

    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,

    /// Cycles requested by the config.
    pub cycles_requested: u32,

    /// Metric bands, one per [`MetricKind`], stable order.
    pub metrics: Vec<MetricBand>,

    /// Objection categories ranked by frequency.
    pub objections: Vec<ObjectionSummary>,

    /// Channels ranked by composite score descending.
    pub channels: Vec<ChannelRanking>,

    pub assessment: Assessment,

    /// 0.0–1.0 overall confidence in the assessment.
    pub confidence_score: f64,

    pub recommendations: Vec<String>,
    pub risks: Vec<String>,

    pub failures: FailureStats,
}

impl SimulationResult {
    /// Band for one metric, if any observations were collected.
    pub fn metric(&self, kind: MetricKind) -> Option<&MetricBand> {
        self.metrics.iter().find(|m| m.metric == kind)
    }

    /// Top-ranked channel, if any channel produced valid decisions.
    pub fn top_channel(&self) -> Option<&ChannelRanking> {
        self.channels.first()
    }
}

/// Stable simulation id: SHA-256 over the config's JSON form plus the
/// RFC 3339 start time.
///
/// serde_json's default map is ordered, so the config serializes with
/// deterministic key order and two runs over the same config at the same
/// start instant share an id — the anchor for A/B comparison.
pub fn simulation_digest(config: &SimConfig, started_at: DateTime<Utc>) -> Result<String> {
    let config_json = serde_json::to_string(config)?;
    let mut hasher = Sha256::new();
    hasher.update(config_json.as_bytes());
    hasher.update(started_at.to_rfc3339().as_bytes());
    Ok(hex::encode(hasher.finalize()))
}
