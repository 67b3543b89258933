//! Advisor synthesis.
//!
//! The advisor narrates and rates the aggregated numbers — it never
//! re-derives them. One oracle call consumes the finalized summary; any
//! failure there falls back to a deterministic rule table, because the
//! numeric report is already complete and valuable without narrative
//! polish.

use std::sync::Arc;

use serde::Deserialize;
use tracing::warn;

use crate::aggregator::AggregateSummary;
use crate::domain::result::{Assessment, ConfidenceLevel, MetricKind};
use crate::evaluator::parse::extract_json;
use crate::oracle::{invoke_with_retry, Oracle, OracleRequest};

/// Advisor sampling temperature: lower than evaluator calls, this is
/// analysis rather than role-play.
const ADVISOR_TEMPERATURE: f64 = 0.5;

const MAX_RECOMMENDATIONS: usize = 5;
const MAX_RISKS: usize = 3;

/// Rule-table thresholds for the deterministic fallback. Product policy
/// values; adjust freely.
const STRONG_CONVERSION_MID: f64 = 0.35;
const PROMISING_CONVERSION_MID: f64 = 0.15;
const CONCERNING_CONVERSION_MID: f64 = 0.05;
const HEALTHY_ROI: f64 = 1.5;
const ELEVATED_THREAT: f64 = 7.0;

/// The advisor's output: a label, a score, and narrative lists.
#[derive(Debug, Clone, PartialEq)]
pub struct Synthesis {
    pub assessment: Assessment,
    /// 0.0–1.0 confidence in the assessment.
    pub confidence_score: f64,
    pub recommendations: Vec<String>,
    pub risks: Vec<String>,
}

/// Synthesizes the final assessment from aggregated statistics.
pub struct AdvisorSynthesizer {
    oracle: Arc<dyn Oracle>,
    retries: u32,
}

impl AdvisorSynthesizer {
    pub fn new(oracle: Arc<dyn Oracle>, retries: u32) -> Self {
        Self { oracle, retries }
    }

    /// Produce the overall assessment for a finalized summary.
    ///
    /// Infallible by design: an oracle or parse failure degrades to the
    /// rule-based synthesis instead of erroring.
    pub async fn synthesize(&self, summary: &AggregateSummary) -> Synthesis {
        let request =
            OracleRequest::new(system_prompt(), synthesis_prompt(summary))
                .with_temperature(ADVISOR_TEMPERATURE);

        match invoke_with_retry(self.oracle.as_ref(), &request, self.retries).await {
            Ok(response) => match parse_synthesis(&response.text) {
                Ok(synthesis) => synthesis,
                Err(reason) => {
                    warn!(%reason, "advisor reply failed validation, using rule table");
                    rule_based_synthesis(summary)
                }
            },
            Err(err) => {
                warn!(error = %err, "advisor oracle call failed, using rule table");
                rule_based_synthesis(summary)
            }
        }
    }
}

fn system_prompt() -> String {
    "You are a skeptical go-to-market strategist reviewing the aggregated \
output of a multi-agent market simulation. The numbers are already \
computed; your job is to rate and narrate them, not to recompute them. \
Be direct about risks. Always reply with a single JSON object and nothing \
else."
        .to_string()
}

fn synthesis_prompt(summary: &AggregateSummary) -> String {
    let mut sections = Vec::new();

    let mut metric_lines = Vec::new();
    for band in &summary.metrics {
        metric_lines.push(format!(
            "- {}: low {:.3} / mid {:.3} / high {:.3} ({} samples, {:?} confidence)",
            band.metric, band.low, band.mid, band.high, band.samples, band.confidence
        ));
    }
    sections.push(format!("## Projected Metrics\n{}", metric_lines.join("\n")));

    if !summary.objections.is_empty() {
        let lines: Vec<String> = summary
            .objections
            .iter()
            .take(5)
            .map(|o| format!("- {} ({}x): {}", o.category, o.count, o.examples.join("; ")))
            .collect();
        sections.push(format!("## Top Objections\n{}", lines.join("\n")));
    }

    if !summary.channels.is_empty() {
        let lines: Vec<String> = summary
            .channels
            .iter()
            .map(|c| {
                format!(
                    "- {}: score {:.2}, CAC ${:.0}, ROI {:.1}x",
                    c.channel, c.score, c.avg_cac, c.avg_roi
                )
            })
            .collect();
        sections.push(format!("## Channel Ranking\n{}", lines.join("\n")));
    }

    if let Some(threat) = summary.avg_threat {
        sections.push(format!("## Competitor Threat\nAverage level {threat:.1}/10"));
    }

    sections.push(format!(
        "## Run Quality\n{} cycles folded, {} degraded, {} of {} evaluations invalid",
        summary.counters.folded_cycles,
        summary.counters.degraded_cycles,
        summary.counters.invalid_decisions,
        summary.counters.total_evaluations,
    ));

    sections.push(
        "## Your Assessment\nReply with JSON:\n{\n  \"overall_assessment\": \"strong\" | \
\"promising\" | \"uncertain\" | \"concerning\" | \"weak\",\n  \"confidence_score\": 0.0-1.0,\n  \
\"recommendations\": [\"...\"],\n  \"risks\": [\"...\"]\n}"
            .to_string(),
    );

    sections.join("\n\n")
}

#[derive(Debug, Deserialize)]
struct SynthesisReply {
    overall_assessment: String,
    confidence_score: f64,
    #[serde(default)]
    recommendations: Vec<String>,
    #[serde(default)]
    risks: Vec<String>,
}

fn parse_synthesis(text: &str) -> Result<Synthesis, String> {
    let json = extract_json(text).ok_or_else(|| "no JSON object in reply".to_string())?;
    let reply: SynthesisReply =
        serde_json::from_str(json).map_err(|e| format!("reply is not valid JSON: {e}"))?;

    let assessment = match reply.overall_assessment.trim().to_ascii_lowercase().as_str() {
        "strong" => Assessment::Strong,
        "promising" => Assessment::Promising,
        "uncertain" => Assessment::Uncertain,
        "concerning" => Assessment::Concerning,
        "weak" => Assessment::Weak,
        other => return Err(format!("unknown assessment {other:?}")),
    };
    if !reply.confidence_score.is_finite() || !(0.0..=1.0).contains(&reply.confidence_score) {
        return Err(format!(
            "confidence_score {} outside [0, 1]",
            reply.confidence_score
        ));
    }

    let mut recommendations = reply.recommendations;
    recommendations.truncate(MAX_RECOMMENDATIONS);
    let mut risks = reply.risks;
    risks.truncate(MAX_RISKS);

    Ok(Synthesis {
        assessment,
        confidence_score: reply.confidence_score,
        recommendations,
        risks,
    })
}

/// Deterministic assessment from the aggregate alone.
///
/// Used when narrative synthesis is disabled or the oracle fails. The
/// thresholds are the named policy constants above.
pub fn rule_based_synthesis(summary: &AggregateSummary) -> Synthesis {
    let conversion = summary.metric(MetricKind::ConversionRate);
    let conversion_mid = conversion.map(|b| b.mid);
    let conversion_samples = conversion.map(|b| b.samples).unwrap_or(0);
    let top_roi = summary.channels.first().map(|c| c.avg_roi);

    let assessment = match (conversion_mid, top_roi) {
        (Some(conv), Some(roi)) if conversion_samples > 0 => {
            if conv >= STRONG_CONVERSION_MID && roi >= HEALTHY_ROI {
                Assessment::Strong
            } else if conv >= PROMISING_CONVERSION_MID && roi >= 1.0 {
                Assessment::Promising
            } else if conv < CONCERNING_CONVERSION_MID {
                if roi < 1.0 {
                    Assessment::Weak
                } else {
                    Assessment::Concerning
                }
            } else {
                Assessment::Uncertain
            }
        }
        _ => Assessment::Uncertain,
    };

    // Confidence: mean of the per-metric labels, blended with the buyers'
    // own self-reported confidence and discounted by the share of degraded
    // cycles.
    let label_score = |level: ConfidenceLevel| match level {
        ConfidenceLevel::High => 1.0,
        ConfidenceLevel::Medium => 0.6,
        ConfidenceLevel::Low => 0.3,
    };
    let mut base = if summary.metrics.is_empty() {
        0.3
    } else {
        summary
            .metrics
            .iter()
            .map(|m| label_score(m.confidence))
            .sum::<f64>()
            / summary.metrics.len() as f64
    };
    if let Some(buyer_confidence) = summary.avg_buyer_confidence {
        base = (base + buyer_confidence) / 2.0;
    }
    let degraded_share = if summary.counters.folded_cycles > 0 {
        f64::from(summary.counters.degraded_cycles) / f64::from(summary.counters.folded_cycles)
    } else {
        1.0
    };
    let confidence_score = (base * (1.0 - 0.5 * degraded_share)).clamp(0.0, 1.0);

    let mut recommendations = Vec::new();
    if let Some(top) = summary.objections.first() {
        recommendations.push(format!(
            "Address the dominant '{}' objection ({} occurrences) in positioning and pricing pages",
            top.category, top.count
        ));
    }
    if let Some(best) = summary.channels.first() {
        recommendations.push(format!(
            "Concentrate early spend on {} (ROI {:.1}x at ${:.0} CAC)",
            best.channel, best.avg_roi, best.avg_cac
        ));
    }
    if conversion_samples == 0 {
        recommendations.push(
            "Collect more buyer signal before committing budget; no conversion sample was gathered"
                .to_string(),
        );
    }
    recommendations.truncate(MAX_RECOMMENDATIONS);

    let mut risks = Vec::new();
    if summary.avg_threat.is_some_and(|t| t >= ELEVATED_THREAT) {
        risks.push("Competitors are likely to respond aggressively to the launch".to_string());
    }
    if summary.counters.degraded_cycles > 0 {
        risks.push(format!(
            "{} degraded cycle(s) reduced sample quality",
            summary.counters.degraded_cycles
        ));
    }
    if summary
        .metrics
        .iter()
        .all(|m| m.confidence == ConfidenceLevel::Low)
    {
        risks.push("All metric projections carry low confidence".to_string());
    }
    risks.truncate(MAX_RISKS);

    Synthesis {
        assessment,
        confidence_score,
        recommendations,
        risks,
    }
}
