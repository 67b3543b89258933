//! Result persistence and markdown rendering.
//!
//! A [`SimulationResult`] written here is the artifact every downstream
//! consumer reads — the compare command, renderers, and distribution
//! tooling. Markdown output is deterministic for a given result.

use anyhow::{Context, Result};
use std::path::Path;

use crate::compare::{ComparisonResult, Direction};
use crate::domain::result::{MetricKind, SimulationResult};

/// Write a result as pretty JSON.
pub fn write_result_json(path: &Path, result: &SimulationResult) -> Result<()> {
    let content = serde_json::to_string_pretty(result).context("serialize simulation result")?;
    std::fs::write(path, content).with_context(|| format!("write {:?}", path))?;
    Ok(())
}

/// Load a previously persisted result.
pub fn load_result_json(path: &Path) -> Result<SimulationResult> {
    let content =
        std::fs::read_to_string(path).with_context(|| format!("read {:?}", path))?;
    serde_json::from_str(&content).with_context(|| format!("parse {:?}", path))
}

fn format_metric_value(metric: MetricKind, value: f64) -> String {
    match metric {
        MetricKind::Cac => format!("${value:.0}"),
        MetricKind::ConversionRate => format!("{:.1}%", value * 100.0),
        MetricKind::TimeToBreakeven => format!("{value:.1} mo"),
    }
}

/// Render a markdown summary of one simulation result.
pub fn render_result_md(result: &SimulationResult) -> String {
    let mut out = String::new();
    out.push_str("# Simulation Report\n\n");
    out.push_str(&format!(
        "- id: `{}`\n- assessment: **{}** (confidence {:.0}%)\n- cycles: {}/{} completed",
        &result.sim_id[..16.min(result.sim_id.len())],
        result.assessment,
        result.confidence_score * 100.0,
        result.failures.completed_cycles,
        result.cycles_requested,
    ));
    if result.failures.aborted {
        out.push_str(" (aborted)");
    }
    out.push_str("\n\n");

    out.push_str("## Projected Metrics\n\n");
    out.push_str("| Metric | Low | Mid | High | Confidence | Samples |\n");
    out.push_str("|---|---|---|---|---|---|\n");
    for band in &result.metrics {
        out.push_str(&format!(
            "| {} | {} | {} | {} | {:?} | {} |\n",
            band.metric,
            format_metric_value(band.metric, band.low),
            format_metric_value(band.metric, band.mid),
            format_metric_value(band.metric, band.high),
            band.confidence,
            band.samples,
        ));
    }
    out.push('\n');

    if !result.objections.is_empty() {
        out.push_str("## Objections\n\n");
        for objection in &result.objections {
            out.push_str(&format!(
                "- **{}** ({}x)",
                objection.category, objection.count
            ));
            if !objection.examples.is_empty() {
                out.push_str(&format!(": {}", objection.examples.join("; ")));
            }
            out.push('\n');
        }
        out.push('\n');
    }

    if !result.channels.is_empty() {
        out.push_str("## Channel Ranking\n\n");
        for (rank, channel) in result.channels.iter().enumerate() {
            out.push_str(&format!(
                "{}. **{}** — score {:.2}, CAC ${:.0}, ROI {:.1}x, reach {}\n",
                rank + 1,
                channel.channel,
                channel.score,
                channel.avg_cac,
                channel.avg_roi,
                channel.avg_reach,
            ));
        }
        out.push('\n');
    }

    if !result.recommendations.is_empty() {
        out.push_str("## Recommendations\n\n");
        for rec in &result.recommendations {
            out.push_str(&format!("- {rec}\n"));
        }
        out.push('\n');
    }

    if !result.risks.is_empty() {
        out.push_str("## Risks\n\n");
        for risk in &result.risks {
            out.push_str(&format!("- {risk}\n"));
        }
        out.push('\n');
    }

    out.push_str(&format!(
        "## Run Quality\n\n- evaluations: {}\n- invalid decisions: {}\n- degraded cycles: {}\n",
        result.failures.total_evaluations,
        result.failures.invalid_decisions,
        result.failures.degraded_cycles,
    ));
    out
}

fn direction_label(direction: Direction) -> &'static str {
    match direction {
        Direction::Improved => "improved",
        Direction::Worsened => "worsened",
        Direction::Flat => "flat",
    }
}

/// Render a markdown summary of an A/B comparison.
pub fn render_comparison_md(comparison: &ComparisonResult) -> String {
    let mut out = String::new();
    out.push_str("# Strategy Comparison\n\n");
    out.push_str(&format!(
        "- A: `{}`\n- B: `{}`\n- confidence delta: {:+.2}\n\n",
        &comparison.sim_id_a[..16.min(comparison.sim_id_a.len())],
        &comparison.sim_id_b[..16.min(comparison.sim_id_b.len())],
        comparison.confidence_delta,
    ));

    out.push_str("## Metrics\n\n");
    out.push_str("| Metric | A | B | Delta | Direction |\n");
    out.push_str("|---|---|---|---|---|\n");
    for delta in &comparison.metrics {
        out.push_str(&format!(
            "| {} | {} | {} | {:+.3} | {} |\n",
            delta.metric,
            format_metric_value(delta.metric, delta.mid_a),
            format_metric_value(delta.metric, delta.mid_b),
            delta.delta,
            direction_label(delta.direction),
        ));
    }
    out.push('\n');

    for (title, diff) in [
        ("Objections", &comparison.objections),
        ("Channels", &comparison.channels),
    ] {
        out.push_str(&format!("## {title}\n\n"));
        if diff.is_unchanged() {
            out.push_str("No changes.\n\n");
            continue;
        }
        for name in &diff.added {
            out.push_str(&format!("- added: {name}\n"));
        }
        for name in &diff.removed {
            out.push_str(&format!("- removed: {name}\n"));
        }
        for shift in &diff.reordered {
            out.push_str(&format!(
                "- reordered: {} #{} → #{}\n",
                shift.name,
                shift.rank_a + 1,
                shift.rank_b + 1,
            ));
        }
        out.push('\n');
    }
    out
}
