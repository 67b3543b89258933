//! A/B comparison of two completed simulation results.
//!
//! Pure functions of their inputs — no network, no clock. The comparison
//! owns nothing beyond the two result ids and the computed deltas.

use serde::{Deserialize, Serialize};

use crate::domain::result::{MetricKind, SimulationResult};

/// Relative deadband inside which a metric movement counts as flat.
pub const DEFAULT_DEADBAND: f64 = 0.05;

/// Qualitative movement of a metric from result A to result B.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Improved,
    Worsened,
    Flat,
}

/// Signed mid-value movement for one metric.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MetricDelta {
    pub metric: MetricKind,
    pub mid_a: f64,
    pub mid_b: f64,
    /// Always B − A.
    pub delta: f64,
    /// Polarity-aware: a CAC drop improves, a conversion drop worsens.
    pub direction: Direction,
}

/// A ranked item present in both results whose position moved.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RankShift {
    pub name: String,
    /// 0-based rank in result A.
    pub rank_a: usize,
    /// 0-based rank in result B.
    pub rank_b: usize,
}

/// Differences between two ranked name lists.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RankingDiff {
    /// Present in B only.
    pub added: Vec<String>,
    /// Present in A only.
    pub removed: Vec<String>,
    /// Present in both at different ranks.
    pub reordered: Vec<RankShift>,
}

impl RankingDiff {
    pub fn is_unchanged(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.reordered.is_empty()
    }
}

/// Structured deltas between two simulation results.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ComparisonResult {
    pub sim_id_a: String,
    pub sim_id_b: String,
    pub metrics: Vec<MetricDelta>,
    pub objections: RankingDiff,
    pub channels: RankingDiff,
    /// confidence_score B − A.
    pub confidence_delta: f64,
}

/// Compare two completed results.
pub fn compare(a: &SimulationResult, b: &SimulationResult) -> ComparisonResult {
    compare_with_deadband(a, b, DEFAULT_DEADBAND)
}

/// Compare with an explicit relative deadband.
pub fn compare_with_deadband(
    a: &SimulationResult,
    b: &SimulationResult,
    deadband: f64,
) -> ComparisonResult {
    let mut metrics = Vec::new();
    for kind in MetricKind::all() {
        if let (Some(band_a), Some(band_b)) = (a.metric(kind), b.metric(kind)) {
            metrics.push(metric_delta(kind, band_a.mid, band_b.mid, deadband));
        }
    }

    let objection_names = |r: &SimulationResult| -> Vec<String> {
        r.objections.iter().map(|o| o.category.clone()).collect()
    };
    let channel_names = |r: &SimulationResult| -> Vec<String> {
        r.channels.iter().map(|c| c.channel.clone()).collect()
    };

    ComparisonResult {
        sim_id_a: a.sim_id.clone(),
        sim_id_b: b.sim_id.clone(),
        metrics,
        objections: diff_rankings(&objection_names(a), &objection_names(b)),
        channels: diff_rankings(&channel_names(a), &channel_names(b)),
        confidence_delta: b.confidence_score - a.confidence_score,
    }
}

fn metric_delta(metric: MetricKind, mid_a: f64, mid_b: f64, deadband: f64) -> MetricDelta {
    let delta = mid_b - mid_a;

    // Relative to A's magnitude; when A is zero any movement is a change.
    let flat = if mid_a.abs() > f64::EPSILON {
        (delta / mid_a).abs() <= deadband
    } else {
        delta.abs() <= f64::EPSILON
    };

    let direction = if flat {
        Direction::Flat
    } else {
        let increased = delta > 0.0;
        let improved = increased != metric.lower_is_better();
        if improved {
            Direction::Improved
        } else {
            Direction::Worsened
        }
    };

    MetricDelta {
        metric,
        mid_a,
        mid_b,
        delta,
        direction,
    }
}

fn diff_rankings(a: &[String], b: &[String]) -> RankingDiff {
    let rank_a: std::collections::HashMap<&String, usize> =
        a.iter().enumerate().map(|(i, n)| (n, i)).collect();
    let rank_b: std::collections::HashMap<&String, usize> =
        b.iter().enumerate().map(|(i, n)| (n, i)).collect();

    let added = b.iter().filter(|n| !rank_a.contains_key(n)).cloned().collect();
    let removed = a.iter().filter(|n| !rank_b.contains_key(n)).cloned().collect();

    let reordered = a
        .iter()
        .enumerate()
        .filter_map(|(i, name)| {
            rank_b.get(name).and_then(|&j| {
                (i != j).then(|| RankShift {
                    name: name.clone(),
                    rank_a: i,
                    rank_b: j,
                })
            })
        })
        .collect();

    RankingDiff {
        added,
        removed,
        reordered,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    use crate::domain::result::{
        Assessment, ChannelRanking, ConfidenceLevel, FailureStats, MetricBand, ObjectionSummary,
        SimulationResult, RESULT_SCHEMA_VERSION,
    };

    fn band(metric: MetricKind, mid: f64) -> MetricBand {
        MetricBand {
            metric,
            low: mid * 0.5,
            mid,
            high: mid * 1.5,
            confidence: ConfidenceLevel::Medium,
            samples: 10,
        }
    }

    fn ranking(name: &str, score: f64) -> ChannelRanking {
        ChannelRanking {
            channel: name.to_string(),
            score,
            avg_cac: 30.0,
            avg_roi: 2.0,
            avg_reach: 1000,
            samples: 5,
        }
    }

    fn result(id: &str, cac_mid: f64, conv_mid: f64, channels: Vec<ChannelRanking>) -> SimulationResult {
        SimulationResult {
            schema_version: RESULT_SCHEMA_VERSION.to_string(),
            sim_id: id.to_string(),
            started_at: Utc::now(),
            completed_at: Utc::now(),
            cycles_requested: 5,
            metrics: vec![
                band(MetricKind::Cac, cac_mid),
                band(MetricKind::ConversionRate, conv_mid),
                band(MetricKind::TimeToBreakeven, cac_mid / 50.0),
            ],
            objections: vec![
                ObjectionSummary {
                    category: "price".to_string(),
                    count: 5,
                    examples: vec![],
                },
                ObjectionSummary {
                    category: "trust".to_string(),
                    count: 2,
                    examples: vec![],
                },
            ],
            channels,
            assessment: Assessment::Promising,
            confidence_score: 0.6,
            recommendations: vec![],
            risks: vec![],
            failures: FailureStats::default(),
        }
    }

    #[test]
    fn test_self_compare_is_all_flat() {
        let r = result(
            "same",
            40.0,
            0.2,
            vec![ranking("a", 0.9), ranking("b", 0.5)],
        );
        let comparison = compare(&r, &r);

        assert_eq!(comparison.metrics.len(), 3);
        for delta in &comparison.metrics {
            assert_eq!(delta.delta, 0.0);
            assert_eq!(delta.direction, Direction::Flat);
        }
        assert!(comparison.objections.is_unchanged());
        assert!(comparison.channels.is_unchanged());
        assert_eq!(comparison.confidence_delta, 0.0);
    }

    #[test]
    fn test_cac_drop_is_improvement() {
        let a = result("a", 60.0, 0.2, vec![ranking("x", 0.9)]);
        let b = result("b", 40.0, 0.2, vec![ranking("x", 0.9)]);
        let comparison = compare(&a, &b);

        let cac = comparison
            .metrics
            .iter()
            .find(|m| m.metric == MetricKind::Cac)
            .expect("cac delta");
        assert_eq!(cac.delta, -20.0);
        assert_eq!(cac.direction, Direction::Improved);
    }

    #[test]
    fn test_conversion_drop_is_worsening() {
        let a = result("a", 40.0, 0.30, vec![ranking("x", 0.9)]);
        let b = result("b", 40.0, 0.15, vec![ranking("x", 0.9)]);
        let comparison = compare(&a, &b);

        let conv = comparison
            .metrics
            .iter()
            .find(|m| m.metric == MetricKind::ConversionRate)
            .expect("conversion delta");
        assert_eq!(conv.direction, Direction::Worsened);
    }

    #[test]
    fn test_small_movement_within_deadband_is_flat() {
        let a = result("a", 100.0, 0.2, vec![ranking("x", 0.9)]);
        let b = result("b", 103.0, 0.2, vec![ranking("x", 0.9)]);
        let comparison = compare(&a, &b);

        let cac = comparison
            .metrics
            .iter()
            .find(|m| m.metric == MetricKind::Cac)
            .expect("cac delta");
        assert_eq!(cac.direction, Direction::Flat);
        assert_eq!(cac.delta, 3.0);
    }

    #[test]
    fn test_top_two_channel_swap_reported_as_reorder() {
        let a = result(
            "a",
            40.0,
            0.2,
            vec![ranking("alpha", 0.9), ranking("beta", 0.7), ranking("gamma", 0.3)],
        );
        let b = result(
            "b",
            40.0,
            0.2,
            vec![ranking("beta", 0.9), ranking("alpha", 0.7), ranking("gamma", 0.3)],
        );
        let comparison = compare(&a, &b);

        assert!(comparison.channels.added.is_empty());
        assert!(comparison.channels.removed.is_empty());
        assert_eq!(comparison.channels.reordered.len(), 2);

        let shift = |name: &str| {
            comparison
                .channels
                .reordered
                .iter()
                .find(|s| s.name == name)
                .expect("shift")
                .clone()
        };
        assert_eq!(shift("alpha").rank_a, 0);
        assert_eq!(shift("alpha").rank_b, 1);
        assert_eq!(shift("beta").rank_a, 1);
        assert_eq!(shift("beta").rank_b, 0);
        // gamma stays put and is not reported.
        assert!(!comparison.channels.reordered.iter().any(|s| s.name == "gamma"));
    }

    #[test]
    fn test_added_and_removed_objections() {
        let mut a = result("a", 40.0, 0.2, vec![ranking("x", 0.9)]);
        let mut b = result("b", 40.0, 0.2, vec![ranking("x", 0.9)]);
        a.objections.push(ObjectionSummary {
            category: "timing".to_string(),
            count: 1,
            examples: vec![],
        });
        b.objections.push(ObjectionSummary {
            category: "features".to_string(),
            count: 1,
            examples: vec![],
        });

        let comparison = compare(&a, &b);
        assert_eq!(comparison.objections.added, vec!["features".to_string()]);
        assert_eq!(comparison.objections.removed, vec!["timing".to_string()]);
    }

    #[test]
    fn test_comparison_serde_roundtrip() {
        let a = result("a", 60.0, 0.2, vec![ranking("x", 0.9)]);
        let b = result("b", 40.0, 0.3, vec![ranking("x", 0.9)]);
        let comparison = compare(&a, &b);

        let json = serde_json::to_string(&comparison).expect("serialize");
        let back: ComparisonResult = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(comparison, back);
    }
}
