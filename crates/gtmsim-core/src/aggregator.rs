//! Cross-cycle aggregation.
//!
//! The [`Aggregator`] folds [`CycleRecord`]s into running accumulators and
//! finalizes them into metric bands, an objection tally, and channel
//! rankings. Folding is order-independent (sums, counts, categorical
//! tallies) and memory stays O(metrics + channels + objection categories +
//! valid observations), never O(cycles × decisions).

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::config::{ChannelWeights, ConfidencePolicy};
use crate::domain::cycle::CycleRecord;
use crate::domain::decision::{BuyerVerdict, DecisionPayload};
use crate::domain::result::{
    ChannelRanking, ConfidenceLevel, MetricBand, MetricKind, ObjectionSummary,
};

/// Maximum example quotes kept per objection category.
const MAX_OBJECTION_EXAMPLES: usize = 3;

/// Running accumulator of valid numeric observations for one metric.
///
/// Only finite values enter the sample; NaN or infinite inputs are dropped
/// so a single bad observation can never poison the percentiles.
#[derive(Debug, Clone, Default)]
pub struct MetricSample {
    values: Vec<f64>,
}

impl MetricSample {
    pub fn push(&mut self, value: f64) {
        if value.is_finite() {
            self.values.push(value);
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    fn sorted(&self) -> Vec<f64> {
        let mut sorted = self.values.clone();
        sorted.sort_by(|a, b| a.partial_cmp(b).expect("finite values"));
        sorted
    }

    /// Nearest-rank percentile over the sorted sample. `None` when empty.
    fn percentile(sorted: &[f64], pct: f64) -> Option<f64> {
        if sorted.is_empty() {
            return None;
        }
        let rank = ((pct / 100.0) * sorted.len() as f64).ceil() as usize;
        Some(sorted[rank.clamp(1, sorted.len()) - 1])
    }

    /// Project the low/mid/high band for this sample.
    ///
    /// Percentile bands need a minimum sample count; below it the band
    /// falls back to min/mean/max and confidence pins to `low`.
    pub fn band(&self, metric: MetricKind, policy: &ConfidencePolicy) -> MetricBand {
        let sorted = self.sorted();
        let samples = sorted.len();

        if samples == 0 {
            return MetricBand {
                metric,
                low: 0.0,
                mid: 0.0,
                high: 0.0,
                confidence: ConfidenceLevel::Low,
                samples: 0,
            };
        }

        if samples < policy.percentile_min_samples {
            let mean = sorted.iter().sum::<f64>() / samples as f64;
            return MetricBand {
                metric,
                low: sorted[0],
                mid: mean,
                high: sorted[samples - 1],
                confidence: ConfidenceLevel::Low,
                samples,
            };
        }

        let low = Self::percentile(&sorted, policy.low_percentile).expect("non-empty");
        let mid = Self::percentile(&sorted, 50.0).expect("non-empty");
        let high = Self::percentile(&sorted, policy.high_percentile).expect("non-empty");

        MetricBand {
            metric,
            low,
            mid,
            high,
            confidence: self.confidence(&sorted, mid, policy),
            samples,
        }
    }

    fn confidence(&self, sorted: &[f64], median: f64, policy: &ConfidencePolicy) -> ConfidenceLevel {
        let samples = sorted.len();
        if samples >= policy.high_min_samples {
            let q1 = Self::percentile(sorted, 25.0).expect("non-empty");
            let q3 = Self::percentile(sorted, 75.0).expect("non-empty");
            let iqr = q3 - q1;
            let relative_spread = if median.abs() > f64::EPSILON {
                iqr / median.abs()
            } else if iqr == 0.0 {
                0.0
            } else {
                f64::INFINITY
            };
            if relative_spread < policy.high_max_relative_spread {
                return ConfidenceLevel::High;
            }
        }
        if samples >= policy.medium_min_samples {
            ConfidenceLevel::Medium
        } else {
            ConfidenceLevel::Low
        }
    }
}

#[derive(Debug, Clone)]
struct ObjectionEntry {
    count: u64,
    examples: Vec<String>,
    /// Sequence number of the most recently recorded example, for the
    /// ranking tiebreak.
    last_seen: u64,
}

/// Frequency tally of normalized objection categories.
///
/// Counts are monotonically non-decreasing for the life of a run.
#[derive(Debug, Clone, Default)]
pub struct ObjectionTally {
    entries: HashMap<String, ObjectionEntry>,
    seq: u64,
    total: u64,
}

impl ObjectionTally {
    /// Normalize a free-form objection into a coarse category.
    pub fn categorize(objection: &str) -> &'static str {
        const CATEGORIES: &[(&str, &[&str])] = &[
            ("price", &["price", "pricing", "expensive", "cost", "afford", "budget"]),
            ("trust", &["trust", "unknown", "risky", "proven", "security", "unproven"]),
            ("features", &["feature", "missing", "functionality", "capability", "integration"]),
            ("competition", &["competitor", "alternative", "existing", "switch", "already use"]),
            ("timing", &["timing", "not now", "later", "ready", "priority", "next quarter"]),
        ];
        let lower = objection.to_lowercase();
        for (category, keywords) in CATEGORIES {
            if keywords.iter().any(|k| lower.contains(k)) {
                return category;
            }
        }
        "other"
    }

    pub fn record(&mut self, objection: &str) {
        self.seq += 1;
        self.total += 1;
        let category = Self::categorize(objection);
        let entry = self
            .entries
            .entry(category.to_string())
            .or_insert(ObjectionEntry {
                count: 0,
                examples: Vec::new(),
                last_seen: 0,
            });
        entry.count += 1;
        entry.last_seen = self.seq;
        if entry.examples.len() < MAX_OBJECTION_EXAMPLES
            && !entry.examples.iter().any(|e| e == objection)
        {
            entry.examples.push(objection.to_string());
        }
    }

    /// Total objections recorded across all categories.
    pub fn total(&self) -> u64 {
        self.total
    }

    /// Categories by occurrence count descending; ties go to the category
    /// with the most recently recorded example.
    pub fn ranked(&self) -> Vec<ObjectionSummary> {
        let mut ranked: Vec<(&String, &ObjectionEntry)> = self.entries.iter().collect();
        ranked.sort_by(|(_, a), (_, b)| {
            b.count
                .cmp(&a.count)
                .then_with(|| b.last_seen.cmp(&a.last_seen))
        });
        ranked
            .into_iter()
            .map(|(category, entry)| ObjectionSummary {
                category: category.clone(),
                count: entry.count,
                examples: entry.examples.clone(),
            })
            .collect()
    }
}

/// Per-channel running sums. Rankings are recomputed from these at
/// finalize time, never from a single cycle.
#[derive(Debug, Clone, Default)]
struct ChannelAccumulator {
    cac_sum: f64,
    roi_sum: f64,
    reach_sum: u64,
    samples: usize,
}

/// Aggregate counters that ride along with the statistical output.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct FoldCounters {
    pub folded_cycles: u32,
    pub degraded_cycles: u32,
    pub total_evaluations: u64,
    pub invalid_decisions: u64,
}

/// Finalized aggregation output handed to the advisor and the result
/// assembler.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateSummary {
    /// One band per [`MetricKind`], stable order.
    pub metrics: Vec<MetricBand>,
    pub objections: Vec<ObjectionSummary>,
    pub channels: Vec<ChannelRanking>,
    /// Mean competitor threat level (1–10) across valid competitor
    /// decisions, when any were observed. Feeds advisor risk framing.
    pub avg_threat: Option<f64>,
    /// Mean self-reported confidence across valid buyer decisions.
    pub avg_buyer_confidence: Option<f64>,
    pub counters: FoldCounters,
}

impl AggregateSummary {
    pub fn metric(&self, kind: MetricKind) -> Option<&MetricBand> {
        self.metrics.iter().find(|m| m.metric == kind)
    }
}

/// Accumulates cycle records into running statistics.
///
/// An explicitly owned instance, passed and returned — never module-level
/// state — so two simulations (the two sides of a compare) can run
/// concurrently without interference.
pub struct Aggregator {
    policy: ConfidencePolicy,
    weights: ChannelWeights,
    /// Reference monthly price for deriving breakeven months from CAC.
    reference_price: f64,
    cac: MetricSample,
    conversion: MetricSample,
    breakeven: MetricSample,
    objections: ObjectionTally,
    channels: BTreeMap<String, ChannelAccumulator>,
    threat_sum: f64,
    threat_samples: usize,
    buyer_confidence_sum: f64,
    buyer_confidence_samples: usize,
    counters: FoldCounters,
}

impl Aggregator {
    pub fn new(policy: ConfidencePolicy, weights: ChannelWeights, reference_price: f64) -> Self {
        Self {
            policy,
            weights,
            reference_price,
            cac: MetricSample::default(),
            conversion: MetricSample::default(),
            breakeven: MetricSample::default(),
            objections: ObjectionTally::default(),
            channels: BTreeMap::new(),
            threat_sum: 0.0,
            threat_samples: 0,
            buyer_confidence_sum: 0.0,
            buyer_confidence_samples: 0,
            counters: FoldCounters::default(),
        }
    }

    /// Fold one cycle's decisions into the running accumulators.
    ///
    /// Only valid decisions contribute observations; invalid ones only move
    /// the failure counters.
    pub fn fold(&mut self, record: &CycleRecord) {
        self.counters.folded_cycles += 1;
        self.counters.total_evaluations += record.decisions.len() as u64;
        self.counters.invalid_decisions += record.invalid_count as u64;
        if record.degraded {
            self.counters.degraded_cycles += 1;
        }

        let mut buyers_seen = 0u32;
        let mut buys = 0u32;

        for decision in record.valid_decisions() {
            match decision.payload.as_ref() {
                Some(DecisionPayload::Buyer {
                    verdict,
                    objections,
                    confidence,
                    ..
                }) => {
                    buyers_seen += 1;
                    if *verdict == BuyerVerdict::Buy {
                        buys += 1;
                    }
                    for objection in objections {
                        self.objections.record(objection);
                    }
                    self.buyer_confidence_sum += confidence;
                    self.buyer_confidence_samples += 1;
                }
                Some(DecisionPayload::Competitor { threat_level, .. }) => {
                    self.threat_sum += f64::from(*threat_level);
                    self.threat_samples += 1;
                }
                Some(DecisionPayload::Channel { cac, reach, roi, .. }) => {
                    self.cac.push(*cac);
                    if self.reference_price > 0.0 {
                        self.breakeven.push(cac / self.reference_price);
                    }
                    let entry = self
                        .channels
                        .entry(decision.subject.clone())
                        .or_default();
                    entry.cac_sum += cac;
                    entry.roi_sum += roi;
                    entry.reach_sum += reach;
                    entry.samples += 1;
                }
                None => {}
            }
        }

        // One conversion observation per cycle with any valid buyers.
        if buyers_seen > 0 {
            self.conversion
                .push(f64::from(buys) / f64::from(buyers_seen));
        }

        debug!(
            cycle = record.index,
            degraded = record.degraded,
            invalid = record.invalid_count,
            "cycle folded"
        );
    }

    /// Finalize the accumulators into a summary.
    ///
    /// Idempotent and side-effect-free; call it after the last fold (or
    /// after cancellation, over whatever was collected).
    pub fn finalize(&self) -> AggregateSummary {
        let metrics = vec![
            self.cac.band(MetricKind::Cac, &self.policy),
            self.conversion.band(MetricKind::ConversionRate, &self.policy),
            self.breakeven.band(MetricKind::TimeToBreakeven, &self.policy),
        ];

        AggregateSummary {
            metrics,
            objections: self.objections.ranked(),
            channels: self.rank_channels(),
            avg_threat: (self.threat_samples > 0)
                .then(|| self.threat_sum / self.threat_samples as f64),
            avg_buyer_confidence: (self.buyer_confidence_samples > 0)
                .then(|| self.buyer_confidence_sum / self.buyer_confidence_samples as f64),
            counters: self.counters.clone(),
        }
    }

    /// Composite-score channel ranking: weighted normalized ROI plus
    /// weighted normalized inverse CAC, ties broken lexicographically.
    fn rank_channels(&self) -> Vec<ChannelRanking> {
        let averages: Vec<(&String, f64, f64, f64)> = self
            .channels
            .iter()
            .filter(|(_, acc)| acc.samples > 0)
            .map(|(name, acc)| {
                let n = acc.samples as f64;
                (
                    name,
                    acc.cac_sum / n,
                    acc.roi_sum / n,
                    acc.reach_sum as f64 / n,
                )
            })
            .collect();

        let max_roi = averages.iter().map(|(_, _, roi, _)| *roi).fold(0.0, f64::max);
        let max_inv_cac = averages
            .iter()
            .map(|(_, cac, _, _)| if *cac > 0.0 { 1.0 / cac } else { 0.0 })
            .fold(0.0, f64::max);

        let mut rankings: Vec<ChannelRanking> = averages
            .into_iter()
            .map(|(name, avg_cac, avg_roi, avg_reach)| {
                let norm_roi = if max_roi > 0.0 { avg_roi / max_roi } else { 0.0 };
                let inv_cac = if avg_cac > 0.0 { 1.0 / avg_cac } else { 0.0 };
                let norm_inv_cac = if max_inv_cac > 0.0 {
                    inv_cac / max_inv_cac
                } else {
                    0.0
                };
                let score = self.weights.roi_weight * norm_roi
                    + self.weights.cac_weight * norm_inv_cac;
                let acc = &self.channels[name];
                ChannelRanking {
                    channel: name.clone(),
                    score,
                    avg_cac,
                    avg_roi,
                    avg_reach: avg_reach.round() as u64,
                    samples: acc.samples,
                }
            })
            .collect();

        rankings.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.channel.cmp(&b.channel))
        });
        rankings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::decision::{AgentDecision, AgentRole, CompetitorReaction};

    fn policy() -> ConfidencePolicy {
        ConfidencePolicy::default()
    }

    fn aggregator() -> Aggregator {
        Aggregator::new(policy(), ChannelWeights::default(), 50.0)
    }

    fn buyer_decision(verdict: BuyerVerdict, objections: Vec<&str>) -> AgentDecision {
        AgentDecision::valid(
            AgentRole::Buyer,
            "Founder",
            DecisionPayload::Buyer {
                verdict,
                objections: objections.into_iter().map(String::from).collect(),
                confidence: 0.7,
                willingness_to_pay: None,
                perceived_value: None,
            },
            "{}".to_string(),
        )
    }

    fn channel_decision(name: &str, cac: f64, roi: f64) -> AgentDecision {
        AgentDecision::valid(
            AgentRole::Channel,
            name,
            DecisionPayload::Channel {
                cac,
                reach: 1000,
                conversion_rate: 0.02,
                roi,
                confidence: 0.6,
            },
            "{}".to_string(),
        )
    }

    fn competitor_decision(threat: u8) -> AgentDecision {
        AgentDecision::valid(
            AgentRole::Competitor,
            "BigCo",
            DecisionPayload::Competitor {
                reaction: CompetitorReaction::Monitor,
                threat_level: threat,
                confidence: 0.5,
                counter_moves: vec![],
            },
            "{}".to_string(),
        )
    }

    fn invalid_decision() -> AgentDecision {
        AgentDecision::invalid(AgentRole::Buyer, "Founder", "timeout", None)
    }

    #[test]
    fn test_metric_sample_rejects_non_finite() {
        let mut sample = MetricSample::default();
        sample.push(f64::NAN);
        sample.push(f64::INFINITY);
        sample.push(42.0);
        assert_eq!(sample.len(), 1);
    }

    #[test]
    fn test_band_ordering_holds() {
        let mut sample = MetricSample::default();
        for v in [5.0, 1.0, 9.0, 3.0, 7.0, 2.0, 8.0] {
            sample.push(v);
        }
        let band = sample.band(MetricKind::Cac, &policy());
        assert!(band.low <= band.mid);
        assert!(band.mid <= band.high);
        assert_eq!(band.samples, 7);
    }

    #[test]
    fn test_small_sample_falls_back_to_min_mean_max() {
        let mut sample = MetricSample::default();
        sample.push(10.0);
        sample.push(20.0);
        let band = sample.band(MetricKind::Cac, &policy());
        assert_eq!(band.low, 10.0);
        assert_eq!(band.mid, 15.0);
        assert_eq!(band.high, 20.0);
        assert_eq!(band.confidence, ConfidenceLevel::Low);
    }

    #[test]
    fn test_cac_median_across_mixed_cycles() {
        // Cycles contribute CAC observations 30,50 then 40,60 then 45 plus
        // one invalid decision: the valid sample is {30,50,40,60,45} and
        // the nearest-rank median is 45 with low confidence (< 10 samples).
        let mut agg = aggregator();
        agg.fold(&CycleRecord::new(
            0,
            vec![
                channel_decision("a", 30.0, 1.0),
                channel_decision("b", 50.0, 1.0),
            ],
            0.5,
        ));
        agg.fold(&CycleRecord::new(
            1,
            vec![
                channel_decision("a", 40.0, 1.0),
                channel_decision("b", 60.0, 1.0),
            ],
            0.5,
        ));
        agg.fold(&CycleRecord::new(
            2,
            vec![channel_decision("a", 45.0, 1.0), invalid_decision()],
            0.5,
        ));

        let summary = agg.finalize();
        let cac = summary.metric(MetricKind::Cac).expect("cac band");
        assert_eq!(cac.samples, 5);
        assert_eq!(cac.mid, 45.0);
        assert_eq!(cac.low, 30.0);
        assert_eq!(cac.high, 60.0);
        assert_eq!(cac.confidence, ConfidenceLevel::Low);
    }

    #[test]
    fn test_confidence_high_with_tight_large_sample() {
        let mut sample = MetricSample::default();
        for i in 0..25 {
            sample.push(100.0 + f64::from(i % 3));
        }
        let band = sample.band(MetricKind::Cac, &policy());
        assert_eq!(band.confidence, ConfidenceLevel::High);
    }

    #[test]
    fn test_confidence_medium_with_wide_large_sample() {
        let mut sample = MetricSample::default();
        for i in 0..25 {
            sample.push(f64::from(i) * 50.0 + 1.0);
        }
        let band = sample.band(MetricKind::Cac, &policy());
        assert_eq!(band.confidence, ConfidenceLevel::Medium);
    }

    #[test]
    fn test_fold_order_independence() {
        let cycles = vec![
            CycleRecord::new(
                0,
                vec![
                    buyer_decision(BuyerVerdict::Buy, vec![]),
                    channel_decision("a", 30.0, 2.0),
                ],
                0.5,
            ),
            CycleRecord::new(
                1,
                vec![
                    buyer_decision(BuyerVerdict::Pass, vec!["too expensive".into()]),
                    channel_decision("b", 60.0, 1.0),
                ],
                0.5,
            ),
            CycleRecord::new(
                2,
                vec![
                    buyer_decision(BuyerVerdict::Object, vec!["need integrations".into()]),
                    channel_decision("a", 40.0, 2.5),
                ],
                0.5,
            ),
        ];

        let mut forward = aggregator();
        for c in &cycles {
            forward.fold(c);
        }
        let mut reverse = aggregator();
        for c in cycles.iter().rev() {
            reverse.fold(c);
        }

        let a = forward.finalize();
        let b = reverse.finalize();
        assert_eq!(a.metrics, b.metrics);
        assert_eq!(a.channels, b.channels);
        assert_eq!(a.counters, b.counters);
        // Category counts match regardless of fold order.
        let count = |s: &AggregateSummary, cat: &str| {
            s.objections
                .iter()
                .find(|o| o.category == cat)
                .map(|o| o.count)
        };
        assert_eq!(count(&a, "price"), count(&b, "price"));
        assert_eq!(count(&a, "features"), count(&b, "features"));
    }

    #[test]
    fn test_all_invalid_cycle_contributes_nothing_but_counts() {
        let mut agg = aggregator();
        agg.fold(&CycleRecord::new(
            0,
            vec![invalid_decision(), invalid_decision()],
            0.5,
        ));
        let summary = agg.finalize();
        assert_eq!(summary.counters.degraded_cycles, 1);
        assert_eq!(summary.counters.invalid_decisions, 2);
        assert_eq!(summary.metric(MetricKind::Cac).expect("band").samples, 0);
    }

    #[test]
    fn test_objection_tally_monotonic_and_totals() {
        let mut agg = aggregator();
        let mut last_total = 0;
        for i in 0..4 {
            agg.fold(&CycleRecord::new(
                i,
                vec![buyer_decision(
                    BuyerVerdict::Object,
                    vec!["price is too high", "unproven vendor"],
                )],
                0.5,
            ));
            let total: u64 = agg.finalize().objections.iter().map(|o| o.count).sum();
            assert!(total >= last_total);
            last_total = total;
        }
        // 4 cycles x 2 objections from objection-bearing valid decisions.
        assert_eq!(last_total, 8);
    }

    #[test]
    fn test_objection_examples_bounded() {
        let mut tally = ObjectionTally::default();
        for i in 0..10 {
            tally.record(&format!("price concern number {i}"));
        }
        let ranked = tally.ranked();
        assert_eq!(ranked[0].count, 10);
        assert!(ranked[0].examples.len() <= MAX_OBJECTION_EXAMPLES);
    }

    #[test]
    fn test_objection_recency_tiebreak() {
        let mut tally = ObjectionTally::default();
        tally.record("too expensive");
        tally.record("missing feature x");
        let ranked = tally.ranked();
        assert_eq!(ranked[0].count, ranked[1].count);
        // Equal counts: the more recently seen category ranks first.
        assert_eq!(ranked[0].category, "features");
        assert_eq!(ranked[1].category, "price");
    }

    #[test]
    fn test_categorize_keywords() {
        assert_eq!(ObjectionTally::categorize("Way too expensive"), "price");
        assert_eq!(ObjectionTally::categorize("we already use X"), "competition");
        assert_eq!(ObjectionTally::categorize("maybe next quarter"), "timing");
        assert_eq!(ObjectionTally::categorize("what is this even"), "other");
    }

    #[test]
    fn test_channel_ranking_prefers_roi_and_cheap_cac() {
        let mut agg = aggregator();
        agg.fold(&CycleRecord::new(
            0,
            vec![
                channel_decision("paid-ads", 120.0, 1.2),
                channel_decision("organic-social", 20.0, 2.5),
            ],
            0.5,
        ));
        let summary = agg.finalize();
        assert_eq!(summary.channels[0].channel, "organic-social");
        assert!(summary.channels[0].score > summary.channels[1].score);
    }

    #[test]
    fn test_channel_ranking_tie_breaks_lexicographically() {
        let mut agg = aggregator();
        agg.fold(&CycleRecord::new(
            0,
            vec![
                channel_decision("zeta", 30.0, 2.0),
                channel_decision("alpha", 30.0, 2.0),
            ],
            0.5,
        ));
        let summary = agg.finalize();
        assert_eq!(summary.channels[0].channel, "alpha");
        assert_eq!(summary.channels[1].channel, "zeta");
    }

    #[test]
    fn test_finalize_is_idempotent() {
        let mut agg = aggregator();
        agg.fold(&CycleRecord::new(
            0,
            vec![
                buyer_decision(BuyerVerdict::Buy, vec![]),
                channel_decision("a", 30.0, 2.0),
                competitor_decision(6),
            ],
            0.5,
        ));
        let first = agg.finalize();
        let second = agg.finalize();
        assert_eq!(first, second);
        assert_eq!(first.avg_threat, Some(6.0));
    }

    #[test]
    fn test_conversion_one_observation_per_cycle() {
        let mut agg = aggregator();
        agg.fold(&CycleRecord::new(
            0,
            vec![
                buyer_decision(BuyerVerdict::Buy, vec![]),
                buyer_decision(BuyerVerdict::Pass, vec![]),
            ],
            0.5,
        ));
        agg.fold(&CycleRecord::new(
            1,
            vec![
                buyer_decision(BuyerVerdict::Buy, vec![]),
                buyer_decision(BuyerVerdict::Buy, vec![]),
            ],
            0.5,
        ));
        let summary = agg.finalize();
        let conv = summary
            .metric(MetricKind::ConversionRate)
            .expect("conversion band");
        assert_eq!(conv.samples, 2);
        // min/mean/max fallback: observations are 0.5 and 1.0.
        assert_eq!(conv.low, 0.5);
        assert_eq!(conv.mid, 0.75);
        assert_eq!(conv.high, 1.0);
    }

    #[test]
    fn test_breakeven_derived_from_reference_price() {
        let mut agg = aggregator();
        agg.fold(&CycleRecord::new(
            0,
            vec![channel_decision("a", 100.0, 1.0)],
            0.5,
        ));
        let summary = agg.finalize();
        let breakeven = summary
            .metric(MetricKind::TimeToBreakeven)
            .expect("breakeven band");
        // CAC 100 at $50/mo reference price -> 2 months.
        assert_eq!(breakeven.mid, 2.0);
    }
}
