//! Simulation orchestration.
//!
//! [`Simulation::run`] drives the whole pipeline: validate config, run
//! cycles strictly in order (cycle N is folded before cycle N+1 starts,
//! bounding memory to one in-flight cycle plus the accumulators), then
//! synthesize the advisor assessment and freeze the result.

use std::sync::Arc;

use chrono::Utc;
use tracing::info;

use crate::advisor::{rule_based_synthesis, AdvisorSynthesizer, Synthesis};
use crate::aggregator::{AggregateSummary, Aggregator};
use crate::domain::config::SimConfig;
use crate::domain::error::Result;
use crate::domain::result::{
    simulation_digest, FailureStats, SimulationResult, RESULT_SCHEMA_VERSION,
};
use crate::oracle::Oracle;
use crate::runner::{cancel_channel, CancelHandle, CycleRunner};

/// One simulation run: a config, an oracle, and a cancellation handle.
pub struct Simulation {
    config: Arc<SimConfig>,
    oracle: Arc<dyn Oracle>,
    cancel: CancelHandle,
    cancel_rx: tokio::sync::watch::Receiver<bool>,
}

impl std::fmt::Debug for Simulation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Simulation")
            .field("config", &self.config)
            .field("oracle", &"<dyn Oracle>")
            .field("cancel", &self.cancel)
            .field("cancel_rx", &self.cancel_rx)
            .finish()
    }
}

impl Simulation {
    /// Validate the config and set up a run.
    ///
    /// This is the only point a simulation can hard-fail; everything after
    /// degrades into lower-confidence output.
    pub fn new(config: SimConfig, oracle: Arc<dyn Oracle>) -> Result<Self> {
        config.validate()?;
        let (cancel, cancel_rx) = cancel_channel();
        Ok(Self {
            config: Arc::new(config),
            oracle,
            cancel,
            cancel_rx,
        })
    }

    /// Handle that cancels this run from another task.
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Run all cycles and produce the final immutable result.
    ///
    /// Cancellation mid-run stops dispatch, finalizes the aggregator with
    /// whatever was collected, and records `aborted` in the failure stats —
    /// partial results are always valid, never corrupt.
    pub async fn run(&self) -> Result<SimulationResult> {
        let started_at = Utc::now();
        let sim_id = simulation_digest(&self.config, started_at)?;
        let settings = &self.config.simulation;

        info!(
            sim_id = %&sim_id[..16],
            cycles = settings.cycles,
            agents_per_cycle = self.config.evaluations_per_cycle(),
            "simulation starting"
        );

        let runner = CycleRunner::new(
            Arc::clone(&self.config),
            Arc::clone(&self.oracle),
            self.cancel_rx.clone(),
        );
        let mut aggregator = Aggregator::new(
            settings.confidence,
            settings.channel_weights,
            self.config.pricing.average_monthly_price(),
        );

        for cycle_index in 0..settings.cycles {
            if runner.cancelled() {
                info!(cycle = cycle_index, "cancellation observed, stopping dispatch");
                break;
            }
            let record = runner.run_cycle(cycle_index).await;
            aggregator.fold(&record);
        }

        let summary = aggregator.finalize();
        let synthesis = self.synthesize(&summary).await;
        let aborted = runner.cancelled();
        let completed_at = Utc::now();

        info!(
            sim_id = %&sim_id[..16],
            completed_cycles = summary.counters.folded_cycles,
            degraded = summary.counters.degraded_cycles,
            aborted,
            assessment = %synthesis.assessment,
            "simulation finished"
        );

        Ok(assemble_result(
            sim_id,
            started_at,
            completed_at,
            settings.cycles,
            summary,
            synthesis,
            aborted,
        ))
    }

    async fn synthesize(&self, summary: &AggregateSummary) -> Synthesis {
        if self.config.simulation.narrative {
            let advisor = AdvisorSynthesizer::new(
                Arc::clone(&self.oracle),
                self.config.simulation.oracle_retries,
            );
            advisor.synthesize(summary).await
        } else {
            rule_based_synthesis(summary)
        }
    }
}

fn assemble_result(
    sim_id: String,
    started_at: chrono::DateTime<Utc>,
    completed_at: chrono::DateTime<Utc>,
    cycles_requested: u32,
    summary: AggregateSummary,
    synthesis: Synthesis,
    aborted: bool,
) -> SimulationResult {
    let failures = FailureStats {
        total_evaluations: summary.counters.total_evaluations,
        invalid_decisions: summary.counters.invalid_decisions,
        degraded_cycles: summary.counters.degraded_cycles,
        completed_cycles: summary.counters.folded_cycles,
        aborted,
    };

    SimulationResult {
        schema_version: RESULT_SCHEMA_VERSION.to_string(),
        sim_id,
        started_at,
        completed_at,
        cycles_requested,
        metrics: summary.metrics,
        objections: summary.objections,
        channels: summary.channels,
        assessment: synthesis.assessment,
        confidence_score: synthesis.confidence_score,
        recommendations: synthesis.recommendations,
        risks: synthesis.risks,
        failures,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::config::minimal_config;
    use crate::domain::error::SimError;
    use crate::oracle::script::ScriptedOracle;

    #[tokio::test]
    async fn test_invalid_config_fails_before_any_cycle() {
        let mut config = minimal_config();
        config.simulation.cycles = 0;
        let oracle = Arc::new(ScriptedOracle::always("{}"));
        let err = Simulation::new(config, oracle).expect_err("must reject");
        assert!(matches!(err, SimError::InvalidConfig(_)));
    }

    #[tokio::test]
    async fn test_full_run_produces_result() {
        let mut config = minimal_config();
        config.simulation.cycles = 2;
        config.simulation.narrative = false;
        let oracle = Arc::new(ScriptedOracle::always(
            r#"{"decision": "BUY", "confidence": 0.9, "objections": []}"#,
        ));
        let sim = Simulation::new(config, oracle).expect("valid config");

        let result = sim.run().await.expect("run");
        assert_eq!(result.cycles_requested, 2);
        assert_eq!(result.failures.completed_cycles, 2);
        assert!(!result.failures.aborted);
        assert_eq!(result.sim_id.len(), 64);
        // One buyer + one channel agent per cycle; the buyer-shaped reply
        // fails channel validation, so half the decisions are invalid.
        assert_eq!(result.failures.total_evaluations, 4);
        assert_eq!(result.failures.invalid_decisions, 2);
    }

    #[tokio::test]
    async fn test_cancelled_run_finalizes_partial() {
        let mut config = minimal_config();
        config.simulation.cycles = 50;
        config.simulation.narrative = false;
        let oracle = Arc::new(ScriptedOracle::always(
            r#"{"decision": "PASS", "confidence": 0.4}"#,
        ));
        let sim = Simulation::new(config, oracle).expect("valid config");

        sim.cancel_handle().cancel();
        let result = sim.run().await.expect("run");
        assert!(result.failures.aborted);
        assert!(result.failures.completed_cycles < 50);
    }
}
