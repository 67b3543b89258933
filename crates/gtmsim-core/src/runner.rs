//! Cycle execution.
//!
//! A [`CycleRunner`] dispatches every configured evaluator for one cycle
//! through a bounded worker pool and collects the decisions into a
//! [`CycleRecord`]. Evaluators within a cycle are independent and
//! order-insensitive; the aggregator does not care about insertion order.

use std::sync::Arc;

use tokio::sync::{watch, Semaphore};
use tokio::task::JoinSet;
use tracing::{info, warn};

use crate::domain::config::SimConfig;
use crate::domain::cycle::CycleRecord;
use crate::domain::decision::AgentDecision;
use crate::evaluator::{AgentEvaluator, RoleContext};
use crate::oracle::Oracle;

/// Cloneable handle that cancels a run.
///
/// Cancelling stops dispatch of new evaluator calls; in-flight calls finish
/// or time out on their own, and the run finalizes with whatever was
/// collected.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        // Receivers may all be gone once the run finishes; that is fine.
        let _ = self.tx.send(true);
    }
}

/// Create a cancellation pair.
pub fn cancel_channel() -> (CancelHandle, watch::Receiver<bool>) {
    let (tx, rx) = watch::channel(false);
    (CancelHandle { tx: Arc::new(tx) }, rx)
}

/// Runs one simulation cycle at a time against a shared evaluator.
pub struct CycleRunner {
    config: Arc<SimConfig>,
    evaluator: Arc<AgentEvaluator>,
    semaphore: Arc<Semaphore>,
    cancel: watch::Receiver<bool>,
}

impl CycleRunner {
    pub fn new(
        config: Arc<SimConfig>,
        oracle: Arc<dyn Oracle>,
        cancel: watch::Receiver<bool>,
    ) -> Self {
        let evaluator = Arc::new(AgentEvaluator::new(oracle, Arc::clone(&config)));
        let semaphore = Arc::new(Semaphore::new(config.simulation.concurrency));
        Self {
            config,
            evaluator,
            semaphore,
            cancel,
        }
    }

    /// Whether cancellation has been requested.
    pub fn cancelled(&self) -> bool {
        *self.cancel.borrow()
    }

    /// The full evaluator invocation list for one cycle.
    fn invocations(&self) -> Vec<RoleContext> {
        let mut contexts = Vec::with_capacity(self.config.evaluations_per_cycle());
        for persona in &self.config.personas {
            for _ in 0..self.config.simulation.buyers_per_persona {
                contexts.push(RoleContext::Buyer(persona.clone()));
            }
        }
        for competitor in &self.config.competitors {
            contexts.push(RoleContext::Competitor(competitor.clone()));
        }
        for channel in &self.config.channels {
            contexts.push(RoleContext::Channel(channel.clone()));
        }
        contexts
    }

    /// Run one cycle and return its record.
    ///
    /// Blocks until every dispatched evaluation completes or times out
    /// individually. Evaluations not yet dispatched when cancellation hits
    /// are skipped, so a cancelled cycle may hold fewer decisions than the
    /// config implies.
    pub async fn run_cycle(&self, cycle_index: u32) -> CycleRecord {
        let contexts = self.invocations();
        let mut join_set: JoinSet<Option<AgentDecision>> = JoinSet::new();

        for context in contexts {
            let evaluator = Arc::clone(&self.evaluator);
            let semaphore = Arc::clone(&self.semaphore);
            let cancel = self.cancel.clone();
            join_set.spawn(async move {
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .expect("semaphore never closed");
                if *cancel.borrow() {
                    return None;
                }
                Some(evaluator.evaluate(&context, cycle_index).await)
            });
        }

        let mut decisions = Vec::new();
        let mut skipped = 0usize;
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok(Some(decision)) => decisions.push(decision),
                Ok(None) => skipped += 1,
                Err(e) => warn!(cycle = cycle_index, error = %e, "evaluator task panicked"),
            }
        }

        if skipped > 0 {
            warn!(
                cycle = cycle_index,
                skipped, "evaluations skipped after cancellation"
            );
        }

        let record = CycleRecord::new(
            cycle_index,
            decisions,
            self.config.simulation.degraded_ratio,
        );
        info!(
            cycle = cycle_index,
            decisions = record.decisions.len(),
            invalid = record.invalid_count,
            degraded = record.degraded,
            "cycle complete"
        );
        record
    }
}
