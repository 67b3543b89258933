//! GTMSim Core Library
//!
//! Multi-agent go-to-market simulation: role-played buyer, competitor, and
//! channel agents evaluated against an LLM oracle across repeated cycles,
//! aggregated into a reproducible result artifact with confidence bands.

pub mod advisor;
pub mod aggregator;
pub mod compare;
pub mod domain;
pub mod engine;
pub mod evaluator;
pub mod oracle;
pub mod report;
pub mod runner;
pub mod telemetry;

pub use domain::{
    simulation_digest, AgentDecision, AgentRole, Assessment, BuyerVerdict, ChannelConfig,
    ChannelRanking, ChannelWeights, CompetitorConfig, CompetitorReaction, ConfidenceLevel,
    ConfidencePolicy, CycleRecord, DecisionPayload, FailureStats, MetricBand, MetricKind,
    ObjectionSummary, OracleError, PersonaConfig, PricingConfig, PricingTier, ProductConfig,
    Result, SimConfig, SimError, SimulationResult, SimulationSettings, WillingnessToPay,
    RESULT_SCHEMA_VERSION,
};

pub use advisor::{rule_based_synthesis, AdvisorSynthesizer, Synthesis};
pub use aggregator::{AggregateSummary, Aggregator, MetricSample, ObjectionTally};
pub use compare::{
    compare, compare_with_deadband, ComparisonResult, Direction, MetricDelta, RankingDiff,
    RankShift,
};
pub use engine::Simulation;
pub use evaluator::{AgentEvaluator, RoleContext};
pub use oracle::http::{HttpOracle, HttpOracleConfig, Provider};
pub use oracle::script::ScriptedOracle;
pub use oracle::{invoke_with_retry, Oracle, OracleRequest, OracleResponse};
pub use report::{
    load_result_json, render_comparison_md, render_result_md, write_result_json,
};
pub use runner::{CancelHandle, CycleRunner};
pub use telemetry::init_tracing;

/// GTMSim version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
