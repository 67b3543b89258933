//! Domain model: configuration, decisions, cycle records, and the final
//! result artifact.

pub mod config;
pub mod cycle;
pub mod decision;
pub mod error;
pub mod result;

pub use config::{
    ChannelConfig, ChannelWeights, CompetitorConfig, ConfidencePolicy, PersonaConfig,
    PricingConfig, PricingTier, ProductConfig, SimConfig, SimulationSettings,
};
pub use cycle::CycleRecord;
pub use decision::{
    AgentDecision, AgentRole, BuyerVerdict, CompetitorReaction, DecisionPayload, WillingnessToPay,
};
pub use error::{OracleError, Result, SimError};
pub use result::{
    simulation_digest, Assessment, ChannelRanking, ConfidenceLevel, FailureStats, MetricBand,
    MetricKind, ObjectionSummary, SimulationResult, RESULT_SCHEMA_VERSION,
};
