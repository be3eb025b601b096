//! Multi-entity reconciliation: five per-kind matcher strategies, a
//! shared confidence-scoring model, a priority rule engine for category
//! hints, and the orchestrator that runs them over a batch.

pub mod engine;
pub mod matchers;
pub mod rules;
pub mod score;

pub use engine::{BatchMatch, CandidatePools, MatchEngine};
pub use matchers::{THRESHOLD_HIGH, THRESHOLD_LOW, THRESHOLD_MEDIUM};
pub use rules::{CategoryRule, CategoryRuleEngine, RuleError, RuleMatchType};
pub use score::{MatchKind, MultiEntityMatch, Signal, SignalKind};
