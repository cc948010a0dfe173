//! DORA Metrics Engine — deterministic, rule-based.
//!
//! Infers which deployment shipped each change through a prioritized chain of
//! heuristics, then reduces changes, deployments and incidents to lead time for
//! changes, deployment frequency, change failure rate and time to restore service.
//!
//! No DB, no network; pure computation over already-fetched lists.

pub mod aggregate;
pub mod config;
pub mod engine;
pub mod error;
pub mod lead_time;
pub mod normalize;
pub mod strategy;
pub mod types;

pub use config::{CandidateOrder, Config, ExactMatchPolicy};
pub use engine::Engine;
pub use error::EngineError;
pub use lead_time::{LeadTimeCalculator, LeadTimeReport};
pub use strategy::{MatchChain, MatchStrategy};
pub use types::{Change, Deployment, DoraMetrics, EventBatch, Incident, TimeWindow};
