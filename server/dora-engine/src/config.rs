//! Engine configuration with sane defaults.

use std::str::FromStr;

use crate::error::EngineError;

/// Which deployments the exact commit-hash strategy may match.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExactMatchPolicy {
  /// Any deployment, whatever its status.
  #[default]
  AnyStatus,
  /// Only deployments whose status is `SUCCESS`.
  SuccessfulOnly,
}

impl FromStr for ExactMatchPolicy {
  type Err = EngineError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_ascii_lowercase().as_str() {
      "any" | "any_status" => Ok(Self::AnyStatus),
      "successful" | "success" | "successful_only" => Ok(Self::SuccessfulOnly),
      _ => Err(EngineError::validation("exact_match", "expected any|successful")),
    }
  }
}

/// Scan order for the release-body reference strategy.
///
/// `AsListed` makes the deployment list order part of the input contract: the first
/// listed deployment mentioning the change wins.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CandidateOrder {
  #[default]
  AsListed,
  /// Earliest deployed-at first; deployments without one go last.
  ByDeployedAt,
}

impl FromStr for CandidateOrder {
  type Err = EngineError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_ascii_lowercase().as_str() {
      "listed" | "as_listed" => Ok(Self::AsListed),
      "deployed_at" | "by_deployed_at" => Ok(Self::ByDeployedAt),
      _ => Err(EngineError::validation("release_order", "expected listed|deployed_at")),
    }
  }
}

/// Tunable matching policy.
#[derive(Debug, Clone, Default)]
pub struct Config {
  pub exact_match: ExactMatchPolicy,
  pub release_order: CandidateOrder,
}

impl Config {
  /// Read `DORA_EXACT_MATCH` and `DORA_RELEASE_ORDER`; unset keys keep their defaults.
  pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, EngineError> {
    let mut config = Self::default();
    if let Some(v) = lookup("DORA_EXACT_MATCH") {
      config.exact_match = v.parse()?;
    }
    if let Some(v) = lookup("DORA_RELEASE_ORDER") {
      config.release_order = v.parse()?;
    }
    Ok(config)
  }

  pub fn from_env() -> Result<Self, EngineError> {
    Self::from_lookup(|key| std::env::var(key).ok())
  }
}
