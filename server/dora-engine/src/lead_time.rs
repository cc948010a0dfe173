//! Lead time for changes: resolve each change to a deployment and average the gaps.

use std::collections::BTreeMap;

use chrono::Duration;
use tracing::debug;

use crate::config::Config;
use crate::strategy::{MatchChain, MatchStrategy};
use crate::types::{Change, Deployment};

/// One resolved (change, deployment) pair.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeMatch {
  pub change_id: String,
  pub deployment_id: String,
  pub strategy: MatchStrategy,
  /// `deployed_at - created_at`, unclamped; negative when the data is skewed.
  pub lead_time_seconds: i64,
}

/// Per-change resolution detail behind the published average.
#[derive(Debug, Clone, Default)]
pub struct LeadTimeReport {
  pub matches: Vec<ChangeMatch>,
  pub unmatched: Vec<String>,
}

impl LeadTimeReport {
  /// Arithmetic mean in whole seconds, truncated toward zero; zero when nothing matched.
  pub fn average(&self) -> Duration {
    if self.matches.is_empty() {
      return Duration::zero();
    }
    let total: i128 = self.matches.iter().map(|m| m.lead_time_seconds as i128).sum();
    let mean = total / self.matches.len() as i128;
    Duration::try_seconds(mean as i64).unwrap_or_else(Duration::zero)
  }

  pub fn counts_by_strategy(&self) -> BTreeMap<MatchStrategy, usize> {
    let mut counts = BTreeMap::new();
    for m in &self.matches {
      *counts.entry(m.strategy).or_insert(0) += 1;
    }
    counts
  }
}

#[derive(Debug, Clone, Default)]
pub struct LeadTimeCalculator {
  config: Config,
}

impl LeadTimeCalculator {
  pub fn new(config: Config) -> Self {
    Self { config }
  }

  /// Average lead time over every change the match chain resolves.
  pub fn calculate(&self, changes: &[Change], deployments: &[Deployment]) -> Duration {
    self.analyze(changes, deployments).average()
  }

  /// Resolve every change and keep the per-pair detail.
  ///
  /// A resolved deployment without a deployed-at instant cannot produce a lead time;
  /// its change is reported as unmatched.
  pub fn analyze(&self, changes: &[Change], deployments: &[Deployment]) -> LeadTimeReport {
    let mut report = LeadTimeReport::default();

    for change in changes {
      let resolved = MatchChain.resolve(change, deployments, &self.config)
        .and_then(|(strategy, d)| d.deployed_at.map(|deployed_at| (strategy, d, deployed_at)));

      match resolved {
        Some((strategy, deployment, deployed_at)) => {
          let lead_time_seconds = (deployed_at - change.created_at).num_seconds();
          debug!(
            change = %change.id,
            deployment = %deployment.id,
            ?strategy,
            lead_time_seconds,
            "change resolved"
          );
          report.matches.push(ChangeMatch {
            change_id: change.id.clone(),
            deployment_id: deployment.id.clone(),
            strategy,
            lead_time_seconds,
          });
        }
        None => {
          debug!(change = %change.id, "change unmatched");
          report.unmatched.push(change.id.clone());
        }
      }
    }

    report
  }
}
