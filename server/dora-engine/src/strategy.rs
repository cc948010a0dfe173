//! Infer which deployment shipped a change.
//!
//! Three heuristics run in fixed priority order; the first one that finds a deployment wins:
//! exact commit hash, a `#<n>` / `/pull/<n>` reference in the release body, then the earliest
//! deployment at or after the merge. A strategy without the data it needs reports no match.

use crate::config::{CandidateOrder, Config, ExactMatchPolicy};
use crate::normalize::change_reference;
use crate::types::{Change, Deployment};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MatchStrategy {
  ExactMatch,
  ReleaseBodyReference,
  TimeWindowNearest,
}


impl MatchStrategy {
  pub fn find_deployment<'a>(
    self,
    change: &Change,
    deployments: &'a [Deployment],
    config: &Config,
  ) -> Option<&'a Deployment> {
    match self {
      Self::ExactMatch => exact_match(change, deployments, config.exact_match),
      Self::ReleaseBodyReference => release_body_reference(change, deployments, config.release_order),
      Self::TimeWindowNearest => time_window_nearest(change, deployments),
    }
  }
}

/// The strategies in their fixed evaluation order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MatchChain;

impl MatchChain {
  pub const ORDER: [MatchStrategy; 3] = [
    MatchStrategy::ExactMatch,
    MatchStrategy::ReleaseBodyReference,
    MatchStrategy::TimeWindowNearest,
  ];

  /// Run the chain for one change; returns the winning strategy and its deployment.
  pub fn resolve<'a>(
    &self,
    change: &Change,
    deployments: &'a [Deployment],
    config: &Config,
  ) -> Option<(MatchStrategy, &'a Deployment)> {
    Self::ORDER
      .iter()
      .find_map(|&strategy| strategy.find_deployment(change, deployments, config).map(|d| (strategy, d)))
  }
}

/// First deployment (list order) with the change's commit hash. Timestamps are ignored.
fn exact_match<'a>(
  change: &Change,
  deployments: &'a [Deployment],
  policy: ExactMatchPolicy,
) -> Option<&'a Deployment> {
  let sha = change.commit_sha.as_deref().filter(|s| !s.is_empty())?;
  deployments.iter().find(|d| {
    d.commit_sha == sha
      && match policy {
        ExactMatchPolicy::AnyStatus => true,
        ExactMatchPolicy::SuccessfulOnly => d.is_successful(),
      }
  })
}

fn release_body_reference<'a>(
  change: &Change,
  deployments: &'a [Deployment],
  order: CandidateOrder,
) -> Option<&'a Deployment> {
  let reference = change_reference(&change.id)?;
  let hash_ref = format!("#{}", reference);
  let pull_ref = format!("/pull/{}", reference);

  let mut candidates = deployments.iter().filter(|d| {
    d.description
      .as_deref()
      .is_some_and(|body| body.contains(&hash_ref) || body.contains(&pull_ref))
  });

  match order {
    CandidateOrder::AsListed => candidates.next(),
    // min_by_key keeps the first of equal keys, so list order still breaks ties.
    CandidateOrder::ByDeployedAt => candidates.min_by_key(|d| (d.deployed_at.is_none(), d.deployed_at)),
  }
}

/// Earliest deployment at or after the merge instant.
fn time_window_nearest<'a>(change: &Change, deployments: &'a [Deployment]) -> Option<&'a Deployment> {
  let merged_at = change.merged_at?;
  deployments
    .iter()
    .filter_map(|d| d.deployed_at.filter(|&t| t >= merged_at).map(|t| (t, d)))
    .min_by_key(|(t, _)| *t)
    .map(|(_, d)| d)
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::{DateTime, Duration, TimeZone, Utc};

  fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 15, 10, 0, 0).unwrap()
  }

  fn change(id: &str, sha: Option<&str>, merged_after_hours: Option<i64>) -> Change {
    Change {
      id: id.into(),
      repository_url: "https://github.com/acme/api".into(),
      commit_sha: sha.map(Into::into),
      created_at: t0(),
      merged_at: merged_after_hours.map(|h| t0() + Duration::hours(h)),
      author: "dev".into(),
    }
  }

  fn deployment(id: &str, sha: &str, deployed_after_hours: Option<i64>, body: Option<&str>) -> Deployment {
    Deployment {
      id: id.into(),
      repository_url: "https://github.com/acme/api".into(),
      commit_sha: sha.into(),
      created_at: t0() - Duration::hours(1),
      deployed_at: deployed_after_hours.map(|h| t0() + Duration::hours(h)),
      environment: "production".into(),
      status: "SUCCESS".into(),
      description: body.map(Into::into),
    }
  }

  #[test]
  fn chain_order_is_fixed() {
    assert_eq!(
      MatchChain::ORDER,
      [
        MatchStrategy::ExactMatch,
        MatchStrategy::ReleaseBodyReference,
        MatchStrategy::TimeWindowNearest
      ]
    );
  }

  #[test]
  fn exact_match_ignores_timestamps_and_body() {
    let config = Config::default();
    let c = change("acme/api/pr/1", Some("sha-1"), Some(5));
    // Deployed before the merge and with an unrelated body: still authoritative.
    let deployments = vec![
      deployment("d0", "other", Some(6), Some("fixes #1")),
      deployment("d1", "sha-1", Some(-2), Some("nothing here")),
    ];
    let (strategy, d) = MatchChain.resolve(&c, &deployments, &config).unwrap();
    assert_eq!(strategy, MatchStrategy::ExactMatch);
    assert_eq!(d.id, "d1");
  }

  #[test]
  fn exact_match_takes_first_in_list_order() {
    let deployments = vec![
      deployment("late", "sha-1", Some(10), None),
      deployment("early", "sha-1", Some(1), None),
    ];
    let c = change("acme/api/pr/1", Some("sha-1"), None);
    let d = MatchStrategy::ExactMatch.find_deployment(&c, &deployments, &Config::default());
    assert_eq!(d.unwrap().id, "late");
  }

  #[test]
  fn exact_match_without_commit_hash_is_no_match() {
    let deployments = vec![deployment("d1", "", Some(1), None)];
    let c = change("acme/api/pr/1", None, None);
    assert!(MatchStrategy::ExactMatch.find_deployment(&c, &deployments, &Config::default()).is_none());
    let c = change("acme/api/pr/1", Some(""), None);
    assert!(MatchStrategy::ExactMatch.find_deployment(&c, &deployments, &Config::default()).is_none());
  }

  #[test]
  fn successful_only_policy_skips_failed_deployments() {
    let mut failed = deployment("failed", "sha-1", Some(1), None);
    failed.status = "FAILURE".into();
    let deployments = vec![failed, deployment("ok", "sha-1", Some(2), None)];
    let c = change("acme/api/pr/1", Some("sha-1"), None);

    let any = MatchStrategy::ExactMatch.find_deployment(&c, &deployments, &Config::default());
    assert_eq!(any.unwrap().id, "failed");

    let strict = Config {
      exact_match: ExactMatchPolicy::SuccessfulOnly,
      ..Config::default()
    };
    let only_ok = MatchStrategy::ExactMatch.find_deployment(&c, &deployments, &strict);
    assert_eq!(only_ok.unwrap().id, "ok");
  }

  #[test]
  fn release_body_matches_hash_or_pull_reference() {
    let config = Config::default();
    let deployments = vec![
      deployment("d1", "x", Some(1), Some("Release notes: nothing")),
      deployment("d2", "y", Some(2), Some("* Fix crash (https://github.com/acme/api/pull/42)")),
    ];
    let c = change("acme/api/pr/42", Some("unrelated"), Some(0));
    let (strategy, d) = MatchChain.resolve(&c, &deployments, &config).unwrap();
    assert_eq!(strategy, MatchStrategy::ReleaseBodyReference);
    assert_eq!(d.id, "d2");

    let deployments = vec![deployment("d3", "z", Some(3), Some("Includes #42 and #43"))];
    let d = MatchStrategy::ReleaseBodyReference.find_deployment(&c, &deployments, &config);
    assert_eq!(d.unwrap().id, "d3");
  }

  #[test]
  fn release_body_needs_a_reference_number() {
    let deployments = vec![deployment("d1", "x", Some(1), Some("#42"))];
    let c = change("c1", None, None);
    assert!(MatchStrategy::ReleaseBodyReference
      .find_deployment(&c, &deployments, &Config::default())
      .is_none());
  }

  #[test]
  fn release_body_order_is_configurable() {
    let deployments = vec![
      deployment("listed-first", "x", Some(9), Some("#7")),
      deployment("no-time", "y", None, Some("#7")),
      deployment("deployed-first", "z", Some(2), Some("#7")),
    ];
    let c = change("acme/api/pr/7", None, None);

    let listed = MatchStrategy::ReleaseBodyReference.find_deployment(&c, &deployments, &Config::default());
    assert_eq!(listed.unwrap().id, "listed-first");

    let by_time = Config {
      release_order: CandidateOrder::ByDeployedAt,
      ..Config::default()
    };
    let earliest = MatchStrategy::ReleaseBodyReference.find_deployment(&c, &deployments, &by_time);
    assert_eq!(earliest.unwrap().id, "deployed-first");
  }

  #[test]
  fn time_window_picks_earliest_at_or_after_merge() {
    let deployments = vec![
      deployment("before", "a", Some(1), None),
      deployment("later", "b", Some(8), None),
      deployment("nearest", "c", Some(4), None),
      deployment("undated", "d", None, None),
    ];
    let c = change("acme/api/pr/1", Some("none"), Some(3));
    let (strategy, d) = MatchChain.resolve(&c, &deployments, &Config::default()).unwrap();
    assert_eq!(strategy, MatchStrategy::TimeWindowNearest);
    assert_eq!(d.id, "nearest");
  }

  #[test]
  fn time_window_accepts_deploy_at_merge_instant() {
    let deployments = vec![deployment("same", "a", Some(3), None)];
    let c = change("acme/api/pr/1", None, Some(3));
    let d = MatchStrategy::TimeWindowNearest.find_deployment(&c, &deployments, &Config::default());
    assert_eq!(d.unwrap().id, "same");
  }

  #[test]
  fn time_window_never_selects_earlier_deployments() {
    let deployments = vec![deployment("before", "a", Some(1), None)];
    let c = change("acme/api/pr/1", None, Some(3));
    assert!(MatchChain.resolve(&c, &deployments, &Config::default()).is_none());
  }

  #[test]
  fn unmerged_change_without_other_evidence_is_unmatched() {
    let deployments = vec![deployment("d1", "a", Some(1), Some("v1.0"))];
    let c = change("acme/api/pr/5", Some("b"), None);
    assert!(MatchChain.resolve(&c, &deployments, &Config::default()).is_none());
  }
}
