//! Core engine: one-shot pipeline from raw event lists to the four indicators.

use tracing::debug;

use crate::aggregate;
use crate::config::Config;
use crate::lead_time::{LeadTimeCalculator, LeadTimeReport};
use crate::types::*;

/// The DORA metrics engine. Stateless apart from its configuration, so a single
/// instance can serve concurrent scans.
#[derive(Debug, Clone, Default)]
pub struct Engine {
  lead_time: LeadTimeCalculator,
}

impl Engine {
  pub fn new(config: Config) -> Self {
    Self {
      lead_time: LeadTimeCalculator::new(config),
    }
  }

  pub fn with_defaults() -> Self {
    Self::default()
  }

  /// Compute the four indicators for one repository over `window`.
  ///
  /// Never fails: malformed records are excluded and empty lists yield zeros.
  pub fn compute(&self, events: &EventBatch, window: &TimeWindow) -> DoraMetrics {
    self.compute_detailed(events, window).0
  }

  /// Same as `compute`, plus the per-change lead-time resolution.
  pub fn compute_detailed(&self, events: &EventBatch, window: &TimeWindow) -> (DoraMetrics, LeadTimeReport) {
    let report = self.lead_time.analyze(&events.changes, &events.deployments);

    let metrics = DoraMetrics {
      lead_time_for_changes: report.average(),
      deployment_frequency: aggregate::deployment_frequency(&events.deployments, window),
      change_failure_rate: aggregate::change_failure_rate(&events.deployments, &events.incidents),
      time_to_restore_service: aggregate::time_to_restore(&events.incidents),
    };

    debug!(
      changes = events.changes.len(),
      matched = report.matches.len(),
      unmatched = report.unmatched.len(),
      deployments = events.deployments.len(),
      incidents = events.incidents.len(),
      "metrics computed"
    );

    (metrics, report)
  }
}

impl EventBatch {
  /// Drop events that begin after the window end. The lower bound is left to the provider.
  ///
  /// Changes are placed by merge time, deployments by deploy time (each falling back to
  /// their creation time), incidents by creation time.
  pub fn clipped_to(&self, window: &TimeWindow) -> EventBatch {
    let end = window.end;
    EventBatch {
      changes: self
        .changes
        .iter()
        .filter(|c| c.merged_at.unwrap_or(c.created_at) <= end)
        .cloned()
        .collect(),
      deployments: self
        .deployments
        .iter()
        .filter(|d| d.deployed_at.unwrap_or(d.created_at) <= end)
        .cloned()
        .collect(),
      incidents: self
        .incidents
        .iter()
        .filter(|i| i.created_at <= end)
        .cloned()
        .collect(),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::{DateTime, Duration, TimeZone, Utc};

  fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()
  }

  fn change(id: &str, sha: &str, merged: DateTime<Utc>) -> Change {
    Change {
      id: id.into(),
      repository_url: "https://github.com/acme/api".into(),
      commit_sha: Some(sha.into()),
      created_at: merged - Duration::hours(1),
      merged_at: Some(merged),
      author: "dev".into(),
    }
  }

  fn deployment(id: &str, sha: &str, deployed: DateTime<Utc>) -> Deployment {
    Deployment {
      id: id.into(),
      repository_url: "https://github.com/acme/api".into(),
      commit_sha: sha.into(),
      created_at: deployed,
      deployed_at: Some(deployed),
      environment: "production".into(),
      status: "SUCCESS".into(),
      description: None,
    }
  }

  fn incident(id: &str, opened: DateTime<Utc>, minutes: i64) -> Incident {
    Incident {
      id: id.into(),
      repository_url: "https://github.com/acme/api".into(),
      created_at: opened,
      resolved_at: Some(opened + Duration::minutes(minutes)),
      severity: "sev2".into(),
      description: "checkout down".into(),
    }
  }

  #[test]
  fn empty_batch_yields_zero_metrics() {
    let engine = Engine::with_defaults();
    let window = TimeWindow::new(t0(), t0()).unwrap();
    assert_eq!(engine.compute(&EventBatch::default(), &window), DoraMetrics::zero());
  }

  #[test]
  fn full_pipeline() {
    let engine = Engine::with_defaults();
    let window = TimeWindow::new(t0(), t0() + Duration::days(4)).unwrap();
    let events = EventBatch {
      changes: vec![change("acme/api/pr/1", "sha-1", t0() + Duration::hours(1))],
      deployments: vec![
        deployment("d1", "sha-1", t0() + Duration::hours(2)),
        deployment("d2", "sha-2", t0() + Duration::days(2)),
      ],
      incidents: vec![incident("i1", t0() + Duration::days(2), 30)],
    };

    let (metrics, report) = engine.compute_detailed(&events, &window);
    // created 1h before merge, deployed 1h after merge.
    assert_eq!(metrics.lead_time_for_changes, Duration::hours(2));
    assert!((metrics.deployment_frequency - 0.5).abs() < f64::EPSILON);
    assert!((metrics.change_failure_rate - 50.0).abs() < f64::EPSILON);
    assert_eq!(metrics.time_to_restore_service, Duration::minutes(30));
    assert_eq!(report.matches.len(), 1);
  }

  #[test]
  fn clipping_drops_events_after_window_end_only() {
    let window = TimeWindow::new(t0() + Duration::days(1), t0() + Duration::days(3)).unwrap();
    let events = EventBatch {
      changes: vec![
        change("old", "a", t0()),
        change("inside", "b", t0() + Duration::days(2)),
        change("future", "c", t0() + Duration::days(5)),
      ],
      deployments: vec![
        deployment("inside", "b", t0() + Duration::days(3)),
        deployment("future", "c", t0() + Duration::days(4)),
      ],
      incidents: vec![
        incident("inside", t0() + Duration::days(2), 10),
        incident("future", t0() + Duration::days(6), 10),
      ],
    };

    let clipped = events.clipped_to(&window);
    let ids: Vec<&str> = clipped.changes.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(ids, vec!["old", "inside"]);
    assert_eq!(clipped.deployments.len(), 1);
    assert_eq!(clipped.deployments[0].id, "inside");
    assert_eq!(clipped.incidents.len(), 1);
    assert_eq!(clipped.incidents[0].id, "inside");
  }

  #[test]
  fn output_is_deterministic() {
    let engine = Engine::with_defaults();
    let window = TimeWindow::new(t0(), t0() + Duration::days(7)).unwrap();
    let events = EventBatch {
      changes: vec![change("acme/api/pr/3", "sha-3", t0() + Duration::hours(5))],
      deployments: vec![deployment("d3", "zzz", t0() + Duration::hours(9))],
      incidents: vec![],
    };
    let a = serde_json::to_string(&engine.compute(&events, &window)).unwrap();
    let b = serde_json::to_string(&engine.compute(&events, &window)).unwrap();
    assert_eq!(a, b);
  }
}
