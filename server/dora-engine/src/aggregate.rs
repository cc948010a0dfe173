//! Reductions that need no change/deployment correlation.

use chrono::Duration;

use crate::types::{Deployment, Incident, TimeWindow};

/// Deployments per day over the window (a zero-day window counts as one day).
pub fn deployment_frequency(deployments: &[Deployment], window: &TimeWindow) -> f64 {
  deployments.len() as f64 / window.days() as f64
}

/// Incidents per deployment as a percentage; 0 when there are no deployments.
///
/// Assumes one incident per failed deployment; incidents are not attributed to
/// specific deployments.
pub fn change_failure_rate(deployments: &[Deployment], incidents: &[Incident]) -> f64 {
  if deployments.is_empty() {
    return 0.0;
  }
  incidents.len() as f64 / deployments.len() as f64 * 100.0
}

/// Mean `resolved_at - created_at` in whole seconds over resolved incidents.
pub fn time_to_restore(incidents: &[Incident]) -> Duration {
  let restore_times: Vec<i64> = incidents
    .iter()
    .filter_map(|i| i.resolved_at.map(|resolved| (resolved - i.created_at).num_seconds()))
    .collect();

  if restore_times.is_empty() {
    return Duration::zero();
  }
  let total: i128 = restore_times.iter().map(|&s| s as i128).sum();
  let mean = total / restore_times.len() as i128;
  Duration::try_seconds(mean as i64).unwrap_or_else(Duration::zero)
}
