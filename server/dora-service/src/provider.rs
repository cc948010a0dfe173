//! Source-event provider: where changes, deployments and incidents come from.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dora_engine::{Change, Deployment, EventBatch, Incident};

use crate::error::ProviderResult;

/// Returns raw event lists for a repository since an instant (UTC).
///
/// Lists are expected to be filtered to `since` at least approximately; the engine
/// applies no further lower-bound filtering.
#[async_trait]
pub trait EventProvider: Send + Sync {
  async fn fetch_deployments(&self, repo_url: &str, since: DateTime<Utc>) -> ProviderResult<Vec<Deployment>>;

  async fn fetch_changes(&self, repo_url: &str, since: DateTime<Utc>) -> ProviderResult<Vec<Change>>;

  async fn fetch_incidents(&self, repo_url: &str, since: DateTime<Utc>) -> ProviderResult<Vec<Incident>>;
}

/// Serves a fixed batch, applying the same `since` rules as the GitHub provider:
/// deployments by deploy time, changes by merge time, incidents by creation time.
/// Events with no such instant are skipped.
#[derive(Debug, Clone, Default)]
pub struct StaticEventProvider {
  events: EventBatch,
}

impl StaticEventProvider {
  pub fn new(events: EventBatch) -> Self {
    Self { events }
  }
}

#[async_trait]
impl EventProvider for StaticEventProvider {
  async fn fetch_deployments(&self, _repo_url: &str, since: DateTime<Utc>) -> ProviderResult<Vec<Deployment>> {
    Ok(
      self
        .events
        .deployments
        .iter()
        .filter(|d| d.deployed_at.is_some_and(|t| t > since))
        .cloned()
        .collect(),
    )
  }

  async fn fetch_changes(&self, _repo_url: &str, since: DateTime<Utc>) -> ProviderResult<Vec<Change>> {
    Ok(
      self
        .events
        .changes
        .iter()
        .filter(|c| c.merged_at.is_some_and(|t| t > since))
        .cloned()
        .collect(),
    )
  }

  async fn fetch_incidents(&self, _repo_url: &str, since: DateTime<Utc>) -> ProviderResult<Vec<Incident>> {
    Ok(
      self
        .events
        .incidents
        .iter()
        .filter(|i| i.created_at > since)
        .cloned()
        .collect(),
    )
  }
}
