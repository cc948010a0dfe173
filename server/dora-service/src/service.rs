//! `calculate_metrics`: fetch, persist, compute.

use std::sync::Arc;

use dora_engine::normalize::repo_path;
use dora_engine::{DoraMetrics, Engine, EventBatch, TimeWindow};
use tracing::{info, info_span, Instrument};
use uuid::Uuid;

use crate::error::ServiceError;
use crate::provider::EventProvider;
use crate::store::EventStore;

pub struct MetricsService {
  provider: Arc<dyn EventProvider>,
  store: Arc<dyn EventStore>,
  engine: Engine,
  clip_to_window: bool,
}

impl MetricsService {
  pub fn new(provider: Arc<dyn EventProvider>, store: Arc<dyn EventStore>, engine: Engine) -> Self {
    Self {
      provider,
      store,
      engine,
      clip_to_window: true,
    }
  }

  pub fn with_clip_to_window(mut self, clip: bool) -> Self {
    self.clip_to_window = clip;
    self
  }

  /// Compute the four metrics for `repo_url` over `window`.
  ///
  /// Events are fetched from `window.start`. Invalid arguments fail before any I/O;
  /// provider and store failures propagate. The computation itself cannot fail.
  pub async fn calculate_metrics(&self, repo_url: &str, window: TimeWindow) -> Result<DoraMetrics, ServiceError> {
    window.validate()?;
    let repo = repo_path(repo_url)?;
    let scan_id = Uuid::new_v4();

    let span = info_span!("scan", %scan_id, repo = %repo);
    self.scan(repo_url, window).instrument(span).await
  }

  async fn scan(&self, repo_url: &str, window: TimeWindow) -> Result<DoraMetrics, ServiceError> {
    let since = window.start;
    let (deployments, changes, incidents) = tokio::try_join!(
      self.provider.fetch_deployments(repo_url, since),
      self.provider.fetch_changes(repo_url, since),
      self.provider.fetch_incidents(repo_url, since),
    )?;

    let fetched = EventBatch {
      changes,
      deployments,
      incidents,
    };
    let events = if self.clip_to_window {
      fetched.clipped_to(&window)
    } else {
      fetched
    };

    self.store.save_deployments(&events.deployments).await?;
    self.store.save_changes(&events.changes).await?;
    self.store.save_incidents(&events.incidents).await?;

    let (metrics, report) = self.engine.compute_detailed(&events, &window);

    info!(
      changes = events.changes.len(),
      deployments = events.deployments.len(),
      incidents = events.incidents.len(),
      matched = report.matches.len(),
      unmatched = report.unmatched.len(),
      by_strategy = ?report.counts_by_strategy(),
      lead_time_secs = metrics.lead_time_for_changes.num_seconds(),
      deployment_frequency = metrics.deployment_frequency,
      change_failure_rate = metrics.change_failure_rate,
      time_to_restore_secs = metrics.time_to_restore_service.num_seconds(),
      "scan complete"
    );

    Ok(metrics)
  }
}
