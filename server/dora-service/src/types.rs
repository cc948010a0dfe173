//! Request types for the metrics API.

use dora_engine::TimeWindow;
use serde::Deserialize;

/// Body of `POST /api/metrics/scan`. Unknown fields are ignored.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanRequest {
  pub repo_url: String,
  pub time_window: TimeWindow,
}
