//! HTTP handlers for the metrics service.

use axum::extract::rejection::JsonRejection;
use axum::{extract::State, Json};
use dora_engine::DoraMetrics;
use std::sync::Arc;

use crate::error::ServiceError;
use crate::state::AppState;
use crate::types::ScanRequest;

pub async fn health() -> &'static str {
  "ok"
}

pub async fn scan(
  State(state): State<Arc<AppState>>,
  payload: Result<Json<ScanRequest>, JsonRejection>,
) -> Result<Json<DoraMetrics>, ServiceError> {
  let Json(request) = payload.map_err(|e| ServiceError::Body(e.body_text()))?;
  let metrics = state
    .service
    .calculate_metrics(&request.repo_url, request.time_window)
    .await?;
  Ok(Json(metrics))
}
