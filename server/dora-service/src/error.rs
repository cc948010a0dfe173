//! Structured error types for the metrics service.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use dora_engine::types::ErrorOutput;
use dora_engine::EngineError;
use thiserror::Error;
use tracing::error;

/// Failures of the source-event provider.
#[derive(Debug, Error)]
pub enum ProviderError {
  #[error("repository not found: {0}")]
  RepositoryNotFound(String),

  #[error("{url} returned HTTP {status}")]
  Status { url: String, status: u16 },

  #[error("http: {0}")]
  Http(#[from] reqwest::Error),
}

pub type ProviderResult<T> = Result<T, ProviderError>;

/// Failures of the event store.
#[derive(Debug, Error)]
pub enum StoreError {
  #[error("database: {0}")]
  Database(#[from] sqlx_core::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("config: {key}: {reason}")]
  Invalid { key: String, reason: String },

  #[error("config: {0}")]
  Engine(#[from] EngineError),
}

impl ConfigError {
  pub fn invalid(key: &str, reason: impl Into<String>) -> Self {
    Self::Invalid {
      key: key.to_string(),
      reason: reason.into(),
    }
  }
}

/// Errors surfaced by `calculate_metrics` and the HTTP boundary.
#[derive(Debug, Error)]
pub enum ServiceError {
  #[error("{0}")]
  Validation(#[from] EngineError),

  #[error("invalid request body: {0}")]
  Body(String),

  #[error("provider: {0}")]
  Provider(#[from] ProviderError),

  #[error("store: {0}")]
  Store(#[from] StoreError),
}

impl ServiceError {
  pub fn status(&self) -> StatusCode {
    match self {
      Self::Validation(_) | Self::Body(_) => StatusCode::BAD_REQUEST,
      Self::Provider(ProviderError::RepositoryNotFound(_)) => StatusCode::BAD_REQUEST,
      Self::Provider(_) | Self::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
  }
}

impl IntoResponse for ServiceError {
  fn into_response(self) -> Response {
    let status = self.status();
    let body = match &self {
      Self::Validation(e) => ErrorOutput::from(e),
      Self::Body(msg) => ErrorOutput::new(msg.clone()),
      Self::Provider(ProviderError::RepositoryNotFound(repo)) => {
        ErrorOutput::new(format!("repository not found: {}", repo)).with_field("repoUrl")
      }
      _ => {
        error!(error = %self, "scan failed");
        ErrorOutput::new(format!("An error occurred: {}", self))
      }
    };
    (status, Json(body)).into_response()
  }
}
