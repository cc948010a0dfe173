//! DORA Metrics Service
//!
//! HTTP service that scans a repository's pull requests, releases and incident issues
//! and returns the four DORA metrics computed by `dora-engine`.
//! Bind to 127.0.0.1 by default (internal only).

pub mod config;
pub mod error;
pub mod github;
mod handlers;
pub mod postgres;
pub mod provider;
pub mod service;
mod state;
pub mod store;
mod types;

use axum::{routing::get, routing::post, Router};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

pub use config::ServiceConfig;
pub use error::{ProviderError, ServiceError, StoreError};
pub use handlers::{health, scan};
pub use provider::{EventProvider, StaticEventProvider};
pub use service::MetricsService;
pub use state::AppState;
pub use store::{EventStore, MemoryEventStore};
pub use types::ScanRequest;

/// `GET /health` and `POST /api/metrics/scan`.
pub fn router(state: Arc<AppState>) -> Router {
  Router::new()
    .route("/health", get(health))
    .route("/api/metrics/scan", post(scan))
    .layer(CorsLayer::permissive())
    .with_state(state)
}
