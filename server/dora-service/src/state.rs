//! Shared application state.

use crate::service::MetricsService;

pub struct AppState {
  pub service: MetricsService,
}
