//! Binary entrypoint for the DORA metrics service.

use std::net::SocketAddr;
use std::sync::Arc;

use dora_engine::Engine;
use dora_service::github::GitHubProvider;
use dora_service::postgres::PgEventStore;
use dora_service::{AppState, EventStore, MemoryEventStore, MetricsService, ServiceConfig};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
    .with_target(false)
    .init();

  let config = ServiceConfig::from_env()?;

  let store: Arc<dyn EventStore> = match &config.database_url {
    Some(url) => {
      let store = PgEventStore::connect(url).await?;
      store.ensure_schema().await?;
      Arc::new(store)
    }
    None => {
      warn!("DATABASE_URL not set; events are kept in memory only");
      Arc::new(MemoryEventStore::new())
    }
  };
  let provider = Arc::new(GitHubProvider::new(config.github.clone())?);
  if config.github.token.is_none() {
    warn!("GITHUB_TOKEN not set; using unauthenticated GitHub API requests");
  }

  let service = MetricsService::new(provider, store, Engine::new(config.engine.clone()))
    .with_clip_to_window(config.clip_to_window);
  let app = dora_service::router(Arc::new(AppState { service }));

  let addr = SocketAddr::new(config.bind_addr, config.port);
  info!(
    %addr,
    exact_match = ?config.engine.exact_match,
    release_order = ?config.engine.release_order,
    "dora-service listening"
  );

  let listener = tokio::net::TcpListener::bind(addr).await?;
  axum::serve(listener, app).await?;

  Ok(())
}
