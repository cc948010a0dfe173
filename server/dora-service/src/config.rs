//! Service configuration from environment variables.

use std::net::{IpAddr, Ipv4Addr};

use crate::error::ConfigError;
use crate::github::GitHubConfig;

#[derive(Debug, Clone)]
pub struct ServiceConfig {
  pub bind_addr: IpAddr,
  pub port: u16,
  /// PostgreSQL URL; `None` selects the in-memory store.
  pub database_url: Option<String>,
  pub github: GitHubConfig,
  pub engine: dora_engine::Config,
  /// Drop fetched events that start after the window end.
  pub clip_to_window: bool,
}

impl Default for ServiceConfig {
  fn default() -> Self {
    Self {
      bind_addr: IpAddr::V4(Ipv4Addr::LOCALHOST),
      port: 5005,
      database_url: None,
      github: GitHubConfig::default(),
      engine: dora_engine::Config::default(),
      clip_to_window: true,
    }
  }
}

impl ServiceConfig {
  pub fn from_env() -> Result<Self, ConfigError> {
    Self::from_lookup(|key| std::env::var(key).ok())
  }

  /// Build from any key lookup; empty values count as unset.
  pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
    let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
    let mut config = Self::default();

    if let Some(v) = get("BIND_ADDR") {
      config.bind_addr = v
        .parse()
        .map_err(|_| ConfigError::invalid("BIND_ADDR", format!("not an IP address: {}", v)))?;
    }
    if let Some(v) = get("PORT") {
      config.port = v
        .parse()
        .map_err(|_| ConfigError::invalid("PORT", format!("not a valid u16: {}", v)))?;
    }
    config.database_url = get("DATABASE_URL");

    if let Some(v) = get("GITHUB_API_URL") {
      config.github.api_url = v;
    }
    config.github.token = get("GITHUB_TOKEN");
    if let Some(v) = get("GITHUB_INCIDENT_LABEL") {
      config.github.incident_label = v;
    }

    config.engine = dora_engine::Config::from_lookup(&get)?;

    if let Some(v) = get("DORA_CLIP_TO_WINDOW") {
      config.clip_to_window = match v.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => true,
        "0" | "false" | "no" | "off" => false,
        _ => return Err(ConfigError::invalid("DORA_CLIP_TO_WINDOW", format!("expected true|false: {}", v))),
      };
    }

    Ok(config)
  }
}
