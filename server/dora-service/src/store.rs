//! Event store: idempotent persistence of fetched events, keyed by id.

use std::collections::BTreeMap;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use dora_engine::{Change, Deployment, Incident};

use crate::error::StoreResult;

/// Upsert semantics: saving an event whose id already exists replaces it.
#[async_trait]
pub trait EventStore: Send + Sync {
  async fn save_deployments(&self, deployments: &[Deployment]) -> StoreResult<()>;

  async fn save_changes(&self, changes: &[Change]) -> StoreResult<()>;

  async fn save_incidents(&self, incidents: &[Incident]) -> StoreResult<()>;
}

/// In-memory store backed by id-ordered maps.
#[derive(Debug, Default)]
pub struct MemoryEventStore {
  deployments: Mutex<BTreeMap<String, Deployment>>,
  changes: Mutex<BTreeMap<String, Change>>,
  incidents: Mutex<BTreeMap<String, Incident>>,
}

impl MemoryEventStore {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn deployments(&self) -> Vec<Deployment> {
    snapshot(&self.deployments)
  }

  pub fn changes(&self) -> Vec<Change> {
    snapshot(&self.changes)
  }

  pub fn incidents(&self) -> Vec<Incident> {
    snapshot(&self.incidents)
  }
}

fn snapshot<T: Clone>(map: &Mutex<BTreeMap<String, T>>) -> Vec<T> {
  map.lock().unwrap_or_else(PoisonError::into_inner).values().cloned().collect()
}

fn upsert<T: Clone>(map: &Mutex<BTreeMap<String, T>>, items: &[T], id: impl Fn(&T) -> &str) {
  let mut map = map.lock().unwrap_or_else(PoisonError::into_inner);
  for item in items {
    map.insert(id(item).to_string(), item.clone());
  }
}

#[async_trait]
impl EventStore for MemoryEventStore {
  async fn save_deployments(&self, deployments: &[Deployment]) -> StoreResult<()> {
    upsert(&self.deployments, deployments, |d| d.id.as_str());
    Ok(())
  }

  async fn save_changes(&self, changes: &[Change]) -> StoreResult<()> {
    upsert(&self.changes, changes, |c| c.id.as_str());
    Ok(())
  }

  async fn save_incidents(&self, incidents: &[Incident]) -> StoreResult<()> {
    upsert(&self.incidents, incidents, |i| i.id.as_str());
    Ok(())
  }
}
