//! PostgreSQL event store (`INSERT ... ON CONFLICT (id) DO UPDATE`).

use async_trait::async_trait;
use dora_engine::{Change, Deployment, Incident};
use sqlx_core::query::query;
use sqlx_postgres::{PgPool, Postgres};
use tracing::info;

use crate::error::StoreResult;
use crate::store::EventStore;

const SCHEMA: [&str; 3] = [
  r#"
  CREATE TABLE IF NOT EXISTS dora_deployments (
    id TEXT PRIMARY KEY,
    repository_url TEXT NOT NULL,
    commit_sha TEXT NOT NULL,
    created_at TIMESTAMPTZ NOT NULL,
    deployed_at TIMESTAMPTZ,
    environment TEXT NOT NULL,
    status TEXT NOT NULL,
    description TEXT
  )
  "#,
  r#"
  CREATE TABLE IF NOT EXISTS dora_changes (
    id TEXT PRIMARY KEY,
    repository_url TEXT NOT NULL,
    commit_sha TEXT,
    created_at TIMESTAMPTZ NOT NULL,
    merged_at TIMESTAMPTZ,
    author TEXT NOT NULL
  )
  "#,
  r#"
  CREATE TABLE IF NOT EXISTS dora_incidents (
    id TEXT PRIMARY KEY,
    repository_url TEXT NOT NULL,
    created_at TIMESTAMPTZ NOT NULL,
    resolved_at TIMESTAMPTZ,
    severity TEXT NOT NULL,
    description TEXT NOT NULL
  )
  "#,
];

pub struct PgEventStore {
  pool: PgPool,
}

impl PgEventStore {
  pub async fn connect(database_url: &str) -> StoreResult<Self> {
    let pool = PgPool::connect(database_url).await?;
    Ok(Self { pool })
  }

  /// Create the three tables if they do not exist yet.
  pub async fn ensure_schema(&self) -> StoreResult<()> {
    for statement in SCHEMA {
      query::<Postgres>(statement).execute(&self.pool).await?;
    }
    info!("event store schema ready");
    Ok(())
  }
}

// Each save is one transaction: a failing row rolls back the whole batch.
#[async_trait]
impl EventStore for PgEventStore {
  async fn save_deployments(&self, deployments: &[Deployment]) -> StoreResult<()> {
    let mut tx = self.pool.begin().await?;
    for d in deployments {
      query::<Postgres>(
        r#"
        INSERT INTO dora_deployments
          (id, repository_url, commit_sha, created_at, deployed_at, environment, status, description)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        ON CONFLICT (id) DO UPDATE SET
          repository_url = EXCLUDED.repository_url,
          commit_sha = EXCLUDED.commit_sha,
          created_at = EXCLUDED.created_at,
          deployed_at = EXCLUDED.deployed_at,
          environment = EXCLUDED.environment,
          status = EXCLUDED.status,
          description = EXCLUDED.description
        "#,
      )
      .bind(&d.id)
      .bind(&d.repository_url)
      .bind(&d.commit_sha)
      .bind(d.created_at)
      .bind(d.deployed_at)
      .bind(&d.environment)
      .bind(&d.status)
      .bind(&d.description)
      .execute(&mut *tx)
      .await?;
    }
    tx.commit().await?;
    Ok(())
  }

  async fn save_changes(&self, changes: &[Change]) -> StoreResult<()> {
    let mut tx = self.pool.begin().await?;
    for c in changes {
      query::<Postgres>(
        r#"
        INSERT INTO dora_changes (id, repository_url, commit_sha, created_at, merged_at, author)
        VALUES ($1, $2, $3, $4, $5, $6)
        ON CONFLICT (id) DO UPDATE SET
          repository_url = EXCLUDED.repository_url,
          commit_sha = EXCLUDED.commit_sha,
          created_at = EXCLUDED.created_at,
          merged_at = EXCLUDED.merged_at,
          author = EXCLUDED.author
        "#,
      )
      .bind(&c.id)
      .bind(&c.repository_url)
      .bind(&c.commit_sha)
      .bind(c.created_at)
      .bind(c.merged_at)
      .bind(&c.author)
      .execute(&mut *tx)
      .await?;
    }
    tx.commit().await?;
    Ok(())
  }

  async fn save_incidents(&self, incidents: &[Incident]) -> StoreResult<()> {
    let mut tx = self.pool.begin().await?;
    for i in incidents {
      query::<Postgres>(
        r#"
        INSERT INTO dora_incidents (id, repository_url, created_at, resolved_at, severity, description)
        VALUES ($1, $2, $3, $4, $5, $6)
        ON CONFLICT (id) DO UPDATE SET
          repository_url = EXCLUDED.repository_url,
          created_at = EXCLUDED.created_at,
          resolved_at = EXCLUDED.resolved_at,
          severity = EXCLUDED.severity,
          description = EXCLUDED.description
        "#,
      )
      .bind(&i.id)
      .bind(&i.repository_url)
      .bind(i.created_at)
      .bind(i.resolved_at)
      .bind(&i.severity)
      .bind(&i.description)
      .execute(&mut *tx)
      .await?;
    }
    tx.commit().await?;
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::{TimeZone, Utc};
  use sqlx_core::query_scalar::query_scalar;
  use uuid::Uuid;

  /// Needs a scratch database; skipped unless `DORA_TEST_DATABASE_URL` is set.
  async fn test_store() -> Option<PgEventStore> {
    let url = std::env::var("DORA_TEST_DATABASE_URL").ok().filter(|u| !u.is_empty())?;
    let store = PgEventStore::connect(&url).await.unwrap();
    store.ensure_schema().await.unwrap();
    Some(store)
  }

  fn deployment(id: &str, description: &str) -> Deployment {
    let t = Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 0).unwrap();
    Deployment {
      id: id.into(),
      repository_url: "https://github.com/acme/api".into(),
      commit_sha: "sha-1".into(),
      created_at: t,
      deployed_at: Some(t),
      environment: "production".into(),
      status: "SUCCESS".into(),
      description: Some(description.into()),
    }
  }

  async fn stored_count(store: &PgEventStore, ids: &[String]) -> i64 {
    query_scalar::<Postgres, i64>("SELECT COUNT(*) FROM dora_deployments WHERE id = ANY($1)")
      .bind(ids.to_vec())
      .fetch_one(&store.pool)
      .await
      .unwrap()
  }

  #[tokio::test]
  async fn failing_row_rolls_back_the_whole_batch() {
    let Some(store) = test_store().await else {
      return;
    };
    let run = Uuid::new_v4();
    let good = deployment(&format!("{}/release/1", run), "ok");
    // PostgreSQL rejects NUL bytes in TEXT columns.
    let bad = deployment(&format!("{}/release/2", run), "nul \0 byte");
    let ids = vec![good.id.clone(), bad.id.clone()];

    assert!(store.save_deployments(&[good.clone(), bad]).await.is_err());
    assert_eq!(stored_count(&store, &ids).await, 0);

    store.save_deployments(&[good.clone(), good]).await.unwrap();
    assert_eq!(stored_count(&store, &ids).await, 1);
  }
}
