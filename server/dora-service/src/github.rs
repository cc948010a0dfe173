//! GitHub REST implementation of the source-event provider.
//!
//! - releases -> deployments (published releases only)
//! - closed pull requests -> changes (merged only)
//! - issues with the incident label -> incidents (closed_at is the resolution time)
//!
//! One page of up to 100 items per call; pagination and rate limits are out of scope.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dora_engine::normalize::repo_path;
use dora_engine::{Change, Deployment, Incident};
use reqwest::header::ACCEPT;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;

use crate::error::{ProviderError, ProviderResult};
use crate::provider::EventProvider;

const PAGE_SIZE: &str = "100";

/// GitHub connection settings.
#[derive(Debug, Clone)]
pub struct GitHubConfig {
  /// API base URL, e.g. `https://api.github.com`.
  pub api_url: String,
  /// Bearer token (optional for public repositories).
  pub token: Option<String>,
  /// Issues carrying this label are treated as incidents.
  pub incident_label: String,
}

impl Default for GitHubConfig {
  fn default() -> Self {
    Self {
      api_url: "https://api.github.com".into(),
      token: None,
      incident_label: "incident".into(),
    }
  }
}

// ---------------------------------------------------------------------------
// Wire types (only the fields we read; unknown fields are ignored)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct ReleaseDto {
  pub id: u64,
  pub target_commitish: String,
  pub created_at: DateTime<Utc>,
  #[serde(default)]
  pub published_at: Option<DateTime<Utc>>,
  #[serde(default)]
  pub body: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PullRequestDto {
  pub number: u64,
  #[serde(default)]
  pub merge_commit_sha: Option<String>,
  pub created_at: DateTime<Utc>,
  #[serde(default)]
  pub merged_at: Option<DateTime<Utc>>,
  #[serde(default)]
  pub user: Option<UserDto>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UserDto {
  pub login: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IssueDto {
  pub number: u64,
  pub title: String,
  pub created_at: DateTime<Utc>,
  #[serde(default)]
  pub closed_at: Option<DateTime<Utc>>,
  #[serde(default)]
  pub labels: Vec<LabelDto>,
  /// Present when the "issue" is really a pull request.
  #[serde(default)]
  pub pull_request: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LabelDto {
  pub name: String,
}

// ---------------------------------------------------------------------------
// Mapping (pure; `repo` is the normalized owner/name)
// ---------------------------------------------------------------------------

pub fn release_to_deployment(repo: &str, repo_url: &str, release: ReleaseDto, since: DateTime<Utc>) -> Option<Deployment> {
  let published_at = release.published_at.filter(|&t| t > since)?;
  Some(Deployment {
    id: format!("{}/release/{}", repo, release.id),
    repository_url: repo_url.to_string(),
    commit_sha: release.target_commitish,
    created_at: release.created_at,
    deployed_at: Some(published_at),
    environment: "production".into(),
    status: "SUCCESS".into(),
    description: release.body,
  })
}

pub fn pull_request_to_change(repo: &str, repo_url: &str, pr: PullRequestDto, since: DateTime<Utc>) -> Option<Change> {
  let merged_at = pr.merged_at.filter(|&t| t > since)?;
  Some(Change {
    id: format!("{}/pr/{}", repo, pr.number),
    repository_url: repo_url.to_string(),
    commit_sha: pr.merge_commit_sha,
    created_at: pr.created_at,
    merged_at: Some(merged_at),
    author: pr.user.map(|u| u.login).unwrap_or_else(|| "unknown".into()),
  })
}

pub fn issue_to_incident(repo: &str, repo_url: &str, issue: IssueDto, since: DateTime<Utc>) -> Option<Incident> {
  if issue.pull_request.is_some() || issue.created_at <= since {
    return None;
  }
  Some(Incident {
    id: format!("{}/issue/{}", repo, issue.number),
    repository_url: repo_url.to_string(),
    created_at: issue.created_at,
    resolved_at: issue.closed_at,
    severity: severity_from_labels(&issue.labels),
    description: issue.title,
  })
}

/// `sev1`, `SEV-2`, `severity:high` style labels; `unknown` when absent.
fn severity_from_labels(labels: &[LabelDto]) -> String {
  labels
    .iter()
    .find_map(|l| {
      let name = l.name.trim().to_ascii_lowercase();
      if let Some(rest) = name.strip_prefix("severity:").or_else(|| name.strip_prefix("severity/")) {
        Some(rest.trim().to_string())
      } else if name.starts_with("sev") {
        Some(name.replace('-', ""))
      } else {
        None
      }
    })
    .filter(|s| !s.is_empty())
    .unwrap_or_else(|| "unknown".into())
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

pub struct GitHubProvider {
  config: GitHubConfig,
  http_client: reqwest::Client,
}

impl GitHubProvider {
  pub fn new(config: GitHubConfig) -> ProviderResult<Self> {
    let http_client = reqwest::Client::builder()
      .user_agent(concat!("dora-service/", env!("CARGO_PKG_VERSION")))
      .build()?;
    Ok(Self { config, http_client })
  }

  async fn get_json<T: DeserializeOwned>(&self, repo: &str, path: &str, query: &[(&str, &str)]) -> ProviderResult<T> {
    let url = format!("{}/repos/{}/{}", self.config.api_url.trim_end_matches('/'), repo, path);
    let mut request = self
      .http_client
      .get(&url)
      .query(query)
      .header(ACCEPT, "application/vnd.github+json");
    if let Some(token) = self.config.token.as_deref().filter(|t| !t.trim().is_empty()) {
      request = request.bearer_auth(token);
    }

    let response = request.send().await?;
    let status = response.status();
    if status == StatusCode::NOT_FOUND {
      return Err(ProviderError::RepositoryNotFound(repo.to_string()));
    }
    if !status.is_success() {
      return Err(ProviderError::Status {
        url,
        status: status.as_u16(),
      });
    }
    Ok(response.json::<T>().await?)
  }
}

/// Repository identifiers are validated before any request; a malformed one reads as not found.
fn checked_repo(repo_url: &str) -> ProviderResult<String> {
  repo_path(repo_url).map_err(|_| ProviderError::RepositoryNotFound(repo_url.to_string()))
}

#[async_trait]
impl EventProvider for GitHubProvider {
  async fn fetch_deployments(&self, repo_url: &str, since: DateTime<Utc>) -> ProviderResult<Vec<Deployment>> {
    let repo = checked_repo(repo_url)?;
    let releases: Vec<ReleaseDto> = self.get_json(&repo, "releases", &[("per_page", PAGE_SIZE)]).await?;
    let fetched = releases.len();
    let deployments: Vec<Deployment> = releases
      .into_iter()
      .filter_map(|r| release_to_deployment(&repo, repo_url, r, since))
      .collect();
    debug!(repo = %repo, fetched, kept = deployments.len(), "releases fetched");
    Ok(deployments)
  }

  async fn fetch_changes(&self, repo_url: &str, since: DateTime<Utc>) -> ProviderResult<Vec<Change>> {
    let repo = checked_repo(repo_url)?;
    let prs: Vec<PullRequestDto> = self
      .get_json(
        &repo,
        "pulls",
        &[("state", "closed"), ("sort", "updated"), ("direction", "desc"), ("per_page", PAGE_SIZE)],
      )
      .await?;
    let fetched = prs.len();
    let changes: Vec<Change> = prs
      .into_iter()
      .filter_map(|pr| pull_request_to_change(&repo, repo_url, pr, since))
      .collect();
    debug!(repo = %repo, fetched, kept = changes.len(), "pull requests fetched");
    Ok(changes)
  }

  async fn fetch_incidents(&self, repo_url: &str, since: DateTime<Utc>) -> ProviderResult<Vec<Incident>> {
    let repo = checked_repo(repo_url)?;
    let since_param = since.to_rfc3339();
    let issues: Vec<IssueDto> = self
      .get_json(
        &repo,
        "issues",
        &[
          ("state", "all"),
          ("labels", self.config.incident_label.as_str()),
          ("since", since_param.as_str()),
          ("per_page", PAGE_SIZE),
        ],
      )
      .await?;
    let fetched = issues.len();
    let incidents: Vec<Incident> = issues
      .into_iter()
      .filter_map(|i| issue_to_incident(&repo, repo_url, i, since))
      .collect();
    debug!(repo = %repo, fetched, kept = incidents.len(), "incident issues fetched");
    Ok(incidents)
  }
}
