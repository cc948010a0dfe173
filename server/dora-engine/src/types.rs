//! Core types for the DORA engine (event model + JSON contracts).

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::EngineError;

// ---------------------------------------------------------------------------
// Event model (immutable snapshots from the source-event provider)
// ---------------------------------------------------------------------------

/// A merged code change (pull request).
///
/// The id encodes a reference number after its last `/pr/` separator,
/// e.g. `"owner/repo/pr/42"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Change {
  pub id: String,
  pub repository_url: String,
  #[serde(default)]
  pub commit_sha: Option<String>,
  pub created_at: DateTime<Utc>,
  #[serde(default)]
  pub merged_at: Option<DateTime<Utc>>,
  pub author: String,
}

/// A deployment (release). `status` is an open string; `"SUCCESS"` marks a good one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deployment {
  pub id: String,
  pub repository_url: String,
  pub commit_sha: String,
  pub created_at: DateTime<Utc>,
  #[serde(default)]
  pub deployed_at: Option<DateTime<Utc>>,
  pub environment: String,
  pub status: String,
  #[serde(default)]
  pub description: Option<String>,
}

impl Deployment {
  pub fn is_successful(&self) -> bool {
    self.status.eq_ignore_ascii_case("SUCCESS")
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Incident {
  pub id: String,
  pub repository_url: String,
  pub created_at: DateTime<Utc>,
  #[serde(default)]
  pub resolved_at: Option<DateTime<Utc>>,
  pub severity: String,
  pub description: String,
}

// ---------------------------------------------------------------------------
// Time window
// ---------------------------------------------------------------------------

/// Inclusive `[start, end]` range bounding a metrics computation. Zero length is allowed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
  pub start: DateTime<Utc>,
  pub end: DateTime<Utc>,
}

impl TimeWindow {
  pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, EngineError> {
    let window = Self { start, end };
    window.validate()?;
    Ok(window)
  }

  /// Deserialized windows bypass `new`; callers validate before use.
  pub fn validate(&self) -> Result<(), EngineError> {
    if self.end < self.start {
      return Err(EngineError::validation(
        "time_window",
        "end must not be before start",
      ));
    }
    Ok(())
  }

  /// Whole days spanned, never less than one.
  pub fn days(&self) -> i64 {
    (self.end - self.start).num_days().max(1)
  }
}

// ---------------------------------------------------------------------------
// Batches (engine input)
// ---------------------------------------------------------------------------

/// The three raw event lists for one repository.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventBatch {
  #[serde(default)]
  pub changes: Vec<Change>,
  #[serde(default)]
  pub deployments: Vec<Deployment>,
  #[serde(default)]
  pub incidents: Vec<Incident>,
}

/// One stdin line for the engine binary.
#[derive(Debug, Clone, Deserialize)]
pub struct ScanInput {
  pub time_window: TimeWindow,
  #[serde(flatten)]
  pub events: EventBatch,
}

// ---------------------------------------------------------------------------
// Output types (JSON contract — what we emit)
// ---------------------------------------------------------------------------

/// The four DORA indicators. Durations serialize as whole seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DoraMetrics {
  #[serde(with = "seconds")]
  pub lead_time_for_changes: Duration,
  /// Deployments per day.
  pub deployment_frequency: f64,
  /// Percentage, 0..=100 and beyond.
  pub change_failure_rate: f64,
  #[serde(with = "seconds")]
  pub time_to_restore_service: Duration,
}

impl DoraMetrics {
  pub fn zero() -> Self {
    Self {
      lead_time_for_changes: Duration::zero(),
      deployment_frequency: 0.0,
      change_failure_rate: 0.0,
      time_to_restore_service: Duration::zero(),
    }
  }
}

/// `chrono::Duration` as a signed whole-second integer.
pub mod seconds {
  use chrono::Duration;
  use serde::{Deserialize, Deserializer, Serializer};

  pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_i64(d.num_seconds())
  }

  pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
    let secs = i64::deserialize(d)?;
    Duration::try_seconds(secs).ok_or_else(|| serde::de::Error::custom("duration out of range"))
  }
}

/// Structured error output for invalid input.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorOutput {
  pub error: bool,
  pub message: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub field: Option<String>,
}

impl ErrorOutput {
  pub fn new(message: impl Into<String>) -> Self {
    Self {
      error: true,
      message: message.into(),
      field: None,
    }
  }

  pub fn with_field(mut self, field: impl Into<String>) -> Self {
    self.field = Some(field.into());
    self
  }
}

impl From<&EngineError> for ErrorOutput {
  fn from(e: &EngineError) -> Self {
    match e {
      EngineError::Validation { field, reason } => ErrorOutput::new(reason.clone()).with_field(field.clone()),
      _ => ErrorOutput::new(e.to_string()),
    }
  }
}
