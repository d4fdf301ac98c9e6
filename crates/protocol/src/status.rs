//! Refresh status types shared by the coordinator and its clients.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What started an acquisition run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TriggerMode {
	/// Fired by the recurring timer; honors the auto-refresh flag.
	Scheduled,
	/// Requested by a caller; runs regardless of the auto-refresh flag.
	Forced,
}

impl std::fmt::Display for TriggerMode {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			TriggerMode::Scheduled => write!(f, "scheduled"),
			TriggerMode::Forced => write!(f, "forced"),
		}
	}
}

/// Lifecycle of a single acquisition run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunOutcome {
	Pending,
	Success,
	Failure,
}

/// Failure classification reported in `lastError`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
	Configuration,
	TwoFactorUnavailable,
	TwoFactorRejected,
	LoginRejected,
	Browser,
	Extraction,
}

/// The most recent run failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LastError {
	pub kind: ErrorKind,
	pub message: String,
	pub timestamp: DateTime<Utc>,
}

/// A finished or in-flight acquisition run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunRecord {
	pub started_at: DateTime<Utc>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub finished_at: Option<DateTime<Utc>>,
	pub trigger: TriggerMode,
	pub outcome: RunOutcome,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub error: Option<LastError>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub record_count: Option<usize>,
}
