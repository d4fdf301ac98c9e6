//! HTTP request and response bodies.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::guest::{GuestRecord, RoomIndex};
use crate::status::{LastError, RunRecord};

/// `GET /api/guests` success body.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuestsResponse {
	pub guests: Vec<GuestRecord>,
	pub count: usize,
	pub last_refresh_time: Option<DateTime<Utc>>,
	pub next_refresh_in: Option<u64>,
}

/// `GET /api/rooms` success body.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomsResponse {
	pub rooms: RoomIndex,
	pub last_refresh_time: Option<DateTime<Utc>>,
	pub next_refresh_in: Option<u64>,
}

/// Body returned while no fresh dataset is cached.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnavailableResponse {
	pub error: String,
	pub message: String,
	pub last_error: Option<LastError>,
}

/// `GET /api/status` body.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusReport {
	pub status: String,
	pub is_refreshing: bool,
	pub two_factor_required: bool,
	pub auto_refresh_enabled: bool,
	pub auto_refresh_status: String,
	pub last_refresh_time: Option<DateTime<Utc>>,
	pub next_refresh_in: Option<u64>,
	pub cache_status: CacheStatus,
	pub guest_count: usize,
	pub last_error: Option<LastError>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub last_run: Option<RunRecord>,
}

/// Whether the guest dataset is currently servable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheStatus {
	Ready,
	Empty,
}

/// `GET /api/health` body.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
	pub status: String,
	pub uptime_secs: u64,
	pub timestamp: DateTime<Utc>,
}

/// `POST /api/2fa` request body.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TwoFactorSubmission {
	#[serde(default)]
	pub code: Option<String>,
}

/// Acknowledgement body for accepted write requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Acknowledgement {
	pub message: String,
	pub timestamp: DateTime<Utc>,
}

impl Acknowledgement {
	/// Creates an acknowledgement stamped with the current time.
	pub fn now(message: impl Into<String>) -> Self {
		Self {
			message: message.into(),
			timestamp: Utc::now(),
		}
	}
}
