//! Route handlers. Reads come from the cache and the coordinator; writes go to
//! the two-factor bridge or start a forced run.

use arrivals::TriggerRejection;
use arrivals::protocol::{
	Acknowledgement, CacheStatus, GuestsResponse, HealthResponse, RoomsResponse, StatusReport, TriggerMode,
	TwoFactorSubmission,
};
use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use chrono::Utc;
use tracing::info;

use super::AppState;
use super::error::{ApiError, DataUnavailable};

pub async fn guests(State(state): State<AppState>) -> Result<Json<GuestsResponse>, DataUnavailable> {
	let status = state.coordinator.status();
	let guests = state.coordinator.cache().guests().ok_or(DataUnavailable {
		last_error: status.last_error,
	})?;

	Ok(Json(GuestsResponse {
		count: guests.len(),
		guests: guests.to_vec(),
		last_refresh_time: status.last_refresh_at,
		next_refresh_in: status.seconds_until_next,
	}))
}

pub async fn rooms(State(state): State<AppState>) -> Result<Json<RoomsResponse>, DataUnavailable> {
	let status = state.coordinator.status();
	let rooms = state.coordinator.cache().rooms().ok_or(DataUnavailable {
		last_error: status.last_error,
	})?;

	Ok(Json(RoomsResponse {
		rooms: (*rooms).clone(),
		last_refresh_time: status.last_refresh_at,
		next_refresh_in: status.seconds_until_next,
	}))
}

pub async fn status(State(state): State<AppState>) -> Json<StatusReport> {
	let status = state.coordinator.status();
	let guests = state.coordinator.cache().guests();

	Json(StatusReport {
		status: "running".into(),
		is_refreshing: status.running,
		two_factor_required: status.two_factor_pending,
		auto_refresh_enabled: status.auto_refresh_enabled,
		auto_refresh_status: if status.auto_refresh_enabled {
			"enabled".into()
		} else {
			"disabled (manual refresh required)".into()
		},
		last_refresh_time: status.last_refresh_at,
		next_refresh_in: status.seconds_until_next,
		cache_status: if guests.is_some() { CacheStatus::Ready } else { CacheStatus::Empty },
		guest_count: guests.map_or(0, |g| g.len()),
		last_error: status.last_error,
		last_run: status.last_run,
	})
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
	Json(HealthResponse {
		status: "healthy".into(),
		uptime_secs: state.started.elapsed().as_secs(),
		timestamp: Utc::now(),
	})
}

pub async fn submit_two_factor(
	State(state): State<AppState>,
	Json(body): Json<TwoFactorSubmission>,
) -> Result<Json<Acknowledgement>, ApiError> {
	let code = body.code.as_deref().map(str::trim).unwrap_or_default();
	if code.is_empty() {
		return Err(ApiError::bad_request("No two-factor code provided"));
	}
	if !state.coordinator.bridge().submit_code(code) {
		return Err(ApiError::bad_request("No two-factor verification in progress")
			.with_details(serde_json::json!({ "twoFactorRequired": false })));
	}

	info!(target = "arrivals.http", "two-factor code submitted");
	Ok(Json(Acknowledgement::now("2FA code submitted")))
}

pub async fn refresh(State(state): State<AppState>) -> Result<(StatusCode, Json<Acknowledgement>), ApiError> {
	match state.coordinator.trigger_in_background(TriggerMode::Forced) {
		Ok(_) => {
			info!(target = "arrivals.http", "manual refresh started");
			Ok((StatusCode::ACCEPTED, Json(Acknowledgement::now("Refresh started"))))
		}
		Err(TriggerRejection::Busy) => Err(ApiError::busy("Please wait for the current refresh to complete")
			.with_details(serde_json::json!({ "isRefreshing": true }))),
		Err(rejection) => Err(ApiError::bad_request(rejection.to_string())),
	}
}
