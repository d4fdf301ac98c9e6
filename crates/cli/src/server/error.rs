//! API error responses.

use arrivals::protocol::{LastError, UnavailableResponse};
use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

/// API error response body.
#[derive(Debug, Serialize)]
pub struct ApiErrorResponse {
	/// Error code for programmatic handling
	pub code: String,
	/// Human-readable error message
	pub message: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub details: Option<serde_json::Value>,
}

/// Request failure rendered as `{code, message, details}`.
#[derive(Debug)]
pub struct ApiError {
	pub status: StatusCode,
	pub code: String,
	pub message: String,
	pub details: Option<serde_json::Value>,
}

impl ApiError {
	pub fn new(status: StatusCode, code: impl Into<String>, message: impl Into<String>) -> Self {
		Self {
			status,
			code: code.into(),
			message: message.into(),
			details: None,
		}
	}

	pub fn with_details(mut self, details: serde_json::Value) -> Self {
		self.details = Some(details);
		self
	}

	pub fn bad_request(message: impl Into<String>) -> Self {
		Self::new(StatusCode::BAD_REQUEST, "BAD_REQUEST", message)
	}

	pub fn busy(message: impl Into<String>) -> Self {
		Self::new(StatusCode::TOO_MANY_REQUESTS, "REFRESH_IN_PROGRESS", message)
	}
}

impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		let body = ApiErrorResponse {
			code: self.code,
			message: self.message,
			details: self.details,
		};
		(self.status, Json(body)).into_response()
	}
}

/// 503 returned while no fresh dataset is cached.
#[derive(Debug)]
pub struct DataUnavailable {
	pub last_error: Option<LastError>,
}

impl IntoResponse for DataUnavailable {
	fn into_response(self) -> Response {
		let body = UnavailableResponse {
			error: "Data not available".into(),
			message: "Data is being fetched. Please try again in a few moments.".into(),
			last_error: self.last_error,
		};
		(StatusCode::SERVICE_UNAVAILABLE, Json(body)).into_response()
	}
}
