//! HTTP facade over the coordinator.

mod error;
mod handlers;

use std::sync::Arc;
use std::time::Instant;

use arrivals::RefreshCoordinator;
use axum::Router;
use axum::routing::{get, post};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

pub use error::{ApiError, ApiErrorResponse, DataUnavailable};

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
	pub coordinator: Arc<RefreshCoordinator>,
	pub started: Instant,
}

impl AppState {
	pub fn new(coordinator: Arc<RefreshCoordinator>) -> Self {
		Self {
			coordinator,
			started: Instant::now(),
		}
	}
}

pub fn router(state: AppState) -> Router {
	let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);

	Router::new()
		.route("/api/guests", get(handlers::guests))
		.route("/api/rooms", get(handlers::rooms))
		.route("/api/status", get(handlers::status))
		.route("/api/health", get(handlers::health))
		.route("/api/2fa", post(handlers::submit_two_factor))
		.route("/api/refresh", post(handlers::refresh))
		.layer(cors)
		.layer(TraceLayer::new_for_http())
		.with_state(state)
}

/// Serves until `shutdown` is cancelled.
pub async fn serve(listener: TcpListener, router: Router, shutdown: CancellationToken) -> std::io::Result<()> {
	axum::serve(listener, router)
		.with_graceful_shutdown(async move {
			shutdown.cancelled().await;
			info!(target = "arrivals.http", "HTTP server shutting down");
		})
		.await
}
