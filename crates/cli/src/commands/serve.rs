use std::sync::Arc;

use anyhow::anyhow;
use arrivals::RefreshCoordinator;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::cli::ServeArgs;
use crate::config::AppConfig;
use crate::error::{AppError, Result};
use crate::portal::PortalLauncher;
use crate::server::{self, AppState};

/// Binds the API, starts the scheduler (first refresh immediately) and serves
/// until SIGINT or SIGTERM.
pub async fn run(config: &AppConfig, args: &ServeArgs) -> Result<()> {
	let launcher = PortalLauncher::new(config.portal_settings()?);
	let store = config.session_store()?;
	if config.credentials.is_none() {
		warn!(target = "arrivals", "ARRIVALS_EMAIL / ARRIVALS_PASSWORD not set; only a saved session can log in");
	}

	let coordinator = Arc::new(RefreshCoordinator::new(
		config.serve_config(args),
		Arc::new(launcher),
		store,
		config.credentials.clone(),
	));

	let addr = format!("{}:{}", args.bind, args.port);
	let listener = TcpListener::bind(&addr)
		.await
		.map_err(|source| AppError::Bind { addr: addr.clone(), source })?;
	info!(target = "arrivals.http", %addr, "listening");

	let shutdown = CancellationToken::new();
	tokio::spawn(shutdown_on_signal(shutdown.clone()));
	let scheduler = Arc::clone(&coordinator).spawn_scheduler(shutdown.child_token());

	server::serve(listener, server::router(AppState::new(coordinator)), shutdown.clone()).await?;

	shutdown.cancel();
	scheduler
		.await
		.map_err(|err| AppError::Anyhow(anyhow!("scheduler task failed: {err}")))?;
	info!(target = "arrivals", "stopped");
	Ok(())
}

async fn shutdown_on_signal(shutdown: CancellationToken) {
	let ctrl_c = async {
		if let Err(err) = tokio::signal::ctrl_c().await {
			warn!(target = "arrivals", error = %err, "cannot listen for Ctrl+C");
			std::future::pending::<()>().await;
		}
	};

	#[cfg(unix)]
	let terminate = async {
		match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
			Ok(mut signal) => {
				signal.recv().await;
			}
			Err(err) => {
				warn!(target = "arrivals", error = %err, "cannot listen for SIGTERM");
				std::future::pending::<()>().await;
			}
		}
	};
	#[cfg(not(unix))]
	let terminate = std::future::pending::<()>();

	tokio::select! {
		_ = ctrl_c => info!(target = "arrivals", "SIGINT received, shutting down"),
		_ = terminate => info!(target = "arrivals", "SIGTERM received, shutting down"),
	}
	shutdown.cancel();
}
