//! Single-flight acquisition runs and the auto-refresh policy.
//!
//! A run is: launch a browsing context, log in, fetch records, publish them,
//! prune old artifacts. Entry is guarded by one atomic flag; a trigger that
//! finds it set is rejected, never queued. Any failure disables scheduled
//! runs until a forced run succeeds.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use arrivals_protocol::{GuestRecord, LastError, RunOutcome, RunRecord, TriggerMode};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::auth::AuthSession;
use crate::cache::ResultCache;
use crate::config::{Credentials, RefreshConfig};
use crate::error::{RefreshError, Result};
use crate::export::{ExportFormat, write_export};
use crate::extractor::{Extractor, ExtractorLauncher};
use crate::retention::RetentionSweeper;
use crate::session_store::SessionStore;
use crate::two_factor::{CodeProvider, TwoFactorBridge};

/// Why a trigger did not start a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TriggerRejection {
	#[error("a refresh is already in progress")]
	Busy,
	#[error("auto-refresh is disabled until a manual refresh succeeds")]
	AutoRefreshDisabled,
}

/// Exclusive right to run one acquisition. Releases the slot on drop.
#[derive(Debug)]
pub struct RunPermit {
	running: Arc<AtomicBool>,
	mode: TriggerMode,
}

impl RunPermit {
	pub fn mode(&self) -> TriggerMode {
		self.mode
	}
}

impl Drop for RunPermit {
	fn drop(&mut self) {
		self.running.store(false, Ordering::Release);
	}
}

/// Snapshot of the coordinator for status reporting.
#[derive(Debug, Clone)]
pub struct RefreshStatus {
	pub running: bool,
	pub two_factor_pending: bool,
	pub auto_refresh_enabled: bool,
	pub last_refresh_at: Option<DateTime<Utc>>,
	pub last_error: Option<LastError>,
	pub last_run: Option<RunRecord>,
	/// `None` while auto-refresh is disabled.
	pub seconds_until_next: Option<u64>,
}

#[derive(Debug, Default)]
struct RunHistory {
	last_error: Option<LastError>,
	last_refresh_at: Option<DateTime<Utc>>,
	last_success: Option<Instant>,
	current: Option<RunRecord>,
	last: Option<RunRecord>,
}

/// Owns the acquisition lifecycle for the whole process.
pub struct RefreshCoordinator {
	config: RefreshConfig,
	launcher: Arc<dyn ExtractorLauncher>,
	store: SessionStore,
	credentials: Option<Credentials>,
	bridge: Arc<TwoFactorBridge>,
	provider: Option<Arc<dyn CodeProvider>>,
	cache: Arc<ResultCache>,
	sweeper: RetentionSweeper,
	running: Arc<AtomicBool>,
	auto_refresh: AtomicBool,
	history: Mutex<RunHistory>,
}

impl RefreshCoordinator {
	pub fn new(
		config: RefreshConfig,
		launcher: Arc<dyn ExtractorLauncher>,
		store: SessionStore,
		credentials: Option<Credentials>,
	) -> Self {
		let bridge = Arc::new(TwoFactorBridge::new(config.challenge_timeout));
		let sweeper = RetentionSweeper::new(config.retention_dirs.clone());
		Self {
			config,
			launcher,
			store,
			credentials,
			bridge,
			provider: None,
			cache: Arc::new(ResultCache::new()),
			sweeper,
			running: Arc::new(AtomicBool::new(false)),
			auto_refresh: AtomicBool::new(true),
			history: Mutex::new(RunHistory::default()),
		}
	}

	/// Replaces the bridge as the source of one-time codes.
	pub fn with_code_provider(mut self, provider: Arc<dyn CodeProvider>) -> Self {
		self.provider = Some(provider);
		self
	}

	pub fn bridge(&self) -> &Arc<TwoFactorBridge> {
		&self.bridge
	}

	pub fn cache(&self) -> &Arc<ResultCache> {
		&self.cache
	}

	pub fn is_running(&self) -> bool {
		self.running.load(Ordering::Acquire)
	}

	pub fn auto_refresh_enabled(&self) -> bool {
		self.auto_refresh.load(Ordering::Acquire)
	}

	/// Claims the run slot for `mode`.
	pub fn try_begin(&self, mode: TriggerMode) -> std::result::Result<RunPermit, TriggerRejection> {
		if self.is_running() {
			return Err(TriggerRejection::Busy);
		}
		if mode == TriggerMode::Scheduled && !self.auto_refresh_enabled() {
			return Err(TriggerRejection::AutoRefreshDisabled);
		}
		self.running
			.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
			.map_err(|_| TriggerRejection::Busy)?;
		Ok(RunPermit {
			running: Arc::clone(&self.running),
			mode,
		})
	}

	/// Runs one acquisition to completion on the caller's task.
	pub async fn trigger(&self, mode: TriggerMode) -> std::result::Result<Result<usize>, TriggerRejection> {
		let permit = self.reject_logged(mode)?;
		Ok(self.execute(permit).await)
	}

	/// Claims the slot now and runs the acquisition on a spawned task.
	pub fn trigger_in_background(
		self: &Arc<Self>,
		mode: TriggerMode,
	) -> std::result::Result<JoinHandle<Result<usize>>, TriggerRejection> {
		let permit = self.reject_logged(mode)?;
		let this = Arc::clone(self);
		Ok(tokio::spawn(async move { this.execute(permit).await }))
	}

	/// Fires a scheduled trigger immediately and then every `interval`.
	pub fn spawn_scheduler(self: Arc<Self>, shutdown: CancellationToken) -> JoinHandle<()> {
		tokio::spawn(async move {
			let mut ticker = tokio::time::interval(self.config.interval);
			ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
			info!(
				target = "arrivals.refresh",
				interval_secs = self.config.interval.as_secs(),
				"scheduler started"
			);
			loop {
				tokio::select! {
					_ = shutdown.cancelled() => {
						info!(target = "arrivals.refresh", "scheduler stopped");
						break;
					}
					_ = ticker.tick() => {
						let _ = self.trigger_in_background(TriggerMode::Scheduled);
					}
				}
			}
		})
	}

	pub fn status(&self) -> RefreshStatus {
		let enabled = self.auto_refresh_enabled();
		let history = self.history.lock();
		RefreshStatus {
			running: self.is_running(),
			two_factor_pending: self.bridge.is_pending(),
			auto_refresh_enabled: enabled,
			last_refresh_at: history.last_refresh_at,
			last_error: history.last_error.clone(),
			last_run: history.current.clone().or_else(|| history.last.clone()),
			seconds_until_next: enabled.then(|| seconds_until(self.config.interval, history.last_success)),
		}
	}

	fn reject_logged(&self, mode: TriggerMode) -> std::result::Result<RunPermit, TriggerRejection> {
		self.try_begin(mode).inspect_err(|rejection| match rejection {
			TriggerRejection::Busy => info!(target = "arrivals.refresh", %mode, "refresh already in progress; skipping"),
			TriggerRejection::AutoRefreshDisabled => {
				info!(target = "arrivals.refresh", "auto-refresh disabled; waiting for a manual refresh")
			}
		})
	}

	async fn execute(&self, permit: RunPermit) -> Result<usize> {
		let mode = permit.mode();
		let started = Utc::now();
		self.history.lock().current = Some(RunRecord {
			started_at: started,
			finished_at: None,
			trigger: mode,
			outcome: RunOutcome::Pending,
			error: None,
			record_count: None,
		});
		info!(target = "arrivals.refresh", %mode, "starting refresh");

		let result = self.acquire().await;
		let finished = Utc::now();

		match &result {
			Ok(guests) => {
				let count = guests.len();
				self.publish(guests);
				self.sweeper.sweep(&self.config.retention);

				let mut history = self.history.lock();
				history.last_error = None;
				history.last_refresh_at = Some(finished);
				history.last_success = Some(Instant::now());
				history.last = history.current.take().map(|run| RunRecord {
					finished_at: Some(finished),
					outcome: RunOutcome::Success,
					record_count: Some(count),
					..run
				});
				self.auto_refresh.store(true, Ordering::Release);
				info!(target = "arrivals.refresh", %mode, count, "refresh succeeded");
			}
			Err(err) => {
				let last_error = LastError {
					kind: err.kind(),
					message: err.to_string(),
					timestamp: finished,
				};
				let mut history = self.history.lock();
				history.last_error = Some(last_error.clone());
				history.last = history.current.take().map(|run| RunRecord {
					finished_at: Some(finished),
					outcome: RunOutcome::Failure,
					error: Some(last_error),
					..run
				});
				self.auto_refresh.store(false, Ordering::Release);
				error!(
					target = "arrivals.refresh",
					%mode,
					kind = ?err.kind(),
					error = %err,
					"refresh failed; auto-refresh disabled until a manual refresh succeeds"
				);
			}
		}

		self.bridge.reset();
		drop(permit);
		result.map(|guests| guests.len())
	}

	async fn acquire(&self) -> Result<Vec<GuestRecord>> {
		let mut extractor = self.launcher.launch().await.map_err(RefreshError::Browser)?;
		let result = self.drive(extractor.as_mut()).await;
		if let Err(err) = extractor.close().await {
			warn!(target = "arrivals.refresh", error = %err, "failed to close browsing context");
		}
		result
	}

	async fn drive(&self, extractor: &mut dyn Extractor) -> Result<Vec<GuestRecord>> {
		let provider: &dyn CodeProvider = match &self.provider {
			Some(provider) => provider.as_ref(),
			None => self.bridge.as_ref(),
		};
		AuthSession::new(&self.store, self.credentials.as_ref(), Some(provider))
			.run(extractor)
			.await?;

		let guests = extractor.fetch_records().await.map_err(RefreshError::Extraction)?;
		debug!(target = "arrivals.refresh", count = guests.len(), "records fetched");
		Ok(guests)
	}

	fn publish(&self, guests: &[GuestRecord]) {
		self.cache.publish(guests.to_vec(), self.config.cache_ttl);
		if let Some(dir) = &self.config.export_dir {
			if let Err(err) = write_export(dir, guests, ExportFormat::Json) {
				warn!(target = "arrivals.refresh", error = %err, "failed to write export");
			}
		}
	}
}

fn seconds_until(interval: Duration, last_success: Option<Instant>) -> u64 {
	let Some(last) = last_success else {
		return interval.as_secs();
	};
	let remaining = interval.saturating_sub(last.elapsed());
	let secs = remaining.as_secs();
	if remaining.subsec_nanos() > 0 { secs + 1 } else { secs }
}
