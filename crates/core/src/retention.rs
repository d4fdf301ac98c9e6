//! Age-based pruning of exports and page captures.

use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use tracing::{debug, info, warn};

/// Maximum age of managed artifacts. `None` disables deletion entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RetentionPolicy {
	pub max_age: Option<Duration>,
}

impl RetentionPolicy {
	/// Builds a policy from a day count; zero or negative disables it.
	pub fn from_days(days: i64) -> Self {
		let max_age = u64::try_from(days)
			.ok()
			.filter(|d| *d > 0)
			.map(|d| Duration::from_secs(d.saturating_mul(24 * 60 * 60)));
		Self { max_age }
	}

	pub fn disabled() -> Self {
		Self { max_age: None }
	}

	pub fn is_enabled(&self) -> bool {
		self.max_age.is_some()
	}
}

/// Outcome counters for one sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SweepReport {
	/// Files removed.
	pub deleted: usize,
	/// Files that were old enough but could not be removed.
	pub failed: usize,
	/// Locations that did not exist or could not be listed. Subdirectories
	/// inside a location are left alone and not counted.
	pub skipped: usize,
}

/// Deletes files older than the policy's max age from a set of directories.
#[derive(Debug, Clone)]
pub struct RetentionSweeper {
	locations: Vec<PathBuf>,
}

impl RetentionSweeper {
	pub fn new(locations: Vec<PathBuf>) -> Self {
		Self { locations }
	}

	/// Sweeps every location once. Never fails; per-entry problems are logged.
	pub fn sweep(&self, policy: &RetentionPolicy) -> SweepReport {
		self.sweep_at(policy, SystemTime::now())
	}

	pub(crate) fn sweep_at(&self, policy: &RetentionPolicy, now: SystemTime) -> SweepReport {
		self.sweep_with(policy, now, |path| std::fs::remove_file(path))
	}

	fn sweep_with(
		&self,
		policy: &RetentionPolicy,
		now: SystemTime,
		remove: impl Fn(&Path) -> io::Result<()>,
	) -> SweepReport {
		let mut report = SweepReport::default();
		let Some(max_age) = policy.max_age else {
			debug!(target = "arrivals.retention", "retention disabled");
			return report;
		};
		let Some(cutoff) = now.checked_sub(max_age) else {
			return report;
		};

		for location in &self.locations {
			sweep_location(location, cutoff, &remove, &mut report);
		}

		if report.deleted > 0 || report.failed > 0 {
			info!(
				target = "arrivals.retention",
				deleted = report.deleted,
				failed = report.failed,
				"retention sweep finished"
			);
		}
		report
	}
}

fn sweep_location(
	location: &Path,
	cutoff: SystemTime,
	remove: &impl Fn(&Path) -> io::Result<()>,
	report: &mut SweepReport,
) {
	let entries = match std::fs::read_dir(location) {
		Ok(entries) => entries,
		Err(err) => {
			debug!(target = "arrivals.retention", path = %location.display(), error = %err, "skipping location");
			report.skipped += 1;
			return;
		}
	};

	for entry in entries.flatten() {
		let path = entry.path();
		let modified = match entry.metadata() {
			Ok(meta) if meta.is_file() => meta.modified(),
			Ok(_) => continue,
			Err(err) => Err(err),
		};
		let modified = match modified {
			Ok(time) => time,
			Err(err) => {
				warn!(target = "arrivals.retention", path = %path.display(), error = %err, "cannot read file age");
				continue;
			}
		};
		if modified >= cutoff {
			continue;
		}

		match remove(&path) {
			Ok(()) => {
				debug!(target = "arrivals.retention", path = %path.display(), "deleted old file");
				report.deleted += 1;
			}
			Err(err) => {
				warn!(target = "arrivals.retention", path = %path.display(), error = %err, "failed to delete old file");
				report.failed += 1;
			}
		}
	}
}
