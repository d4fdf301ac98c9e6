//! Cookie bundle persistence between acquisition runs.
//!
//! The bundle is stored as one JSON document (`cookies.json`) inside the
//! session directory. Reads are best-effort: any problem reads as "no session"
//! and the login flow falls back to credentials.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use arrivals_protocol::{Cookie, SessionBundle};
use chrono::Utc;
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use crate::error::StorageError;

const COOKIES_FILE: &str = "cookies.json";

/// File-backed store for the reusable cookie bundle.
#[derive(Debug, Clone)]
pub struct SessionStore {
	path: PathBuf,
}

impl SessionStore {
	/// Creates a store that keeps its bundle inside `dir`.
	pub fn new(dir: impl AsRef<Path>) -> Self {
		Self {
			path: dir.as_ref().join(COOKIES_FILE),
		}
	}

	/// Returns the bundle file path.
	pub fn path(&self) -> &Path {
		&self.path
	}

	/// Returns `true` if a bundle file is present, valid or not.
	pub fn exists(&self) -> bool {
		self.path.exists()
	}

	/// Loads a usable cookie bundle.
	///
	/// Returns `None` when nothing is stored, the file cannot be read or
	/// parsed, the bundle is empty, or any cookie in it has expired. In the
	/// expired case the bundle is removed from disk, since it is only usable
	/// as a unit.
	pub fn load(&self) -> Option<Vec<Cookie>> {
		self.load_at(unix_now())
	}

	pub(crate) fn load_at(&self, now_secs: f64) -> Option<Vec<Cookie>> {
		let bundle = match self.read_bundle() {
			Ok(Some(bundle)) => bundle,
			Ok(None) => {
				debug!(target = "arrivals.session", path = %self.path.display(), "no saved session");
				return None;
			}
			Err(err) => {
				warn!(target = "arrivals.session", error = %err, "ignoring unreadable session");
				return None;
			}
		};

		if bundle.cookies.is_empty() {
			debug!(target = "arrivals.session", "saved session is empty");
			return None;
		}

		let expired = bundle.cookies.iter().filter(|c| c.is_expired_at(now_secs)).count();
		if expired > 0 {
			info!(
				target = "arrivals.session",
				expired,
				total = bundle.cookies.len(),
				"saved session expired; discarding bundle"
			);
			if let Err(err) = self.clear() {
				warn!(target = "arrivals.session", error = %err, "failed to remove expired session");
			}
			return None;
		}

		debug!(target = "arrivals.session", cookies = bundle.cookies.len(), "saved session loaded");
		Some(bundle.cookies)
	}

	/// Reads the raw bundle without expiry filtering.
	pub fn inspect(&self) -> Result<Option<SessionBundle>, StorageError> {
		self.read_bundle()
	}

	/// Replaces the stored bundle.
	///
	/// The document is written to a temporary file in the same directory and
	/// renamed over the previous one, so readers see either the old or the new
	/// bundle.
	pub fn save(&self, cookies: &[Cookie]) -> Result<(), StorageError> {
		let dir = self.path.parent().unwrap_or_else(|| Path::new("."));
		std::fs::create_dir_all(dir).map_err(|e| StorageError::io(dir, e))?;

		let bundle = SessionBundle {
			saved_at: Utc::now(),
			cookies: cookies.to_vec(),
		};
		let json = serde_json::to_vec_pretty(&bundle)?;

		let mut tmp = NamedTempFile::new_in(dir).map_err(|e| StorageError::io(dir, e))?;
		tmp.write_all(&json).map_err(|e| StorageError::io(tmp.path(), e))?;
		tmp.as_file().sync_all().map_err(|e| StorageError::io(tmp.path(), e))?;
		tmp.persist(&self.path).map_err(|e| StorageError::io(&self.path, e.error))?;

		info!(target = "arrivals.session", cookies = cookies.len(), "session saved");
		Ok(())
	}

	/// Removes the stored bundle. Returns `false` if there was nothing to remove.
	pub fn clear(&self) -> Result<bool, StorageError> {
		match std::fs::remove_file(&self.path) {
			Ok(()) => {
				info!(target = "arrivals.session", path = %self.path.display(), "session removed");
				Ok(true)
			}
			Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(false),
			Err(err) => Err(StorageError::io(&self.path, err)),
		}
	}

	fn read_bundle(&self) -> Result<Option<SessionBundle>, StorageError> {
		let content = match std::fs::read_to_string(&self.path) {
			Ok(content) => content,
			Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
			Err(err) => return Err(StorageError::io(&self.path, err)),
		};
		Ok(Some(serde_json::from_str(&content)?))
	}
}

fn unix_now() -> f64 {
	SystemTime::now()
		.duration_since(UNIX_EPOCH)
		.map(|d| d.as_secs_f64())
		.unwrap_or(0.0)
}
