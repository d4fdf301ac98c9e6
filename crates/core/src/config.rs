//! Typed settings consumed by the coordinator.
//!
//! The core never reads the environment; the binary crate resolves flags and
//! variables into these structs.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use crate::retention::RetentionPolicy;
use crate::two_factor::DEFAULT_CHALLENGE_TIMEOUT;

/// Back-office login credentials.
#[derive(Clone)]
pub struct Credentials {
	pub email: String,
	pub password: String,
}

impl Credentials {
	/// Returns credentials only when both parts are present and non-blank.
	pub fn from_parts(email: Option<String>, password: Option<String>) -> Option<Self> {
		let email = email.filter(|s| !s.trim().is_empty())?;
		let password = password.filter(|s| !s.is_empty())?;
		Some(Self { email, password })
	}
}

impl fmt::Debug for Credentials {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Credentials")
			.field("email", &self.email)
			.field("password", &"<redacted>")
			.finish()
	}
}

/// Coordinator settings.
#[derive(Debug, Clone)]
pub struct RefreshConfig {
	/// Period of the scheduled trigger.
	pub interval: Duration,
	/// Lifetime of cached datasets.
	pub cache_ttl: Duration,
	/// How long a two-factor challenge waits for a code.
	pub challenge_timeout: Duration,
	/// Age limit applied to `retention_dirs` after each successful run.
	pub retention: RetentionPolicy,
	/// Directories swept by the retention policy.
	pub retention_dirs: Vec<PathBuf>,
	/// When set, every successful run writes a JSON export here.
	pub export_dir: Option<PathBuf>,
}

impl Default for RefreshConfig {
	fn default() -> Self {
		Self {
			interval: Duration::from_secs(600),
			cache_ttl: Duration::from_secs(600),
			challenge_timeout: DEFAULT_CHALLENGE_TIMEOUT,
			retention: RetentionPolicy::from_days(7),
			retention_dirs: Vec::new(),
			export_dir: None,
		}
	}
}
