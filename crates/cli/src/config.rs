//! Resolves flags and environment into the typed settings the core consumes.

use std::path::{Path, PathBuf};
use std::time::Duration;

use arrivals::{Credentials, RefreshConfig, RetentionPolicy, SessionStore};
use url::Url;

use crate::cli::{Cli, ServeArgs};
use crate::error::{AppError, Result};
use crate::portal::PortalSettings;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Settings shared by every command.
#[derive(Debug, Clone)]
pub struct AppConfig {
	pub site_url: Option<String>,
	pub login_path: String,
	pub arrivals_path: String,
	pub credentials: Option<Credentials>,
	pub data_dir: PathBuf,
	pub session_dir: PathBuf,
	pub capture_dir: PathBuf,
	pub retention: RetentionPolicy,
	pub capture: bool,
}

impl AppConfig {
	pub fn from_cli(cli: &Cli) -> Self {
		Self {
			site_url: cli.site.site_url.clone().filter(|s| !s.trim().is_empty()),
			login_path: cli.site.login_path.clone(),
			arrivals_path: cli.site.arrivals_path.clone(),
			credentials: Credentials::from_parts(cli.site.email.clone(), cli.site.password.clone()),
			data_dir: cli.storage.data_dir.clone(),
			session_dir: cli.storage.session_dir.clone(),
			capture_dir: cli.storage.capture_dir.clone(),
			retention: RetentionPolicy::from_days(cli.storage.retention_days),
			capture: cli.storage.capture,
		}
	}

	/// Page locations and capture settings for the portal extractor.
	pub fn portal_settings(&self) -> Result<PortalSettings> {
		let raw = self
			.site_url
			.as_deref()
			.ok_or_else(|| AppError::Config("ARRIVALS_SITE_URL (or --site-url) is required".into()))?;
		let base = Url::parse(raw).map_err(|e| AppError::Config(format!("invalid site URL {raw:?}: {e}")))?;
		let join = |path: &str| {
			base.join(path)
				.map_err(|e| AppError::Config(format!("invalid path {path:?}: {e}")))
		};

		Ok(PortalSettings {
			login_url: join(&self.login_path)?,
			arrivals_url: join(&self.arrivals_path)?,
			capture_dir: self.capture.then(|| self.capture_dir.clone()),
			request_timeout: REQUEST_TIMEOUT,
		})
	}

	/// Opens the session store, creating its directory.
	pub fn session_store(&self) -> Result<SessionStore> {
		ensure_dir(&self.session_dir)?;
		Ok(SessionStore::new(&self.session_dir))
	}

	/// Directories the retention policy applies to.
	pub fn retention_dirs(&self) -> Vec<PathBuf> {
		vec![self.data_dir.clone(), self.capture_dir.clone()]
	}

	/// Coordinator settings for one-shot runs.
	pub fn refresh_config(&self) -> RefreshConfig {
		RefreshConfig {
			retention: self.retention,
			retention_dirs: self.retention_dirs(),
			..RefreshConfig::default()
		}
	}

	/// Coordinator settings for the long-running server.
	pub fn serve_config(&self, args: &ServeArgs) -> RefreshConfig {
		RefreshConfig {
			interval: Duration::from_secs(args.interval_secs.max(1)),
			cache_ttl: Duration::from_secs(args.cache_ttl_secs),
			challenge_timeout: Duration::from_secs(args.two_factor_timeout_secs),
			export_dir: args.export.then(|| self.data_dir.clone()),
			..self.refresh_config()
		}
	}
}

pub(crate) fn ensure_dir(path: &Path) -> Result<()> {
	std::fs::create_dir_all(path).map_err(|source| AppError::Directory {
		path: path.to_path_buf(),
		source,
	})
}
