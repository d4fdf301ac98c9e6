//! Error types for acquisition runs and session persistence.

use std::path::PathBuf;

use arrivals_protocol::ErrorKind;
use thiserror::Error;

use crate::extractor::ExtractorError;

/// Failure of a single acquisition run.
///
/// Every variant is fatal to the run and nothing else: the coordinator records
/// it as the last error and keeps the process and the scheduler alive.
#[derive(Debug, Error)]
pub enum RefreshError {
	/// Required settings are missing (credentials for a fresh login).
	#[error("configuration error: {0}")]
	Configuration(String),

	/// The site asked for a one-time code and no provider was supplied.
	#[error("two-factor authentication required but no code provider is available")]
	TwoFactorUnavailable,

	/// A one-time code was requested but it was empty, timed out, or refused.
	#[error("two-factor verification failed: {0}")]
	TwoFactorRejected(String),

	/// Credentials were submitted but the site did not show an authenticated surface.
	#[error("login rejected: {0}")]
	LoginRejected(String),

	/// The browsing context could not be opened or driven during login.
	#[error("browser context error: {0}")]
	Browser(#[source] ExtractorError),

	/// The post-login data fetch failed.
	#[error("data extraction failed: {0}")]
	Extraction(#[source] ExtractorError),
}

impl RefreshError {
	/// Returns the wire classification used in status payloads.
	pub fn kind(&self) -> ErrorKind {
		match self {
			RefreshError::Configuration(_) => ErrorKind::Configuration,
			RefreshError::TwoFactorUnavailable => ErrorKind::TwoFactorUnavailable,
			RefreshError::TwoFactorRejected(_) => ErrorKind::TwoFactorRejected,
			RefreshError::LoginRejected(_) => ErrorKind::LoginRejected,
			RefreshError::Browser(_) => ErrorKind::Browser,
			RefreshError::Extraction(_) => ErrorKind::Extraction,
		}
	}
}

/// Session persistence failure. Always non-fatal to a run.
#[derive(Debug, Error)]
pub enum StorageError {
	#[error("session store I/O error at {path}: {source}")]
	Io {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("session store encoding error: {0}")]
	Json(#[from] serde_json::Error),
}

impl StorageError {
	pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
		StorageError::Io { path: path.into(), source }
	}
}

/// Result alias for acquisition runs.
pub type Result<T> = std::result::Result<T, RefreshError>;
