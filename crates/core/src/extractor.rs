//! The page-driving seam between the core and a concrete browsing context.
//!
//! A run asks the [`ExtractorLauncher`] for a fresh context, drives it through
//! [`AuthSession`](crate::AuthSession), fetches records, and always calls
//! [`Extractor::close`] before the run ends, whatever the outcome.

use arrivals_protocol::{Cookie, GuestRecord};
use async_trait::async_trait;
use thiserror::Error;

/// Failure reported by a browsing context.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ExtractorError {
	/// A page load or form submission did not complete.
	#[error("navigation failed: {0}")]
	Navigation(String),

	/// An element the flow depends on is not on the page.
	#[error("missing element: {0}")]
	MissingElement(String),

	/// The page was loaded but its content could not be interpreted.
	#[error("unexpected markup: {0}")]
	Markup(String),

	#[error("{0}")]
	Other(String),
}

/// One isolated browsing context with its own cookie jar.
///
/// Method order during a run:
/// `apply_cookies`/`open_login` → `is_authenticated` → `submit_credentials`
/// → `challenge_detected` → `submit_challenge_code` → `export_cookies`
/// → `fetch_records` → `close`.
#[async_trait]
pub trait Extractor: Send {
	/// Installs persisted cookies into the context before the first navigation.
	async fn apply_cookies(&mut self, cookies: &[Cookie]) -> Result<(), ExtractorError>;

	/// Navigates to the login surface (or reloads it after cookies were applied).
	async fn open_login(&mut self) -> Result<(), ExtractorError>;

	/// Returns `true` when the current page is an authenticated surface.
	async fn is_authenticated(&mut self) -> Result<bool, ExtractorError>;

	/// Fills and submits the primary credential form.
	async fn submit_credentials(&mut self, email: &str, password: &str) -> Result<(), ExtractorError>;

	/// Returns `true` when the current page asks for a one-time code.
	async fn challenge_detected(&mut self) -> Result<bool, ExtractorError>;

	/// Fills and submits the one-time code form.
	async fn submit_challenge_code(&mut self, code: &str) -> Result<(), ExtractorError>;

	/// Returns the context's current cookies for persistence.
	async fn export_cookies(&mut self) -> Result<Vec<Cookie>, ExtractorError>;

	/// Loads the arrivals page and extracts its records.
	async fn fetch_records(&mut self) -> Result<Vec<GuestRecord>, ExtractorError>;

	/// Releases the context. Must be safe to call after any failure.
	async fn close(&mut self) -> Result<(), ExtractorError>;
}

/// Factory for fresh browsing contexts, one per acquisition run.
#[async_trait]
pub trait ExtractorLauncher: Send + Sync {
	async fn launch(&self) -> Result<Box<dyn Extractor>, ExtractorError>;
}
