//! Login state machine.
//!
//! ```text
//! Start ─▶ SessionProbe ─▶ Authenticated
//!   │           │
//!   └───────────┴─▶ CredentialLogin ─▶ Authenticated | Failed
//!                          │
//!                          └─▶ TwoFactorChallenge ─▶ Authenticated | Failed
//! ```
//!
//! Each call to [`AuthSession::advance`] performs exactly one transition, so
//! the machine can be stepped and inspected with a fake [`Extractor`].

use std::mem;

use arrivals_protocol::Cookie;
use tracing::{debug, info, warn};

use crate::config::Credentials;
use crate::error::{RefreshError, Result};
use crate::extractor::{Extractor, ExtractorError};
use crate::session_store::SessionStore;
use crate::two_factor::CodeProvider;

/// How the run ended up authenticated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthPath {
	ReusedSession,
	Credentials,
	TwoFactor,
}

/// Login progress.
#[derive(Debug)]
pub enum AuthState {
	Start,
	/// A persisted bundle is being tried on a fresh context.
	SessionProbe(Vec<Cookie>),
	CredentialLogin,
	TwoFactorChallenge,
	Authenticated(AuthPath),
	Failed(RefreshError),
}

impl AuthState {
	pub fn is_terminal(&self) -> bool {
		matches!(self, AuthState::Authenticated(_) | AuthState::Failed(_))
	}

	pub fn name(&self) -> &'static str {
		match self {
			AuthState::Start => "start",
			AuthState::SessionProbe(_) => "session_probe",
			AuthState::CredentialLogin => "credential_login",
			AuthState::TwoFactorChallenge => "two_factor_challenge",
			AuthState::Authenticated(_) => "authenticated",
			AuthState::Failed(_) => "failed",
		}
	}
}

/// Result of a successful login.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthOutcome {
	pub path: AuthPath,
	/// Whether the resulting cookies were persisted.
	pub session_saved: bool,
}

/// Drives one browsing context from a fresh start to an authenticated surface.
pub struct AuthSession<'a> {
	store: &'a SessionStore,
	credentials: Option<&'a Credentials>,
	provider: Option<&'a dyn CodeProvider>,
	state: AuthState,
	code_requested: bool,
}

impl<'a> AuthSession<'a> {
	pub fn new(
		store: &'a SessionStore,
		credentials: Option<&'a Credentials>,
		provider: Option<&'a dyn CodeProvider>,
	) -> Self {
		Self {
			store,
			credentials,
			provider,
			state: AuthState::Start,
			code_requested: false,
		}
	}

	pub fn state(&self) -> &AuthState {
		&self.state
	}

	/// Runs the machine to completion.
	///
	/// On success the context's cookies are saved to the store; a storage
	/// failure is logged and does not fail the login.
	pub async fn run(mut self, extractor: &mut dyn Extractor) -> Result<AuthOutcome> {
		loop {
			match mem::replace(&mut self.state, AuthState::Start) {
				AuthState::Authenticated(path) => {
					let session_saved = persist_session(self.store, extractor).await;
					info!(target = "arrivals.auth", ?path, session_saved, "authenticated");
					return Ok(AuthOutcome { path, session_saved });
				}
				AuthState::Failed(err) => {
					warn!(target = "arrivals.auth", kind = ?err.kind(), error = %err, "login failed");
					return Err(err);
				}
				pending => {
					self.state = pending;
					self.advance(extractor).await;
				}
			}
		}
	}

	/// Performs one transition. Does nothing in a terminal state.
	pub async fn advance(&mut self, extractor: &mut dyn Extractor) {
		if self.state.is_terminal() {
			return;
		}
		let from = mem::replace(&mut self.state, AuthState::Start);
		let from_name = from.name();
		let next = match from {
			AuthState::Start => self.start(),
			AuthState::SessionProbe(cookies) => self.probe(extractor, cookies).await,
			AuthState::CredentialLogin => self.credential_login(extractor).await,
			AuthState::TwoFactorChallenge => self.two_factor(extractor).await,
			terminal => terminal,
		};
		debug!(target = "arrivals.auth", from = from_name, to = next.name(), "auth transition");
		self.state = next;
	}

	fn start(&self) -> AuthState {
		match self.store.load() {
			Some(cookies) => AuthState::SessionProbe(cookies),
			None => AuthState::CredentialLogin,
		}
	}

	async fn probe(&self, extractor: &mut dyn Extractor, cookies: Vec<Cookie>) -> AuthState {
		match try_session(extractor, &cookies).await {
			Ok(true) => {
				info!(target = "arrivals.auth", cookies = cookies.len(), "saved session still valid");
				AuthState::Authenticated(AuthPath::ReusedSession)
			}
			Ok(false) => {
				info!(target = "arrivals.auth", "saved session rejected; falling back to credentials");
				if let Err(err) = self.store.clear() {
					warn!(target = "arrivals.auth", error = %err, "failed to clear rejected session");
				}
				AuthState::CredentialLogin
			}
			Err(err) => AuthState::Failed(RefreshError::Browser(err)),
		}
	}

	async fn credential_login(&self, extractor: &mut dyn Extractor) -> AuthState {
		let Some(credentials) = self.credentials else {
			return AuthState::Failed(RefreshError::Configuration(
				"login credentials are not configured (ARRIVALS_EMAIL / ARRIVALS_PASSWORD)".into(),
			));
		};

		match try_credentials(extractor, credentials).await {
			Ok(None) => {
				info!(target = "arrivals.auth", "two-factor challenge detected");
				AuthState::TwoFactorChallenge
			}
			Ok(Some(true)) => AuthState::Authenticated(AuthPath::Credentials),
			Ok(Some(false)) => AuthState::Failed(RefreshError::LoginRejected(
				"no authenticated page after submitting credentials".into(),
			)),
			Err(err) => AuthState::Failed(RefreshError::Browser(err)),
		}
	}

	async fn two_factor(&mut self, extractor: &mut dyn Extractor) -> AuthState {
		let Some(provider) = self.provider else {
			return AuthState::Failed(RefreshError::TwoFactorUnavailable);
		};
		if self.code_requested {
			return AuthState::Failed(RefreshError::TwoFactorRejected("challenge already attempted".into()));
		}
		self.code_requested = true;

		let code = provider
			.request_code("two-factor code not received before the deadline")
			.await;
		let code = code.trim();
		if code.is_empty() {
			return AuthState::Failed(RefreshError::TwoFactorRejected("no code received".into()));
		}

		match try_code(extractor, code).await {
			Ok(true) => AuthState::Authenticated(AuthPath::TwoFactor),
			Ok(false) => AuthState::Failed(RefreshError::TwoFactorRejected("code was not accepted".into())),
			Err(err) => AuthState::Failed(RefreshError::Browser(err)),
		}
	}
}

async fn try_session(extractor: &mut dyn Extractor, cookies: &[Cookie]) -> std::result::Result<bool, ExtractorError> {
	extractor.apply_cookies(cookies).await?;
	extractor.open_login().await?;
	extractor.is_authenticated().await
}

/// `None` means a challenge is showing; otherwise whether the login landed.
async fn try_credentials(
	extractor: &mut dyn Extractor,
	credentials: &Credentials,
) -> std::result::Result<Option<bool>, ExtractorError> {
	extractor.open_login().await?;
	extractor.submit_credentials(&credentials.email, &credentials.password).await?;
	if extractor.challenge_detected().await? {
		return Ok(None);
	}
	extractor.is_authenticated().await.map(Some)
}

async fn try_code(extractor: &mut dyn Extractor, code: &str) -> std::result::Result<bool, ExtractorError> {
	extractor.submit_challenge_code(code).await?;
	extractor.is_authenticated().await
}

async fn persist_session(store: &SessionStore, extractor: &mut dyn Extractor) -> bool {
	let cookies = match extractor.export_cookies().await {
		Ok(cookies) => cookies,
		Err(err) => {
			warn!(target = "arrivals.auth", error = %err, "could not read cookies to persist");
			return false;
		}
	};
	match store.save(&cookies) {
		Ok(()) => true,
		Err(err) => {
			warn!(target = "arrivals.auth", error = %err, "could not persist session");
			false
		}
	}
}

#[cfg(test)]
mod tests {
	use std::result::Result;
	use std::sync::atomic::{AtomicUsize, Ordering};

	use arrivals_protocol::GuestRecord;
	use async_trait::async_trait;
	use tempfile::TempDir;

	use super::*;

	#[derive(Default)]
	struct FakeSite {
		accepts_cookie: Option<&'static str>,
		challenge: bool,
		expected_code: &'static str,
		credentials_ok: bool,
		fail_navigation: bool,
		jar: Vec<Cookie>,
		authenticated: bool,
		code_submissions: usize,
	}

	#[async_trait]
	impl Extractor for FakeSite {
		async fn apply_cookies(&mut self, cookies: &[Cookie]) -> Result<(), ExtractorError> {
			self.jar.extend_from_slice(cookies);
			Ok(())
		}

		async fn open_login(&mut self) -> Result<(), ExtractorError> {
			if self.fail_navigation {
				return Err(ExtractorError::Navigation("connection refused".into()));
			}
			self.authenticated = self
				.accepts_cookie
				.is_some_and(|name| self.jar.iter().any(|c| c.name == name));
			Ok(())
		}

		async fn is_authenticated(&mut self) -> Result<bool, ExtractorError> {
			Ok(self.authenticated)
		}

		async fn submit_credentials(&mut self, _email: &str, _password: &str) -> Result<(), ExtractorError> {
			self.authenticated = self.credentials_ok && !self.challenge;
			Ok(())
		}

		async fn challenge_detected(&mut self) -> Result<bool, ExtractorError> {
			Ok(self.challenge)
		}

		async fn submit_challenge_code(&mut self, code: &str) -> Result<(), ExtractorError> {
			self.code_submissions += 1;
			self.authenticated = code == self.expected_code;
			Ok(())
		}

		async fn export_cookies(&mut self) -> Result<Vec<Cookie>, ExtractorError> {
			Ok(vec![Cookie::new("sid", "fresh")])
		}

		async fn fetch_records(&mut self) -> Result<Vec<GuestRecord>, ExtractorError> {
			Ok(Vec::new())
		}

		async fn close(&mut self) -> Result<(), ExtractorError> {
			Ok(())
		}
	}

	struct FixedCode {
		code: &'static str,
		calls: AtomicUsize,
	}

	impl FixedCode {
		fn new(code: &'static str) -> Self {
			Self {
				code,
				calls: AtomicUsize::new(0),
			}
		}
	}

	#[async_trait]
	impl CodeProvider for FixedCode {
		async fn request_code(&self, _timeout_message: &str) -> String {
			self.calls.fetch_add(1, Ordering::SeqCst);
			self.code.to_owned()
		}
	}

	fn credentials() -> Credentials {
		Credentials::from_parts(Some("desk@example.com".into()), Some("secret".into())).unwrap()
	}

	#[tokio::test]
	async fn valid_saved_session_skips_login() {
		let temp = TempDir::new().unwrap();
		let store = SessionStore::new(temp.path());
		store.save(&[Cookie::new("sid", "old")]).unwrap();
		let mut site = FakeSite {
			accepts_cookie: Some("sid"),
			..Default::default()
		};

		let outcome = AuthSession::new(&store, None, None).run(&mut site).await.unwrap();

		assert_eq!(outcome.path, AuthPath::ReusedSession);
		assert!(outcome.session_saved);
	}

	#[tokio::test]
	async fn rejected_session_is_cleared_before_credential_login() {
		let temp = TempDir::new().unwrap();
		let store = SessionStore::new(temp.path());
		store.save(&[Cookie::new("stale", "x")]).unwrap();
		let mut site = FakeSite {
			accepts_cookie: Some("sid"),
			credentials_ok: true,
			..Default::default()
		};
		let creds = credentials();
		let mut session = AuthSession::new(&store, Some(&creds), None);

		session.advance(&mut site).await;
		assert!(matches!(session.state(), AuthState::SessionProbe(c) if c.len() == 1));
		session.advance(&mut site).await;
		assert!(matches!(session.state(), AuthState::CredentialLogin));
		assert!(!store.exists());
		session.advance(&mut site).await;
		assert!(matches!(session.state(), AuthState::Authenticated(AuthPath::Credentials)));
		assert!(session.state().is_terminal());
		session.advance(&mut site).await;
		assert!(matches!(session.state(), AuthState::Authenticated(AuthPath::Credentials)));
	}

	#[tokio::test]
	async fn missing_credentials_is_a_configuration_error() {
		let temp = TempDir::new().unwrap();
		let store = SessionStore::new(temp.path());
		let mut site = FakeSite::default();

		let err = AuthSession::new(&store, None, None).run(&mut site).await.unwrap_err();
		assert!(matches!(err, RefreshError::Configuration(_)));
	}

	#[tokio::test]
	async fn wrong_credentials_without_challenge_are_rejected() {
		let temp = TempDir::new().unwrap();
		let store = SessionStore::new(temp.path());
		let mut site = FakeSite::default();
		let creds = credentials();

		let err = AuthSession::new(&store, Some(&creds), None).run(&mut site).await.unwrap_err();
		assert!(matches!(err, RefreshError::LoginRejected(_)));
		assert!(!store.exists());
	}

	#[tokio::test]
	async fn challenge_without_provider_is_unavailable() {
		let temp = TempDir::new().unwrap();
		let store = SessionStore::new(temp.path());
		let mut site = FakeSite {
			credentials_ok: true,
			challenge: true,
			..Default::default()
		};
		let creds = credentials();

		let err = AuthSession::new(&store, Some(&creds), None).run(&mut site).await.unwrap_err();
		assert!(matches!(err, RefreshError::TwoFactorUnavailable));
	}

	#[tokio::test]
	async fn correct_code_authenticates_and_saves() {
		let temp = TempDir::new().unwrap();
		let store = SessionStore::new(temp.path());
		let mut site = FakeSite {
			credentials_ok: true,
			challenge: true,
			expected_code: "123456",
			..Default::default()
		};
		let creds = credentials();
		let provider = FixedCode::new(" 123456 ");

		let outcome = AuthSession::new(&store, Some(&creds), Some(&provider))
			.run(&mut site)
			.await
			.unwrap();

		assert_eq!(outcome.path, AuthPath::TwoFactor);
		assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
		assert_eq!(store.load().unwrap()[0].value, "fresh");
	}

	#[tokio::test]
	async fn wrong_code_is_tried_once() {
		let temp = TempDir::new().unwrap();
		let store = SessionStore::new(temp.path());
		let mut site = FakeSite {
			credentials_ok: true,
			challenge: true,
			expected_code: "123456",
			..Default::default()
		};
		let creds = credentials();
		let provider = FixedCode::new("999999");

		let err = AuthSession::new(&store, Some(&creds), Some(&provider))
			.run(&mut site)
			.await
			.unwrap_err();

		assert!(matches!(err, RefreshError::TwoFactorRejected(_)));
		assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
		assert_eq!(site.code_submissions, 1);
	}

	#[tokio::test]
	async fn empty_code_is_rejected_without_submission() {
		let temp = TempDir::new().unwrap();
		let store = SessionStore::new(temp.path());
		let mut site = FakeSite {
			credentials_ok: true,
			challenge: true,
			..Default::default()
		};
		let creds = credentials();
		let provider = FixedCode::new("");

		let err = AuthSession::new(&store, Some(&creds), Some(&provider))
			.run(&mut site)
			.await
			.unwrap_err();

		assert!(matches!(err, RefreshError::TwoFactorRejected(_)));
		assert_eq!(site.code_submissions, 0);
	}

	#[tokio::test]
	async fn navigation_failure_maps_to_browser_error() {
		let temp = TempDir::new().unwrap();
		let store = SessionStore::new(temp.path());
		let mut site = FakeSite {
			fail_navigation: true,
			..Default::default()
		};
		let creds = credentials();

		let err = AuthSession::new(&store, Some(&creds), None).run(&mut site).await.unwrap_err();
		assert!(matches!(err, RefreshError::Browser(ExtractorError::Navigation(_))));
	}
}
