//! Credential artifacts: cookies and the persisted session bundle.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single browser cookie as captured after a successful login.
///
/// `expires` is in Unix seconds. `None` or a negative value marks a session
/// cookie, which carries no absolute expiry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cookie {
	pub name: String,
	pub value: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub domain: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub path: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub expires: Option<f64>,
	#[serde(default)]
	pub http_only: bool,
	#[serde(default)]
	pub secure: bool,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub same_site: Option<String>,
}

impl Cookie {
	/// Creates a session cookie with no domain, path or expiry.
	pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			value: value.into(),
			domain: None,
			path: None,
			expires: None,
			http_only: false,
			secure: false,
			same_site: None,
		}
	}

	/// Sets the absolute expiry in Unix seconds.
	pub fn with_expires(mut self, expires: f64) -> Self {
		self.expires = Some(expires);
		self
	}

	/// Sets the cookie domain.
	pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
		self.domain = Some(domain.into());
		self
	}

	/// Returns the absolute expiry, or `None` for session cookies.
	pub fn expiry(&self) -> Option<f64> {
		self.expires.filter(|ts| *ts >= 0.0)
	}

	/// Returns `true` when the cookie has an expiry at or before `now_secs`.
	pub fn is_expired_at(&self, now_secs: f64) -> bool {
		self.expiry().is_some_and(|ts| ts <= now_secs)
	}
}

/// On-disk format of the persisted credential set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionBundle {
	pub saved_at: DateTime<Utc>,
	#[serde(default)]
	pub cookies: Vec<Cookie>,
}
