//! HTTP-form implementation of the page-driving seam.
//!
//! Each run gets its own [`PortalExtractor`] with a private cookie book.
//! Redirects are followed by hand so every `Set-Cookie` along a login chain
//! lands in the book, which is what gets persisted after a successful login.

mod form;
mod markup;

use std::path::PathBuf;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use arrivals::protocol::{Cookie, GuestRecord};
use arrivals::{Extractor, ExtractorError, ExtractorLauncher};
use async_trait::async_trait;
use reqwest::header::{COOKIE, LOCATION};
use reqwest::{Client, Method, StatusCode};
use tracing::{debug, info, warn};
use url::Url;

const MAX_REDIRECTS: usize = 10;
const USER_AGENT: &str = concat!("arrivals/", env!("CARGO_PKG_VERSION"));

/// Page locations and capture settings.
#[derive(Debug, Clone)]
pub struct PortalSettings {
	pub login_url: Url,
	pub arrivals_url: Url,
	/// When set, the HTML of every step is written here.
	pub capture_dir: Option<PathBuf>,
	pub request_timeout: Duration,
}

/// Opens one isolated HTTP client per acquisition run.
#[derive(Debug, Clone)]
pub struct PortalLauncher {
	settings: PortalSettings,
}

impl PortalLauncher {
	pub fn new(settings: PortalSettings) -> Self {
		Self { settings }
	}
}

#[async_trait]
impl ExtractorLauncher for PortalLauncher {
	async fn launch(&self) -> Result<Box<dyn Extractor>, ExtractorError> {
		let client = Client::builder()
			.redirect(reqwest::redirect::Policy::none())
			.timeout(self.settings.request_timeout)
			.user_agent(USER_AGENT)
			.build()
			.map_err(|e| ExtractorError::Other(format!("failed to build HTTP client: {e}")))?;

		debug!(target = "arrivals.portal", login = %self.settings.login_url, "browsing context opened");
		Ok(Box::new(PortalExtractor {
			client,
			settings: self.settings.clone(),
			book: CookieBook::default(),
			page: None,
		}))
	}
}

struct Page {
	url: Url,
	html: String,
}

/// Drives the back-office login and arrivals pages over plain HTTP.
pub struct PortalExtractor {
	client: Client,
	settings: PortalSettings,
	book: CookieBook,
	page: Option<Page>,
}

impl PortalExtractor {
	fn page(&self) -> Result<&Page, ExtractorError> {
		self.page
			.as_ref()
			.ok_or_else(|| ExtractorError::MissingElement("no page loaded".into()))
	}

	async fn navigate(
		&mut self,
		mut method: Method,
		mut url: Url,
		mut fields: Option<Vec<(String, String)>>,
		capture: &str,
	) -> Result<(), ExtractorError> {
		for _ in 0..=MAX_REDIRECTS {
			let mut request = self.client.request(method.clone(), url.clone());
			if let Some(header) = self.book.header_for(&url) {
				request = request.header(COOKIE, header);
			}
			if let Some(fields) = &fields {
				request = if method == Method::GET {
					request.query(fields)
				} else {
					request.form(fields)
				};
			}

			let response = request
				.send()
				.await
				.map_err(|e| ExtractorError::Navigation(format!("{method} {}: {e}", redacted(&url))))?;
			self.book.absorb(&url, response.cookies());

			let status = response.status();
			if status.is_redirection() {
				let location = response
					.headers()
					.get(LOCATION)
					.and_then(|v| v.to_str().ok())
					.ok_or_else(|| ExtractorError::Navigation(format!("{status} without a Location header")))?;
				let next = url
					.join(location)
					.map_err(|e| ExtractorError::Navigation(format!("bad redirect {location:?}: {e}")))?;
				if status != StatusCode::TEMPORARY_REDIRECT && status != StatusCode::PERMANENT_REDIRECT {
					method = Method::GET;
					fields = None;
				}
				debug!(target = "arrivals.portal", %status, to = %redacted(&next), "following redirect");
				url = next;
				continue;
			}
			if status.is_server_error() {
				return Err(ExtractorError::Navigation(format!("{} returned {status}", redacted(&url))));
			}

			let html = response
				.text()
				.await
				.map_err(|e| ExtractorError::Navigation(format!("reading {}: {e}", redacted(&url))))?;
			debug!(target = "arrivals.portal", %status, url = %redacted(&url), bytes = html.len(), "page loaded");
			self.capture(capture, &html);
			self.page = Some(Page { url, html });
			return Ok(());
		}

		Err(ExtractorError::Navigation(format!("more than {MAX_REDIRECTS} redirects")))
	}

	fn capture(&self, name: &str, html: &str) {
		let Some(dir) = &self.settings.capture_dir else {
			return;
		};
		let path = dir.join(name);
		let written = std::fs::create_dir_all(dir).and_then(|()| std::fs::write(&path, html));
		match written {
			Ok(()) => debug!(target = "arrivals.portal", path = %path.display(), "page captured"),
			Err(err) => warn!(target = "arrivals.portal", path = %path.display(), error = %err, "page capture failed"),
		}
	}
}

#[async_trait]
impl Extractor for PortalExtractor {
	async fn apply_cookies(&mut self, cookies: &[Cookie]) -> Result<(), ExtractorError> {
		for cookie in cookies {
			self.book.insert(cookie.clone());
		}
		Ok(())
	}

	async fn open_login(&mut self) -> Result<(), ExtractorError> {
		let url = self.settings.login_url.clone();
		self.navigate(Method::GET, url, None, "1-login-form.html").await
	}

	async fn is_authenticated(&mut self) -> Result<bool, ExtractorError> {
		Ok(self
			.page
			.as_ref()
			.is_some_and(|page| markup::looks_authenticated(&page.url, &page.html)))
	}

	async fn submit_credentials(&mut self, email: &str, password: &str) -> Result<(), ExtractorError> {
		let page = self.page()?;
		let form = markup::login_form(&page.html).ok_or_else(|| ExtractorError::MissingElement("login form".into()))?;
		let fields = form
			.login_fields(email, password)
			.ok_or_else(|| ExtractorError::MissingElement("e-mail field".into()))?;
		let target = form
			.target(&page.url)
			.map_err(|e| ExtractorError::Markup(format!("login form action: {e}")))?;
		let method = if form.is_get() { Method::GET } else { Method::POST };

		info!(target = "arrivals.portal", to = %redacted(&target), "submitting credentials");
		self.navigate(method, target, Some(fields), "2-after-login.html").await
	}

	async fn challenge_detected(&mut self) -> Result<bool, ExtractorError> {
		let page = self.page()?;
		let detected = markup::challenge_present(&page.html);
		if detected {
			self.capture("2b-two-factor.html", &page.html);
		}
		Ok(detected)
	}

	async fn submit_challenge_code(&mut self, code: &str) -> Result<(), ExtractorError> {
		let page = self.page()?;
		let form =
			markup::challenge_form(&page.html).ok_or_else(|| ExtractorError::MissingElement("verification form".into()))?;
		let fields = form.code_fields(code);
		let target = form
			.target(&page.url)
			.map_err(|e| ExtractorError::Markup(format!("verification form action: {e}")))?;
		let method = if form.is_get() { Method::GET } else { Method::POST };

		info!(target = "arrivals.portal", to = %redacted(&target), "submitting verification code");
		self.navigate(method, target, Some(fields), "3-dashboard.html").await
	}

	async fn export_cookies(&mut self) -> Result<Vec<Cookie>, ExtractorError> {
		Ok(self.book.cookies.clone())
	}

	async fn fetch_records(&mut self) -> Result<Vec<GuestRecord>, ExtractorError> {
		let url = self.settings.arrivals_url.clone();
		self.navigate(Method::GET, url, None, "3-arrivals.html").await?;

		let page = self.page()?;
		if markup::login_form(&page.html).is_some() {
			return Err(ExtractorError::Navigation("arrivals page redirected to the login form".into()));
		}
		let guests = markup::parse_arrivals(&page.html);
		info!(target = "arrivals.portal", count = guests.len(), "arrivals parsed");
		Ok(guests)
	}

	async fn close(&mut self) -> Result<(), ExtractorError> {
		self.page = None;
		Ok(())
	}
}

/// Cookies collected by one browsing context.
#[derive(Debug, Default)]
struct CookieBook {
	cookies: Vec<Cookie>,
}

impl CookieBook {
	fn insert(&mut self, cookie: Cookie) {
		self.cookies
			.retain(|c| !(c.name == cookie.name && c.domain == cookie.domain && c.path == cookie.path));
		if !cookie.value.is_empty() && !cookie.is_expired_at(unix_now()) {
			self.cookies.push(cookie);
		}
	}

	fn absorb<'a>(&mut self, origin: &Url, received: impl Iterator<Item = reqwest::cookie::Cookie<'a>>) {
		let now = unix_now();
		for c in received {
			let expires = c
				.max_age()
				.map(|age| now + age.as_secs_f64())
				.or_else(|| c.expires().and_then(system_secs));
			let same_site = if c.same_site_strict() {
				Some("Strict".to_string())
			} else if c.same_site_lax() {
				Some("Lax".to_string())
			} else {
				None
			};
			self.insert(Cookie {
				name: c.name().to_string(),
				value: c.value().to_string(),
				domain: c.domain().map(str::to_string).or_else(|| origin.host_str().map(str::to_string)),
				path: Some(c.path().unwrap_or("/").to_string()),
				expires,
				http_only: c.http_only(),
				secure: c.secure(),
				same_site,
			});
		}
	}

	fn header_for(&self, url: &Url) -> Option<String> {
		let host = url.host_str()?;
		let now = unix_now();
		let pairs: Vec<String> = self
			.cookies
			.iter()
			.filter(|c| domain_matches(c.domain.as_deref(), host))
			.filter(|c| url.path().starts_with(c.path.as_deref().unwrap_or("/")))
			.filter(|c| !c.secure || url.scheme() == "https")
			.filter(|c| !c.is_expired_at(now))
			.map(|c| format!("{}={}", c.name, c.value))
			.collect();
		(!pairs.is_empty()).then(|| pairs.join("; "))
	}
}

fn domain_matches(domain: Option<&str>, host: &str) -> bool {
	let Some(domain) = domain else {
		return true;
	};
	let domain = domain.trim_start_matches('.');
	host.eq_ignore_ascii_case(domain)
		|| host
			.to_ascii_lowercase()
			.ends_with(&format!(".{}", domain.to_ascii_lowercase()))
}

fn system_secs(time: SystemTime) -> Option<f64> {
	time.duration_since(UNIX_EPOCH).ok().map(|d| d.as_secs_f64())
}

fn unix_now() -> f64 {
	system_secs(SystemTime::now()).unwrap_or(0.0)
}

/// URL without its query string, for logs.
fn redacted(url: &Url) -> String {
	let mut url = url.clone();
	url.set_query(None);
	url.to_string()
}
