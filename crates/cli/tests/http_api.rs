//! The HTTP facade exercised in-process against a scripted browsing context.

use std::sync::Arc;

use arrivals::protocol::{Cookie, GuestRecord, TriggerMode};
use arrivals::{Credentials, Extractor, ExtractorError, ExtractorLauncher, RefreshConfig, RefreshCoordinator, SessionStore};
use arrivals_cli::server::{AppState, router};
use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::Value;
use tempfile::TempDir;
use tokio::sync::Notify;
use tower::ServiceExt;

#[derive(Clone, Default)]
struct Script {
	challenge: bool,
	hold_fetch: Option<Arc<Notify>>,
}

struct FakeLauncher {
	script: Script,
}

#[async_trait]
impl ExtractorLauncher for FakeLauncher {
	async fn launch(&self) -> Result<Box<dyn Extractor>, ExtractorError> {
		Ok(Box::new(FakeContext {
			script: self.script.clone(),
			authenticated: false,
		}))
	}
}

struct FakeContext {
	script: Script,
	authenticated: bool,
}

#[async_trait]
impl Extractor for FakeContext {
	async fn apply_cookies(&mut self, _cookies: &[Cookie]) -> Result<(), ExtractorError> {
		Ok(())
	}

	async fn open_login(&mut self) -> Result<(), ExtractorError> {
		Ok(())
	}

	async fn is_authenticated(&mut self) -> Result<bool, ExtractorError> {
		Ok(self.authenticated)
	}

	async fn submit_credentials(&mut self, _email: &str, _password: &str) -> Result<(), ExtractorError> {
		self.authenticated = !self.script.challenge;
		Ok(())
	}

	async fn challenge_detected(&mut self) -> Result<bool, ExtractorError> {
		Ok(self.script.challenge)
	}

	async fn submit_challenge_code(&mut self, code: &str) -> Result<(), ExtractorError> {
		self.authenticated = code == "123456";
		Ok(())
	}

	async fn export_cookies(&mut self) -> Result<Vec<Cookie>, ExtractorError> {
		Ok(vec![Cookie::new("sid", "token")])
	}

	async fn fetch_records(&mut self) -> Result<Vec<GuestRecord>, ExtractorError> {
		if let Some(gate) = &self.script.hold_fetch {
			gate.notified().await;
		}
		Ok(vec![
			GuestRecord {
				name: "Ada Lovelace".into(),
				room_type: "Suite".into(),
				persons: "2".into(),
				amount_due: "240,00 €".into(),
				dates: "12 mai - 14 mai".into(),
			},
			GuestRecord {
				name: "Charles Babbage".into(),
				room_type: String::new(),
				persons: "1".into(),
				amount_due: String::new(),
				dates: "12 mai - 13 mai".into(),
			},
		])
	}

	async fn close(&mut self) -> Result<(), ExtractorError> {
		Ok(())
	}
}

struct Harness {
	_temp: TempDir,
	coordinator: Arc<RefreshCoordinator>,
	app: Router,
}

fn harness(script: Script) -> Harness {
	let temp = TempDir::new().unwrap();
	let store = SessionStore::new(temp.path().join("session"));
	let credentials = Credentials::from_parts(Some("desk@example.com".into()), Some("secret".into()));
	let coordinator = Arc::new(RefreshCoordinator::new(
		RefreshConfig::default(),
		Arc::new(FakeLauncher { script }),
		store,
		credentials,
	));
	let app = router(AppState::new(Arc::clone(&coordinator)));
	Harness {
		_temp: temp,
		coordinator,
		app,
	}
}

async fn call(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
	let mut request = Request::builder().method(method).uri(uri);
	let body = match body {
		Some(json) => {
			request = request.header("content-type", "application/json");
			Body::from(json.to_string())
		}
		None => Body::empty(),
	};

	let response = app.clone().oneshot(request.body(body).unwrap()).await.unwrap();
	let status = response.status();
	let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
	let json = if bytes.is_empty() {
		Value::Null
	} else {
		serde_json::from_slice(&bytes).unwrap()
	};
	(status, json)
}

async fn until(mut condition: impl FnMut() -> bool) {
	while !condition() {
		tokio::task::yield_now().await;
	}
}

#[tokio::test]
async fn data_routes_are_unavailable_before_first_run() {
	let h = harness(Script::default());

	let (status, body) = call(&h.app, "GET", "/api/guests", None).await;
	assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
	assert_eq!(body["error"], "Data not available");
	assert!(body["lastError"].is_null());

	let (status, _) = call(&h.app, "GET", "/api/rooms", None).await;
	assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

	let (status, body) = call(&h.app, "GET", "/api/status", None).await;
	assert_eq!(status, StatusCode::OK);
	assert_eq!(body["cacheStatus"], "empty");
	assert_eq!(body["guestCount"], 0);
	assert_eq!(body["autoRefreshEnabled"], true);
}

#[tokio::test]
async fn successful_run_is_served() {
	let h = harness(Script::default());
	h.coordinator.trigger(TriggerMode::Forced).await.unwrap().unwrap();

	let (status, body) = call(&h.app, "GET", "/api/guests", None).await;
	assert_eq!(status, StatusCode::OK);
	assert_eq!(body["count"], 2);
	assert_eq!(body["guests"][0]["roomType"], "Suite");
	assert_eq!(body["nextRefreshIn"], 600);
	assert!(body["lastRefreshTime"].is_string());

	let (status, body) = call(&h.app, "GET", "/api/rooms", None).await;
	assert_eq!(status, StatusCode::OK);
	assert_eq!(body["rooms"]["Suite"][0]["name"], "Ada Lovelace");
	assert_eq!(body["rooms"][""][0]["name"], "Charles Babbage");

	let (_, body) = call(&h.app, "GET", "/api/status", None).await;
	assert_eq!(body["cacheStatus"], "ready");
	assert_eq!(body["guestCount"], 2);
	assert_eq!(body["autoRefreshStatus"], "enabled");
	assert_eq!(body["lastRun"]["outcome"], "success");
	assert_eq!(body["lastRun"]["trigger"], "forced");
}

#[tokio::test]
async fn two_factor_submission_requires_pending_challenge() {
	let h = harness(Script::default());

	let (status, body) = call(&h.app, "POST", "/api/2fa", Some(serde_json::json!({ "code": "123456" }))).await;
	assert_eq!(status, StatusCode::BAD_REQUEST);
	assert_eq!(body["code"], "BAD_REQUEST");

	let (status, _) = call(&h.app, "POST", "/api/2fa", Some(serde_json::json!({ "code": "   " }))).await;
	assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn refresh_is_accepted_then_busy() {
	let gate = Arc::new(Notify::new());
	let h = harness(Script {
		hold_fetch: Some(Arc::clone(&gate)),
		..Default::default()
	});

	let (status, body) = call(&h.app, "POST", "/api/refresh", None).await;
	assert_eq!(status, StatusCode::ACCEPTED);
	assert_eq!(body["message"], "Refresh started");

	let (status, body) = call(&h.app, "POST", "/api/refresh", None).await;
	assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
	assert_eq!(body["code"], "REFRESH_IN_PROGRESS");

	let (_, body) = call(&h.app, "GET", "/api/status", None).await;
	assert_eq!(body["isRefreshing"], true);

	gate.notify_one();
	until(|| !h.coordinator.is_running()).await;

	let (status, _) = call(&h.app, "GET", "/api/guests", None).await;
	assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn code_submitted_over_http_completes_login() {
	let h = harness(Script {
		challenge: true,
		..Default::default()
	});

	let (status, _) = call(&h.app, "POST", "/api/refresh", None).await;
	assert_eq!(status, StatusCode::ACCEPTED);
	until(|| h.coordinator.bridge().is_pending()).await;

	let (_, body) = call(&h.app, "GET", "/api/status", None).await;
	assert_eq!(body["twoFactorRequired"], true);

	let (status, body) = call(&h.app, "POST", "/api/2fa", Some(serde_json::json!({ "code": "123456" }))).await;
	assert_eq!(status, StatusCode::OK);
	assert_eq!(body["message"], "2FA code submitted");

	until(|| !h.coordinator.is_running()).await;
	let (_, body) = call(&h.app, "GET", "/api/status", None).await;
	assert_eq!(body["twoFactorRequired"], false);
	assert_eq!(body["cacheStatus"], "ready");
	assert!(body["lastError"].is_null());
}

#[tokio::test]
async fn health_reports_uptime() {
	let h = harness(Script::default());
	let (status, body) = call(&h.app, "GET", "/api/health", None).await;

	assert_eq!(status, StatusCode::OK);
	assert_eq!(body["status"], "healthy");
	assert!(body["uptimeSecs"].is_u64());
}
