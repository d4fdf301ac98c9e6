//! The portal extractor against a local back-office double served over real HTTP.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use arrivals::{Extractor, ExtractorError, ExtractorLauncher};
use arrivals_cli::portal::{PortalLauncher, PortalSettings};
use axum::Router;
use axum::extract::State;
use axum::http::{HeaderMap, Method, StatusCode, Uri, header};
use axum::response::{Html, IntoResponse, Response};
use url::Url;

#[derive(Debug, Clone)]
struct Hit {
	method: Method,
	path: String,
	cookie: Option<String>,
	body: String,
}

type Log = Arc<Mutex<Vec<Hit>>>;

const SEE_OTHER_LOGIN: &str = r#"<html><body>
<form action="/a/session" method="post">
  <input type="hidden" name="_csrf" value="tok">
  <input type="email" name="email">
  <input type="password" name="password">
  <button type="submit">Connexion</button>
</form></body></html>"#;

const TEMPORARY_LOGIN: &str = r#"<html><body>
<form action="/b/session" method="post">
  <input type="email" name="email">
  <input type="password" name="password">
</form></body></html>"#;

async fn site(State(log): State<Log>, method: Method, uri: Uri, headers: HeaderMap, body: String) -> Response {
	let path = uri.path().to_string();
	log.lock().unwrap().push(Hit {
		method: method.clone(),
		path: path.clone(),
		cookie: headers
			.get(header::COOKIE)
			.and_then(|v| v.to_str().ok())
			.map(str::to_string),
		body,
	});

	let get = method == Method::GET;
	match path.as_str() {
		"/a/login" if get => Html(SEE_OTHER_LOGIN).into_response(),
		"/a/session" if !get => (
			StatusCode::SEE_OTHER,
			[
				(header::LOCATION, "/a/admin/dashboard"),
				(header::SET_COOKIE, "sid=abc123; Path=/; HttpOnly"),
			],
		)
			.into_response(),
		"/a/admin/dashboard" if get => Html(r#"<nav class="sidebar">Menu</nav>"#).into_response(),
		"/b/login" if get => Html(TEMPORARY_LOGIN).into_response(),
		"/b/session" if !get => (StatusCode::TEMPORARY_REDIRECT, [(header::LOCATION, "/b/landing")]).into_response(),
		"/b/landing" if !get => Html("<nav>ok</nav>").into_response(),
		"/loop" => (StatusCode::FOUND, [(header::LOCATION, "/loop")]).into_response(),
		_ => StatusCode::NOT_FOUND.into_response(),
	}
}

async fn spawn_site() -> (SocketAddr, Log) {
	let log = Log::default();
	let app = Router::new().fallback(site).with_state(Arc::clone(&log));
	let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
	let addr = listener.local_addr().unwrap();
	tokio::spawn(async move {
		axum::serve(listener, app).await.unwrap();
	});
	(addr, log)
}

fn launcher(addr: SocketAddr, login_path: &str) -> PortalLauncher {
	let base = Url::parse(&format!("http://{addr}")).unwrap();
	PortalLauncher::new(PortalSettings {
		login_url: base.join(login_path).unwrap(),
		arrivals_url: base.join("/arrivals").unwrap(),
		capture_dir: None,
		request_timeout: Duration::from_secs(5),
	})
}

fn hits(log: &Log) -> Vec<Hit> {
	log.lock().unwrap().clone()
}

#[tokio::test]
async fn see_other_after_login_switches_to_get_and_keeps_redirect_cookie() {
	let (addr, log) = spawn_site().await;
	let mut context = launcher(addr, "/a/login").launch().await.unwrap();

	context.open_login().await.unwrap();
	assert!(!context.is_authenticated().await.unwrap());
	context.submit_credentials("desk@example.com", "secret").await.unwrap();
	assert!(context.is_authenticated().await.unwrap());

	let cookies = context.export_cookies().await.unwrap();
	assert_eq!(cookies.len(), 1);
	assert_eq!(cookies[0].name, "sid");
	assert_eq!(cookies[0].value, "abc123");
	assert_eq!(cookies[0].domain.as_deref(), Some("127.0.0.1"));
	assert!(cookies[0].http_only);

	let hits = hits(&log);
	let route: Vec<(Method, &str)> = hits.iter().map(|h| (h.method.clone(), h.path.as_str())).collect();
	assert_eq!(
		route,
		vec![
			(Method::GET, "/a/login"),
			(Method::POST, "/a/session"),
			(Method::GET, "/a/admin/dashboard"),
		]
	);

	let login = &hits[1];
	assert!(login.body.contains("email=desk%40example.com"));
	assert!(login.body.contains("password=secret"));
	assert!(login.body.contains("_csrf=tok"));

	let dashboard = &hits[2];
	assert!(dashboard.body.is_empty());
	assert_eq!(dashboard.cookie.as_deref(), Some("sid=abc123"));
}

#[tokio::test]
async fn temporary_redirect_replays_method_and_body() {
	let (addr, log) = spawn_site().await;
	let mut context = launcher(addr, "/b/login").launch().await.unwrap();

	context.open_login().await.unwrap();
	context.submit_credentials("desk@example.com", "secret").await.unwrap();
	assert!(context.is_authenticated().await.unwrap());

	let hits = hits(&log);
	let landing = hits.last().unwrap();
	assert_eq!(landing.method, Method::POST);
	assert_eq!(landing.path, "/b/landing");
	assert_eq!(landing.body, hits[1].body);
	assert!(landing.body.contains("password=secret"));
}

#[tokio::test]
async fn redirect_loop_is_cut_off() {
	let (addr, log) = spawn_site().await;
	let mut context = launcher(addr, "/loop").launch().await.unwrap();

	let err = context.open_login().await.unwrap_err();
	assert!(matches!(err, ExtractorError::Navigation(ref msg) if msg.contains("redirects")));
	assert_eq!(hits(&log).len(), 11);
}
