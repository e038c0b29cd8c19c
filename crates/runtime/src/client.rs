//! Blocking wire client for the WebDriver/Appium HTTP protocol.

use std::fmt;
use std::time::Duration;

use herd_protocol::wire::{
	ErrorPayload, NewSessionPayload, StatusPayload, ValueEnvelope, WindowRect, decode_screenshot,
};
use herd_protocol::NewSessionRequest;
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::debug;
use url::Url;

use crate::endpoint;
use crate::error::{Result, WireError};

/// Ceiling for individual wire calls. Session creation can legitimately
/// take close to the helper-install timeout it requests.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Identifier of a live driver session on the remote server.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionId(String);

impl SessionId {
	pub fn new(raw: impl Into<String>) -> Self {
		Self(raw.into())
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl fmt::Display for SessionId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

/// Raw session operations the factories and session handles are built on.
///
/// `WireClient` is the production implementation; tests script their own.
pub trait SessionBackend: Send + Sync + fmt::Debug {
	fn status(&self) -> Result<StatusPayload>;
	fn create_session(&self, request: &NewSessionRequest) -> Result<SessionId>;
	fn delete_session(&self, session: &SessionId) -> Result<()>;
	/// Trivial state query used as a session liveness probe.
	fn current_activity(&self, session: &SessionId) -> Result<String>;
	/// Captures a screenshot, returning decoded PNG bytes.
	fn screenshot(&self, session: &SessionId) -> Result<Vec<u8>>;
	fn orientation(&self, session: &SessionId) -> Result<String>;
	fn set_orientation(&self, session: &SessionId, orientation: &str) -> Result<()>;
	fn back(&self, session: &SessionId) -> Result<()>;
	fn window_rect(&self, session: &SessionId) -> Result<WindowRect>;
}

/// HTTP client bound to one automation server endpoint.
#[derive(Debug)]
pub struct WireClient {
	http: reqwest::blocking::Client,
	base: Url,
}

impl WireClient {
	/// Connects to `base`, probing for the legacy `/wd/hub` path shape.
	pub fn connect(base: &str) -> Result<Self> {
		let http = build_http()?;
		let base = endpoint::resolve_endpoint(&http, base)?;
		debug!(target: "herd.wire", url = %base, "automation server endpoint resolved");
		Ok(Self { http, base })
	}

	/// Binds to `base` exactly as configured, without path probing.
	pub fn direct(base: &str) -> Result<Self> {
		let http = build_http()?;
		let trimmed = base.trim_end_matches('/');
		let base = Url::parse(trimmed).map_err(|err| WireError::InvalidUrl(format!("{trimmed}: {err}")))?;
		Ok(Self { http, base })
	}

	pub fn base(&self) -> &Url {
		&self.base
	}

	/// Polls the status endpoint until the server is ready.
	pub fn wait_until_ready(&self, timeout: Duration) -> Result<()> {
		endpoint::wait_until_ready(&self.http, &self.base, timeout)
	}

	fn url(&self, path: &str) -> String {
		format!("{}/{}", self.base.as_str().trim_end_matches('/'), path)
	}

	fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
		let response = self.http.get(self.url(path)).send()?;
		read_value(response)
	}

	fn post<T: DeserializeOwned>(&self, path: &str, body: &serde_json::Value) -> Result<T> {
		let response = self.http.post(self.url(path)).json(body).send()?;
		read_value(response)
	}
}

impl SessionBackend for WireClient {
	fn status(&self) -> Result<StatusPayload> {
		self.get("status")
	}

	fn create_session(&self, request: &NewSessionRequest) -> Result<SessionId> {
		let response = self.http.post(self.url("session")).json(request).send()?;
		let payload: NewSessionPayload = read_value(response)?;
		Ok(SessionId::new(payload.session_id))
	}

	fn delete_session(&self, session: &SessionId) -> Result<()> {
		let response = self.http.delete(self.url(&format!("session/{session}"))).send()?;
		let _: serde_json::Value = read_value(response)?;
		Ok(())
	}

	fn current_activity(&self, session: &SessionId) -> Result<String> {
		self.get(&format!("session/{session}/appium/device/current_activity"))
	}

	fn screenshot(&self, session: &SessionId) -> Result<Vec<u8>> {
		let payload: String = self.get(&format!("session/{session}/screenshot"))?;
		Ok(decode_screenshot(&payload)?)
	}

	fn orientation(&self, session: &SessionId) -> Result<String> {
		self.get(&format!("session/{session}/orientation"))
	}

	fn set_orientation(&self, session: &SessionId, orientation: &str) -> Result<()> {
		let body = json!({ "orientation": orientation.to_ascii_uppercase() });
		let _: serde_json::Value = self.post(&format!("session/{session}/orientation"), &body)?;
		Ok(())
	}

	fn back(&self, session: &SessionId) -> Result<()> {
		let _: serde_json::Value = self.post(&format!("session/{session}/back"), &json!({}))?;
		Ok(())
	}

	fn window_rect(&self, session: &SessionId) -> Result<WindowRect> {
		self.get(&format!("session/{session}/window/rect"))
	}
}

fn build_http() -> Result<reqwest::blocking::Client> {
	Ok(reqwest::blocking::Client::builder().timeout(REQUEST_TIMEOUT).build()?)
}

/// Unwraps the `{"value": ...}` envelope, turning non-2xx responses into
/// [`WireError::WebDriver`] with whatever error payload the server sent.
fn read_value<T: DeserializeOwned>(response: reqwest::blocking::Response) -> Result<T> {
	let status = response.status();
	if status.is_success() {
		let envelope: ValueEnvelope<T> = response.json()?;
		return Ok(envelope.value);
	}

	let body = response.text().unwrap_or_default();
	let payload = serde_json::from_str::<ValueEnvelope<ErrorPayload>>(&body)
		.map(|envelope| envelope.value)
		.unwrap_or_else(|_| ErrorPayload {
			error: "unknown error".into(),
			message: truncated(&body),
			stacktrace: String::new(),
		});
	Err(WireError::WebDriver {
		status: status.as_u16(),
		error: payload.error,
		message: payload.message,
	})
}

fn truncated(body: &str) -> String {
	const LIMIT: usize = 200;
	let trimmed = body.trim();
	if trimmed.len() <= LIMIT {
		return trimmed.to_string();
	}
	let mut end = LIMIT;
	while !trimmed.is_char_boundary(end) {
		end -= 1;
	}
	format!("{}…", &trimmed[..end])
}
