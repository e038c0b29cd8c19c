//! Browser driver acquisition.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use herd_protocol::Capabilities;
use herd_runtime::{SessionBackend, SessionId, WireClient};
use serde_json::json;
use tracing::{debug, info};

use crate::config::Config;
use crate::context::{context, keys};
use crate::error::{HerdError, Result};

use super::{ensure_screenshot_ledger, record_capture, resolve_capture_path};

const DEFAULT_WEBDRIVER_URL: &str = "http://localhost:9515";
const DEFAULT_BROWSER: &str = "chrome";

/// Launch argument translated to a privacy preference for Firefox
/// instead of being passed through as a raw flag.
const INCOGNITO_ARG: &str = "--incognito";
const FIREFOX_PRIVATE_PREF: &str = "browser.privatebrowsing.autostart";

/// Creates browser driver sessions against the configured WebDriver
/// endpoint.
pub struct BrowserFactory {
	config: Arc<Config>,
}

impl BrowserFactory {
	pub fn new(config: Arc<Config>) -> Self {
		Self { config }
	}

	/// Creates a session for the browser named by the thread context's
	/// `platform` key, falling back to the configured default.
	/// An unsupported browser name fails immediately; there is no retry.
	pub fn create_session(&self) -> Result<BrowserSession> {
		let endpoint = self.config.get_or("webdriver_url", DEFAULT_WEBDRIVER_URL);
		let client = WireClient::direct(&endpoint).map_err(|err| HerdError::BrowserDriver(err.to_string()))?;
		self.create_with_backend(Arc::new(client))
	}

	pub fn create_with_backend(&self, backend: Arc<dyn SessionBackend>) -> Result<BrowserSession> {
		let store = context();
		let browser = store
			.get_text(keys::PLATFORM)
			.unwrap_or_else(|| self.config.get_or("browser", DEFAULT_BROWSER))
			.to_lowercase();
		let args = self.config.get_list("args");
		debug!(target: "herd.session", %browser, ?args, "creating browser driver");

		let capabilities = browser_capabilities(&browser, &args)?;
		let id = backend
			.create_session(&capabilities.into_request())
			.map_err(|err| HerdError::BrowserDriver(err.to_string()))?;

		ensure_screenshot_ledger(store);
		info!(target: "herd.session", %browser, session = %id, "browser session created");
		Ok(BrowserSession { backend, id })
	}
}

/// Builds browser-specific capabilities from the configured launch args.
fn browser_capabilities(browser: &str, args: &[String]) -> Result<Capabilities> {
	let mut caps = Capabilities::new();
	match browser {
		"chrome" => {
			caps.set("browserName", "chrome");
			caps.set("goog:chromeOptions", json!({ "args": args }));
		}
		"firefox" => {
			let mut launch_args = Vec::new();
			let mut private_browsing = false;
			for arg in args {
				if arg == INCOGNITO_ARG {
					private_browsing = true;
				} else {
					launch_args.push(arg.clone());
				}
			}
			let mut options = json!({ "args": launch_args });
			if private_browsing {
				options["prefs"] = json!({ FIREFOX_PRIVATE_PREF: true });
			}
			caps.set("browserName", "firefox");
			caps.set("moz:firefoxOptions", options);
		}
		other => return Err(HerdError::UnsupportedBrowser(other.to_string())),
	}
	Ok(caps)
}

/// A live browser driver session.
///
/// The capture operation is composed as resolve → record → delegate; the
/// resolved absolute path is appended to the thread's screenshot ledger
/// before the underlying capture call runs.
pub struct BrowserSession {
	backend: Arc<dyn SessionBackend>,
	id: SessionId,
}

impl BrowserSession {
	pub fn session_id(&self) -> &SessionId {
		&self.id
	}

	pub fn save_screenshot(&self, requested: impl AsRef<Path>) -> Result<PathBuf> {
		let store = context();
		ensure_screenshot_ledger(store);
		let target = resolve_capture_path(store, requested.as_ref())?;
		record_capture(store, &target);

		let bytes = self
			.backend
			.screenshot(&self.id)
			.map_err(|source| HerdError::Screenshot { path: target.clone(), source: source.into() })?;
		std::fs::write(&target, bytes)
			.map_err(|source| HerdError::Screenshot { path: target.clone(), source: source.into() })?;
		Ok(target)
	}

	/// Ends the session. The handle is consumed; a new session must be
	/// created after a quit.
	pub fn quit(self) -> Result<()> {
		self.backend.delete_session(&self.id)?;
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use herd_protocol::NewSessionRequest;
	use herd_protocol::wire::{StatusPayload, WindowRect};
	use herd_runtime::WireError;
	use parking_lot::Mutex;
	use tempfile::TempDir;

	use crate::context::ContextValue;
	use crate::report::ReportHandle;

	use super::*;

	#[derive(Default, Debug)]
	struct ScriptedBackend {
		requests: Mutex<Vec<serde_json::Value>>,
		fail_screenshot: bool,
	}

	impl SessionBackend for ScriptedBackend {
		fn status(&self) -> herd_runtime::Result<StatusPayload> {
			Ok(StatusPayload { ready: true, message: String::new() })
		}

		fn create_session(&self, request: &NewSessionRequest) -> herd_runtime::Result<SessionId> {
			self.requests.lock().push(serde_json::to_value(request).unwrap());
			Ok(SessionId::new("browser-1"))
		}

		fn delete_session(&self, _session: &SessionId) -> herd_runtime::Result<()> {
			Ok(())
		}

		fn current_activity(&self, _session: &SessionId) -> herd_runtime::Result<String> {
			Ok(String::new())
		}

		fn screenshot(&self, _session: &SessionId) -> herd_runtime::Result<Vec<u8>> {
			if self.fail_screenshot {
				return Err(WireError::WebDriver {
					status: 500,
					error: "unknown error".into(),
					message: "capture failed".into(),
				});
			}
			Ok(vec![0x89, b'P', b'N', b'G'])
		}

		fn orientation(&self, _session: &SessionId) -> herd_runtime::Result<String> {
			Ok("PORTRAIT".into())
		}

		fn set_orientation(&self, _session: &SessionId, _orientation: &str) -> herd_runtime::Result<()> {
			Ok(())
		}

		fn back(&self, _session: &SessionId) -> herd_runtime::Result<()> {
			Ok(())
		}

		fn window_rect(&self, _session: &SessionId) -> herd_runtime::Result<WindowRect> {
			Ok(WindowRect { x: 0, y: 0, width: 1080, height: 1920 })
		}
	}

	#[test]
	fn chrome_arguments_pass_through() {
		let caps = browser_capabilities("chrome", &["--headless".into(), "--incognito".into()]).unwrap();
		assert_eq!(
			caps.get("goog:chromeOptions").unwrap()["args"],
			json!(["--headless", "--incognito"])
		);
	}

	#[test]
	fn firefox_translates_incognito_to_a_preference() {
		let caps = browser_capabilities("firefox", &["--headless".into(), "--incognito".into()]).unwrap();
		let options = caps.get("moz:firefoxOptions").unwrap();
		assert_eq!(options["args"], json!(["--headless"]));
		assert_eq!(options["prefs"][FIREFOX_PRIVATE_PREF], json!(true));
	}

	#[test]
	fn unsupported_browser_fails_without_retry() {
		let err = browser_capabilities("opera", &[]).unwrap_err();
		assert!(matches!(err, HerdError::UnsupportedBrowser(_)));
	}

	#[test]
	fn capture_records_into_ledger_before_delegating() {
		let tmp = TempDir::new().unwrap();
		let store = context();
		store.clear_current_thread();
		store.set(keys::REPORT, ContextValue::Report(ReportHandle::new(tmp.path().join("shots"))));

		let factory = BrowserFactory::new(Arc::new(Config::default()));
		let session = factory
			.create_with_backend(Arc::new(ScriptedBackend { fail_screenshot: true, ..Default::default() }))
			.unwrap();

		let err = session.save_screenshot("login.png").unwrap_err();
		assert!(matches!(err, HerdError::Screenshot { .. }));

		// The resolved path was recorded even though the capture failed.
		let ledger = store.get(keys::SCREENSHOTS).unwrap();
		let paths = ledger.as_paths().unwrap();
		assert_eq!(paths.len(), 1);
		assert!(paths[0].ends_with("shots/login.png"));
		store.clear_current_thread();
	}

	#[test]
	fn successful_capture_writes_the_file() {
		let tmp = TempDir::new().unwrap();
		let store = context();
		store.clear_current_thread();
		store.set(keys::REPORT, ContextValue::Report(ReportHandle::new(tmp.path().join("shots"))));

		let factory = BrowserFactory::new(Arc::new(Config::default()));
		let session = factory.create_with_backend(Arc::new(ScriptedBackend::default())).unwrap();

		let written = session.save_screenshot("home.png").unwrap();
		assert_eq!(std::fs::read(&written).unwrap(), vec![0x89, b'P', b'N', b'G']);
		store.clear_current_thread();
	}
}
