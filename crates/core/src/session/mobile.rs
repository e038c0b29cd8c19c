//! Mobile driver acquisition with retry-and-recovery.
//!
//! Session creation against an on-device automation helper fails in
//! recoverable ways: the helper service hangs, or its installed packages
//! are stale. The factory classifies each failure through
//! [`SessionErrorKind`] and picks the matching recovery action between
//! attempts.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use herd_protocol::{Capabilities, SessionErrorKind};
use herd_runtime::{AdbRecovery, DeviceRecovery, SessionBackend, SessionId, WireClient, WireError};
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::context::{context, keys};
use crate::error::{HerdError, Result};

use super::{ensure_screenshot_ledger, record_capture, resolve_capture_path};

pub(crate) const DEFAULT_APPIUM_URL: &str = "http://localhost:4723";
const DEFAULT_RETRY_COUNT: u32 = 2;

/// Stability capabilities applied to every mobile session.
const COMMAND_TIMEOUT_SECS: u64 = 300;
const HELPER_LAUNCH_TIMEOUT_MS: u64 = 60_000;
const HELPER_INSTALL_TIMEOUT_MS: u64 = 60_000;
const AUTOMATION_ENGINE: &str = "UiAutomator2";

/// Pause after a stale-package cleanup, letting the device settle.
const CLEANUP_SETTLE_PAUSE: Duration = Duration::from_secs(2);
/// Pause after a helper-service restart before the next attempt.
const RESTART_PAUSE: Duration = Duration::from_secs(3);
/// Pause between the two pre-capture liveness checks.
const LIVENESS_RETRY_PAUSE: Duration = Duration::from_secs(2);

/// Caller inputs for one mobile session.
#[derive(Clone, Debug)]
pub struct MobileSessionOptions {
	pub app_package: Option<String>,
	pub app_activity: Option<String>,
	/// Capability overrides layered last; override wins.
	pub capabilities: Option<Map<String, Value>>,
	/// Extra attempts after the first. Total attempts = `retry_count + 1`.
	pub retry_count: u32,
}

impl Default for MobileSessionOptions {
	fn default() -> Self {
		Self { app_package: None, app_activity: None, capabilities: None, retry_count: DEFAULT_RETRY_COUNT }
	}
}

/// Creates mobile driver sessions against the configured automation
/// server, recovering from known helper failures between attempts.
pub struct MobileFactory {
	config: Arc<Config>,
	backend: Arc<dyn SessionBackend>,
	recovery: Arc<dyn DeviceRecovery>,
	settle_pause: Duration,
	restart_pause: Duration,
}

impl MobileFactory {
	/// Connects to the configured `appium_url`, probing for the legacy
	/// `/wd/hub` path shape, with `adb`-backed recovery.
	pub fn connect(config: Arc<Config>) -> Result<Self> {
		let url = config.get_or("appium_url", DEFAULT_APPIUM_URL);
		let client = WireClient::connect(&url)?;
		Ok(Self::with_parts(config, Arc::new(client), Arc::new(AdbRecovery)))
	}

	pub fn with_parts(
		config: Arc<Config>,
		backend: Arc<dyn SessionBackend>,
		recovery: Arc<dyn DeviceRecovery>,
	) -> Self {
		Self {
			config,
			backend,
			recovery,
			settle_pause: CLEANUP_SETTLE_PAUSE,
			restart_pause: RESTART_PAUSE,
		}
	}

	/// Overrides the inter-attempt pauses.
	pub fn with_pauses(mut self, settle: Duration, restart: Duration) -> Self {
		self.settle_pause = settle;
		self.restart_pause = restart;
		self
	}

	/// Creates a session, retrying with recovery on failure.
	///
	/// Every freshly created session is liveness-probed; a session that
	/// fails the probe is discarded and counts as a creation failure.
	/// Exhausted retries escalate with the last underlying error.
	pub fn create_session(&self, options: &MobileSessionOptions) -> Result<MobileSession> {
		let capabilities = self.assemble_capabilities(options);
		let attempts = options.retry_count + 1;
		let mut last_error: Option<WireError> = None;

		for attempt in 1..=attempts {
			let outcome = self.backend.create_session(&capabilities.clone().into_request()).and_then(|id| {
				match self.backend.current_activity(&id) {
					Ok(_) => Ok(id),
					Err(probe) => {
						let _ = self.backend.delete_session(&id);
						Err(probe)
					}
				}
			});

			let err = match outcome {
				Ok(id) => {
					let store = context();
					ensure_screenshot_ledger(store);
					info!(target: "herd.session", attempt, session = %id, "mobile session created");
					return Ok(MobileSession { backend: Arc::clone(&self.backend), id });
				}
				Err(err) => err,
			};

			warn!(target: "herd.session", attempt, error = %err, "mobile session attempt failed");
			if SessionErrorKind::classify(&err.to_string()) == SessionErrorKind::StaleHelperPackage
				&& self.recovery.cleanup_helper_packages()
			{
				debug!(target: "herd.session", "stale helper packages cleaned up; retrying without service restart");
				std::thread::sleep(self.settle_pause);
				last_error = Some(err);
				continue;
			}

			if attempt < attempts {
				self.recovery.restart_helper_service();
				std::thread::sleep(self.restart_pause);
			}
			last_error = Some(err);
		}

		let source = last_error.unwrap_or_else(|| WireError::NotReady {
			url: String::new(),
			reason: "no session attempt was made".into(),
		});
		Err(HerdError::DriverCreate { attempts, source })
	}

	/// Assembles the capability map: context-or-config platform and
	/// device, fixed stability capabilities, optional app target, and
	/// caller overrides layered last.
	fn assemble_capabilities(&self, options: &MobileSessionOptions) -> Capabilities {
		let store = context();
		let platform_name = store
			.get_text(keys::PLATFORM)
			.unwrap_or_else(|| self.config.get_or("platformName", "Android"));
		let device_name = store
			.get_text(keys::DEVICE_ID)
			.unwrap_or_else(|| self.config.get_or("deviceName", ""));

		let mut caps = Capabilities::new();
		caps.set("platformName", platform_name);
		caps.set("deviceName", device_name);
		caps.set("newCommandTimeout", COMMAND_TIMEOUT_SECS);
		caps.set("noReset", true);
		caps.set("autoLaunch", true);
		caps.set("automationName", AUTOMATION_ENGINE);
		caps.set("uiautomator2ServerLaunchTimeout", HELPER_LAUNCH_TIMEOUT_MS);
		caps.set("uiautomator2ServerInstallTimeout", HELPER_INSTALL_TIMEOUT_MS);

		let app_package = options.app_package.clone().or_else(|| self.config.get("appPackage"));
		let app_activity = options.app_activity.clone().or_else(|| self.config.get("appActivity"));
		if let (Some(package), Some(activity)) = (app_package, app_activity) {
			caps.set("appPackage", package);
			caps.set("appActivity", activity);
		}

		let extras = options.capabilities.clone().unwrap_or_else(|| self.config.get_dict("capabilities"));
		caps.merge(&extras);
		caps
	}
}

/// A live mobile driver session.
#[derive(Debug)]
pub struct MobileSession {
	backend: Arc<dyn SessionBackend>,
	id: SessionId,
}

impl MobileSession {
	pub fn session_id(&self) -> &SessionId {
		&self.id
	}

	/// Captures a screenshot with a pre-capture liveness re-check (one
	/// internal retry). The resolved path joins the thread's ledger when
	/// the capture succeeds; a failed capture leaves an `.error` sidecar
	/// next to the target and re-raises.
	pub fn save_screenshot(&self, requested: impl AsRef<Path>) -> Result<PathBuf> {
		let store = context();
		ensure_screenshot_ledger(store);
		let target = resolve_capture_path(store, requested.as_ref())?;

		match self.capture_to(&target) {
			Ok(()) => {
				record_capture(store, &target);
				Ok(target)
			}
			Err(source) => {
				warn!(target: "herd.session", path = %target.display(), error = format_args!("{source:#}"), "screenshot capture failed");
				let sidecar = PathBuf::from(format!("{}.error", target.display()));
				if let Some(parent) = sidecar.parent() {
					let _ = std::fs::create_dir_all(parent);
				}
				let _ = std::fs::write(&sidecar, format!("Screenshot failed: {source:#}"));
				Err(HerdError::Screenshot { path: target, source })
			}
		}
	}

	fn capture_to(&self, target: &Path) -> anyhow::Result<()> {
		for check in 0..2 {
			match self.backend.current_activity(&self.id) {
				Ok(_) => break,
				Err(err) if check == 0 => {
					warn!(target: "herd.session", error = %err, "session liveness check failed, retrying");
					std::thread::sleep(LIVENESS_RETRY_PAUSE);
				}
				Err(err) => return Err(err.into()),
			}
		}
		let bytes = self.backend.screenshot(&self.id)?;
		std::fs::write(target, bytes)?;
		Ok(())
	}

	pub fn is_alive(&self) -> bool {
		self.backend.window_rect(&self.id).is_ok()
	}

	pub fn orientation(&self) -> Result<String> {
		Ok(self.backend.orientation(&self.id)?)
	}

	pub fn set_orientation(&self, orientation: &str) -> Result<()> {
		Ok(self.backend.set_orientation(&self.id, orientation)?)
	}

	pub fn press_back(&self) -> Result<()> {
		Ok(self.backend.back(&self.id)?)
	}

	pub fn window_size(&self) -> Result<(u64, u64)> {
		let rect = self.backend.window_rect(&self.id)?;
		Ok((rect.width, rect.height))
	}

	/// Ends the session. The handle is consumed; it must not be reused
	/// after a quit.
	pub fn quit(self) -> Result<()> {
		self.backend.delete_session(&self.id)?;
		Ok(())
	}
}
