//! On-device recovery actions for the mobile automation helper.
//!
//! The helper service (the on-device agent that executes automation
//! commands) wedges in two known ways: its processes hang, or the
//! installed helper packages are stale relative to the server driving
//! them. Both recoveries shell out to `adb`.

use std::process::Command;
use std::time::Duration;

use tracing::{debug, warn};

/// Helper service processes force-stopped on a restart.
const HELPER_SERVICE_PACKAGES: [&str; 2] =
	["io.appium.uiautomator2.server", "io.appium.uiautomator2.server.test"];

/// Helper packages uninstalled on a stale-package cleanup.
const HELPER_APK_PACKAGES: [&str; 3] = [
	"io.appium.uiautomator2.server",
	"io.appium.uiautomator2.server.test",
	"io.appium.settings",
];

const ADB_TIMEOUT_PAUSE: Duration = Duration::from_secs(2);

/// Recovery actions run between session-creation attempts.
///
/// Scripted implementations stand in for a device in factory tests.
pub trait DeviceRecovery: Send + Sync {
	/// Force-stops the helper service processes and pauses until they
	/// are fully gone.
	fn restart_helper_service(&self);

	/// Uninstalls stale helper packages. Returns `true` when a cleanup
	/// actually ran, `false` when the preconditions (adb present, a
	/// device connected, helper packages installed) do not hold.
	fn cleanup_helper_packages(&self) -> bool;
}

/// `adb`-backed recovery against the first connected device.
#[derive(Clone, Copy, Debug, Default)]
pub struct AdbRecovery;

impl DeviceRecovery for AdbRecovery {
	fn restart_helper_service(&self) {
		for package in HELPER_SERVICE_PACKAGES {
			let outcome = Command::new("adb").args(["shell", "am", "force-stop", package]).output();
			if let Err(err) = outcome {
				warn!(target: "herd.wire", package, error = %err, "could not stop helper process");
			}
		}
		std::thread::sleep(ADB_TIMEOUT_PAUSE);
		debug!(target: "herd.wire", "helper service restarted");
	}

	fn cleanup_helper_packages(&self) -> bool {
		if !adb_available() || connected_devices().is_empty() {
			return false;
		}

		let installed = Command::new("adb")
			.args(["shell", "pm", "list", "packages"])
			.output()
			.map(|output| String::from_utf8_lossy(&output.stdout).contains(HELPER_SERVICE_PACKAGES[0]))
			.unwrap_or(false);
		if !installed {
			return false;
		}

		debug!(target: "herd.wire", "uninstalling stale helper packages");
		for package in HELPER_APK_PACKAGES {
			let _ = Command::new("adb").args(["uninstall", package]).output();
		}
		true
	}
}

/// Returns `true` when `adb` is on the PATH.
pub fn adb_available() -> bool {
	which::which("adb").is_ok()
}

/// Lists connected device ids via `adb devices`.
pub fn connected_devices() -> Vec<String> {
	let output = match Command::new("adb").arg("devices").output() {
		Ok(output) => output,
		Err(_) => return Vec::new(),
	};
	parse_device_list(&String::from_utf8_lossy(&output.stdout))
}

/// Parses `adb devices` output: one `<id>\tdevice` line per usable
/// device, after a header line.
fn parse_device_list(raw: &str) -> Vec<String> {
	raw.lines()
		.skip(1)
		.filter_map(|line| {
			let mut parts = line.split_whitespace();
			let id = parts.next()?;
			let state = parts.next()?;
			(state == "device").then(|| id.to_string())
		})
		.collect()
}
