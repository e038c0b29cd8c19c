//! Mobile prerequisite checks for collection entries.

use std::time::Duration;

use herd_runtime::{WireClient, recovery};
use tracing::debug;

use crate::config::Config;
use crate::context::{ContextValue, context, keys};
use crate::error::{HerdError, Result};
use crate::session::mobile::DEFAULT_APPIUM_URL;

const SERVER_READY_TIMEOUT: Duration = Duration::from_secs(15);

/// Verifies the tooling a mobile suite entry needs: `adb` on the PATH, a
/// reachable automation server, and a usable device id. A device
/// resolved from `adb devices` is stored into the thread context so
/// capability assembly picks it up.
pub fn verify_mobile_tooling(config: &Config) -> Result<()> {
	if !recovery::adb_available() {
		return Err(HerdError::Config("adb is not installed or not on PATH".into()));
	}

	let url = config.get_or("appium_url", DEFAULT_APPIUM_URL);
	let client = WireClient::connect(&url)?;
	client
		.wait_until_ready(SERVER_READY_TIMEOUT)
		.map_err(|err| HerdError::Config(format!("automation server is not reachable: {err}")))?;

	resolve_device(config)
}

fn resolve_device(config: &Config) -> Result<()> {
	let store = context();
	let configured = store
		.get_text(keys::DEVICE_ID)
		.or_else(|| config.get("deviceName"))
		.unwrap_or_default();
	if !is_placeholder(&configured) {
		return Ok(());
	}

	match recovery::connected_devices().into_iter().next() {
		Some(device) => {
			debug!(target: "herd.sched", %device, "resolved device from adb");
			store.set(keys::DEVICE_ID, ContextValue::Text(device));
			Ok(())
		}
		None => Err(HerdError::Config(
			"no device configured and none connected; set deviceName or connect a device".into(),
		)),
	}
}

/// Empty and `auto`/`detect` values mean "pick a device for me".
fn is_placeholder(device: &str) -> bool {
	matches!(device.trim().to_lowercase().as_str(), "" | "auto" | "detect")
}
