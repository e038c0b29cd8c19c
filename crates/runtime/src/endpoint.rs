//! Endpoint resolution and readiness polling for the automation server.
//!
//! Legacy servers mount the WebDriver API under `/wd/hub`; modern ones
//! serve it at the root. Rather than shelling out to ask the server
//! binary for its version, we probe the status endpoint of both path
//! shapes and keep whichever answers.

use std::time::{Duration, Instant};

use tracing::debug;
use url::Url;

use crate::error::{Result, WireError};

const LEGACY_PATH_SUFFIX: &str = "/wd/hub";
const READY_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Builds the status URL for a base endpoint.
pub fn status_url(base: &Url) -> String {
	format!("{}/status", base.as_str().trim_end_matches('/'))
}

/// Resolves the effective base URL for `base`, probing for the legacy
/// `/wd/hub` path shape.
///
/// The URL is kept as configured when its own status endpoint answers,
/// or when neither shape answers (later calls then surface the real
/// connection error). Only a successful probe of the alternate shape
/// switches the path.
pub fn resolve_endpoint(client: &reqwest::blocking::Client, base: &str) -> Result<Url> {
	let base = parse_base(base)?;
	Ok(resolve_with(&base, |candidate| {
		client
			.get(status_url(candidate))
			.timeout(Duration::from_secs(2))
			.send()
			.map(|response| response.status().is_success())
			.unwrap_or(false)
	}))
}

/// Pure resolution over a probe callback; see [`resolve_endpoint`].
pub fn resolve_with(base: &Url, probe: impl Fn(&Url) -> bool) -> Url {
	if probe(base) {
		return base.clone();
	}
	if let Some(alternate) = toggled_path(base) {
		if probe(&alternate) {
			debug!(target: "herd.wire", url = %alternate, "switched to alternate server path");
			return alternate;
		}
	}
	base.clone()
}

/// Polls the status endpoint until the server answers with a 200, or
/// the timeout elapses.
pub fn wait_until_ready(client: &reqwest::blocking::Client, base: &Url, timeout: Duration) -> Result<()> {
	let status = status_url(base);
	let deadline = Instant::now() + timeout;
	let mut last_reason = String::from("no response");

	loop {
		match client.get(&status).timeout(Duration::from_secs(3)).send() {
			Ok(response) if response.status().is_success() => return Ok(()),
			Ok(response) => last_reason = format!("http {}", response.status().as_u16()),
			Err(err) => last_reason = err.to_string(),
		}
		if Instant::now() >= deadline {
			return Err(WireError::NotReady { url: status, reason: last_reason });
		}
		std::thread::sleep(READY_POLL_INTERVAL);
	}
}

fn parse_base(base: &str) -> Result<Url> {
	let trimmed = base.trim_end_matches('/');
	Url::parse(trimmed).map_err(|err| WireError::InvalidUrl(format!("{trimmed}: {err}")))
}

/// Returns the same URL with the legacy suffix appended or stripped.
fn toggled_path(base: &Url) -> Option<Url> {
	let raw = base.as_str().trim_end_matches('/');
	let toggled = match raw.strip_suffix(LEGACY_PATH_SUFFIX) {
		Some(stripped) => stripped.to_string(),
		None => format!("{raw}{LEGACY_PATH_SUFFIX}"),
	};
	Url::parse(&toggled).ok()
}
