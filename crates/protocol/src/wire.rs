//! Response envelopes for the WebDriver wire protocol.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::Deserialize;

/// Generic `{"value": ...}` envelope wrapping every WebDriver response.
#[derive(Clone, Debug, Deserialize)]
pub struct ValueEnvelope<T> {
	pub value: T,
}

/// Payload of `GET /status`.
#[derive(Clone, Debug, Deserialize)]
pub struct StatusPayload {
	#[serde(default)]
	pub ready: bool,
	#[serde(default)]
	pub message: String,
}

/// Payload of a successful `POST /session`.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSessionPayload {
	pub session_id: String,
	#[serde(default)]
	pub capabilities: serde_json::Value,
}

/// Payload of a WebDriver error response.
#[derive(Clone, Debug, Deserialize)]
pub struct ErrorPayload {
	#[serde(default)]
	pub error: String,
	#[serde(default)]
	pub message: String,
	#[serde(default)]
	pub stacktrace: String,
}

/// Window geometry from `GET /session/{id}/window/rect`.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq)]
pub struct WindowRect {
	#[serde(default)]
	pub x: i64,
	#[serde(default)]
	pub y: i64,
	pub width: u64,
	pub height: u64,
}

/// Decodes the base64 PNG payload of `GET /session/{id}/screenshot`.
pub fn decode_screenshot(payload: &str) -> Result<Vec<u8>, base64::DecodeError> {
	STANDARD.decode(payload.trim())
}
