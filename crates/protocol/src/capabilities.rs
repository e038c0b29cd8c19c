//! W3C capability assembly for new-session requests.

use serde::Serialize;
use serde_json::{Map, Value};

/// Ordered capability map sent as the `alwaysMatch` member of a
/// new-session request.
///
/// Later writes win: callers layer fixed stability capabilities first and
/// user-supplied overrides last, so an override of the same key replaces
/// the earlier value.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Capabilities {
	entries: Map<String, Value>,
}

impl Capabilities {
	pub fn new() -> Self {
		Self::default()
	}

	/// Sets a single capability, replacing any existing value for the key.
	pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
		self.entries.insert(key.into(), value.into());
	}

	pub fn get(&self, key: &str) -> Option<&Value> {
		self.entries.get(key)
	}

	/// Layers `overrides` on top of the current set. Override wins.
	pub fn merge(&mut self, overrides: &Map<String, Value>) {
		for (key, value) in overrides {
			self.entries.insert(key.clone(), value.clone());
		}
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	/// Wraps the map into the body of `POST /session`.
	pub fn into_request(self) -> NewSessionRequest {
		NewSessionRequest {
			capabilities: RequestedCapabilities { always_match: self.entries },
		}
	}
}

/// Body of `POST /session`.
#[derive(Clone, Debug, Serialize)]
pub struct NewSessionRequest {
	pub capabilities: RequestedCapabilities,
}

#[derive(Clone, Debug, Serialize)]
pub struct RequestedCapabilities {
	#[serde(rename = "alwaysMatch")]
	pub always_match: Map<String, Value>,
}

#[cfg(test)]
mod tests {
	use serde_json::json;

	use super::*;

	#[test]
	fn set_replaces_existing_value() {
		let mut caps = Capabilities::new();
		caps.set("noReset", true);
		caps.set("noReset", false);
		assert_eq!(caps.get("noReset"), Some(&json!(false)));
	}

	#[test]
	fn merge_layers_overrides_last() {
		let mut caps = Capabilities::new();
		caps.set("platformName", "Android");
		caps.set("newCommandTimeout", 300);

		let mut overrides = Map::new();
		overrides.insert("newCommandTimeout".into(), json!(60));
		overrides.insert("fullReset".into(), json!(true));
		caps.merge(&overrides);

		assert_eq!(caps.get("platformName"), Some(&json!("Android")));
		assert_eq!(caps.get("newCommandTimeout"), Some(&json!(60)));
		assert_eq!(caps.get("fullReset"), Some(&json!(true)));
	}

	#[test]
	fn request_serializes_as_always_match() {
		let mut caps = Capabilities::new();
		caps.set("browserName", "chrome");
		let body = serde_json::to_value(caps.into_request()).unwrap();
		assert_eq!(body, json!({ "capabilities": { "alwaysMatch": { "browserName": "chrome" } } }));
	}
}
