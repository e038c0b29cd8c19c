use std::fmt;

use crate::error::{HerdError, Result};

/// Target platform for a run. Mobile platforms drive an on-device
/// automation session; web platforms drive a browser.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Platform {
	Android,
	Chrome,
	Firefox,
}

impl Platform {
	pub const ALL: [Platform; 3] = [Platform::Android, Platform::Chrome, Platform::Firefox];

	/// Parses a platform tag. Unknown values are a configuration error,
	/// never a fallback.
	pub fn parse(raw: &str) -> Result<Platform> {
		match raw.trim().to_ascii_lowercase().as_str() {
			"android" => Ok(Platform::Android),
			"chrome" => Ok(Platform::Chrome),
			"firefox" => Ok(Platform::Firefox),
			other => {
				let valid = Self::ALL.map(|p| p.as_str()).join(", ");
				Err(HerdError::Config(format!("invalid platform: {other}. Must be one of: {valid}")))
			}
		}
	}

	pub fn as_str(self) -> &'static str {
		match self {
			Platform::Android => "android",
			Platform::Chrome => "chrome",
			Platform::Firefox => "firefox",
		}
	}

	pub fn is_mobile(self) -> bool {
		matches!(self, Platform::Android)
	}
}

impl fmt::Display for Platform {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}
