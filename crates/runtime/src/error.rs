use thiserror::Error;

pub type Result<T> = std::result::Result<T, WireError>;

#[derive(Debug, Error)]
pub enum WireError {
	#[error("invalid automation server url: {0}")]
	InvalidUrl(String),

	#[error("automation server not ready at {url}: {reason}")]
	NotReady { url: String, reason: String },

	/// Error response decoded from the WebDriver error envelope. The
	/// rendered text carries the HTTP status so session-failure
	/// classification sees signatures like `404` alongside the server's
	/// own message.
	#[error("webdriver request failed: http {status} {error}: {message}")]
	WebDriver { status: u16, error: String, message: String },

	#[error("screenshot payload was not valid base64")]
	ScreenshotDecode(#[from] base64::DecodeError),

	#[error(transparent)]
	Http(#[from] reqwest::Error),

	#[error(transparent)]
	Io(#[from] std::io::Error),
}
