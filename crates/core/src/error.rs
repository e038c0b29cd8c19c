use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, HerdError>;

#[derive(Debug, Error)]
pub enum HerdError {
	#[error("configuration error: {0}")]
	Config(String),

	#[error("unsupported browser: {0}")]
	UnsupportedBrowser(String),

	#[error("browser driver error: {0}")]
	BrowserDriver(String),

	#[error("collection file not found: {}", .0.display())]
	CollectionNotFound(PathBuf),

	#[error("failed to parse {}", path.display())]
	Parse {
		path: PathBuf,
		#[source]
		source: serde_yaml::Error,
	},

	#[error("failed to read {}", path.display())]
	Read {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("no entry point found in {0}")]
	MissingEntryPoint(String),

	#[error("feature run failed with code {code}: {}", path.display())]
	Feature { path: PathBuf, code: i32 },

	#[error("failed to create driver after {attempts} attempts")]
	DriverCreate {
		attempts: u32,
		#[source]
		source: herd_runtime::WireError,
	},

	#[error("screenshot failed: {}", path.display())]
	Screenshot {
		path: PathBuf,
		#[source]
		source: anyhow::Error,
	},

	#[error(transparent)]
	Wire(#[from] herd_runtime::WireError),

	#[error(transparent)]
	Io(#[from] std::io::Error),

	#[error(transparent)]
	Json(#[from] serde_json::Error),

	#[error(transparent)]
	Other(#[from] anyhow::Error),
}
