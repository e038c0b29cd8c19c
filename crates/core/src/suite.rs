//! Suite and collection documents.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::{HerdError, Result};
use crate::platform::Platform;

/// Normalizes a case path from a suite document: backslashes become
/// forward slashes, doubled slashes collapse.
pub fn normalize_case_path(raw: &str) -> String {
	raw.replace('\\', "/").replace("//", "/")
}

/// A suite document: an ordered list of case paths.
#[derive(Debug, Default, Deserialize)]
pub struct SuiteSpec {
	#[serde(default)]
	pub test_cases: Vec<String>,
}

impl SuiteSpec {
	pub fn load(path: &Path) -> Result<SuiteSpec> {
		let content = std::fs::read_to_string(path)
			.map_err(|source| HerdError::Read { path: path.to_path_buf(), source })?;
		serde_yaml::from_str(&content).map_err(|source| HerdError::Parse { path: path.to_path_buf(), source })
	}
}

/// How a collection's entries are driven.
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionMethod {
	#[default]
	Sequential,
	Parallel,
}

/// One suite entry of a collection, with optional per-entry overrides.
#[derive(Clone, Debug, PartialEq)]
pub struct CollectionEntry {
	pub suite: String,
	pub platform: Option<Platform>,
	pub device_id: Option<String>,
}

/// A parsed, validated collection document.
#[derive(Debug)]
pub struct Collection {
	pub method: ExecutionMethod,
	pub max_instances: usize,
	pub launch_delay: Duration,
	pub entries: Vec<CollectionEntry>,
}

impl Collection {
	/// Loads and validates a collection document. A missing file is a
	/// fatal error; so is an unknown platform tag or a zero instance
	/// bound.
	pub fn load(path: &Path) -> Result<Collection> {
		if !path.is_file() {
			return Err(HerdError::CollectionNotFound(path.to_path_buf()));
		}
		let content = std::fs::read_to_string(path)
			.map_err(|source| HerdError::Read { path: path.to_path_buf(), source })?;
		let raw: RawCollection = serde_yaml::from_str(&content)
			.map_err(|source| HerdError::Parse { path: path.to_path_buf(), source })?;
		raw.validate()
	}
}

#[derive(Debug, Deserialize)]
struct RawCollection {
	#[serde(default)]
	execution_method: ExecutionMethod,
	#[serde(default = "default_max_instances")]
	max_concurrent_instances: usize,
	#[serde(default, rename = "delay_between_instances(s)")]
	delay_between_instances: f64,
	#[serde(default)]
	testsuites: Vec<RawEntry>,
}

fn default_max_instances() -> usize {
	1
}

/// Collection entries are either a bare suite path or an object with
/// per-entry overrides.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawEntry {
	Path(String),
	Detailed {
		testsuite: String,
		#[serde(default)]
		platform: Option<String>,
		#[serde(default)]
		device_id: Option<String>,
	},
}

impl RawCollection {
	fn validate(self) -> Result<Collection> {
		if self.max_concurrent_instances == 0 {
			return Err(HerdError::Config("max_concurrent_instances must be at least 1".into()));
		}
		if !self.delay_between_instances.is_finite() || self.delay_between_instances < 0.0 {
			return Err(HerdError::Config("delay_between_instances(s) must be a non-negative number".into()));
		}

		let mut entries = Vec::with_capacity(self.testsuites.len());
		for raw in self.testsuites {
			entries.push(match raw {
				RawEntry::Path(suite) => CollectionEntry { suite, platform: None, device_id: None },
				RawEntry::Detailed { testsuite, platform, device_id } => CollectionEntry {
					suite: testsuite,
					platform: platform.as_deref().map(Platform::parse).transpose()?,
					device_id,
				},
			});
		}

		Ok(Collection {
			method: self.execution_method,
			max_instances: self.max_concurrent_instances,
			launch_delay: Duration::from_secs_f64(self.delay_between_instances),
			entries,
		})
	}
}
