//! Test cases and the loader seam.
//!
//! A case is a filesystem path naming a loadable unit with a single
//! no-argument entry point. The default loader executes the case file as
//! a sub-process; the registry loader maps paths to native callables for
//! embedding and tests.

use std::collections::HashMap;
use std::path::PathBuf;
use std::process::Command;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::Serialize;

use crate::error::{HerdError, Result};

/// Outcome of one case execution.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CaseStatus {
	Passed,
	Failed,
}

impl CaseStatus {
	pub fn as_str(self) -> &'static str {
		match self {
			CaseStatus::Passed => "passed",
			CaseStatus::Failed => "failed",
		}
	}
}

/// Per-case result record handed to the after/teardown case hooks.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CaseRecord {
	pub status: CaseStatus,
	pub name: String,
}

/// A loaded case, ready to execute once.
pub trait TestCase: Send + std::fmt::Debug {
	fn run(&self) -> anyhow::Result<()>;
}

/// Resolves a case path into an executable case.
pub trait CaseLoader: Send + Sync {
	/// Loads the case at `path`. A path with no usable entry point is a
	/// fatal error for that case.
	fn load(&self, path: &str) -> Result<Box<dyn TestCase>>;
}

/// Executes the case file itself as a sub-process; a non-zero exit is a
/// case failure.
#[derive(Clone, Copy, Debug, Default)]
pub struct ProcessCaseLoader;

impl CaseLoader for ProcessCaseLoader {
	fn load(&self, path: &str) -> Result<Box<dyn TestCase>> {
		let file = PathBuf::from(path);
		if !file.is_file() {
			return Err(HerdError::MissingEntryPoint(path.to_string()));
		}
		Ok(Box::new(ProcessCase { file }))
	}
}

#[derive(Debug)]
struct ProcessCase {
	file: PathBuf,
}

impl TestCase for ProcessCase {
	fn run(&self) -> anyhow::Result<()> {
		let status = Command::new(&self.file)
			.status()
			.map_err(|err| anyhow::anyhow!("failed to execute {}: {err}", self.file.display()))?;
		if !status.success() {
			anyhow::bail!("case exited with {status}");
		}
		Ok(())
	}
}

type CaseFn = Arc<dyn Fn() -> anyhow::Result<()> + Send + Sync>;

/// In-process case registry keyed by path.
#[derive(Default)]
pub struct RegistryCaseLoader {
	cases: RwLock<HashMap<String, CaseFn>>,
}

impl RegistryCaseLoader {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn register(&self, path: impl Into<String>, case: impl Fn() -> anyhow::Result<()> + Send + Sync + 'static) {
		self.cases.write().insert(path.into(), Arc::new(case));
	}
}

impl CaseLoader for RegistryCaseLoader {
	fn load(&self, path: &str) -> Result<Box<dyn TestCase>> {
		let case = self
			.cases
			.read()
			.get(path)
			.cloned()
			.ok_or_else(|| HerdError::MissingEntryPoint(path.to_string()))?;
		Ok(Box::new(RegisteredCase { case }))
	}
}

struct RegisteredCase {
	case: CaseFn,
}

impl std::fmt::Debug for RegisteredCase {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("RegisteredCase").finish_non_exhaustive()
	}
}

impl TestCase for RegisteredCase {
	fn run(&self) -> anyhow::Result<()> {
		(self.case)()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn case_record_serializes_with_lowercase_status() {
		let record = CaseRecord { status: CaseStatus::Failed, name: "cases/a.py".into() };
		let json = serde_json::to_value(&record).unwrap();
		assert_eq!(json, serde_json::json!({ "status": "failed", "name": "cases/a.py" }));
	}

	#[test]
	fn missing_file_has_no_entry_point() {
		let err = ProcessCaseLoader.load("does/not/exist.py").unwrap_err();
		assert!(matches!(err, HerdError::MissingEntryPoint(_)));
	}

	#[test]
	fn registry_loader_resolves_registered_cases_only() {
		let loader = RegistryCaseLoader::new();
		loader.register("cases/ok.py", || Ok(()));

		assert!(loader.load("cases/ok.py").unwrap().run().is_ok());
		assert!(matches!(loader.load("cases/other.py").unwrap_err(), HerdError::MissingEntryPoint(_)));
	}
}
