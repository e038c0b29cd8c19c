//! The execution orchestrator: case → suite → collection.

use std::path::Path;
use std::process::Command;
use std::sync::Arc;

use tracing::{error, info};

use crate::case::{CaseLoader, CaseRecord, CaseStatus, ProcessCaseLoader};
use crate::config::Config;
use crate::error::{HerdError, Result};
use crate::hooks::{HookArgs, HookRegistry, HookStage};
use crate::scheduler;
use crate::suite::{Collection, SuiteSpec, normalize_case_path};

const DEFAULT_BDD_RUNNER: &str = "behave";

/// Runs cases, suites, and suite collections.
///
/// One runner drives one thread. The scheduler forks a runner per
/// worker: forks share the global hook scope and the case loader but
/// keep their own suite-local hook scope.
pub struct Runner {
	config: Arc<Config>,
	hooks: HookRegistry,
	loader: Arc<dyn CaseLoader>,
}

impl Runner {
	pub fn new(config: Arc<Config>) -> Self {
		Self::with_loader(config, Arc::new(ProcessCaseLoader))
	}

	pub fn with_loader(config: Arc<Config>, loader: Arc<dyn CaseLoader>) -> Self {
		Self { config, hooks: HookRegistry::new(), loader }
	}

	/// Forks a runner for another thread: shared global hooks and
	/// loader, fresh suite-local hook scope.
	pub fn fork(&self) -> Runner {
		Runner {
			config: Arc::clone(&self.config),
			hooks: self.hooks.fork(),
			loader: Arc::clone(&self.loader),
		}
	}

	pub fn config(&self) -> &Arc<Config> {
		&self.config
	}

	pub fn hooks(&self) -> &HookRegistry {
		&self.hooks
	}

	/// Loads and executes a single case. A case without an entry point
	/// is fatal for that case and propagates to the caller.
	pub fn run_case(&self, case_path: &str) -> Result<()> {
		info!(target: "herd.runner", case = case_path, "running test case");
		let case = self.loader.load(case_path)?;
		case.run().map_err(HerdError::Other)
	}

	/// Executes a suite: suite-local hooks load first, then the full
	/// case list runs with per-case hooks around each case. A failing
	/// case is recorded and never aborts the suite; the returned records
	/// are in case order.
	pub fn run_suite(&mut self, suite_path: &Path) -> Result<Vec<CaseRecord>> {
		let suite_name = suite_path.to_string_lossy().into_owned();
		info!(target: "herd.runner", suite = %suite_name, "running test suite");

		self.hooks.load_suite_hooks(suite_path)?;
		self.hooks.invoke(HookStage::BeforeTestSuite, &HookArgs::Suite { suite: &suite_name });
		self.hooks.invoke(HookStage::Setup, &HookArgs::Suite { suite: &suite_name });

		let spec = SuiteSpec::load(suite_path)?;
		let mut records = Vec::with_capacity(spec.test_cases.len());

		for raw_case in &spec.test_cases {
			let case = normalize_case_path(raw_case);
			self.hooks.invoke(HookStage::SetupTestCase, &HookArgs::Case { case: &case });
			self.hooks.invoke(HookStage::BeforeTestCase, &HookArgs::Case { case: &case });

			let status = match self.run_case(&case) {
				Ok(()) => CaseStatus::Passed,
				Err(err) => {
					error!(target: "herd.runner", case = %case, error = format_args!("{err:#}"), "test case failed");
					CaseStatus::Failed
				}
			};
			let record = CaseRecord { status, name: case.clone() };

			self.hooks.invoke(HookStage::AfterTestCase, &HookArgs::CaseResult { case: &case, result: &record });
			self.hooks.invoke(HookStage::TeardownTestCase, &HookArgs::CaseResult { case: &case, result: &record });
			records.push(record);
		}

		self.hooks.invoke(HookStage::Teardown, &HookArgs::Suite { suite: &suite_name });
		self.hooks.invoke(HookStage::AfterTestSuite, &HookArgs::Suite { suite: &suite_name });
		Ok(records)
	}

	/// Runs a collection of suites under its execution policy. The call
	/// returns once every entry has completed; the first entry error, if
	/// any, is surfaced after the join.
	pub fn run_collection(&self, collection_path: &Path) -> Result<()> {
		let collection = Collection::load(collection_path)?;
		let project_root = std::env::current_dir()?;
		info!(
			target: "herd.runner",
			collection = %collection_path.display(),
			entries = collection.entries.len(),
			method = ?collection.method,
			"running suite collection"
		);
		scheduler::run(self, &collection, &project_root)
	}

	/// Delegates a BDD feature to the configured scenario runner as a
	/// sub-process. A non-zero exit is a feature failure.
	pub fn run_feature(&self, feature_path: &Path, tags: Option<&str>) -> Result<()> {
		info!(target: "herd.runner", feature = %feature_path.display(), ?tags, "running feature");
		let runner = self.config.get_or("bdd_runner", DEFAULT_BDD_RUNNER);

		let mut command = Command::new(runner);
		if let Some(tags) = tags {
			command.args(["--tags", tags]);
		}
		command.arg(feature_path);

		let status = command.status()?;
		if !status.success() {
			return Err(HerdError::Feature {
				path: feature_path.to_path_buf(),
				code: status.code().unwrap_or(-1),
			});
		}
		Ok(())
	}
}
