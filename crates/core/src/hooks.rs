//! Lifecycle hook registry and invocation.
//!
//! Hooks live in two scopes. Global hooks are registered once and persist
//! for the process. Suite-local hooks come from a sidecar document
//! colocated with the suite file (`<stem>.hooks.yml`) and are replaced
//! wholesale every time a suite is loaded, so nothing accumulates across
//! suites. Invocation order within a stage is registration order,
//! global scope first.
//!
//! Each stage has a fixed argument shape ([`HookArgs`]); a hook failure
//! is logged with the hook's name and swallowed — hooks can never abort
//! a case or a suite.

use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::Deserialize;
use tracing::{debug, error};

use crate::case::CaseRecord;
use crate::error::{HerdError, Result};

/// The eight lifecycle stages, in firing order around a suite.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HookStage {
	BeforeTestSuite,
	Setup,
	SetupTestCase,
	BeforeTestCase,
	AfterTestCase,
	TeardownTestCase,
	Teardown,
	AfterTestSuite,
}

impl HookStage {
	pub const ALL: [HookStage; 8] = [
		HookStage::BeforeTestSuite,
		HookStage::Setup,
		HookStage::SetupTestCase,
		HookStage::BeforeTestCase,
		HookStage::AfterTestCase,
		HookStage::TeardownTestCase,
		HookStage::Teardown,
		HookStage::AfterTestSuite,
	];

	pub fn as_str(self) -> &'static str {
		match self {
			HookStage::BeforeTestSuite => "before_test_suite",
			HookStage::Setup => "setup",
			HookStage::SetupTestCase => "setup_test_case",
			HookStage::BeforeTestCase => "before_test_case",
			HookStage::AfterTestCase => "after_test_case",
			HookStage::TeardownTestCase => "teardown_test_case",
			HookStage::Teardown => "teardown",
			HookStage::AfterTestSuite => "after_test_suite",
		}
	}

	fn parse(raw: &str) -> Option<HookStage> {
		Self::ALL.into_iter().find(|stage| stage.as_str() == raw)
	}

	fn index(self) -> usize {
		Self::ALL.iter().position(|stage| *stage == self).unwrap_or(0)
	}
}

impl fmt::Display for HookStage {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Arguments delivered to a hook. Each stage declares one shape;
/// registrants conform to the shape for their stage.
#[derive(Debug)]
pub enum HookArgs<'a> {
	/// `before_test_suite`, `setup`, `teardown`, `after_test_suite`.
	Suite { suite: &'a str },
	/// `setup_test_case`, `before_test_case`.
	Case { case: &'a str },
	/// `after_test_case`, `teardown_test_case`.
	CaseResult { case: &'a str, result: &'a CaseRecord },
}

pub type HookFn = Arc<dyn Fn(&HookArgs<'_>) -> anyhow::Result<()> + Send + Sync>;

/// A named callable bound to a lifecycle stage.
#[derive(Clone)]
pub struct Hook {
	name: String,
	call: HookFn,
}

impl Hook {
	pub fn new(
		name: impl Into<String>,
		call: impl Fn(&HookArgs<'_>) -> anyhow::Result<()> + Send + Sync + 'static,
	) -> Self {
		Self { name: name.into(), call: Arc::new(call) }
	}

	pub fn name(&self) -> &str {
		&self.name
	}
}

impl fmt::Debug for Hook {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Hook").field("name", &self.name).finish_non_exhaustive()
	}
}

#[derive(Clone, Default)]
struct StageMap {
	stages: [Vec<Hook>; 8],
}

impl StageMap {
	fn push(&mut self, stage: HookStage, hook: Hook) {
		self.stages[stage.index()].push(hook);
	}

	fn get(&self, stage: HookStage) -> &[Hook] {
		&self.stages[stage.index()]
	}
}

/// Registry of global and suite-local hooks.
pub struct HookRegistry {
	global: Arc<RwLock<StageMap>>,
	suite: StageMap,
}

impl Default for HookRegistry {
	fn default() -> Self {
		Self::new()
	}
}

impl HookRegistry {
	pub fn new() -> Self {
		Self { global: Arc::new(RwLock::new(StageMap::default())), suite: StageMap::default() }
	}

	/// Forks a registry sharing the global scope with a fresh, empty
	/// suite-local scope. Each worker thread runs on its own fork so
	/// concurrent suite loads cannot clobber each other.
	pub fn fork(&self) -> Self {
		Self { global: Arc::clone(&self.global), suite: StageMap::default() }
	}

	/// Registers a global hook. Global hooks persist for the process.
	pub fn register_global(
		&self,
		stage: HookStage,
		name: impl Into<String>,
		call: impl Fn(&HookArgs<'_>) -> anyhow::Result<()> + Send + Sync + 'static,
	) {
		self.global.write().push(stage, Hook::new(name, call));
	}

	/// Loads the suite-local hooks for `suite_path`, replacing the
	/// previous suite-local scope entirely. A suite without a sidecar
	/// document simply gets an empty scope.
	pub fn load_suite_hooks(&mut self, suite_path: &Path) -> Result<()> {
		self.suite = StageMap::default();

		let sidecar = sidecar_path(suite_path);
		if !sidecar.is_file() {
			return Ok(());
		}
		debug!(target: "herd.hooks", path = %sidecar.display(), "loading suite hooks");

		let content = std::fs::read_to_string(&sidecar)
			.map_err(|source| HerdError::Read { path: sidecar.clone(), source })?;
		let stages: serde_yaml::Mapping = serde_yaml::from_str(&content)
			.map_err(|source| HerdError::Parse { path: sidecar.clone(), source })?;

		for (key, specs) in stages {
			let raw_stage = key.as_str().unwrap_or_default().to_string();
			let stage = HookStage::parse(&raw_stage).ok_or_else(|| {
				HerdError::Config(format!("unknown hook stage '{raw_stage}' in {}", sidecar.display()))
			})?;
			let specs: Vec<CommandHookSpec> = serde_yaml::from_value(specs)
				.map_err(|source| HerdError::Parse { path: sidecar.clone(), source })?;
			for spec in specs {
				self.suite.push(stage, spec.into_hook());
			}
		}
		Ok(())
	}

	/// Hooks enabled for `stage`: global registrations first, then the
	/// current suite-local scope, each in registration order.
	pub fn enabled(&self, stage: HookStage) -> Vec<Hook> {
		let global = self.global.read();
		global.get(stage).iter().chain(self.suite.get(stage)).cloned().collect()
	}

	/// Invokes every enabled hook for `stage`. Failures are logged with
	/// the hook's name and swallowed.
	pub fn invoke(&self, stage: HookStage, args: &HookArgs<'_>) {
		for hook in self.enabled(stage) {
			if let Err(err) = (hook.call)(args) {
				error!(
					target: "herd.hooks",
					hook = %hook.name,
					%stage,
					error = format_args!("{err:#}"),
					"hook failed"
				);
			}
		}
	}
}

/// `login.yml` → `login.hooks.yml`, next to the suite.
fn sidecar_path(suite_path: &Path) -> PathBuf {
	let stem = suite_path.file_stem().unwrap_or_default().to_string_lossy();
	suite_path.with_file_name(format!("{stem}.hooks.yml"))
}

/// One command entry in a hook sidecar: either a bare command string or
/// `{name, run}`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CommandHookSpec {
	Bare(String),
	Named {
		#[serde(default)]
		name: Option<String>,
		run: String,
	},
}

impl CommandHookSpec {
	fn into_hook(self) -> Hook {
		let (name, command) = match self {
			CommandHookSpec::Bare(run) => (run.clone(), run),
			CommandHookSpec::Named { name, run } => (name.unwrap_or_else(|| run.clone()), run),
		};
		Hook::new(name, move |args| run_command_hook(&command, args))
	}
}

/// Runs a sidecar command through the platform shell, passing the stage
/// arguments as environment variables.
fn run_command_hook(command: &str, args: &HookArgs<'_>) -> anyhow::Result<()> {
	#[cfg(not(windows))]
	let mut invocation = {
		let mut cmd = Command::new("sh");
		cmd.args(["-c", command]);
		cmd
	};
	#[cfg(windows)]
	let mut invocation = {
		let mut cmd = Command::new("cmd");
		cmd.args(["/C", command]);
		cmd
	};

	match args {
		HookArgs::Suite { suite } => {
			invocation.env("HERD_SUITE", suite);
		}
		HookArgs::Case { case } => {
			invocation.env("HERD_CASE", case);
		}
		HookArgs::CaseResult { case, result } => {
			invocation.env("HERD_CASE", case).env("HERD_CASE_STATUS", result.status.as_str());
		}
	}

	let status = invocation.status()?;
	if !status.success() {
		anyhow::bail!("command exited with {status}");
	}
	Ok(())
}
