//! Command dispatch.

use std::path::Path;
use std::sync::Arc;

use herd::{Config, ContextValue, HerdError, Platform, Runner, context, keys};

use crate::cli::{Cli, Commands, RunArgs};

pub fn dispatch(cli: Cli) -> herd::Result<()> {
	match cli.command {
		Commands::Run(args) => run(args),
		Commands::Devices => devices(),
	}
}

fn run(args: RunArgs) -> herd::Result<()> {
	let config = Arc::new(Config::load()?);

	if let Some(raw) = &args.platform {
		let platform = Platform::parse(raw)?;
		context().set(keys::PLATFORM, ContextValue::Text(platform.as_str().into()));
	}

	let mut runner = Runner::new(config);
	match classify_target(&args.target)? {
		TargetKind::Collection => runner.run_collection(&args.target),
		TargetKind::Suite => runner.run_suite(&args.target).map(|_| ()),
		TargetKind::Feature => runner.run_feature(&args.target, args.tags.as_deref()),
		TargetKind::Case => runner.run_case(&args.target.to_string_lossy()),
	}
}

fn devices() -> herd::Result<()> {
	if !herd_runtime::recovery::adb_available() {
		return Err(HerdError::Config("adb is not installed or not on PATH".into()));
	}
	let devices = herd_runtime::recovery::connected_devices();
	if devices.is_empty() {
		println!("no connected devices");
	} else {
		for device in devices {
			println!("{device}");
		}
	}
	Ok(())
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum TargetKind {
	Collection,
	Suite,
	Feature,
	Case,
}

/// A `.feature` file goes to the scenario runner. A YAML document is a
/// collection when it has a `testsuites` key and a suite when it has
/// `test_cases`. Anything else executes as a single case.
fn classify_target(target: &Path) -> herd::Result<TargetKind> {
	let extension = target.extension().and_then(|ext| ext.to_str()).unwrap_or_default();
	match extension {
		"feature" => Ok(TargetKind::Feature),
		"yml" | "yaml" => {
			let content = std::fs::read_to_string(target)
				.map_err(|source| HerdError::Read { path: target.to_path_buf(), source })?;
			let doc: serde_yaml::Value = serde_yaml::from_str(&content)
				.map_err(|source| HerdError::Parse { path: target.to_path_buf(), source })?;
			if doc.get("testsuites").is_some() {
				Ok(TargetKind::Collection)
			} else if doc.get("test_cases").is_some() {
				Ok(TargetKind::Suite)
			} else {
				Err(HerdError::Config(format!(
					"{} has neither a 'testsuites' nor a 'test_cases' key",
					target.display()
				)))
			}
		}
		_ => Ok(TargetKind::Case),
	}
}
