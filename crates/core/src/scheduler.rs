//! Bounded-concurrency scheduling of suite-collection entries.
//!
//! Parallel collections run on a fixed pool of worker threads sharing an
//! ordered queue; sequential collections run on the calling thread. The
//! inter-launch delay is observed between successive submissions, not
//! between completions, so it bounds the rate of concurrent session
//! startups without capping total concurrency below the pool size.

use std::path::Path;
use std::sync::mpsc;

use parking_lot::Mutex;
use tracing::{debug, error};

use crate::context::{ContextValue, context, keys};
use crate::error::Result;
use crate::preflight;
use crate::runner::Runner;
use crate::suite::{Collection, CollectionEntry, ExecutionMethod};

/// Drives every entry of `collection` to completion and returns after
/// the join. The first entry error, if any, surfaces to the caller;
/// sibling entries are unaffected.
pub(crate) fn run(runner: &Runner, collection: &Collection, project_root: &Path) -> Result<()> {
	let parallel = collection.method == ExecutionMethod::Parallel && collection.max_instances > 1;
	let outcomes = if parallel {
		run_parallel(runner, collection, project_root)
	} else {
		run_sequential(runner, collection, project_root)
	};

	let mut first_error = None;
	for (suite, outcome) in outcomes {
		if let Err(err) = outcome {
			error!(target: "herd.sched", suite = %suite, error = format_args!("{err:#}"), "collection entry failed");
			if first_error.is_none() {
				first_error = Some(err);
			}
		}
	}
	match first_error {
		Some(err) => Err(err),
		None => Ok(()),
	}
}

fn run_sequential(runner: &Runner, collection: &Collection, project_root: &Path) -> Vec<(String, Result<()>)> {
	let mut outcomes = Vec::with_capacity(collection.entries.len());
	for (index, entry) in collection.entries.iter().enumerate() {
		let mut worker = runner.fork();
		outcomes.push((entry.suite.clone(), run_entry(&mut worker, entry, project_root)));
		if !collection.launch_delay.is_zero() && index + 1 < collection.entries.len() {
			std::thread::sleep(collection.launch_delay);
		}
	}
	outcomes
}

fn run_parallel(runner: &Runner, collection: &Collection, project_root: &Path) -> Vec<(String, Result<()>)> {
	let (sender, receiver) = mpsc::channel::<&CollectionEntry>();
	let receiver = Mutex::new(receiver);
	let outcomes = Mutex::new(Vec::with_capacity(collection.entries.len()));
	let workers = collection.max_instances.min(collection.entries.len().max(1));
	debug!(target: "herd.sched", workers, entries = collection.entries.len(), "starting worker pool");

	std::thread::scope(|scope| {
		for _ in 0..workers {
			scope.spawn(|| {
				let mut worker = runner.fork();
				loop {
					let next = { receiver.lock().recv() };
					let Ok(entry) = next else { break };
					let outcome = run_entry(&mut worker, entry, project_root);
					// Worker threads are reused across entries; drop this
					// entry's ambient context before taking the next one.
					context().clear_current_thread();
					outcomes.lock().push((entry.suite.clone(), outcome));
				}
			});
		}

		for (index, entry) in collection.entries.iter().enumerate() {
			if sender.send(entry).is_err() {
				break;
			}
			if !collection.launch_delay.is_zero() && index + 1 < collection.entries.len() {
				std::thread::sleep(collection.launch_delay);
			}
		}
		drop(sender);
	});

	outcomes.into_inner()
}

/// Runs one collection entry: seed the thread context from the entry's
/// overrides, verify mobile tooling when the entry targets a mobile
/// platform, resolve the suite path, and hand off to the runner.
fn run_entry(runner: &mut Runner, entry: &CollectionEntry, project_root: &Path) -> Result<()> {
	let store = context();
	match &entry.device_id {
		Some(device_id) => store.set(keys::DEVICE_ID, ContextValue::Text(device_id.clone())),
		None => store.unset(keys::DEVICE_ID),
	}
	if let Some(platform) = entry.platform {
		store.set(keys::PLATFORM, ContextValue::Text(platform.as_str().into()));
		if platform.is_mobile() {
			preflight::verify_mobile_tooling(runner.config())?;
		}
	}

	let suite_path = project_root.join(&entry.suite);
	runner.run_suite(&suite_path)?;
	Ok(())
}
