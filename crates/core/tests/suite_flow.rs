//! End-to-end suite execution: hook ordering, case containment, and
//! suite-local hook isolation.

use std::path::PathBuf;
use std::sync::Arc;

use herd::{CaseStatus, Config, HookArgs, HookStage, RegistryCaseLoader, Runner};
use parking_lot::Mutex;
use tempfile::TempDir;

type EventLog = Arc<Mutex<Vec<String>>>;

fn record_stage(runner: &Runner, stage: HookStage, events: &EventLog) {
	let sink = Arc::clone(events);
	runner.hooks().register_global(stage, format!("record-{stage}"), move |args| {
		let detail = match args {
			HookArgs::Suite { .. } => stage.to_string(),
			HookArgs::Case { case } => format!("{stage}:{case}"),
			HookArgs::CaseResult { case, result } => format!("{stage}:{case}:{}", result.status.as_str()),
		};
		sink.lock().push(detail);
		Ok(())
	});
}

fn instrumented_runner(loader: Arc<RegistryCaseLoader>) -> (Runner, EventLog) {
	let runner = Runner::with_loader(Arc::new(Config::default()), loader);
	let events: EventLog = Arc::new(Mutex::new(Vec::new()));
	for stage in HookStage::ALL {
		record_stage(&runner, stage, &events);
	}
	(runner, events)
}

fn write_suite(dir: &TempDir, name: &str, cases: &[&str]) -> PathBuf {
	let path = dir.path().join(name);
	let mut body = String::from("test_cases:\n");
	for case in cases {
		body.push_str(&format!("  - {case}\n"));
	}
	std::fs::write(&path, body).unwrap();
	path
}

#[test]
fn failing_case_is_recorded_and_the_suite_continues() {
	let tmp = TempDir::new().unwrap();
	let loader = Arc::new(RegistryCaseLoader::new());
	loader.register("cases/a.py", || anyhow::bail!("assertion failed"));
	loader.register("cases/b.py", || Ok(()));

	let (mut runner, events) = instrumented_runner(Arc::clone(&loader));
	let suite = write_suite(&tmp, "login.yml", &["cases/a.py", "cases/b.py"]);

	let records = runner.run_suite(&suite).unwrap();
	assert_eq!(records.len(), 2);
	assert_eq!(records[0].status, CaseStatus::Failed);
	assert_eq!(records[0].name, "cases/a.py");
	assert_eq!(records[1].status, CaseStatus::Passed);
	assert_eq!(records[1].name, "cases/b.py");

	let events = events.lock();
	assert_eq!(
		events.as_slice(),
		&[
			"before_test_suite".to_string(),
			"setup".to_string(),
			"setup_test_case:cases/a.py".to_string(),
			"before_test_case:cases/a.py".to_string(),
			"after_test_case:cases/a.py:failed".to_string(),
			"teardown_test_case:cases/a.py:failed".to_string(),
			"setup_test_case:cases/b.py".to_string(),
			"before_test_case:cases/b.py".to_string(),
			"after_test_case:cases/b.py:passed".to_string(),
			"teardown_test_case:cases/b.py:passed".to_string(),
			"teardown".to_string(),
			"after_test_suite".to_string(),
		]
	);
}

#[test]
fn per_case_hooks_fire_exactly_once_per_case_in_order() {
	let tmp = TempDir::new().unwrap();
	let loader = Arc::new(RegistryCaseLoader::new());
	for name in ["cases/1.py", "cases/2.py", "cases/3.py"] {
		loader.register(name, || Ok(()));
	}

	let (mut runner, events) = instrumented_runner(Arc::clone(&loader));
	let suite = write_suite(&tmp, "trio.yml", &["cases/1.py", "cases/2.py", "cases/3.py"]);
	runner.run_suite(&suite).unwrap();

	let events = events.lock();
	let befores: Vec<_> = events.iter().filter(|e| e.starts_with("before_test_case:")).collect();
	let afters: Vec<_> = events.iter().filter(|e| e.starts_with("after_test_case:")).collect();
	assert_eq!(
		befores,
		vec!["before_test_case:cases/1.py", "before_test_case:cases/2.py", "before_test_case:cases/3.py"]
	);
	assert_eq!(afters.len(), 3);
}

#[test]
fn missing_entry_point_counts_as_a_failed_case_not_a_suite_abort() {
	let tmp = TempDir::new().unwrap();
	let loader = Arc::new(RegistryCaseLoader::new());
	loader.register("cases/known.py", || Ok(()));

	let (mut runner, events) = instrumented_runner(Arc::clone(&loader));
	let suite = write_suite(&tmp, "gap.yml", &["cases/unknown.py", "cases/known.py"]);

	let records = runner.run_suite(&suite).unwrap();
	assert_eq!(records[0].status, CaseStatus::Failed);
	assert_eq!(records[1].status, CaseStatus::Passed);
	assert_eq!(events.lock().iter().filter(|e| e.starts_with("after_test_case:")).count(), 2);
}

#[test]
fn case_paths_are_normalized_before_execution() {
	let tmp = TempDir::new().unwrap();
	let loader = Arc::new(RegistryCaseLoader::new());
	loader.register("cases/login.py", || Ok(()));

	let (mut runner, _events) = instrumented_runner(Arc::clone(&loader));
	let suite = write_suite(&tmp, "slashes.yml", &[r"cases\login.py"]);

	let records = runner.run_suite(&suite).unwrap();
	assert_eq!(records[0].name, "cases/login.py");
	assert_eq!(records[0].status, CaseStatus::Passed);
}

#[cfg(unix)]
#[test]
fn suite_local_hooks_do_not_leak_into_the_next_suite() {
	let tmp = TempDir::new().unwrap();
	let loader = Arc::new(RegistryCaseLoader::new());
	let mut runner = Runner::with_loader(Arc::new(Config::default()), loader);

	let log = tmp.path().join("setup.log");
	let suite_a = write_suite(&tmp, "a.yml", &[]);
	let suite_b = write_suite(&tmp, "b.yml", &[]);
	std::fs::write(
		tmp.path().join("a.hooks.yml"),
		format!("setup:\n  - name: mark\n    run: \"echo ran >> {}\"\n", log.display()),
	)
	.unwrap();

	runner.run_suite(&suite_a).unwrap();
	runner.run_suite(&suite_b).unwrap();

	let marks = std::fs::read_to_string(&log).unwrap();
	assert_eq!(marks.lines().count(), 1);
}
