//! Collection scheduling: concurrency bound, join-all, and per-entry
//! failure isolation.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use herd::{Config, RegistryCaseLoader, Runner};
use tempfile::TempDir;

/// Tracks how many sleeping cases overlap at any instant.
#[derive(Default)]
struct ConcurrencyGauge {
	current: AtomicUsize,
	peak: AtomicUsize,
	completed: AtomicUsize,
}

impl ConcurrencyGauge {
	fn enter(&self) {
		let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
		self.peak.fetch_max(now, Ordering::SeqCst);
	}

	fn exit(&self) {
		self.current.fetch_sub(1, Ordering::SeqCst);
		self.completed.fetch_add(1, Ordering::SeqCst);
	}
}

fn sleepy_fixture(tmp: &TempDir, suites: usize, gauge: &Arc<ConcurrencyGauge>) -> (Arc<RegistryCaseLoader>, Vec<PathBuf>) {
	let loader = Arc::new(RegistryCaseLoader::new());
	let mut suite_paths = Vec::new();

	for index in 0..suites {
		let case_name = format!("cases/sleepy_{index}.py");
		let tracker = Arc::clone(gauge);
		loader.register(case_name.clone(), move || {
			tracker.enter();
			std::thread::sleep(Duration::from_millis(150));
			tracker.exit();
			Ok(())
		});

		let suite_path = tmp.path().join(format!("suite_{index}.yml"));
		std::fs::write(&suite_path, format!("test_cases:\n  - {case_name}\n")).unwrap();
		suite_paths.push(suite_path);
	}

	(loader, suite_paths)
}

fn write_collection(tmp: &TempDir, header: &str, suites: &[PathBuf]) -> PathBuf {
	let mut body = String::from(header);
	body.push_str("testsuites:\n");
	for suite in suites {
		body.push_str(&format!("  - {}\n", suite.display()));
	}
	let path = tmp.path().join("collection.yml");
	std::fs::write(&path, body).unwrap();
	path
}

#[test]
fn parallel_collection_respects_the_concurrency_bound() {
	let tmp = TempDir::new().unwrap();
	let gauge = Arc::new(ConcurrencyGauge::default());
	let (loader, suites) = sleepy_fixture(&tmp, 4, &gauge);

	let collection = write_collection(
		&tmp,
		"execution_method: parallel\nmax_concurrent_instances: 2\n",
		&suites,
	);
	let runner = Runner::with_loader(Arc::new(Config::default()), loader);
	runner.run_collection(&collection).unwrap();

	// Join-all: every entry completed before the call returned.
	assert_eq!(gauge.completed.load(Ordering::SeqCst), 4);
	assert!(gauge.peak.load(Ordering::SeqCst) <= 2);
	assert_eq!(gauge.current.load(Ordering::SeqCst), 0);
}

#[test]
fn parallel_with_a_bound_of_one_behaves_sequentially() {
	let tmp = TempDir::new().unwrap();
	let gauge = Arc::new(ConcurrencyGauge::default());
	let (loader, suites) = sleepy_fixture(&tmp, 3, &gauge);

	let collection = write_collection(
		&tmp,
		"execution_method: parallel\nmax_concurrent_instances: 1\n",
		&suites,
	);
	let runner = Runner::with_loader(Arc::new(Config::default()), loader);
	runner.run_collection(&collection).unwrap();

	assert_eq!(gauge.completed.load(Ordering::SeqCst), 3);
	assert_eq!(gauge.peak.load(Ordering::SeqCst), 1);
}

#[test]
fn an_entry_failure_does_not_stop_sibling_entries() {
	let tmp = TempDir::new().unwrap();
	let gauge = Arc::new(ConcurrencyGauge::default());
	let (loader, mut suites) = sleepy_fixture(&tmp, 2, &gauge);
	// First entry points at a suite file that does not exist.
	suites.insert(0, tmp.path().join("missing.yml"));

	let collection = write_collection(&tmp, "", &suites);
	let runner = Runner::with_loader(Arc::new(Config::default()), loader);

	let err = runner.run_collection(&collection).unwrap_err();
	assert!(err.to_string().contains("missing.yml"));
	// Both healthy siblings still ran to completion.
	assert_eq!(gauge.completed.load(Ordering::SeqCst), 2);
}

#[test]
fn inter_launch_delay_spaces_out_submissions() {
	let tmp = TempDir::new().unwrap();
	let gauge = Arc::new(ConcurrencyGauge::default());
	let (loader, suites) = sleepy_fixture(&tmp, 2, &gauge);

	let collection = write_collection(
		&tmp,
		"execution_method: parallel\nmax_concurrent_instances: 2\ndelay_between_instances(s): 0.05\n",
		&suites,
	);
	let runner = Runner::with_loader(Arc::new(Config::default()), loader);

	let started = std::time::Instant::now();
	runner.run_collection(&collection).unwrap();

	// One 50ms gap between the two submissions, plus the 150ms cases.
	assert!(started.elapsed() >= Duration::from_millis(200));
	assert_eq!(gauge.completed.load(Ordering::SeqCst), 2);
}
