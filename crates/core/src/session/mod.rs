//! Driver session handles and screenshot recording.
//!
//! Factories return session objects whose capture operation is composed
//! at construction time: resolve the target path, record it into the
//! thread's screenshot ledger, delegate to the underlying capture call.
//! Nothing is patched onto a live object after the fact.

pub mod browser;
pub mod mobile;

use std::path::{Path, PathBuf};

use crate::context::{ContextStore, ContextValue, keys};
use crate::error::Result;

const DEFAULT_SCREENSHOTS_DIR: &str = "screenshots";

/// Initializes the calling thread's screenshot ledger when absent.
pub(crate) fn ensure_screenshot_ledger(store: &ContextStore) {
	if store.get(keys::SCREENSHOTS).is_none() {
		store.set(keys::SCREENSHOTS, ContextValue::Paths(Vec::new()));
	}
}

/// Resolves a requested capture path to an absolute target.
///
/// Relative paths land in the report's screenshots directory — or
/// `./screenshots` when no report handle is in context — which is
/// created on demand; a name collision gets a `_1`, `_2`, … suffix.
/// Absolute paths pass through untouched.
pub(crate) fn resolve_capture_path(store: &ContextStore, requested: &Path) -> Result<PathBuf> {
	if requested.is_absolute() {
		return Ok(requested.to_path_buf());
	}

	let dir = store
		.get(keys::REPORT)
		.and_then(|value| value.as_report().map(|report| report.screenshots_dir().to_path_buf()))
		.unwrap_or_else(|| std::env::current_dir().unwrap_or_default().join(DEFAULT_SCREENSHOTS_DIR));
	std::fs::create_dir_all(&dir)?;

	let mut candidate = dir.join(requested);
	let stem = candidate.file_stem().unwrap_or_default().to_string_lossy().into_owned();
	let extension = candidate.extension().map(|ext| ext.to_string_lossy().into_owned());
	let mut suffix = 1;
	while candidate.exists() {
		let name = match &extension {
			Some(ext) => format!("{stem}_{suffix}.{ext}"),
			None => format!("{stem}_{suffix}"),
		};
		candidate = dir.join(name);
		suffix += 1;
	}

	Ok(std::path::absolute(candidate)?)
}

/// Appends a captured path to the calling thread's screenshot ledger.
pub(crate) fn record_capture(store: &ContextStore, captured: &Path) {
	let mut paths = store
		.get(keys::SCREENSHOTS)
		.and_then(|value| value.as_paths().map(<[PathBuf]>::to_vec))
		.unwrap_or_default();
	paths.push(captured.to_path_buf());
	store.set(keys::SCREENSHOTS, ContextValue::Paths(paths));
}

#[cfg(test)]
mod tests {
	use tempfile::TempDir;

	use crate::report::ReportHandle;

	use super::*;

	#[test]
	fn relative_paths_resolve_into_the_report_directory() {
		let tmp = TempDir::new().unwrap();
		let store = ContextStore::new();
		store.set(keys::REPORT, ContextValue::Report(ReportHandle::new(tmp.path().join("shots"))));

		let resolved = resolve_capture_path(&store, Path::new("login.png")).unwrap();
		assert!(resolved.is_absolute());
		assert!(resolved.ends_with("shots/login.png"));
		assert!(tmp.path().join("shots").is_dir());
	}

	#[test]
	fn collisions_get_numeric_suffixes() {
		let tmp = TempDir::new().unwrap();
		let store = ContextStore::new();
		let shots = tmp.path().join("shots");
		store.set(keys::REPORT, ContextValue::Report(ReportHandle::new(&shots)));
		std::fs::create_dir_all(&shots).unwrap();
		std::fs::write(shots.join("login.png"), b"png").unwrap();
		std::fs::write(shots.join("login_1.png"), b"png").unwrap();

		let resolved = resolve_capture_path(&store, Path::new("login.png")).unwrap();
		assert!(resolved.ends_with("shots/login_2.png"));
	}

	#[test]
	fn absolute_paths_pass_through() {
		let tmp = TempDir::new().unwrap();
		let store = ContextStore::new();
		let absolute = tmp.path().join("explicit.png");
		assert_eq!(resolve_capture_path(&store, &absolute).unwrap(), absolute);
	}

	#[test]
	fn recorded_captures_append_in_order() {
		let store = ContextStore::new();
		ensure_screenshot_ledger(&store);
		record_capture(&store, Path::new("/tmp/a.png"));
		record_capture(&store, Path::new("/tmp/b.png"));

		let ledger = store.get(keys::SCREENSHOTS).unwrap();
		assert_eq!(ledger.as_paths().unwrap(), &[PathBuf::from("/tmp/a.png"), PathBuf::from("/tmp/b.png")]);
	}
}
