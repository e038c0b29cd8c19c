use std::path::{Path, PathBuf};

/// Handle to the active report for this thread's run.
///
/// The orchestrator does not render reports; the handle exists so driver
/// sessions know where captured screenshots belong.
#[derive(Clone, Debug, PartialEq)]
pub struct ReportHandle {
	screenshots_dir: PathBuf,
}

impl ReportHandle {
	pub fn new(screenshots_dir: impl Into<PathBuf>) -> Self {
		Self { screenshots_dir: screenshots_dir.into() }
	}

	pub fn screenshots_dir(&self) -> &Path {
		&self.screenshots_dir
	}
}
