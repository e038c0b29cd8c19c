//! Shared mobile driver lifecycle for keyword-style callers.
//!
//! One process-wide session slot, guarded by a mutex for creation,
//! assignment, and teardown. Concurrent suites sharing this layer
//! serialize around driver lifecycle operations — a designed constraint.
//! Callers needing a true per-thread mobile session use
//! [`MobileFactory`] directly.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{info, warn};

use crate::config::Config;
use crate::error::Result;
use crate::session::mobile::{MobileFactory, MobileSession, MobileSessionOptions};

static SHARED_SESSION: Mutex<Option<MobileSession>> = Mutex::new(None);

/// Keyword-layer entry points over the shared mobile session.
pub struct Mobile;

impl Mobile {
	/// Runs `operation` against the shared session, creating it through
	/// the factory on first use. The slot stays locked for the duration
	/// of the operation.
	pub fn with_session<T>(config: &Arc<Config>, operation: impl FnOnce(&MobileSession) -> Result<T>) -> Result<T> {
		let mut slot = SHARED_SESSION.lock();
		if let Some(session) = slot.as_ref() {
			return operation(session);
		}

		let factory = MobileFactory::connect(Arc::clone(config))?;
		let session = factory.create_session(&MobileSessionOptions::default())?;
		info!(target: "herd.session", session = %session.session_id(), "shared mobile session created");
		let outcome = operation(&session);
		*slot = Some(session);
		outcome
	}

	/// Adopts an externally created session as the shared instance,
	/// replacing (without quitting) any previous one.
	pub fn adopt(session: MobileSession) {
		*SHARED_SESSION.lock() = Some(session);
	}

	pub fn is_alive() -> bool {
		SHARED_SESSION.lock().as_ref().is_some_and(MobileSession::is_alive)
	}

	/// Quits and clears the shared session for a clean state between
	/// test cases. The next keyword call creates a fresh session.
	pub fn reset() {
		Self::shutdown("reset");
	}

	/// Ends the shared session at the end of a run.
	pub fn quit() {
		Self::shutdown("quit");
	}

	fn shutdown(action: &str) {
		if let Some(session) = SHARED_SESSION.lock().take() {
			if let Err(err) = session.quit() {
				warn!(target: "herd.session", action, error = %err, "error quitting shared mobile session");
			}
		}
	}

	pub fn save_screenshot(config: &Arc<Config>, path: impl AsRef<Path>) -> Result<PathBuf> {
		Self::with_session(config, |session| session.save_screenshot(path.as_ref()))
	}

	pub fn orientation(config: &Arc<Config>) -> Result<String> {
		Self::with_session(config, MobileSession::orientation)
	}

	pub fn set_orientation(config: &Arc<Config>, orientation: &str) -> Result<()> {
		Self::with_session(config, |session| session.set_orientation(orientation))
	}

	pub fn press_back(config: &Arc<Config>) -> Result<()> {
		Self::with_session(config, MobileSession::press_back)
	}

	pub fn window_size(config: &Arc<Config>) -> Result<(u64, u64)> {
		Self::with_session(config, MobileSession::window_size)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn empty_slot_is_not_alive_and_shutdown_is_a_no_op() {
		assert!(!Mobile::is_alive());
		Mobile::reset();
		Mobile::quit();
		assert!(!Mobile::is_alive());
	}
}
