//! Thread-keyed ambient context store.
//!
//! Every execution thread gets its own key/value slot, keyed by
//! [`std::thread::ThreadId`]. Values set by one thread are never visible
//! to another, which is what lets concurrently running suites hold their
//! own platform, device id, report handle, and screenshot ledger without
//! coordination. Slots are dropped explicitly via
//! [`ContextStore::clear_current_thread`]; there is no other teardown.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::LazyLock;
use std::thread::ThreadId;

use parking_lot::RwLock;

use crate::report::ReportHandle;

/// Well-known context keys.
pub mod keys {
	/// Active platform tag (`android`, `chrome`, `firefox`).
	pub const PLATFORM: &str = "platform";
	/// Active device identifier for mobile sessions.
	pub const DEVICE_ID: &str = "device_id";
	/// Active report handle; owns the screenshots directory.
	pub const REPORT: &str = "report";
	/// Ordered list of absolute screenshot paths captured on this thread.
	pub const SCREENSHOTS: &str = "screenshots";
}

/// Value stored in a thread's context slot.
#[derive(Clone, Debug, PartialEq)]
pub enum ContextValue {
	Text(String),
	Paths(Vec<PathBuf>),
	Report(ReportHandle),
}

impl ContextValue {
	pub fn as_text(&self) -> Option<&str> {
		match self {
			ContextValue::Text(text) => Some(text),
			_ => None,
		}
	}

	pub fn as_paths(&self) -> Option<&[PathBuf]> {
		match self {
			ContextValue::Paths(paths) => Some(paths),
			_ => None,
		}
	}

	pub fn as_report(&self) -> Option<&ReportHandle> {
		match self {
			ContextValue::Report(report) => Some(report),
			_ => None,
		}
	}
}

/// Process-wide map of per-thread context slots.
#[derive(Debug, Default)]
pub struct ContextStore {
	slots: RwLock<HashMap<ThreadId, HashMap<String, ContextValue>>>,
}

impl ContextStore {
	pub fn new() -> Self {
		Self::default()
	}

	/// Returns the calling thread's value for `key`, or `None` when the
	/// key was never set on this thread. Never fails.
	pub fn get(&self, key: &str) -> Option<ContextValue> {
		let slots = self.slots.read();
		slots.get(&std::thread::current().id()).and_then(|slot| slot.get(key)).cloned()
	}

	/// Returns the calling thread's value for `key`, or `default`.
	pub fn get_or(&self, key: &str, default: ContextValue) -> ContextValue {
		self.get(key).unwrap_or(default)
	}

	/// Convenience accessor for text-valued keys.
	pub fn get_text(&self, key: &str) -> Option<String> {
		self.get(key).and_then(|value| value.as_text().map(String::from))
	}

	/// Stores `value` into the calling thread's slot only.
	pub fn set(&self, key: impl Into<String>, value: ContextValue) {
		let mut slots = self.slots.write();
		slots.entry(std::thread::current().id()).or_default().insert(key.into(), value);
	}

	/// Removes `key` from the calling thread's slot.
	pub fn unset(&self, key: &str) {
		let mut slots = self.slots.write();
		if let Some(slot) = slots.get_mut(&std::thread::current().id()) {
			slot.remove(key);
		}
	}

	/// Drops the calling thread's entire slot.
	pub fn clear_current_thread(&self) {
		let mut slots = self.slots.write();
		slots.remove(&std::thread::current().id());
	}
}

static STORE: LazyLock<ContextStore> = LazyLock::new(ContextStore::new);

/// The process-wide context store.
pub fn context() -> &'static ContextStore {
	&STORE
}
