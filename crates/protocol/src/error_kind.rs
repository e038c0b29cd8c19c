//! Classification of session-creation failures.

/// Recoverable-failure classification for driver session creation.
///
/// The mobile factory picks its recovery action from this enumeration
/// rather than matching raw error text at call sites. New recoverable
/// causes get a new variant here; call sites stay signature-free.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionErrorKind {
	/// On-device automation helper packages are stale or incompatible
	/// with the server that is trying to drive them. Recoverable by
	/// uninstalling the helper packages and retrying.
	StaleHelperPackage,
	/// The automation helper service is wedged or crashed. Recoverable
	/// by force-stopping the helper processes and retrying.
	HelperService,
}

/// Error-text signatures produced by servers talking to a stale helper
/// package install.
const STALE_HELPER_SIGNATURES: [&str; 3] = ["unknown command", "resource could not be found", "404"];

impl SessionErrorKind {
	/// Classifies a creation failure from its wire-level error text.
	pub fn classify(message: &str) -> Self {
		let lower = message.to_ascii_lowercase();
		if STALE_HELPER_SIGNATURES.iter().any(|sig| lower.contains(sig)) {
			SessionErrorKind::StaleHelperPackage
		} else {
			SessionErrorKind::HelperService
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn stale_helper_signatures_classify() {
		for text in [
			"Unknown command: POST /session",
			"The requested resource could not be found, or a request was received using an HTTP method that is not supported",
			"webdriver request failed: http 404",
		] {
			assert_eq!(SessionErrorKind::classify(text), SessionErrorKind::StaleHelperPackage);
		}
	}

	#[test]
	fn everything_else_is_a_helper_service_failure() {
		assert_eq!(
			SessionErrorKind::classify("An unknown server-side error occurred while processing the command"),
			SessionErrorKind::HelperService
		);
		assert_eq!(SessionErrorKind::classify("connection reset by peer"), SessionErrorKind::HelperService);
	}
}
