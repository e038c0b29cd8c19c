//! Wire types for the WebDriver/Appium automation protocol.
//!
//! This crate owns the request/response shapes exchanged with a remote
//! automation server and the classification of session-creation failures.
//! It performs no I/O; `herd-runtime` drives the actual HTTP exchange.

pub mod capabilities;
pub mod error_kind;
pub mod wire;

pub use capabilities::{Capabilities, NewSessionRequest};
pub use error_kind::SessionErrorKind;
pub use wire::{
	ErrorPayload, NewSessionPayload, StatusPayload, ValueEnvelope, WindowRect, decode_screenshot,
};
