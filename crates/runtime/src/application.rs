//! Application error capability.
//!
//! Every error that crosses the wire as a WAMP ERROR message is a
//! [`WampError`]: user-defined error types implement it (and [`FromPayload`]
//! to be rebuilt from an incoming ERROR), and [`ApplicationError`] is the
//! generic fallback that can represent any URI with any payload.

use std::fmt;

use downcast_rs::{DowncastSync, impl_downcast};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use thiserror::Error;
use wamp_protocol::{Payload, UriPattern};

/// Error URI used when a raised error has no mapping.
pub const RUNTIME_ERROR_URI: &str = "wamp.error.runtime_error";

/// An error that can be carried by a WAMP ERROR message.
///
/// The payload accessors default to empty, so an error type only overrides
/// what it actually carries.
pub trait WampError: DowncastSync + fmt::Debug + fmt::Display + 'static {
	/// Positional payload of this error.
	fn args(&self) -> Vec<Value> {
		Vec::new()
	}

	/// Keyword payload of this error.
	fn kwargs(&self) -> Map<String, Value> {
		Map::new()
	}

	fn payload(&self) -> Payload {
		Payload {
			args: self.args(),
			kwargs: self.kwargs(),
		}
	}
}

impl_downcast!(sync WampError);

/// An error type that can be rebuilt from the payload of an ERROR message.
pub trait FromPayload: WampError + Sized {
	/// URI patterns this type declares for itself.
	///
	/// Types that return `Some` must be defined without an explicit URI;
	/// types that return `None` must be given one.
	fn declared_uris() -> Option<Vec<UriPattern>> {
		None
	}

	/// Rebuilds the error from a wire payload.
	fn from_payload(payload: &Payload) -> Result<Self, PayloadError>;
}

/// A wire payload did not fit the error type it was mapped to.
#[derive(Debug, Error)]
#[error("payload does not fit {expected}: {reason}")]
pub struct PayloadError {
	pub expected: &'static str,
	pub reason: String,
}

impl PayloadError {
	pub fn new(expected: &'static str, reason: impl Into<String>) -> Self {
		Self {
			expected,
			reason: reason.into(),
		}
	}
}

/// Decodes positional arguments into `T` (typically a tuple or tuple struct).
pub fn decode_args<T: DeserializeOwned>(args: &[Value]) -> Result<T, PayloadError> {
	serde_json::from_value(Value::Array(args.to_vec()))
		.map_err(|e| PayloadError::new(std::any::type_name::<T>(), e.to_string()))
}

/// Generic application error: an error URI with its payload, verbatim.
#[derive(Debug, Clone, PartialEq)]
pub struct ApplicationError {
	uri: String,
	args: Vec<Value>,
	kwargs: Map<String, Value>,
}

impl ApplicationError {
	pub fn new(uri: impl Into<String>, payload: Payload) -> Self {
		Self {
			uri: uri.into(),
			args: payload.args,
			kwargs: payload.kwargs,
		}
	}

	/// Creates an error carrying a single human-readable message.
	pub fn with_message(uri: impl Into<String>, message: impl Into<String>) -> Self {
		Self::new(uri, Payload::new().arg(message.into()))
	}

	pub fn uri(&self) -> &str {
		&self.uri
	}
}

impl fmt::Display for ApplicationError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.uri)?;
		match self.args.first() {
			Some(Value::String(message)) if self.args.len() == 1 => write!(f, ": {message}"),
			Some(_) => write!(f, ": {}", Value::Array(self.args.clone())),
			None => Ok(()),
		}
	}
}

impl std::error::Error for ApplicationError {}

impl WampError for ApplicationError {
	fn args(&self) -> Vec<Value> {
		self.args.clone()
	}

	fn kwargs(&self) -> Map<String, Value> {
		self.kwargs.clone()
	}
}

/// A boxed [`WampError`] raised by a procedure handler.
///
/// Any `WampError` converts into it, so handlers can use `?` on their own
/// error types.
pub struct RaisedError(Box<dyn WampError>);

impl RaisedError {
	pub fn new(error: Box<dyn WampError>) -> Self {
		Self(error)
	}

	pub fn as_error(&self) -> &dyn WampError {
		self.0.as_ref()
	}

	pub fn into_inner(self) -> Box<dyn WampError> {
		self.0
	}
}

impl<E: WampError> From<E> for RaisedError {
	fn from(error: E) -> Self {
		Self(Box::new(error))
	}
}

impl fmt::Debug for RaisedError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		fmt::Debug::fmt(&self.0, f)
	}
}

impl fmt::Display for RaisedError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		fmt::Display::fmt(&self.0, f)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	#[derive(Debug)]
	struct OutOfRange(i64, i64);

	impl fmt::Display for OutOfRange {
		fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
			write!(f, "{} out of range {}", self.0, self.1)
		}
	}

	impl WampError for OutOfRange {
		fn args(&self) -> Vec<Value> {
			vec![json!(self.0), json!(self.1)]
		}
	}

	impl FromPayload for OutOfRange {
		fn from_payload(payload: &Payload) -> Result<Self, PayloadError> {
			let (value, limit) = decode_args::<(i64, i64)>(&payload.args)?;
			Ok(Self(value, limit))
		}
	}

	#[test]
	fn test_decode_args_tuple() {
		let (a, b): (i64, String) = decode_args(&[json!(1), json!("x")]).unwrap();
		assert_eq!(a, 1);
		assert_eq!(b, "x");
	}

	#[test]
	fn test_decode_args_arity_mismatch() {
		let result = decode_args::<(i64, i64)>(&[json!(1)]);
		assert!(result.is_err());
	}

	#[test]
	fn test_from_payload_roundtrip() {
		let original = OutOfRange(12, 10);
		let rebuilt = OutOfRange::from_payload(&original.payload()).unwrap();
		assert_eq!(rebuilt.0, 12);
		assert_eq!(rebuilt.1, 10);
	}

	#[test]
	fn test_raised_error_downcast() {
		let raised: RaisedError = OutOfRange(1, 0).into();
		assert!(raised.as_error().is::<OutOfRange>());
		assert_eq!(raised.to_string(), "1 out of range 0");
	}

	#[test]
	fn test_application_error_display() {
		let plain = ApplicationError::new("com.example.empty", Payload::new());
		assert_eq!(plain.to_string(), "com.example.empty");

		let message = ApplicationError::with_message("com.example.failed", "boom");
		assert_eq!(message.to_string(), "com.example.failed: boom");

		let positional =
			ApplicationError::new("com.example.args", Payload::from_args([json!(1), json!(2)]));
		assert_eq!(positional.to_string(), "com.example.args: [1,2]");
	}
}
