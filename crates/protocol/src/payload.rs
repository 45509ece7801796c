//! Positional and keyword application payload.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Application payload attached to PUBLISH, EVENT, CALL, RESULT, INVOCATION,
/// YIELD and ERROR.
///
/// Empty `args`/`kwargs` mean "absent" and are omitted when serialized.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Payload {
	/// Positional arguments.
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub args: Vec<Value>,
	/// Keyword arguments.
	#[serde(default, skip_serializing_if = "Map::is_empty")]
	pub kwargs: Map<String, Value>,
}

impl Payload {
	/// Creates an empty payload.
	pub fn new() -> Self {
		Self::default()
	}

	/// Creates a payload carrying only positional arguments.
	pub fn from_args(args: impl IntoIterator<Item = Value>) -> Self {
		Self {
			args: args.into_iter().collect(),
			kwargs: Map::new(),
		}
	}

	/// Appends a positional argument.
	pub fn arg(mut self, value: impl Into<Value>) -> Self {
		self.args.push(value.into());
		self
	}

	/// Sets a keyword argument.
	pub fn kwarg(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
		self.kwargs.insert(key.into(), value.into());
		self
	}

	/// Returns true if neither positional nor keyword arguments are present.
	pub fn is_empty(&self) -> bool {
		self.args.is_empty() && self.kwargs.is_empty()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	#[test]
	fn test_empty_payload_serializes_to_empty_object() {
		let value = serde_json::to_value(Payload::new()).unwrap();
		assert_eq!(value, json!({}));
	}

	#[test]
	fn test_builder_collects_args_and_kwargs() {
		let payload = Payload::new().arg(1).arg("two").kwarg("three", 3);
		assert_eq!(payload.args, vec![json!(1), json!("two")]);
		assert_eq!(payload.kwargs["three"], json!(3));
		assert!(!payload.is_empty());
	}

	#[test]
	fn test_missing_fields_default_to_empty() {
		let payload: Payload = serde_json::from_str(r#"{"args": [true]}"#).unwrap();
		assert_eq!(payload.args, vec![json!(true)]);
		assert!(payload.kwargs.is_empty());
	}
}
