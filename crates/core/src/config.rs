//! Session engine configuration.

use serde::{Deserialize, Serialize};
use wamp_runtime::Result;

/// Behavior switches for a [`Session`](crate::Session).
///
/// Every field defaults to `true`; a JSON document only needs to name the
/// switches it turns off.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
	/// Reject every pending request with `Error::TransportLost` when the
	/// transport closes, instead of leaving callers waiting.
	pub reject_pending_on_close: bool,

	/// Drop active subscriptions and registrations when the transport closes.
	pub clear_state_on_close: bool,

	/// Treat EVENT/INVOCATION for an unknown subscription/registration as a
	/// protocol violation, unless an UNSUBSCRIBE/UNREGISTER for it is in flight.
	pub strict_event_dispatch: bool,
}

impl Default for SessionConfig {
	fn default() -> Self {
		Self {
			reject_pending_on_close: true,
			clear_state_on_close: true,
			strict_event_dispatch: true,
		}
	}
}

impl SessionConfig {
	pub fn new() -> Self {
		Self::default()
	}

	/// Parses a configuration from JSON, filling missing fields with defaults.
	pub fn from_json_str(json: &str) -> Result<Self> {
		Ok(serde_json::from_str(json)?)
	}

	pub fn reject_pending_on_close(mut self, enabled: bool) -> Self {
		self.reject_pending_on_close = enabled;
		self
	}

	pub fn clear_state_on_close(mut self, enabled: bool) -> Self {
		self.clear_state_on_close = enabled;
		self
	}

	pub fn strict_event_dispatch(mut self, enabled: bool) -> Self {
		self.strict_event_dispatch = enabled;
		self
	}
}
