//! Option and detail dictionaries for WAMP messages.
//!
//! Options travel with requests from the peer to the router; details travel
//! with routed messages from the router to the peer. Unset fields are omitted
//! on the wire.

use serde::{Deserialize, Serialize};

use crate::Id;
use crate::uri::MatchPolicy;

/// Options for PUBLISH.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct PublishOptions {
	/// Ask the router to confirm the publication with PUBLISHED
	#[serde(skip_serializing_if = "Option::is_none")]
	pub acknowledge: Option<bool>,

	/// Exclude the publisher from receiving its own event
	#[serde(skip_serializing_if = "Option::is_none")]
	pub exclude_me: Option<bool>,

	/// Session ids excluded from receiving the event
	#[serde(skip_serializing_if = "Option::is_none")]
	pub exclude: Option<Vec<Id>>,

	/// Session ids eligible to receive the event
	#[serde(skip_serializing_if = "Option::is_none")]
	pub eligible: Option<Vec<Id>>,

	/// Disclose the publisher's session id to subscribers
	#[serde(skip_serializing_if = "Option::is_none")]
	pub disclose_me: Option<bool>,
}

impl PublishOptions {
	/// Creates new default options.
	pub fn new() -> Self {
		Self::default()
	}

	/// Sets the acknowledge flag.
	pub fn acknowledge(mut self, acknowledge: bool) -> Self {
		self.acknowledge = Some(acknowledge);
		self
	}

	/// Sets the exclude_me flag.
	pub fn exclude_me(mut self, exclude_me: bool) -> Self {
		self.exclude_me = Some(exclude_me);
		self
	}

	/// Sets the excluded session ids.
	pub fn exclude(mut self, sessions: Vec<Id>) -> Self {
		self.exclude = Some(sessions);
		self
	}

	/// Sets the eligible session ids.
	pub fn eligible(mut self, sessions: Vec<Id>) -> Self {
		self.eligible = Some(sessions);
		self
	}

	/// Sets the disclose_me flag.
	pub fn disclose_me(mut self, disclose_me: bool) -> Self {
		self.disclose_me = Some(disclose_me);
		self
	}
}

/// Options for SUBSCRIBE.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubscribeOptions {
	#[serde(rename = "match", skip_serializing_if = "Option::is_none")]
	pub match_policy: Option<MatchPolicy>,
}

impl SubscribeOptions {
	pub fn new() -> Self {
		Self::default()
	}

	/// Sets the topic match policy.
	pub fn match_policy(mut self, policy: MatchPolicy) -> Self {
		self.match_policy = Some(policy);
		self
	}
}

/// Options for CALL.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct CallOptions {
	/// Router-side call timeout in milliseconds
	#[serde(skip_serializing_if = "Option::is_none")]
	pub timeout: Option<u64>,

	/// Disclose the caller's session id to the callee
	#[serde(skip_serializing_if = "Option::is_none")]
	pub disclose_me: Option<bool>,

	/// Ask for progressive results
	#[serde(skip_serializing_if = "Option::is_none")]
	pub receive_progress: Option<bool>,
}

impl CallOptions {
	/// Creates new default options.
	pub fn new() -> Self {
		Self::default()
	}

	/// Sets the router-side timeout.
	pub fn timeout(mut self, timeout_ms: u64) -> Self {
		self.timeout = Some(timeout_ms);
		self
	}

	/// Sets the disclose_me flag.
	pub fn disclose_me(mut self, disclose_me: bool) -> Self {
		self.disclose_me = Some(disclose_me);
		self
	}

	/// Sets the receive_progress flag.
	pub fn receive_progress(mut self, receive_progress: bool) -> Self {
		self.receive_progress = Some(receive_progress);
		self
	}
}

/// Options for REGISTER.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RegisterOptions {
	#[serde(rename = "match", skip_serializing_if = "Option::is_none")]
	pub match_policy: Option<MatchPolicy>,

	/// Ask the router to disclose callers to this callee
	#[serde(skip_serializing_if = "Option::is_none")]
	pub disclose_caller: Option<bool>,
}

impl RegisterOptions {
	pub fn new() -> Self {
		Self::default()
	}

	/// Sets the procedure match policy.
	pub fn match_policy(mut self, policy: MatchPolicy) -> Self {
		self.match_policy = Some(policy);
		self
	}

	/// Sets the disclose_caller flag.
	pub fn disclose_caller(mut self, disclose_caller: bool) -> Self {
		self.disclose_caller = Some(disclose_caller);
		self
	}
}

/// Details attached to EVENT.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventDetails {
	/// Publisher session id, when disclosed
	#[serde(skip_serializing_if = "Option::is_none")]
	pub publisher: Option<Id>,

	/// Concrete topic, for pattern-based subscriptions
	#[serde(skip_serializing_if = "Option::is_none")]
	pub topic: Option<String>,
}

/// Details attached to INVOCATION.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InvocationDetails {
	/// Caller session id, when disclosed
	#[serde(skip_serializing_if = "Option::is_none")]
	pub caller: Option<Id>,

	/// Concrete procedure, for pattern-based registrations
	#[serde(skip_serializing_if = "Option::is_none")]
	pub procedure: Option<String>,

	/// Caller asked for progressive results
	#[serde(skip_serializing_if = "Option::is_none")]
	pub receive_progress: Option<bool>,
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	#[test]
	fn test_publish_options_skip_unset_fields() {
		let options = PublishOptions::new().acknowledge(true).exclude(vec![7]);
		let value = serde_json::to_value(&options).unwrap();
		assert_eq!(value, json!({"acknowledge": true, "exclude": [7]}));
	}

	#[test]
	fn test_subscribe_options_use_match_key() {
		let options = SubscribeOptions::new().match_policy(MatchPolicy::Prefix);
		let value = serde_json::to_value(&options).unwrap();
		assert_eq!(value, json!({"match": "prefix"}));
	}

	#[test]
	fn test_call_options_builder() {
		let options = CallOptions::new().timeout(500).receive_progress(true);
		assert_eq!(options.timeout, Some(500));
		assert_eq!(options.receive_progress, Some(true));
		assert_eq!(options.disclose_me, None);
	}
}
