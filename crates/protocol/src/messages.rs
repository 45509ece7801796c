//! WAMP message structs and the [`Message`] sum type.
//!
//! Only the messages a peer exchanges during an established session carry
//! request correlation. HELLO, WELCOME, ABORT and GOODBYE belong to session
//! establishment and are modelled so that the session engine can decline them.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::Id;
use crate::options::{
	CallOptions, EventDetails, InvocationDetails, PublishOptions, RegisterOptions,
	SubscribeOptions,
};
use crate::payload::Payload;

/// WAMP message type with its protocol code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
	Hello,
	Welcome,
	Abort,
	Goodbye,
	Error,
	Publish,
	Published,
	Subscribe,
	Subscribed,
	Unsubscribe,
	Unsubscribed,
	Event,
	Call,
	Result,
	Register,
	Registered,
	Unregister,
	Unregistered,
	Invocation,
	Yield,
}

impl MessageKind {
	/// Returns the numeric message type from the WAMP basic profile.
	pub fn code(self) -> u8 {
		match self {
			MessageKind::Hello => 1,
			MessageKind::Welcome => 2,
			MessageKind::Abort => 3,
			MessageKind::Goodbye => 6,
			MessageKind::Error => 8,
			MessageKind::Publish => 16,
			MessageKind::Published => 17,
			MessageKind::Subscribe => 32,
			MessageKind::Subscribed => 33,
			MessageKind::Unsubscribe => 34,
			MessageKind::Unsubscribed => 35,
			MessageKind::Event => 36,
			MessageKind::Call => 48,
			MessageKind::Result => 50,
			MessageKind::Register => 64,
			MessageKind::Registered => 65,
			MessageKind::Unregister => 66,
			MessageKind::Unregistered => 67,
			MessageKind::Invocation => 68,
			MessageKind::Yield => 70,
		}
	}

	/// Upper-case protocol name, as used in logs and protocol errors.
	pub fn name(self) -> &'static str {
		match self {
			MessageKind::Hello => "HELLO",
			MessageKind::Welcome => "WELCOME",
			MessageKind::Abort => "ABORT",
			MessageKind::Goodbye => "GOODBYE",
			MessageKind::Error => "ERROR",
			MessageKind::Publish => "PUBLISH",
			MessageKind::Published => "PUBLISHED",
			MessageKind::Subscribe => "SUBSCRIBE",
			MessageKind::Subscribed => "SUBSCRIBED",
			MessageKind::Unsubscribe => "UNSUBSCRIBE",
			MessageKind::Unsubscribed => "UNSUBSCRIBED",
			MessageKind::Event => "EVENT",
			MessageKind::Call => "CALL",
			MessageKind::Result => "RESULT",
			MessageKind::Register => "REGISTER",
			MessageKind::Registered => "REGISTERED",
			MessageKind::Unregister => "UNREGISTER",
			MessageKind::Unregistered => "UNREGISTERED",
			MessageKind::Invocation => "INVOCATION",
			MessageKind::Yield => "YIELD",
		}
	}
}

impl std::fmt::Display for MessageKind {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(self.name())
	}
}

/// HELLO: opens a session on a realm.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hello {
	pub realm: String,
	#[serde(default)]
	pub details: Map<String, Value>,
}

/// WELCOME: the router accepted the session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Welcome {
	pub session: Id,
	#[serde(default)]
	pub details: Map<String, Value>,
}

/// ABORT: session establishment was refused.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Abort {
	pub reason: String,
	#[serde(default)]
	pub details: Map<String, Value>,
}

/// GOODBYE: orderly session close.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Goodbye {
	pub reason: String,
	#[serde(default)]
	pub details: Map<String, Value>,
}

/// ERROR: a request failed. `error` is the error URI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorMessage {
	pub request: Id,
	#[serde(default)]
	pub details: Map<String, Value>,
	pub error: String,
	#[serde(flatten)]
	pub payload: Payload,
}

impl ErrorMessage {
	pub fn new(request: Id, error: impl Into<String>, payload: Payload) -> Self {
		Self {
			request,
			details: Map::new(),
			error: error.into(),
			payload,
		}
	}
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Publish {
	pub request: Id,
	#[serde(default)]
	pub options: PublishOptions,
	pub topic: String,
	#[serde(flatten)]
	pub payload: Payload,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Published {
	pub request: Id,
	pub publication: Id,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subscribe {
	pub request: Id,
	#[serde(default)]
	pub options: SubscribeOptions,
	pub topic: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subscribed {
	pub request: Id,
	pub subscription: Id,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Unsubscribe {
	pub request: Id,
	pub subscription: Id,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Unsubscribed {
	pub request: Id,
}

/// EVENT: a publication routed to one of our subscriptions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
	pub subscription: Id,
	pub publication: Id,
	#[serde(default)]
	pub details: EventDetails,
	#[serde(flatten)]
	pub payload: Payload,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Call {
	pub request: Id,
	#[serde(default)]
	pub options: CallOptions,
	pub procedure: String,
	#[serde(flatten)]
	pub payload: Payload,
}

/// RESULT: the outcome of one of our calls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallResult {
	pub request: Id,
	#[serde(default)]
	pub details: Map<String, Value>,
	#[serde(flatten)]
	pub payload: Payload,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Register {
	pub request: Id,
	#[serde(default)]
	pub options: RegisterOptions,
	pub procedure: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Registered {
	pub request: Id,
	pub registration: Id,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Unregister {
	pub request: Id,
	pub registration: Id,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Unregistered {
	pub request: Id,
}

/// INVOCATION: the router asks us to run one of our registered procedures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invocation {
	pub request: Id,
	pub registration: Id,
	#[serde(default)]
	pub details: InvocationDetails,
	#[serde(flatten)]
	pub payload: Payload,
}

/// YIELD: our answer to an INVOCATION.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Yield {
	pub request: Id,
	#[serde(default)]
	pub options: Map<String, Value>,
	#[serde(flatten)]
	pub payload: Payload,
}

/// Discriminated union of WAMP messages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Message {
	Hello(Hello),
	Welcome(Welcome),
	Abort(Abort),
	Goodbye(Goodbye),
	Error(ErrorMessage),
	Publish(Publish),
	Published(Published),
	Subscribe(Subscribe),
	Subscribed(Subscribed),
	Unsubscribe(Unsubscribe),
	Unsubscribed(Unsubscribed),
	Event(Event),
	Call(Call),
	Result(CallResult),
	Register(Register),
	Registered(Registered),
	Unregister(Unregister),
	Unregistered(Unregistered),
	Invocation(Invocation),
	Yield(Yield),
}

impl Message {
	pub fn kind(&self) -> MessageKind {
		match self {
			Message::Hello(_) => MessageKind::Hello,
			Message::Welcome(_) => MessageKind::Welcome,
			Message::Abort(_) => MessageKind::Abort,
			Message::Goodbye(_) => MessageKind::Goodbye,
			Message::Error(_) => MessageKind::Error,
			Message::Publish(_) => MessageKind::Publish,
			Message::Published(_) => MessageKind::Published,
			Message::Subscribe(_) => MessageKind::Subscribe,
			Message::Subscribed(_) => MessageKind::Subscribed,
			Message::Unsubscribe(_) => MessageKind::Unsubscribe,
			Message::Unsubscribed(_) => MessageKind::Unsubscribed,
			Message::Event(_) => MessageKind::Event,
			Message::Call(_) => MessageKind::Call,
			Message::Result(_) => MessageKind::Result,
			Message::Register(_) => MessageKind::Register,
			Message::Registered(_) => MessageKind::Registered,
			Message::Unregister(_) => MessageKind::Unregister,
			Message::Unregistered(_) => MessageKind::Unregistered,
			Message::Invocation(_) => MessageKind::Invocation,
			Message::Yield(_) => MessageKind::Yield,
		}
	}

	/// Returns the request id this message carries, if its kind has one.
	pub fn request_id(&self) -> Option<Id> {
		match self {
			Message::Error(m) => Some(m.request),
			Message::Publish(m) => Some(m.request),
			Message::Published(m) => Some(m.request),
			Message::Subscribe(m) => Some(m.request),
			Message::Subscribed(m) => Some(m.request),
			Message::Unsubscribe(m) => Some(m.request),
			Message::Unsubscribed(m) => Some(m.request),
			Message::Call(m) => Some(m.request),
			Message::Result(m) => Some(m.request),
			Message::Register(m) => Some(m.request),
			Message::Registered(m) => Some(m.request),
			Message::Unregister(m) => Some(m.request),
			Message::Unregistered(m) => Some(m.request),
			Message::Invocation(m) => Some(m.request),
			Message::Yield(m) => Some(m.request),
			Message::Hello(_)
			| Message::Welcome(_)
			| Message::Abort(_)
			| Message::Goodbye(_)
			| Message::Event(_) => None,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	#[test]
	fn test_kind_codes() {
		assert_eq!(MessageKind::Error.code(), 8);
		assert_eq!(MessageKind::Published.code(), 17);
		assert_eq!(MessageKind::Unsubscribed.code(), 35);
		assert_eq!(MessageKind::Result.code(), 50);
		assert_eq!(MessageKind::Yield.code(), 70);
	}

	#[test]
	fn test_message_deserialization_error() {
		let json = r#"{"type": "error", "request": 42, "error": "com.example.foo", "args": [1, 2]}"#;
		let message: Message = serde_json::from_str(json).unwrap();

		match message {
			Message::Error(error) => {
				assert_eq!(error.request, 42);
				assert_eq!(error.error, "com.example.foo");
				assert_eq!(error.payload.args, vec![json!(1), json!(2)]);
				assert!(error.payload.kwargs.is_empty());
				assert!(error.details.is_empty());
			}
			other => panic!("Expected Error, got {:?}", other),
		}
	}

	#[test]
	fn test_publish_serialization_flattens_payload() {
		let message = Message::Publish(Publish {
			request: 1,
			options: PublishOptions::new().acknowledge(true),
			topic: "com.example.topic".to_string(),
			payload: Payload::new().arg("hello").kwarg("n", 3),
		});

		let value = serde_json::to_value(&message).unwrap();
		assert_eq!(value["type"], "publish");
		assert_eq!(value["options"]["acknowledge"], true);
		assert_eq!(value["args"], json!(["hello"]));
		assert_eq!(value["kwargs"], json!({"n": 3}));
	}

	#[test]
	fn test_request_id() {
		let published = Message::Published(Published {
			request: 9,
			publication: 100,
		});
		assert_eq!(published.request_id(), Some(9));
		assert_eq!(published.kind(), MessageKind::Published);

		let event = Message::Event(Event {
			subscription: 1,
			publication: 2,
			details: EventDetails::default(),
			payload: Payload::new(),
		});
		assert_eq!(event.request_id(), None);
	}
}
