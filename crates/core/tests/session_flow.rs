//! End-to-end session flows over the in-memory transport.
//!
//! Each test plays the router by hand: it reads what the session sent from the
//! transport's receiver and feeds replies into the stream `Session::run`
//! dispatches.

use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value, json};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use wamp::{
	ApplicationError, CallOptions, Error, Event, EventDetails, FromPayload, Id, Invocation,
	InvocationDetails, MemoryTransport, Message, Payload, PayloadError, PublishOptions,
	RaisedError, RegisterOptions, Result, Session, SessionConfig, SubscribeOptions, WampError,
	decode_args, event_handler, invocation_handler,
};
use wamp_protocol::{CallResult, ErrorMessage, Published, Registered, Subscribed};

struct Harness {
	session: Arc<Session>,
	/// Messages the session sent to the router.
	sent: mpsc::UnboundedReceiver<Message>,
	/// Messages the router delivers to the session.
	deliver: mpsc::UnboundedSender<Message>,
	runner: JoinHandle<Result<()>>,
}

impl Harness {
	async fn start() -> Self {
		let session = Arc::new(Session::new(SessionConfig::default()));
		let (transport, sent) = MemoryTransport::pair();
		let (deliver, incoming) = mpsc::unbounded_channel();

		let runner = {
			let session = Arc::clone(&session);
			tokio::spawn(async move { session.run(Arc::new(transport), incoming).await })
		};
		while !session.is_open() {
			tokio::task::yield_now().await;
		}

		Self {
			session,
			sent,
			deliver,
			runner,
		}
	}

	async fn next_sent(&mut self) -> Message {
		self.sent.recv().await.unwrap()
	}

	fn reply(&self, message: Message) {
		self.deliver.send(message).unwrap();
	}
}

#[derive(Debug, PartialEq)]
struct InsufficientFunds {
	balance: i64,
	requested: i64,
}

impl fmt::Display for InsufficientFunds {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "balance {} is below {}", self.balance, self.requested)
	}
}

impl WampError for InsufficientFunds {
	fn args(&self) -> Vec<Value> {
		vec![json!(self.balance), json!(self.requested)]
	}
}

impl FromPayload for InsufficientFunds {
	fn from_payload(payload: &Payload) -> std::result::Result<Self, PayloadError> {
		let (balance, requested) = decode_args::<(i64, i64)>(&payload.args)?;
		Ok(Self { balance, requested })
	}
}

#[tokio::test]
async fn test_replies_resolve_out_of_order() {
	let mut harness = Harness::start().await;

	let publish = harness
		.session
		.publish(
			"com.example.news",
			Payload::new().arg("hello"),
			PublishOptions::new().acknowledge(true),
		)
		.await
		.unwrap();
	let subscribe = harness
		.session
		.subscribe("com.example.news", SubscribeOptions::new(), event_handler(|_| async {}))
		.await
		.unwrap();
	let call = harness
		.session
		.call("com.example.add", Payload::new().arg(2).arg(3), CallOptions::new())
		.await
		.unwrap();

	let mut requests = Vec::new();
	for _ in 0..3 {
		requests.push(harness.next_sent().await);
	}
	assert_eq!(harness.session.pending_requests(), 3);

	for message in requests.into_iter().rev() {
		let reply = match message {
			Message::Publish(m) => Message::Published(Published {
				request: m.request,
				publication: 1001,
			}),
			Message::Subscribe(m) => Message::Subscribed(Subscribed {
				request: m.request,
				subscription: 2002,
			}),
			Message::Call(m) => Message::Result(CallResult {
				request: m.request,
				details: Map::new(),
				payload: Payload::new().arg(5),
			}),
			other => panic!("unexpected {}", other.kind()),
		};
		harness.reply(reply);
	}

	assert_eq!(call.await.unwrap().args, vec![json!(5)]);
	assert_eq!(subscribe.await.unwrap(), 2002);
	assert_eq!(publish.await.unwrap(), 1001);
	assert!(harness.session.has_subscription(2002));
	assert_eq!(harness.session.pending_requests(), 0);
}

#[tokio::test]
async fn test_events_reach_subscription_in_order() {
	let mut harness = Harness::start().await;
	let (seen_tx, mut seen_rx) = mpsc::unbounded_channel();
	let handler = event_handler(move |event: Event| {
		let seen_tx = seen_tx.clone();
		async move {
			let _ = seen_tx.send(event.publication);
		}
	});

	let pending = harness
		.session
		.subscribe("com.example.ticks", SubscribeOptions::new(), handler)
		.await
		.unwrap();
	let Message::Subscribe(subscribe) = harness.next_sent().await else {
		panic!("expected SUBSCRIBE");
	};
	harness.reply(Message::Subscribed(Subscribed {
		request: subscribe.request,
		subscription: 12,
	}));
	let subscription: Id = pending.await.unwrap();

	for publication in 1..=3 {
		harness.reply(Message::Event(Event {
			subscription,
			publication,
			details: EventDetails::default(),
			payload: Payload::new(),
		}));
	}

	for expected in 1..=3 {
		assert_eq!(seen_rx.recv().await, Some(expected));
	}
}

#[tokio::test]
async fn test_remote_error_rebuilds_mapped_type() {
	let mut harness = Harness::start().await;
	harness
		.session
		.define::<InsufficientFunds>(Some("com.example.insufficient_funds"))
		.unwrap();

	let pending = harness
		.session
		.call("com.example.withdraw", Payload::new().arg(100), CallOptions::new())
		.await
		.unwrap();
	let Message::Call(call) = harness.next_sent().await else {
		panic!("expected CALL");
	};

	harness.reply(Message::Error(ErrorMessage::new(
		call.request,
		"com.example.insufficient_funds",
		Payload::new().arg(40).arg(100),
	)));

	let error = pending.await.unwrap_err();
	assert_eq!(
		error.downcast_remote::<InsufficientFunds>(),
		Some(&InsufficientFunds {
			balance: 40,
			requested: 100,
		})
	);
	assert!(harness.session.is_open());
}

#[tokio::test]
async fn test_procedure_can_call_back_into_session() {
	let mut harness = Harness::start().await;

	let session = Arc::clone(&harness.session);
	let handler = invocation_handler(move |invocation: Invocation| {
		let session = Arc::clone(&session);
		async move {
			let lookup = async move {
				session
					.call("com.example.lookup", invocation.payload, CallOptions::new())
					.await?
					.await
			};
			match lookup.await {
				Ok(found) => Ok(Payload::new().arg(format!("looked up {}", found.args[0]))),
				Err(e) => Err(RaisedError::from(ApplicationError::with_message(
					"com.example.failed",
					e.to_string(),
				))),
			}
		}
	});

	let pending = harness
		.session
		.register("com.example.describe", RegisterOptions::new(), handler)
		.await
		.unwrap();
	let Message::Register(register) = harness.next_sent().await else {
		panic!("expected REGISTER");
	};
	harness.reply(Message::Registered(Registered {
		request: register.request,
		registration: 77,
	}));
	let registration = pending.await.unwrap();

	harness.reply(Message::Invocation(Invocation {
		request: 5000,
		registration,
		details: InvocationDetails::default(),
		payload: Payload::new().arg("key"),
	}));

	// The procedure's own CALL goes out while its INVOCATION is still open
	let Message::Call(call) = harness.next_sent().await else {
		panic!("expected CALL");
	};
	assert_eq!(call.procedure, "com.example.lookup");
	harness.reply(Message::Result(CallResult {
		request: call.request,
		details: Map::new(),
		payload: Payload::new().arg("value"),
	}));

	let Message::Yield(reply) = harness.next_sent().await else {
		panic!("expected YIELD");
	};
	assert_eq!(reply.request, 5000);
	assert_eq!(reply.payload.args, vec![json!("looked up \"value\"")]);
}

#[tokio::test]
async fn test_protocol_violation_ends_run() {
	let mut harness = Harness::start().await;
	let pending = harness
		.session
		.call("com.example.slow", Payload::new(), CallOptions::new())
		.await
		.unwrap();
	harness.next_sent().await;

	harness.reply(Message::Published(Published {
		request: 999_999,
		publication: 1,
	}));

	let result = harness.runner.await.unwrap();
	assert!(matches!(result, Err(Error::ProtocolViolation(_))));
	assert!(matches!(pending.await, Err(Error::TransportLost)));
	assert!(!harness.session.is_open());
}

#[tokio::test]
async fn test_stream_end_closes_session() {
	let mut harness = Harness::start().await;
	let pending = harness
		.session
		.call("com.example.slow", Payload::new(), CallOptions::new())
		.await
		.unwrap();
	harness.next_sent().await;

	let Harness {
		session,
		deliver,
		runner,
		..
	} = harness;
	drop(deliver);

	runner.await.unwrap().unwrap();
	assert!(matches!(pending.await, Err(Error::TransportLost)));

	let after = session
		.publish("com.example.news", Payload::new(), PublishOptions::new())
		.await;
	assert!(matches!(after, Err(Error::NotConnected)));
}

#[tokio::test]
async fn test_panicking_subscriber_does_not_stall_session() {
	let mut harness = Harness::start().await;
	let handler = event_handler(|event: Event| async move {
		if event.publication > 0 {
			panic!("subscriber gave up");
		}
	});

	let pending = harness
		.session
		.subscribe("com.example.alerts", SubscribeOptions::new(), handler)
		.await
		.unwrap();
	let Message::Subscribe(subscribe) = harness.next_sent().await else {
		panic!("expected SUBSCRIBE");
	};
	harness.reply(Message::Subscribed(Subscribed {
		request: subscribe.request,
		subscription: 31,
	}));
	pending.await.unwrap();

	let call = harness
		.session
		.call("com.example.slow", Payload::new(), CallOptions::new())
		.await
		.unwrap();
	let Message::Call(sent) = harness.next_sent().await else {
		panic!("expected CALL");
	};

	harness.reply(Message::Event(Event {
		subscription: 31,
		publication: 1,
		details: EventDetails::default(),
		payload: Payload::new(),
	}));
	harness.reply(Message::Result(CallResult {
		request: sent.request,
		details: Map::new(),
		payload: Payload::new().arg("still here"),
	}));

	assert_eq!(call.await.unwrap().args, vec![json!("still here")]);
	assert!(harness.session.is_open());
	assert!(!harness.runner.is_finished());
}
