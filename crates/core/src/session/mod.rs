//! WAMP session protocol engine.
//!
//! Correlates outbound requests with their replies and routes EVENT and
//! INVOCATION messages to the handlers of active subscriptions and
//! registrations.
//!
//! # Request Flow
//!
//! 1. Caller invokes an operation such as [`Session::call`]
//! 2. Session allocates a request id and records a completion in the ledger
//! 3. Request is sent through the attached [`Transport`]
//! 4. Caller awaits the returned [`Pending`]
//! 5. Transport delivers the reply to [`Session::on_message`]
//! 6. Reply is correlated by request id and the completion is resolved
//!
//! A request is resolved exactly once: the success reply, the ERROR reply,
//! [`Session::cancel`] and [`Session::on_close`] all go through
//! [`RequestLedger::take`], and only the path that takes the entry resolves it.
//!
//! # Locking
//!
//! Ledger and state share one mutex, held only for the table operations of a
//! single dispatch or operation. It is never held across a transport send or a
//! handler call.

mod pending;

use std::any::Any;
use std::collections::HashSet;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_util::FutureExt;
use parking_lot::{Mutex, RwLock};
use serde_json::{Map, Value};
use tokio::sync::{mpsc, oneshot};
use wamp_protocol::{
	Call, CallOptions, ErrorMessage, Event, Id, Invocation, MAX_ID, Message, Payload, Publish,
	PublishOptions, Register, RegisterOptions, Subscribe, SubscribeOptions, Unregister,
	Unsubscribe, Yield, is_valid_uri,
};
use wamp_runtime::{Error, FromPayload, RUNTIME_ERROR_URI, Result, Transport};

pub use self::pending::Pending;
use crate::config::SessionConfig;
use crate::handlers::{EventHandler, InvocationHandler};
use crate::ledger::{Completion, PendingRequest, RequestKind, RequestLedger};
use crate::state::SessionState;
use crate::translator::ErrorTranslator;

/// Error URI answering an INVOCATION for a registration we no longer hold.
pub const NO_SUCH_REGISTRATION_URI: &str = "wamp.error.no_such_registration";

struct SessionInner {
	ledger: RequestLedger,
	state: SessionState,
	/// Requests withdrawn by [`Session::cancel`] whose reply may still arrive.
	cancelled: HashSet<Id>,
}

/// Client side of one WAMP session.
///
/// Closed until [`on_open`](Self::on_open) attaches a transport, open until
/// [`on_close`](Self::on_close) detaches it. Operations on a closed session
/// fail with [`Error::NotConnected`] before anything is recorded or sent.
pub struct Session {
	config: SessionConfig,
	transport: RwLock<Option<Arc<dyn Transport>>>,
	inner: Mutex<SessionInner>,
	errors: RwLock<ErrorTranslator>,
}

impl Default for Session {
	fn default() -> Self {
		Self::new(SessionConfig::default())
	}
}

impl Session {
	pub fn new(config: SessionConfig) -> Self {
		Self {
			config,
			transport: RwLock::new(None),
			inner: Mutex::new(SessionInner {
				ledger: RequestLedger::new(),
				state: SessionState::new(),
				cancelled: HashSet::new(),
			}),
			errors: RwLock::new(ErrorTranslator::new()),
		}
	}

	pub fn config(&self) -> &SessionConfig {
		&self.config
	}

	/// Maps the error type `E` to an error URI for this session.
	///
	/// See [`ErrorTranslator::define`].
	pub fn define<E: FromPayload>(&self, uri: Option<&str>) -> Result<()> {
		self.errors.write().define::<E>(uri)
	}

	/// Attaches the transport, opening the session.
	pub fn on_open(&self, transport: Arc<dyn Transport>) {
		if self.transport.write().replace(transport).is_some() {
			tracing::warn!("Session opened again without close, previous transport replaced");
		} else {
			tracing::debug!("Session opened");
		}
	}

	/// Detaches the transport, closing the session.
	///
	/// With the default configuration every pending request is rejected with
	/// [`Error::TransportLost`] and all subscriptions and registrations are
	/// dropped.
	pub fn on_close(&self) {
		if self.transport.write().take().is_none() {
			tracing::debug!("Session already closed");
			return;
		}

		let (rejected, kept) = {
			let mut inner = self.inner.lock();
			inner.cancelled.clear();
			if self.config.clear_state_on_close {
				inner.state.clear();
			}
			if self.config.reject_pending_on_close {
				(inner.ledger.drain(), 0)
			} else {
				(Vec::new(), inner.ledger.len())
			}
		};

		if kept > 0 {
			tracing::warn!(pending = kept, "Session closed with requests left pending");
		}
		for (request, pending) in rejected {
			tracing::debug!(request, kind = %pending.kind(), "Rejecting pending request on close");
			pending.reject(Error::TransportLost);
		}
		tracing::debug!("Session closed");
	}

	/// Returns true while a transport is attached and can carry messages.
	pub fn is_open(&self) -> bool {
		self.transport
			.read()
			.as_ref()
			.is_some_and(|transport| transport.is_open())
	}

	/// Number of requests awaiting a reply.
	pub fn pending_requests(&self) -> usize {
		self.inner.lock().ledger.len()
	}

	pub fn subscription_count(&self) -> usize {
		self.inner.lock().state.subscription_count()
	}

	pub fn registration_count(&self) -> usize {
		self.inner.lock().state.registration_count()
	}

	pub fn has_subscription(&self, subscription: Id) -> bool {
		self.inner.lock().state.lookup_subscription(subscription).is_some()
	}

	pub fn has_registration(&self, registration: Id) -> bool {
		self.inner.lock().state.lookup_registration(registration).is_some()
	}

	/// Publishes an event to `topic`. Resolves to the publication id.
	///
	/// The router is always asked to acknowledge, so every publication is
	/// answered by PUBLISHED or ERROR.
	pub async fn publish(
		&self,
		topic: &str,
		payload: Payload,
		options: PublishOptions,
	) -> Result<Pending<Id>> {
		let transport = self.transport()?;
		validate_uri("topic", topic)?;

		let (tx, rx) = oneshot::channel();
		let request = self.enqueue(PendingRequest::Publish { completion: tx })?;
		let message = Message::Publish(Publish {
			request,
			options: options.acknowledge(true),
			topic: topic.to_string(),
			payload,
		});
		self.send_request(&transport, request, message).await?;
		Ok(Pending::new(request, rx))
	}

	/// Subscribes `handler` to `topic`. Resolves to the subscription id.
	pub async fn subscribe(
		&self,
		topic: &str,
		options: SubscribeOptions,
		handler: EventHandler,
	) -> Result<Pending<Id>> {
		let transport = self.transport()?;
		validate_uri("topic", topic)?;

		let (tx, rx) = oneshot::channel();
		let request = self.enqueue(PendingRequest::Subscribe {
			completion: tx,
			handler,
		})?;
		let message = Message::Subscribe(Subscribe {
			request,
			options,
			topic: topic.to_string(),
		});
		self.send_request(&transport, request, message).await?;
		Ok(Pending::new(request, rx))
	}

	pub async fn unsubscribe(&self, subscription: Id) -> Result<Pending<()>> {
		let transport = self.transport()?;
		validate_id("subscription", subscription)?;

		let (tx, rx) = oneshot::channel();
		let request = self.enqueue(PendingRequest::Unsubscribe {
			completion: tx,
			subscription,
		})?;
		let message = Message::Unsubscribe(Unsubscribe {
			request,
			subscription,
		});
		self.send_request(&transport, request, message).await?;
		Ok(Pending::new(request, rx))
	}

	/// Calls `procedure`. Resolves to the RESULT payload.
	pub async fn call(
		&self,
		procedure: &str,
		payload: Payload,
		options: CallOptions,
	) -> Result<Pending<Payload>> {
		let transport = self.transport()?;
		validate_uri("procedure", procedure)?;

		let (tx, rx) = oneshot::channel();
		let request = self.enqueue(PendingRequest::Call { completion: tx })?;
		let message = Message::Call(Call {
			request,
			options,
			procedure: procedure.to_string(),
			payload,
		});
		self.send_request(&transport, request, message).await?;
		Ok(Pending::new(request, rx))
	}

	/// Registers `handler` as `procedure`. Resolves to the registration id.
	pub async fn register(
		&self,
		procedure: &str,
		options: RegisterOptions,
		handler: InvocationHandler,
	) -> Result<Pending<Id>> {
		let transport = self.transport()?;
		validate_uri("procedure", procedure)?;

		let (tx, rx) = oneshot::channel();
		let request = self.enqueue(PendingRequest::Register {
			completion: tx,
			handler,
		})?;
		let message = Message::Register(Register {
			request,
			options,
			procedure: procedure.to_string(),
		});
		self.send_request(&transport, request, message).await?;
		Ok(Pending::new(request, rx))
	}

	pub async fn unregister(&self, registration: Id) -> Result<Pending<()>> {
		let transport = self.transport()?;
		validate_id("registration", registration)?;

		let (tx, rx) = oneshot::channel();
		let request = self.enqueue(PendingRequest::Unregister {
			completion: tx,
			registration,
		})?;
		let message = Message::Unregister(Unregister {
			request,
			registration,
		});
		self.send_request(&transport, request, message).await?;
		Ok(Pending::new(request, rx))
	}

	/// Withdraws a pending request, rejecting its caller with
	/// [`Error::Cancelled`].
	///
	/// Returns false if the request already resolved. A reply that arrives
	/// for a withdrawn request later is discarded.
	pub fn cancel(&self, request: Id) -> bool {
		let pending = {
			let mut inner = self.inner.lock();
			let pending = inner.ledger.take_any(request);
			if pending.is_some() {
				inner.cancelled.insert(request);
			}
			pending
		};

		match pending {
			Some(pending) => {
				tracing::debug!(request, kind = %pending.kind(), "Cancelled pending request");
				pending.reject(Error::Cancelled(request));
				true
			}
			None => false,
		}
	}

	/// Opens the session on `transport`, dispatches `incoming` until it ends
	/// or the peer violates the protocol, then closes the session.
	pub async fn run(
		self: &Arc<Self>,
		transport: Arc<dyn Transport>,
		mut incoming: mpsc::UnboundedReceiver<Message>,
	) -> Result<()> {
		self.on_open(transport);

		let result = loop {
			let Some(message) = incoming.recv().await else {
				tracing::debug!("Incoming message stream ended");
				break Ok(());
			};
			let kind = message.kind();
			match self.on_message(message).await {
				Ok(true) => {}
				Ok(false) => tracing::debug!(%kind, "Message not handled by session (ignored)"),
				Err(e) if e.is_protocol_violation() => {
					tracing::error!(%kind, "Closing session: {}", e);
					break Err(e);
				}
				Err(e) => tracing::error!(%kind, "Error dispatching message: {}", e),
			}
		};

		self.on_close();
		result
	}

	/// Dispatches one incoming message.
	///
	/// Returns `Ok(false)` for message kinds this engine does not own. A reply
	/// that correlates with no pending request is an
	/// [`Error::ProtocolViolation`], after which the session should be closed.
	pub async fn on_message(self: &Arc<Self>, message: Message) -> Result<bool> {
		tracing::debug!(
			kind = %message.kind(),
			request = ?message.request_id(),
			"Dispatching message"
		);

		match message {
			Message::Published(published) => {
				let request = published.request;
				let pending = take_reply(&mut self.inner.lock(), RequestKind::Publish, request)?;
				if let Some(PendingRequest::Publish { completion }) = pending {
					complete(request, completion, Ok(published.publication));
				}
			}
			Message::Subscribed(subscribed) => {
				let request = subscribed.request;
				let subscription = subscribed.subscription;
				let completion = {
					let mut inner = self.inner.lock();
					match take_reply(&mut inner, RequestKind::Subscribe, request)? {
						Some(PendingRequest::Subscribe {
							completion,
							handler,
						}) => {
							inner.state.install_subscription(subscription, handler);
							Some(completion)
						}
						_ => {
							tracing::warn!(
								request,
								subscription,
								"Subscription orphaned by cancel"
							);
							None
						}
					}
				};
				if let Some(completion) = completion {
					tracing::debug!(request, subscription, "Subscription installed");
					complete(request, completion, Ok(subscription));
				}
			}
			Message::Unsubscribed(unsubscribed) => {
				let request = unsubscribed.request;
				let completion = {
					let mut inner = self.inner.lock();
					match take_reply(&mut inner, RequestKind::Unsubscribe, request)? {
						Some(PendingRequest::Unsubscribe {
							completion,
							subscription,
						}) => {
							if !inner.state.remove_subscription(subscription) {
								tracing::debug!(
									request,
									subscription,
									"Unsubscribed an already removed subscription"
								);
							}
							Some(completion)
						}
						_ => None,
					}
				};
				if let Some(completion) = completion {
					complete(request, completion, Ok(()));
				}
			}
			Message::Result(result) if is_progress(&result.details) => {
				self.on_progress(result.request)?;
			}
			Message::Result(result) => {
				let request = result.request;
				let pending = take_reply(&mut self.inner.lock(), RequestKind::Call, request)?;
				if let Some(PendingRequest::Call { completion }) = pending {
					complete(request, completion, Ok(result.payload));
				}
			}
			Message::Registered(registered) => {
				let request = registered.request;
				let registration = registered.registration;
				let completion = {
					let mut inner = self.inner.lock();
					match take_reply(&mut inner, RequestKind::Register, request)? {
						Some(PendingRequest::Register {
							completion,
							handler,
						}) => {
							inner.state.install_registration(registration, handler);
							Some(completion)
						}
						_ => {
							tracing::warn!(
								request,
								registration,
								"Registration orphaned by cancel"
							);
							None
						}
					}
				};
				if let Some(completion) = completion {
					tracing::debug!(request, registration, "Registration installed");
					complete(request, completion, Ok(registration));
				}
			}
			Message::Unregistered(unregistered) => {
				let request = unregistered.request;
				let completion = {
					let mut inner = self.inner.lock();
					match take_reply(&mut inner, RequestKind::Unregister, request)? {
						Some(PendingRequest::Unregister {
							completion,
							registration,
						}) => {
							if !inner.state.remove_registration(registration) {
								tracing::debug!(
									request,
									registration,
									"Unregistered an already removed registration"
								);
							}
							Some(completion)
						}
						_ => None,
					}
				};
				if let Some(completion) = completion {
					complete(request, completion, Ok(()));
				}
			}
			Message::Error(error) => self.on_error(error)?,
			Message::Event(event) => self.on_event(event).await?,
			Message::Invocation(invocation) => self.on_invocation(invocation).await?,
			Message::Hello(_)
			| Message::Welcome(_)
			| Message::Abort(_)
			| Message::Goodbye(_)
			| Message::Publish(_)
			| Message::Subscribe(_)
			| Message::Unsubscribe(_)
			| Message::Call(_)
			| Message::Register(_)
			| Message::Unregister(_)
			| Message::Yield(_) => return Ok(false),
		}

		Ok(true)
	}

	/// Drops a progressive RESULT, leaving the call pending for its final one.
	fn on_progress(&self, request: Id) -> Result<()> {
		let inner = self.inner.lock();
		if inner.ledger.pending_kind(request) == Some(RequestKind::Call)
			|| inner.cancelled.contains(&request)
		{
			tracing::debug!(request, "Progressive RESULT dropped");
			return Ok(());
		}
		Err(violation(format!(
			"progressive RESULT received for non-pending request ID {request}"
		)))
	}

	fn on_error(&self, message: ErrorMessage) -> Result<()> {
		let request = message.request;
		let pending = {
			let mut inner = self.inner.lock();
			match inner.ledger.take_any(request) {
				Some(pending) => Some(pending),
				None if inner.cancelled.remove(&request) => {
					tracing::debug!(
						request,
						uri = %message.error,
						"ERROR for cancelled request discarded"
					);
					None
				}
				None => {
					return Err(violation(format!(
						"ERROR received for non-pending request ID {request}"
					)));
				}
			}
		};

		if let Some(pending) = pending {
			tracing::debug!(
				request,
				kind = %pending.kind(),
				uri = %message.error,
				"Request failed remotely"
			);
			let error = self.errors.read().from_wire_error(&message);
			if !pending.reject(Error::Remote(error)) {
				tracing::debug!(request, "Caller dropped pending request before its reply");
			}
		}
		Ok(())
	}

	/// Runs the subscription handler inline so events are seen in order.
	///
	/// A panicking handler is logged and the event counts as delivered.
	async fn on_event(&self, event: Event) -> Result<()> {
		let subscription = event.subscription;
		let handler = {
			let inner = self.inner.lock();
			match inner.state.lookup_subscription(subscription) {
				Some(handler) => handler,
				None if inner.ledger.is_unsubscribing(subscription) => {
					tracing::debug!(
						subscription,
						"EVENT for subscription being unsubscribed (dropped)"
					);
					return Ok(());
				}
				None if !self.config.strict_event_dispatch => {
					tracing::debug!(subscription, "EVENT for unknown subscription (dropped)");
					return Ok(());
				}
				None => {
					return Err(violation(format!(
						"EVENT received for unknown subscription ID {subscription}"
					)));
				}
			}
		};

		let publication = event.publication;
		let outcome = AssertUnwindSafe(async move { handler(event).await })
			.catch_unwind()
			.await;
		if let Err(panic) = outcome {
			tracing::error!(
				subscription,
				publication,
				"{}",
				panic_message("event handler", panic.as_ref())
			);
		}
		Ok(())
	}

	async fn on_invocation(self: &Arc<Self>, invocation: Invocation) -> Result<()> {
		let request = invocation.request;
		let registration = invocation.registration;
		let handler = {
			let inner = self.inner.lock();
			let handler = inner.state.lookup_registration(registration);
			if handler.is_none()
				&& self.config.strict_event_dispatch
				&& !inner.ledger.is_unregistering(registration)
			{
				return Err(violation(format!(
					"INVOCATION received for unknown registration ID {registration}"
				)));
			}
			handler
		};

		let Some(handler) = handler else {
			tracing::debug!(
				request,
				registration,
				"INVOCATION for unknown registration, answering with error"
			);
			let reply = ErrorMessage::new(request, NO_SUCH_REGISTRATION_URI, Payload::new());
			self.send_reply(Message::Error(reply)).await;
			return Ok(());
		};

		self.spawn_invocation(handler, invocation);
		Ok(())
	}

	/// Runs a procedure handler on its own task and sends its YIELD or ERROR.
	fn spawn_invocation(self: &Arc<Self>, handler: InvocationHandler, invocation: Invocation) {
		let session = Arc::clone(self);
		let request = invocation.request;

		tokio::spawn(async move {
			let outcome = AssertUnwindSafe(async move { handler(invocation).await })
				.catch_unwind()
				.await;

			let reply = match outcome {
				Ok(Ok(payload)) => Message::Yield(Yield {
					request,
					options: Map::new(),
					payload,
				}),
				Ok(Err(raised)) => {
					tracing::debug!(request, "Procedure raised: {}", raised);
					Message::Error(session.errors.read().to_wire_error(request, raised.as_error()))
				}
				Err(panic) => {
					let message = panic_message("procedure", panic.as_ref());
					tracing::error!(request, "{}", message);
					Message::Error(ErrorMessage::new(
						request,
						RUNTIME_ERROR_URI,
						Payload::new().arg(message),
					))
				}
			};

			session.send_reply(reply).await;
		});
	}

	fn transport(&self) -> Result<Arc<dyn Transport>> {
		self.transport.read().clone().ok_or(Error::NotConnected)
	}

	/// Allocates a request id and records `pending` under it.
	fn enqueue(&self, pending: PendingRequest) -> Result<Id> {
		let mut inner = self.inner.lock();
		let request = inner.ledger.new_request_id();
		inner.ledger.register(request, pending)?;
		inner.cancelled.remove(&request);
		Ok(request)
	}

	/// Sends a recorded request, withdrawing it again if the send fails.
	async fn send_request(
		&self,
		transport: &Arc<dyn Transport>,
		request: Id,
		message: Message,
	) -> Result<()> {
		let kind = message.kind();
		tracing::debug!(request, %kind, "Sending request");

		if let Err(e) = transport.send(message).await {
			tracing::error!(request, %kind, "Failed to send request: {}", e);
			self.inner.lock().ledger.take_any(request);
			return Err(e);
		}
		Ok(())
	}

	/// Sends a YIELD or ERROR answering an INVOCATION.
	async fn send_reply(&self, message: Message) {
		let kind = message.kind();
		let request = message.request_id();
		let transport = match self.transport() {
			Ok(transport) => transport,
			Err(_) => {
				tracing::warn!(%kind, ?request, "Dropping reply, session is closed");
				return;
			}
		};
		if let Err(e) = transport.send(message).await {
			tracing::error!(%kind, ?request, "Failed to send reply: {}", e);
		}
	}
}

/// Takes the pending request a reply answers.
///
/// A returned request is always of `kind`, since each ledger table holds one
/// kind. `Ok(None)` means the request was cancelled and the reply is
/// discarded.
fn take_reply(
	inner: &mut SessionInner,
	kind: RequestKind,
	request: Id,
) -> Result<Option<PendingRequest>> {
	if let Some(pending) = inner.ledger.take(kind, request) {
		return Ok(Some(pending));
	}
	if inner.cancelled.remove(&request) {
		tracing::debug!(request, %kind, "Reply for cancelled request discarded");
		return Ok(None);
	}
	Err(violation(format!(
		"{kind} reply received for non-pending request ID {request}"
	)))
}

fn complete<T>(request: Id, completion: Completion<T>, value: Result<T>) {
	if completion.send(value).is_err() {
		tracing::debug!(request, "Caller dropped pending request before its reply");
	}
}

fn is_progress(details: &Map<String, Value>) -> bool {
	details.get("progress").and_then(Value::as_bool) == Some(true)
}

fn panic_message(what: &str, panic: &(dyn Any + Send)) -> String {
	if let Some(s) = panic.downcast_ref::<&str>() {
		format!("panic in {what}: {s}")
	} else if let Some(s) = panic.downcast_ref::<String>() {
		format!("panic in {what}: {s}")
	} else {
		format!("panic in {what}")
	}
}

fn violation(message: String) -> Error {
	tracing::error!("Protocol violation: {}", message);
	Error::ProtocolViolation(message)
}

fn validate_uri(what: &str, uri: &str) -> Result<()> {
	if is_valid_uri(uri) {
		Ok(())
	} else {
		Err(Error::InvalidArgument(format!("invalid {what} URI '{uri}'")))
	}
}

fn validate_id(what: &str, id: Id) -> Result<()> {
	if (1..=MAX_ID).contains(&id) {
		Ok(())
	} else {
		Err(Error::InvalidArgument(format!("{what} ID {id} is out of range")))
	}
}
