//! wamp: session-layer request correlation for WAMP peers
//!
//! This crate drives the client side of a WAMP session once a transport is
//! connected: it issues PUBLISH, SUBSCRIBE, CALL, REGISTER and their
//! counterparts, correlates every reply with the request that caused it, and
//! routes incoming EVENT and INVOCATION messages to application handlers.
//!
//! # Examples
//!
//! ```ignore
//! use std::sync::Arc;
//!
//! use wamp::{MemoryTransport, Payload, CallOptions, Session, SessionConfig};
//!
//! #[tokio::main]
//! async fn main() -> wamp::Result<()> {
//!     let session = Arc::new(Session::new(SessionConfig::default()));
//!     let (transport, _outgoing) = MemoryTransport::pair();
//!     session.on_open(Arc::new(transport));
//!
//!     let pending = session
//!         .call("com.example.add", Payload::new().arg(2).arg(3), CallOptions::new())
//!         .await?;
//!
//!     // The peer answers through session.on_message(...)
//!     let result = pending.await?;
//!     println!("{:?}", result.args);
//!     Ok(())
//! }
//! ```
//!
//! # Layers
//!
//! - `wamp-protocol`: typed WAMP messages, options and payloads
//! - `wamp-runtime`: errors, the application error capability, transports
//! - this crate: the session engine, its request ledger and error translator

pub mod config;
pub mod handlers;
pub mod ledger;
pub mod session;
pub mod state;
pub mod translator;

pub use config::SessionConfig;
pub use handlers::{
	EventHandler, HandlerFuture, InvocationHandler, InvocationResult, event_handler,
	invocation_handler,
};
pub use ledger::{PendingRequest, RequestKind, RequestLedger};
pub use session::{NO_SUCH_REGISTRATION_URI, Pending, Session};
pub use state::SessionState;
pub use translator::ErrorTranslator;
pub use wamp_protocol::{
	CallOptions, ErrorMessage, Event, EventDetails, Id, Invocation, InvocationDetails, MAX_ID,
	MatchPolicy, Message, MessageKind, Payload, PublishOptions, RegisterOptions,
	SubscribeOptions, UriPattern,
};
pub use wamp_runtime::{
	ApplicationError, Error, FromPayload, MemoryTransport, PayloadError, RUNTIME_ERROR_URI,
	RaisedError, Result, Transport, WampError, decode_args,
};
