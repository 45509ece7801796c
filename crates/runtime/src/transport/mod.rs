//! Transport boundary of the session engine.
//!
//! The engine only needs to hand a typed [`Message`] to whatever carries it;
//! framing and serialization live behind this trait. [`MemoryTransport`]
//! carries messages over an in-process channel.

use std::future::Future;
use std::pin::Pin;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use wamp_protocol::Message;

use crate::error::{Error, Result};

/// Future returned by [`Transport::send`].
pub type SendFuture<'a> = Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;

/// A message-oriented channel to the router.
pub trait Transport: Send + Sync {
	/// Sends one message. May wait on backpressure; fails if the channel is gone.
	fn send(&self, message: Message) -> SendFuture<'_>;

	/// Returns false once the channel can no longer carry messages.
	fn is_open(&self) -> bool {
		true
	}
}

/// In-memory transport backed by an unbounded tokio channel.
///
/// The paired receiver observes every sent message; [`close`](Self::close)
/// ends the receiver's stream and makes further sends fail.
pub struct MemoryTransport {
	tx: Mutex<Option<mpsc::UnboundedSender<Message>>>,
}

impl MemoryTransport {
	/// Creates a transport and the receiver for the messages sent through it.
	pub fn pair() -> (Self, mpsc::UnboundedReceiver<Message>) {
		let (tx, rx) = mpsc::unbounded_channel();
		(
			Self {
				tx: Mutex::new(Some(tx)),
			},
			rx,
		)
	}

	/// Closes the transport.
	pub fn close(&self) {
		if self.tx.lock().take().is_some() {
			tracing::debug!("Memory transport closed");
		}
	}
}

impl Transport for MemoryTransport {
	fn send(&self, message: Message) -> SendFuture<'_> {
		let result = match self.tx.lock().as_ref() {
			Some(tx) => tx.send(message).map_err(|e| {
				Error::TransportError(format!("receiver dropped, lost {}", e.0.kind()))
			}),
			None => Err(Error::TransportError("transport is closed".to_string())),
		};
		Box::pin(async move { result })
	}

	fn is_open(&self) -> bool {
		self.tx.lock().as_ref().is_some_and(|tx| !tx.is_closed())
	}
}
