//! Error types for the WAMP runtime.

use thiserror::Error;
use wamp_protocol::Id;

use crate::application::{ApplicationError, WampError};

/// Result type alias for runtime operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the WAMP session layer.
#[derive(Debug, Error)]
pub enum Error {
	/// No transport is attached, so no request can be issued.
	#[error("Not connected: no WAMP session is open")]
	NotConnected,

	/// The transport closed while the request was still pending.
	#[error("Transport lost before the request completed")]
	TransportLost,

	/// The transport failed to send a message.
	#[error("Transport error: {0}")]
	TransportError(String),

	/// The peer sent a message that does not correlate with our state.
	#[error("Protocol violation: {0}")]
	ProtocolViolation(String),

	/// Invalid argument provided to an operation.
	#[error("Invalid argument: {0}")]
	InvalidArgument(String),

	/// An error mapping could not be defined.
	#[error("Invalid error definition: {0}")]
	InvalidDefinition(String),

	/// A request id was registered while already pending.
	#[error("Request {0} is already pending")]
	DuplicateRequest(Id),

	/// The request was withdrawn locally before a reply arrived.
	#[error("Request {0} was cancelled")]
	Cancelled(Id),

	/// The remote peer answered the request with an application error.
	#[error("{0}")]
	Remote(Box<dyn WampError>),

	/// Completion dropped without being resolved.
	#[error("Channel closed unexpectedly")]
	ChannelClosed,

	/// JSON serialization/deserialization error.
	#[error("JSON error: {0}")]
	Json(#[from] serde_json::Error),
}

impl Error {
	/// Returns the application error if this is a Remote error.
	pub fn remote(&self) -> Option<&dyn WampError> {
		match self {
			Error::Remote(error) => Some(error.as_ref()),
			_ => None,
		}
	}

	/// Returns the remote error as `E` if it was reconstructed as that type.
	pub fn downcast_remote<E: WampError>(&self) -> Option<&E> {
		self.remote().and_then(|error| error.downcast_ref::<E>())
	}

	/// Returns the error URI if this is a Remote error that fell back to
	/// [`ApplicationError`].
	pub fn error_uri(&self) -> Option<&str> {
		self.downcast_remote::<ApplicationError>()
			.map(|error| error.uri())
	}

	/// Returns true if the session must be torn down because of this error.
	pub fn is_protocol_violation(&self) -> bool {
		matches!(self, Error::ProtocolViolation(_))
	}

	/// Returns true if the request failed because the transport went away.
	pub fn is_transport_lost(&self) -> bool {
		matches!(
			self,
			Error::TransportLost | Error::NotConnected | Error::TransportError(_)
		)
	}
}
