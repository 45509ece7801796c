//! Pending request bookkeeping.
//!
//! Every outbound request is recorded here under its request id until the
//! matching reply arrives. [`RequestLedger::take`] is the single point where a
//! request leaves the ledger, so whichever path takes it (success reply, error
//! reply, transport close, local cancellation) is the only one that resolves it.

use std::collections::HashMap;
use std::fmt;

use tokio::sync::oneshot;
use wamp_protocol::{Id, Payload};
use wamp_runtime::{Error, IdGenerator, Result};

use crate::handlers::{EventHandler, InvocationHandler};

/// Single-fire resolve/reject sink for one pending request.
pub type Completion<T> = oneshot::Sender<Result<T>>;

/// Kind of an outbound request, one ledger table per kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestKind {
	Publish,
	Subscribe,
	Unsubscribe,
	Call,
	Register,
	Unregister,
}

impl RequestKind {
	/// All kinds, in the order an ERROR reply searches them.
	pub const ALL: [RequestKind; 6] = [
		RequestKind::Publish,
		RequestKind::Subscribe,
		RequestKind::Unsubscribe,
		RequestKind::Call,
		RequestKind::Register,
		RequestKind::Unregister,
	];

	fn index(self) -> usize {
		self as usize
	}
}

impl fmt::Display for RequestKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let name = match self {
			RequestKind::Publish => "PUBLISH",
			RequestKind::Subscribe => "SUBSCRIBE",
			RequestKind::Unsubscribe => "UNSUBSCRIBE",
			RequestKind::Call => "CALL",
			RequestKind::Register => "REGISTER",
			RequestKind::Unregister => "UNREGISTER",
		};
		f.write_str(name)
	}
}

/// One in-flight request with the data needed to resolve it.
pub enum PendingRequest {
	Publish {
		completion: Completion<Id>,
	},
	Subscribe {
		completion: Completion<Id>,
		/// Installed under the subscription id once SUBSCRIBED arrives.
		handler: EventHandler,
	},
	Unsubscribe {
		completion: Completion<()>,
		/// Removed from session state once UNSUBSCRIBED arrives.
		subscription: Id,
	},
	Call {
		completion: Completion<Payload>,
	},
	Register {
		completion: Completion<Id>,
		handler: InvocationHandler,
	},
	Unregister {
		completion: Completion<()>,
		registration: Id,
	},
}

impl PendingRequest {
	pub fn kind(&self) -> RequestKind {
		match self {
			PendingRequest::Publish { .. } => RequestKind::Publish,
			PendingRequest::Subscribe { .. } => RequestKind::Subscribe,
			PendingRequest::Unsubscribe { .. } => RequestKind::Unsubscribe,
			PendingRequest::Call { .. } => RequestKind::Call,
			PendingRequest::Register { .. } => RequestKind::Register,
			PendingRequest::Unregister { .. } => RequestKind::Unregister,
		}
	}

	/// Resolves the request with an error.
	///
	/// Returns false if the caller already dropped its [`Pending`](crate::Pending).
	pub fn reject(self, error: Error) -> bool {
		match self {
			PendingRequest::Publish { completion }
			| PendingRequest::Subscribe { completion, .. }
			| PendingRequest::Register { completion, .. } => completion.send(Err(error)).is_ok(),
			PendingRequest::Unsubscribe { completion, .. }
			| PendingRequest::Unregister { completion, .. } => completion.send(Err(error)).is_ok(),
			PendingRequest::Call { completion } => completion.send(Err(error)).is_ok(),
		}
	}
}

impl fmt::Debug for PendingRequest {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let mut debug = f.debug_struct("PendingRequest");
		debug.field("kind", &self.kind());
		match self {
			PendingRequest::Unsubscribe { subscription, .. } => {
				debug.field("subscription", subscription);
			}
			PendingRequest::Unregister { registration, .. } => {
				debug.field("registration", registration);
			}
			_ => {}
		}
		debug.finish()
	}
}

/// Per-kind tables of pending requests, keyed by request id.
///
/// Request ids are unique across all tables.
#[derive(Default)]
pub struct RequestLedger {
	ids: IdGenerator,
	tables: [HashMap<Id, PendingRequest>; 6],
}

impl RequestLedger {
	pub fn new() -> Self {
		Self::default()
	}

	/// Creates a ledger that allocates ids from `ids`.
	pub fn with_ids(ids: IdGenerator) -> Self {
		Self {
			ids,
			tables: Default::default(),
		}
	}

	/// Allocates a request id not pending in any table.
	pub fn new_request_id(&self) -> Id {
		loop {
			let id = self.ids.next_id();
			if !self.is_pending(id) {
				return id;
			}
			tracing::debug!(id, "Skipping request id still pending");
		}
	}

	/// Records a pending request under `id`.
	pub fn register(&mut self, id: Id, request: PendingRequest) -> Result<()> {
		if self.is_pending(id) {
			return Err(Error::DuplicateRequest(id));
		}
		self.tables[request.kind().index()].insert(id, request);
		Ok(())
	}

	/// Removes and returns the pending request `id` of the given kind.
	pub fn take(&mut self, kind: RequestKind, id: Id) -> Option<PendingRequest> {
		self.tables[kind.index()].remove(&id)
	}

	/// Removes and returns the pending request `id`, probing every kind in
	/// [`RequestKind::ALL`] order.
	pub fn take_any(&mut self, id: Id) -> Option<PendingRequest> {
		self.tables.iter_mut().find_map(|table| table.remove(&id))
	}

	pub fn is_pending(&self, id: Id) -> bool {
		self.tables.iter().any(|table| table.contains_key(&id))
	}

	/// Returns the kind of the pending request `id`.
	pub fn pending_kind(&self, id: Id) -> Option<RequestKind> {
		RequestKind::ALL
			.into_iter()
			.find(|kind| self.tables[kind.index()].contains_key(&id))
	}

	/// Returns true if an UNSUBSCRIBE for `subscription` is in flight.
	pub fn is_unsubscribing(&self, subscription: Id) -> bool {
		self.tables[RequestKind::Unsubscribe.index()]
			.values()
			.any(|request| match request {
				PendingRequest::Unsubscribe { subscription: s, .. } => *s == subscription,
				_ => false,
			})
	}

	/// Returns true if an UNREGISTER for `registration` is in flight.
	pub fn is_unregistering(&self, registration: Id) -> bool {
		self.tables[RequestKind::Unregister.index()]
			.values()
			.any(|request| match request {
				PendingRequest::Unregister { registration: r, .. } => *r == registration,
				_ => false,
			})
	}

	/// Number of pending requests across all kinds.
	pub fn len(&self) -> usize {
		self.tables.iter().map(HashMap::len).sum()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	/// Number of pending requests of one kind.
	pub fn len_of(&self, kind: RequestKind) -> usize {
		self.tables[kind.index()].len()
	}

	/// Removes every pending request.
	pub fn drain(&mut self) -> Vec<(Id, PendingRequest)> {
		self.tables
			.iter_mut()
			.flat_map(|table| table.drain())
			.collect()
	}
}
