use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::sync::oneshot;
use wamp_protocol::Id;
use wamp_runtime::{Error, Result};

/// Future resolving to the reply of one outbound request.
///
/// Returned by every [`Session`](crate::Session) operation once the request is
/// on the wire. Dropping it does not withdraw the request; use
/// [`Session::cancel`](crate::Session::cancel) with [`request_id`](Self::request_id)
/// for that.
#[must_use = "a Pending does nothing unless awaited"]
pub struct Pending<T> {
	request: Id,
	rx: oneshot::Receiver<Result<T>>,
}

impl<T> Pending<T> {
	pub(crate) fn new(request: Id, rx: oneshot::Receiver<Result<T>>) -> Self {
		Self { request, rx }
	}

	/// Request id this future is waiting on.
	pub fn request_id(&self) -> Id {
		self.request
	}
}

impl<T> Future for Pending<T> {
	type Output = Result<T>;

	fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
		Pin::new(&mut self.rx)
			.poll(cx)
			.map(|result| result.map_err(|_| Error::ChannelClosed).and_then(|r| r))
	}
}

impl<T> std::fmt::Debug for Pending<T> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Pending")
			.field("request", &self.request)
			.finish_non_exhaustive()
	}
}
