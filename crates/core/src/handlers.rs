//! Event and procedure handler types.
//!
//! Handlers are stored type-erased behind [`Arc`] so the session can clone
//! them out of its state and invoke them without holding any lock.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use wamp_protocol::{Event, Invocation, Payload};
use wamp_runtime::RaisedError;

/// Boxed async handler future.
pub type HandlerFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;

/// What a procedure handler produces: the YIELD payload, or an error that is
/// translated into an ERROR reply.
pub type InvocationResult = std::result::Result<Payload, RaisedError>;

/// Handler function for EVENT messages routed to a subscription.
pub type EventHandler = Arc<dyn Fn(Event) -> HandlerFuture<()> + Send + Sync>;

/// Handler function for INVOCATION messages routed to a registration.
pub type InvocationHandler =
	Arc<dyn Fn(Invocation) -> HandlerFuture<InvocationResult> + Send + Sync>;

/// Wraps an async closure as an [`EventHandler`].
///
/// Event handlers run on the dispatch path: a handler that never completes
/// stalls every other reply on the session.
pub fn event_handler<F, Fut>(handler: F) -> EventHandler
where
	F: Fn(Event) -> Fut + Send + Sync + 'static,
	Fut: Future<Output = ()> + Send + 'static,
{
	Arc::new(move |event: Event| -> HandlerFuture<()> { Box::pin(handler(event)) })
}

/// Wraps an async closure as an [`InvocationHandler`].
pub fn invocation_handler<F, Fut>(handler: F) -> InvocationHandler
where
	F: Fn(Invocation) -> Fut + Send + Sync + 'static,
	Fut: Future<Output = InvocationResult> + Send + 'static,
{
	Arc::new(move |invocation: Invocation| -> HandlerFuture<InvocationResult> {
		Box::pin(handler(invocation))
	})
}
