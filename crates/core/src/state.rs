//! Active subscriptions and registrations.
//!
//! Only the session mutates this, and only in response to SUBSCRIBED,
//! UNSUBSCRIBED, REGISTERED and UNREGISTERED replies (or on close).

use std::collections::HashMap;

use wamp_protocol::Id;

use crate::handlers::{EventHandler, InvocationHandler};

#[derive(Default)]
pub struct SessionState {
	subscriptions: HashMap<Id, EventHandler>,
	registrations: HashMap<Id, InvocationHandler>,
}

impl SessionState {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn install_subscription(&mut self, subscription: Id, handler: EventHandler) {
		if self.subscriptions.insert(subscription, handler).is_some() {
			tracing::warn!(subscription, "Replaced handler of an active subscription");
		}
	}

	/// Removes a subscription. Returns false if it was not active.
	pub fn remove_subscription(&mut self, subscription: Id) -> bool {
		self.subscriptions.remove(&subscription).is_some()
	}

	pub fn lookup_subscription(&self, subscription: Id) -> Option<EventHandler> {
		self.subscriptions.get(&subscription).cloned()
	}

	pub fn install_registration(&mut self, registration: Id, handler: InvocationHandler) {
		if self.registrations.insert(registration, handler).is_some() {
			tracing::warn!(registration, "Replaced handler of an active registration");
		}
	}

	/// Removes a registration. Returns false if it was not active.
	pub fn remove_registration(&mut self, registration: Id) -> bool {
		self.registrations.remove(&registration).is_some()
	}

	pub fn lookup_registration(&self, registration: Id) -> Option<InvocationHandler> {
		self.registrations.get(&registration).cloned()
	}

	pub fn subscription_count(&self) -> usize {
		self.subscriptions.len()
	}

	pub fn registration_count(&self) -> usize {
		self.registrations.len()
	}

	pub fn clear(&mut self) {
		self.subscriptions.clear();
		self.registrations.clear();
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::handlers::{event_handler, invocation_handler};
	use wamp_protocol::Payload;

	#[test]
	fn test_subscription_lifecycle() {
		let mut state = SessionState::new();
		state.install_subscription(7, event_handler(|_| async {}));

		assert!(state.lookup_subscription(7).is_some());
		assert!(state.lookup_subscription(8).is_none());
		assert!(state.remove_subscription(7));
		assert!(state.lookup_subscription(7).is_none());
	}

	#[test]
	fn test_remove_absent_is_harmless() {
		let mut state = SessionState::new();
		assert!(!state.remove_subscription(1));
		assert!(!state.remove_registration(1));
		assert_eq!(state.subscription_count(), 0);
	}

	#[test]
	fn test_clear_drops_everything() {
		let mut state = SessionState::new();
		state.install_subscription(1, event_handler(|_| async {}));
		state.install_registration(2, invocation_handler(|_| async { Ok(Payload::new()) }));
		assert_eq!(state.subscription_count(), 1);
		assert_eq!(state.registration_count(), 1);

		state.clear();

		assert_eq!(state.subscription_count(), 0);
		assert_eq!(state.registration_count(), 0);
	}
}
