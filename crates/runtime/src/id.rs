//! Request id allocation.

use std::sync::atomic::{AtomicU64, Ordering};

use wamp_protocol::{Id, MAX_ID};

/// Sequential id generator over `1..=MAX_ID`, wrapping back to 1.
#[derive(Debug)]
pub struct IdGenerator {
	next: AtomicU64,
}

impl Default for IdGenerator {
	fn default() -> Self {
		Self::new()
	}
}

impl IdGenerator {
	pub fn new() -> Self {
		Self::starting_at(1)
	}

	/// Creates a generator whose first id is `first` (clamped into the id space).
	pub fn starting_at(first: Id) -> Self {
		Self {
			next: AtomicU64::new(first.clamp(1, MAX_ID)),
		}
	}

	/// Returns the next id.
	pub fn next_id(&self) -> Id {
		let raw = self.next.fetch_add(1, Ordering::SeqCst);
		(raw - 1) % MAX_ID + 1
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_request_id_increments() {
		let ids = IdGenerator::new();
		assert_eq!(ids.next_id(), 1);
		assert_eq!(ids.next_id(), 2);
		assert_eq!(ids.next_id(), 3);
	}

	#[test]
	fn test_wraps_at_max_id() {
		let ids = IdGenerator::starting_at(MAX_ID);
		assert_eq!(ids.next_id(), MAX_ID);
		assert_eq!(ids.next_id(), 1);
	}

	#[test]
	fn test_zero_is_never_issued() {
		let ids = IdGenerator::starting_at(0);
		assert_eq!(ids.next_id(), 1);
	}
}
